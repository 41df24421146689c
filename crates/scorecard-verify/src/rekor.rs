//! Transparency log collaborator and Rekor client.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::error::{VerifyError, VerifyResult};
use crate::http::{endpoint, parse_base_url, HttpBackend, HttpOutcome};
use crate::types::{LogEntry, LogEntryResponse, SearchIndex, VerifierConfig};

/// Read access to a transparency log.
#[async_trait]
pub trait TransparencyLog: Send + Sync {
    /// UUIDs of entries whose artifact digest matches `payload`.
    ///
    /// No ordering is assumed by callers.
    async fn find_entry_uuids_by_payload(&self, payload: &[u8]) -> VerifyResult<Vec<String>>;

    /// Fetch one entry by UUID.
    async fn get_entry(&self, uuid: &str) -> VerifyResult<LogEntry>;
}

/// `sha256:<hex>` digest used as the Rekor search key.
pub fn payload_digest(payload: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(payload)))
}

/// HTTP client for the Rekor v1 API.
#[derive(Debug, Clone)]
pub struct RekorClient {
    http: HttpBackend,
    base_url: Url,
}

impl RekorClient {
    pub fn new(config: &VerifierConfig) -> VerifyResult<Self> {
        Ok(Self {
            http: HttpBackend::new("rekor", config)?,
            base_url: parse_base_url("rekor", &config.rekor_url)?,
        })
    }
}

#[async_trait]
impl TransparencyLog for RekorClient {
    async fn find_entry_uuids_by_payload(&self, payload: &[u8]) -> VerifyResult<Vec<String>> {
        let url = endpoint(&self.base_url, ["api", "v1", "index", "retrieve"]);
        let query = SearchIndex {
            hash: payload_digest(payload),
        };
        debug!(url = %url, hash = %query.hash, "searching log index");

        let response = match self
            .http
            .send(|client| client.post(url.clone()).json(&query))
            .await?
        {
            HttpOutcome::Found(response) => response,
            HttpOutcome::NotFound => return Ok(Vec::new()),
        };

        response
            .json()
            .await
            .map_err(|e| VerifyError::invalid_response(format!("failed to parse index response: {}", e)))
    }

    async fn get_entry(&self, uuid: &str) -> VerifyResult<LogEntry> {
        let url = endpoint(&self.base_url, ["api", "v1", "log", "entries", uuid]);
        debug!(url = %url, "fetching log entry");

        let response = match self.http.send(|client| client.get(url.clone())).await? {
            HttpOutcome::Found(response) => response,
            HttpOutcome::NotFound => {
                return Err(VerifyError::EntryNotFound {
                    query: format!("uuid {}", uuid),
                })
            }
        };

        let entries: LogEntryResponse = response.json().await.map_err(|e| {
            VerifyError::invalid_response(format!("failed to parse log entry response: {}", e))
        })?;

        let (returned_uuid, mut entry) = entries.into_iter().next().ok_or_else(|| {
            VerifyError::invalid_response(format!("empty log entry response for {}", uuid))
        })?;
        entry.uuid = returned_uuid;
        Ok(entry)
    }
}
