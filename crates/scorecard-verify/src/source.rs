//! Source host collaborator and GitHub contents client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{VerifyError, VerifyResult};
use crate::http::{endpoint, parse_base_url, HttpBackend, HttpOutcome};
use crate::types::{FileRequest, VerifierConfig, WorkflowFile};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Read access to repository files at a given ref.
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn get_file_contents(&self, request: &FileRequest) -> VerifyResult<WorkflowFile>;
}

/// Body of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sha: Option<String>,
}

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpBackend,
    base_url: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &VerifierConfig) -> VerifyResult<Self> {
        Ok(Self {
            http: HttpBackend::new("github", config)?,
            base_url: parse_base_url("github", &config.github_api_url)?,
            token: config.github_token.clone(),
        })
    }

    fn contents_url(&self, request: &FileRequest) -> Url {
        let prefix = [
            "repos",
            request.repository.owner.as_str(),
            request.repository.name.as_str(),
            "contents",
        ];
        let file_segments = request.path.split('/').filter(|s| !s.is_empty());
        let mut url = endpoint(&self.base_url, prefix.into_iter().chain(file_segments));
        url.query_pairs_mut().append_pair("ref", &request.reference);
        url
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn get_file_contents(&self, request: &FileRequest) -> VerifyResult<WorkflowFile> {
        let url = self.contents_url(request);
        debug!(url = %url, file = %request, "fetching file contents");

        let outcome = self
            .http
            .send(|client| {
                let mut builder = client
                    .get(url.clone())
                    .header(ACCEPT, GITHUB_ACCEPT)
                    .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
                if let Some(token) = &self.token {
                    builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
                }
                builder
            })
            .await?;

        let response = match outcome {
            HttpOutcome::Found(response) => response,
            HttpOutcome::NotFound => {
                return Err(VerifyError::WorkflowNotFound {
                    owner: request.repository.owner.clone(),
                    repo: request.repository.name.clone(),
                    path: request.path.clone(),
                    reference: request.reference.clone(),
                })
            }
        };

        let body: ContentsResponse = response.json().await.map_err(|e| {
            VerifyError::invalid_response(format!("failed to parse contents response: {}", e))
        })?;

        Ok(WorkflowFile {
            path: request.path.clone(),
            reference: request.reference.clone(),
            content: decode_contents(&body)?,
            sha: body.sha,
        })
    }
}

fn decode_contents(body: &ContentsResponse) -> VerifyResult<Vec<u8>> {
    if body.kind != "file" {
        return Err(VerifyError::invalid_response(format!(
            "expected a file, got {:?}",
            body.kind
        )));
    }

    let content = body.content.as_deref().unwrap_or_default();
    match body.encoding.as_deref() {
        Some("base64") => {
            // GitHub wraps the base64 body at 60 columns.
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map_err(|e| VerifyError::encoding("file contents", e))
        }
        Some("") | None if content.is_empty() => Ok(Vec::new()),
        other => Err(VerifyError::invalid_response(format!(
            "unsupported content encoding {:?}",
            other
        ))),
    }
}
