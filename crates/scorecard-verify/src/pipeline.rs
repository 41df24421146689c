//! Verification pipeline.
//!
//! Payload to report:
//! 1. Look up log entries by payload digest
//! 2. Pick the most recently integrated entry
//! 3. Decode it and extract the signing certificate
//! 4. Recover repository provenance from the certificate
//! 5. Fetch the workflow file at that ref and hand it to the policy

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::certificate::{leaf_certificate, parse_certificates};
use crate::error::{VerifyError, VerifyResult};
use crate::key::extract_key_material;
use crate::policy::{PolicyOutcome, UnverifiedWorkflow, WorkflowPolicy};
use crate::provenance::extract_provenance;
use crate::rekor::{payload_digest, RekorClient, TransparencyLog};
use crate::source::{GitHubClient, SourceHost};
use crate::types::{
    EntrySummary, FileRequest, LogEntry, ProvenanceSummary, VerificationReport, VerifierConfig,
    WorkflowSummary,
};

/// Runs the verification pipeline against its collaborators.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct Verifier {
    log: Arc<dyn TransparencyLog>,
    source: Arc<dyn SourceHost>,
    policy: Arc<dyn WorkflowPolicy>,
    config: VerifierConfig,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    pub fn new(
        log: Arc<dyn TransparencyLog>,
        source: Arc<dyn SourceHost>,
        policy: Arc<dyn WorkflowPolicy>,
        config: VerifierConfig,
    ) -> Self {
        Self {
            log,
            source,
            policy,
            config,
        }
    }

    /// Rekor + GitHub clients with the default (non-evaluating) policy.
    pub fn from_config(config: VerifierConfig) -> VerifyResult<Self> {
        let log = RekorClient::new(&config)?;
        let source = GitHubClient::new(&config)?;
        Ok(Self::new(
            Arc::new(log),
            Arc::new(source),
            Arc::new(UnverifiedWorkflow),
            config,
        ))
    }

    /// Verify `payload` and report where it was signed from.
    pub async fn verify(&self, payload: &[u8]) -> VerifyResult<VerificationReport> {
        if payload.is_empty() {
            return Err(VerifyError::EmptyPayload);
        }

        let entry = self.latest_entry(payload).await?;

        let proposed = entry.decode()?;
        let key_material = extract_key_material(&proposed)?;
        let certs = parse_certificates(key_material)?;
        let provenance = extract_provenance(leaf_certificate(&certs)?)?;
        let repository = provenance.repository()?;
        info!(
            uuid = %entry.uuid,
            kind = %proposed.kind(),
            repository = %repository,
            reference = %provenance.reference,
            "recovered provenance"
        );

        let request = FileRequest {
            repository: repository.clone(),
            path: self.config.workflow_path(),
            reference: provenance.reference.clone(),
        };
        let workflow = self.source.get_file_contents(&request).await?;
        debug!(file = %request, bytes = workflow.content.len(), "fetched workflow");

        let policy = self.policy.evaluate(&provenance, &workflow);
        if let PolicyOutcome::Rejected { reason } = &policy {
            warn!(file = %request, reason = %reason, "workflow rejected");
            return Err(VerifyError::PolicyRejected {
                path: workflow.path,
                reason: reason.clone(),
            });
        }

        Ok(VerificationReport {
            entry: EntrySummary {
                uuid: entry.uuid.clone(),
                kind: proposed.kind().to_string(),
                log_index: entry.log_index,
                integrated_time: entry.integrated_at(),
                inclusion_proof_present: entry
                    .verification
                    .as_ref()
                    .is_some_and(|v| v.inclusion_proof.is_some()),
            },
            provenance: ProvenanceSummary {
                reference: provenance.reference,
                path: provenance.path,
                owner: repository.owner,
                repository: repository.name,
            },
            workflow: WorkflowSummary {
                size: workflow.content.len(),
                path: workflow.path,
                reference: workflow.reference,
                sha: workflow.sha,
            },
            policy,
        })
    }

    /// Fetch the trailing candidates and keep the greatest
    /// `(integrated_time, log_index)`.
    async fn latest_entry(&self, payload: &[u8]) -> VerifyResult<LogEntry> {
        let uuids = self.log.find_entry_uuids_by_payload(payload).await?;
        if uuids.is_empty() {
            return Err(VerifyError::EntryNotFound {
                query: payload_digest(payload),
            });
        }

        // Recency is decided by integrated time within the window, but the
        // window itself is the tail of the search result, so log order is
        // still trusted to put newer entries last.
        let skip = uuids.len().saturating_sub(self.config.max_candidates);
        if skip > 0 {
            debug!(
                total = uuids.len(),
                skipped = skip,
                "limiting candidate entries to the tail of the search result"
            );
        }

        let mut latest: Option<LogEntry> = None;
        for uuid in &uuids[skip..] {
            let entry = self.log.get_entry(uuid).await?;
            let newer = match &latest {
                Some(current) => entry.recency() >= current.recency(),
                None => true,
            };
            if newer {
                latest = Some(entry);
            }
        }

        latest.ok_or_else(|| VerifyError::EntryNotFound {
            query: payload_digest(payload),
        })
    }
}
