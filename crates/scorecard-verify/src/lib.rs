//! Scorecard signature certificate verification.
//!
//! Given a Scorecard results payload, this crate finds the matching entry
//! in the Rekor transparency log and recovers which repository and ref
//! signed it:
//!
//! - Rekor search and entry retrieval
//! - `rekord` / `hashedrekord` entry body decoding
//! - PEM certificate parsing of the embedded key material
//! - Fulcio provenance extensions (repository path and ref)
//! - Workflow file retrieval from GitHub at the signing ref
//!
//! # Quick Start
//!
//! ```no_run
//! use scorecard_verify::{Verifier, VerifierConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let verifier = Verifier::from_config(VerifierConfig::from_env())?;
//!
//! let payload = std::fs::read("results.sarif")?;
//! let report = verifier.verify(&payload).await?;
//! println!(
//!     "signed by {} at {}",
//!     report.provenance.path, report.provenance.reference
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SCORECARD_VERIFY_REKOR_URL` | Rekor base URL (default: `https://rekor.sigstore.dev`) |
//! | `SCORECARD_VERIFY_GITHUB_API_URL` | GitHub API base URL (default: `https://api.github.com`) |
//! | `SCORECARD_VERIFY_GITHUB_TOKEN` | GitHub token (falls back to `GITHUB_TOKEN`) |
//! | `SCORECARD_VERIFY_WORKFLOW_FILE` | Workflow file name (default: `scorecards.yml`) |
//! | `SCORECARD_VERIFY_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `SCORECARD_VERIFY_MAX_RETRIES` | Max retries for transient failures (default: 3) |
//! | `SCORECARD_VERIFY_MAX_CANDIDATES` | Max log entries examined per payload (default: 16) |

pub mod certificate;
pub mod entry;
pub mod error;
mod http;
pub mod key;
pub mod pipeline;
pub mod policy;
pub mod provenance;
pub mod rekor;
pub mod source;
pub mod types;

// Re-export main types
pub use certificate::{leaf_certificate, parse_certificates, parse_pem_certificates};
pub use entry::{decode_entry, EntryKind, ProposedEntry};
pub use error::{VerifyError, VerifyResult};
pub use key::extract_key_material;
pub use pipeline::Verifier;
pub use policy::{PolicyOutcome, UnverifiedWorkflow, WorkflowPolicy};
pub use provenance::{
    extract_provenance, scan_extensions, Provenance, ProvenanceFields, RepositoryPath,
};
pub use rekor::{payload_digest, RekorClient, TransparencyLog};
pub use source::{GitHubClient, SourceHost};
pub use types::{
    EntrySummary, FileRequest, LogEntry, LogEntryResponse, ProvenanceSummary, VerificationReport,
    VerifierConfig, WorkflowFile, WorkflowSummary,
};

/// `User-Agent` sent to Rekor and GitHub.
pub const USER_AGENT: &str = http::USER_AGENT_VALUE;
