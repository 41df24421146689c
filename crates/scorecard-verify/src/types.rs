//! Configuration and wire types shared across the pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::PolicyOutcome;
use crate::provenance::RepositoryPath;

/// A transparency log entry as returned by `GET /api/v1/log/entries/{uuid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// UUID of the entry (the key in the response map).
    #[serde(skip)]
    pub uuid: String,

    /// Canonicalized entry body (base64).
    pub body: String,

    /// Integrated time (Unix seconds).
    pub integrated_time: i64,

    /// Log ID (SHA-256 of the log's public key).
    #[serde(rename = "logID")]
    pub log_id: String,

    /// Log index.
    pub log_index: i64,

    /// Verification data.
    #[serde(default)]
    pub verification: Option<Verification>,
}

impl LogEntry {
    /// Integrated time as a UTC timestamp.
    pub fn integrated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.integrated_time, 0)
    }

    /// Ordering key for "most recently appended".
    pub(crate) fn recency(&self) -> (i64, i64) {
        (self.integrated_time, self.log_index)
    }
}

/// Verification data attached to a log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// Inclusion proof.
    #[serde(default)]
    pub inclusion_proof: Option<InclusionProof>,

    /// Signed entry timestamp (base64).
    #[serde(default)]
    pub signed_entry_timestamp: Option<String>,
}

/// Inclusion proof for a log entry. Carried through, never checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    #[serde(default)]
    pub checkpoint: Option<String>,
    pub hashes: Vec<String>,
    pub log_index: i64,
    pub root_hash: String,
    pub tree_size: i64,
}

/// Response body of the entries endpoint: `{ "<uuid>": LogEntry }`.
pub type LogEntryResponse = BTreeMap<String, LogEntry>;

/// Request body for `POST /api/v1/index/retrieve`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchIndex {
    pub hash: String,
}

/// Everything needed to fetch one file from a source host.
///
/// Bundled into a struct so owner, repo, path and ref cannot be passed in
/// the wrong order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub repository: RepositoryPath,
    pub path: String,
    pub reference: String,
}

impl std::fmt::Display for FileRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.repository, self.path, self.reference)
    }
}

/// A file fetched from the source host.
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    pub path: String,
    pub reference: String,
    /// Blob SHA reported by the host.
    pub sha: Option<String>,
    pub content: Vec<u8>,
}

/// Result of a successful verification, returned by `POST /projects/`.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub entry: EntrySummary,
    pub provenance: ProvenanceSummary,
    pub workflow: WorkflowSummary,
    pub policy: PolicyOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub uuid: String,
    pub kind: String,
    pub log_index: i64,
    pub integrated_time: Option<DateTime<Utc>>,
    pub inclusion_proof_present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceSummary {
    pub reference: String,
    pub path: String,
    pub owner: String,
    pub repository: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub path: String,
    pub reference: String,
    pub sha: Option<String>,
    pub size: usize,
}

/// Verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Base URL for the Rekor transparency log.
    #[serde(default = "default_rekor_url")]
    pub rekor_url: String,

    /// Base URL for the GitHub REST API.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// GitHub token (raises the anonymous rate limit).
    #[serde(default)]
    pub github_token: Option<String>,

    /// Workflow file name under `.github/workflows/`.
    #[serde(default = "default_workflow_file")]
    pub workflow_file: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of matching log entries examined per request.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_rekor_url() -> String {
    "https://rekor.sigstore.dev".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_workflow_file() -> String {
    "scorecards.yml".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_candidates() -> usize {
    16
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            rekor_url: default_rekor_url(),
            github_api_url: default_github_api_url(),
            github_token: None,
            workflow_file: default_workflow_file(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl VerifierConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SCORECARD_VERIFY_REKOR_URL` | Rekor base URL |
    /// | `SCORECARD_VERIFY_GITHUB_API_URL` | GitHub API base URL |
    /// | `SCORECARD_VERIFY_GITHUB_TOKEN` | GitHub token (falls back to `GITHUB_TOKEN`) |
    /// | `SCORECARD_VERIFY_WORKFLOW_FILE` | Workflow file name |
    /// | `SCORECARD_VERIFY_TIMEOUT` | Request timeout in seconds |
    /// | `SCORECARD_VERIFY_MAX_RETRIES` | Max retries for transient failures |
    /// | `SCORECARD_VERIFY_MAX_CANDIDATES` | Max log entries examined |
    pub fn from_env() -> Self {
        let github_token = std::env::var("SCORECARD_VERIFY_GITHUB_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        Self {
            rekor_url: std::env::var("SCORECARD_VERIFY_REKOR_URL")
                .unwrap_or_else(|_| default_rekor_url()),
            github_api_url: std::env::var("SCORECARD_VERIFY_GITHUB_API_URL")
                .unwrap_or_else(|_| default_github_api_url()),
            github_token,
            workflow_file: std::env::var("SCORECARD_VERIFY_WORKFLOW_FILE")
                .unwrap_or_else(|_| default_workflow_file()),
            timeout_secs: std::env::var("SCORECARD_VERIFY_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("SCORECARD_VERIFY_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
            max_candidates: std::env::var("SCORECARD_VERIFY_MAX_CANDIDATES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or_else(default_max_candidates),
        }
    }

    /// Set the Rekor base URL.
    pub fn with_rekor_url(mut self, url: impl Into<String>) -> Self {
        self.rekor_url = url.into();
        self
    }

    /// Set the GitHub API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    /// Set the GitHub token.
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    /// Set the workflow file name.
    pub fn with_workflow_file(mut self, file: impl Into<String>) -> Self {
        self.workflow_file = file.into();
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the maximum number of candidate entries.
    pub fn with_max_candidates(mut self, n: usize) -> Self {
        self.max_candidates = n.max(1);
        self
    }

    /// Repository-relative path of the workflow file.
    pub fn workflow_path(&self) -> String {
        format!(".github/workflows/{}", self.workflow_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        for var in [
            "SCORECARD_VERIFY_REKOR_URL",
            "SCORECARD_VERIFY_GITHUB_API_URL",
            "SCORECARD_VERIFY_GITHUB_TOKEN",
            "GITHUB_TOKEN",
            "SCORECARD_VERIFY_WORKFLOW_FILE",
            "SCORECARD_VERIFY_TIMEOUT",
            "SCORECARD_VERIFY_MAX_RETRIES",
            "SCORECARD_VERIFY_MAX_CANDIDATES",
        ] {
            std::env::remove_var(var);
        }

        let config = VerifierConfig::from_env();
        assert_eq!(config.rekor_url, "https://rekor.sigstore.dev");
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert!(config.github_token.is_none());
        assert_eq!(config.workflow_path(), ".github/workflows/scorecards.yml");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_candidates, 16);
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        std::env::set_var("SCORECARD_VERIFY_REKOR_URL", "http://rekor.local:3000");
        std::env::remove_var("SCORECARD_VERIFY_GITHUB_TOKEN");
        std::env::set_var("GITHUB_TOKEN", "ghp_fallback");
        std::env::set_var("SCORECARD_VERIFY_MAX_CANDIDATES", "0");
        std::env::set_var("SCORECARD_VERIFY_TIMEOUT", "not-a-number");

        let config = VerifierConfig::from_env();
        assert_eq!(config.rekor_url, "http://rekor.local:3000");
        assert_eq!(config.github_token.as_deref(), Some("ghp_fallback"));
        assert_eq!(config.max_candidates, 16);
        assert_eq!(config.timeout_secs, 30);

        std::env::remove_var("SCORECARD_VERIFY_REKOR_URL");
        std::env::remove_var("GITHUB_TOKEN");
        std::env::remove_var("SCORECARD_VERIFY_MAX_CANDIDATES");
        std::env::remove_var("SCORECARD_VERIFY_TIMEOUT");
    }

    #[test]
    fn test_config_builder() {
        let config = VerifierConfig::default()
            .with_rekor_url("http://127.0.0.1:1")
            .with_github_token("token")
            .with_workflow_file("scorecard.yml")
            .with_max_candidates(0);

        assert_eq!(config.rekor_url, "http://127.0.0.1:1");
        assert_eq!(config.github_token.as_deref(), Some("token"));
        assert_eq!(config.workflow_path(), ".github/workflows/scorecard.yml");
        assert_eq!(config.max_candidates, 1);
    }

    #[test]
    fn test_log_entry_response_parses() {
        let json = include_str!("../tests/fixtures/rekor_entry.json");
        let response: LogEntryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.len(), 1);

        let entry = response.values().next().unwrap();
        assert_eq!(entry.log_index, 1492843);
        assert_eq!(entry.integrated_time, 1646157823);
        assert!(entry
            .verification
            .as_ref()
            .and_then(|v| v.signed_entry_timestamp.as_ref())
            .is_some());
        assert!(entry.integrated_at().is_some());
    }
}
