//! Error types for the verification pipeline.

use std::time::Duration;

/// Verification errors.
///
/// Every pipeline stage fails fast with one of these; nothing is retried
/// except the transient upstream variants inside the HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Request carried no payload to look up.
    #[error("empty payload")]
    EmptyPayload,

    /// No transparency log entry matches the payload.
    #[error("no transparency log entry found for {query}")]
    EntryNotFound { query: String },

    /// Invalid base64.
    #[error("invalid base64 in {context}: {message}")]
    Encoding {
        context: &'static str,
        message: String,
    },

    /// Entry body is not a structurally valid proposed entry.
    #[error("malformed log entry: {message}")]
    MalformedEntry { message: String },

    /// Entry kind/version is not one we can extract a certificate from.
    #[error("unsupported entry kind: {kind} (apiVersion {api_version})")]
    UnsupportedEntryKind { kind: String, api_version: String },

    /// Key material is not valid PEM / DER.
    #[error("PEM decode failed: {message}")]
    PemDecode { message: String },

    /// Key material decoded but holds no certificate.
    #[error("no certificate found in key material: {message}")]
    NoCertificateFound { message: String },

    /// Signing certificate lacks a provenance extension.
    #[error("certificate missing {field} extension (OID {oid})")]
    MissingExtension {
        field: &'static str,
        oid: &'static str,
    },

    /// Repository path is not `owner/name`.
    #[error("malformed repository path: {path:?}")]
    MalformedPath { path: String },

    /// Workflow file does not exist at the certificate's ref.
    #[error("workflow not found: {owner}/{repo}:{path}@{reference}")]
    WorkflowNotFound {
        owner: String,
        repo: String,
        path: String,
        reference: String,
    },

    /// Workflow policy rejected the fetched workflow.
    #[error("workflow policy rejected {path}: {reason}")]
    PolicyRejected { path: String, reason: String },

    /// Upstream rate limit exceeded.
    #[error("rate limited by {service}: retry after {retry_after:?}")]
    RateLimited {
        service: &'static str,
        retry_after: Option<Duration>,
    },

    /// Upstream request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Invalid response from an upstream service.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl VerifyError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyPayload => 400,

            Self::EntryNotFound { .. } => 404,
            Self::WorkflowNotFound { .. } => 404,

            // Entry not verifiable
            Self::Encoding { .. } => 422,
            Self::MalformedEntry { .. } => 422,
            Self::UnsupportedEntryKind { .. } => 422,
            Self::PemDecode { .. } => 422,
            Self::NoCertificateFound { .. } => 422,
            Self::MissingExtension { .. } => 422,
            Self::MalformedPath { .. } => 422,
            Self::PolicyRejected { .. } => 422,

            // Upstream
            Self::Network { .. } => 502,
            Self::InvalidResponse { .. } => 502,
            Self::RateLimited { .. } => 503,
            Self::Timeout { .. } => 504,

            Self::Config { .. } => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPayload => "empty_payload",
            Self::EntryNotFound { .. } => "entry_not_found",
            Self::Encoding { .. } => "encoding_error",
            Self::MalformedEntry { .. } => "malformed_entry",
            Self::UnsupportedEntryKind { .. } => "unsupported_entry_kind",
            Self::PemDecode { .. } => "pem_decode_error",
            Self::NoCertificateFound { .. } => "no_certificate_found",
            Self::MissingExtension { .. } => "missing_extension",
            Self::MalformedPath { .. } => "malformed_path",
            Self::WorkflowNotFound { .. } => "workflow_not_found",
            Self::PolicyRejected { .. } => "policy_rejected",
            Self::RateLimited { .. } => "upstream_rate_limited",
            Self::Timeout { .. } => "upstream_timeout",
            Self::Network { .. } => "upstream_unavailable",
            Self::InvalidResponse { .. } => "upstream_invalid_response",
            Self::Config { .. } => "configuration_error",
        }
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network { .. }
        )
    }

    /// Whether the log entry itself could not be turned into provenance.
    pub fn is_unverifiable_entry(&self) -> bool {
        matches!(
            self,
            Self::Encoding { .. }
                | Self::MalformedEntry { .. }
                | Self::UnsupportedEntryKind { .. }
                | Self::PemDecode { .. }
                | Self::NoCertificateFound { .. }
                | Self::MissingExtension { .. }
                | Self::MalformedPath { .. }
        )
    }

    pub(crate) fn encoding(context: &'static str, err: base64::DecodeError) -> Self {
        Self::Encoding {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed_entry(message: impl Into<String>) -> Self {
        Self::MalformedEntry {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for VerifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for verification operations.
pub type VerifyResult<T> = Result<T, VerifyError>;
