//! Rekor entry body decoding.
//!
//! A log entry's `body` is base64 of a JSON "proposed entry":
//!
//! ```json
//! { "apiVersion": "0.0.1", "kind": "hashedrekord", "spec": { ... } }
//! ```
//!
//! Decoding resolves `(kind, apiVersion)` to exactly one [`ProposedEntry`]
//! variant and then parses `spec` against that variant's schema.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};
use crate::types::LogEntry;

/// Entry kinds this crate can extract a signing certificate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Generic record: signature over the artifact itself.
    Rekord,
    /// Hashed record: signature over a pre-computed artifact digest.
    HashedRekord,
}

impl EntryKind {
    pub const API_VERSION_V001: &'static str = "0.0.1";

    /// Resolve a `(kind, apiVersion)` pair.
    pub fn resolve(kind: &str, api_version: &str) -> Option<Self> {
        match (kind, api_version) {
            ("rekord", Self::API_VERSION_V001) => Some(Self::Rekord),
            ("hashedrekord", Self::API_VERSION_V001) => Some(Self::HashedRekord),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rekord => "rekord",
            Self::HashedRekord => "hashedrekord",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded, typed entry body.
#[derive(Debug, Clone)]
pub enum ProposedEntry {
    Rekord(RekordV001),
    HashedRekord(HashedRekordV001),
}

impl ProposedEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Rekord(_) => EntryKind::Rekord,
            Self::HashedRekord(_) => EntryKind::HashedRekord,
        }
    }
}

/// Untyped envelope shared by every entry kind.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProposedEntry {
    api_version: String,
    kind: String,
    spec: serde_json::Value,
}

/// `rekord` v0.0.1 spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RekordV001 {
    pub signature: RekordSignature,
    pub data: RekordData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RekordSignature {
    /// Signature format (`x509`, `pgp`, `minisign`, `ssh`, ...).
    pub format: String,
    pub content: String,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RekordData {
    #[serde(default)]
    pub hash: Option<EntryHash>,
    #[serde(default)]
    pub content: Option<String>,
}

/// `hashedrekord` v0.0.1 spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordV001 {
    pub signature: HashedRekordSignature,
    pub data: HashedRekordData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedRekordSignature {
    #[serde(default)]
    pub content: Option<String>,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordData {
    pub hash: EntryHash,
}

/// Public key or certificate, as base64 of PEM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKey {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHash {
    pub algorithm: String,
    pub value: String,
}

/// Decode a base64 entry body into a [`ProposedEntry`].
pub fn decode_entry(body: &str) -> VerifyResult<ProposedEntry> {
    let bytes = BASE64
        .decode(body.trim())
        .map_err(|e| VerifyError::encoding("entry body", e))?;

    let raw: RawProposedEntry = serde_json::from_slice(&bytes).map_err(|e| {
        VerifyError::malformed_entry(format!("body is not a proposed entry: {}", e))
    })?;

    let kind = EntryKind::resolve(&raw.kind, &raw.api_version).ok_or_else(|| {
        VerifyError::UnsupportedEntryKind {
            kind: raw.kind.clone(),
            api_version: raw.api_version.clone(),
        }
    })?;

    let entry = match kind {
        EntryKind::Rekord => ProposedEntry::Rekord(parse_spec(raw.spec, kind)?),
        EntryKind::HashedRekord => ProposedEntry::HashedRekord(parse_spec(raw.spec, kind)?),
    };

    debug!(kind = %kind, "decoded proposed entry");
    Ok(entry)
}

fn parse_spec<T: DeserializeOwned>(spec: serde_json::Value, kind: EntryKind) -> VerifyResult<T> {
    serde_json::from_value(spec)
        .map_err(|e| VerifyError::malformed_entry(format!("invalid {} spec: {}", kind, e)))
}

impl LogEntry {
    /// Decode this entry's body.
    pub fn decode(&self) -> VerifyResult<ProposedEntry> {
        decode_entry(&self.body)
    }
}
