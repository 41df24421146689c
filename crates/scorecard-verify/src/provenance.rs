//! Provenance recovery from Fulcio certificate extensions.
//!
//! Fulcio encodes the GitHub Actions OIDC claims as custom X.509
//! extensions under `1.3.6.1.4.1.57264.1`:
//!
//! | OID | Field | Value |
//! |-----|-------|-------|
//! | `.1.5` (v1) | Repository | `org/repo`, raw UTF-8 |
//! | `.1.6` (v1) | Repository ref | `refs/heads/main`, raw UTF-8 |
//! | `.1.12` (v2) | Source repository URI | `https://github.com/org/repo`, DER UTF8String |
//! | `.1.14` (v2) | Source repository ref | `refs/heads/main`, DER UTF8String |
//!
//! The v1 OIDs are authoritative; v2 values are used only when the v1
//! extension is absent.

use std::fmt;

use tracing::warn;
use x509_cert::der::asn1::{ObjectIdentifier, Utf8StringRef};
use x509_cert::der::Decode;
use x509_cert::Certificate;

use crate::error::{VerifyError, VerifyResult};

/// Repository path (`org/repo`), Fulcio v1.
pub const OID_REPOSITORY_PATH: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.5");

/// Repository ref (`refs/heads/main`), Fulcio v1.
pub const OID_REPOSITORY_REF: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.6");

/// Source repository URI, Fulcio v2.
pub const OID_SOURCE_REPOSITORY_URI: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.12");

/// Source repository ref, Fulcio v2.
pub const OID_SOURCE_REPOSITORY_REF: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.14");

const GITHUB_URI_PREFIX: &str = "https://github.com/";

/// Raw result of scanning a certificate; `None` means the extension is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceFields {
    pub reference: Option<String>,
    pub path: Option<String>,
}

/// Repository reference and path recovered from a signing certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub reference: String,
    pub path: String,
}

impl Provenance {
    /// Split `path` into owner and repository name.
    pub fn repository(&self) -> VerifyResult<RepositoryPath> {
        RepositoryPath::parse(&self.path)
    }
}

/// `owner/name` split of a repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPath {
    pub owner: String,
    pub name: String,
}

impl RepositoryPath {
    /// Split on the first `/`. Both sides must be non-empty.
    pub fn parse(path: &str) -> VerifyResult<Self> {
        match path.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(VerifyError::MalformedPath {
                path: path.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepositoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Read the provenance extensions of `cert` without failing on absence.
///
/// A v2 repository URI outside `https://github.com/` is reported as absent.
pub fn scan_extensions(cert: &Certificate) -> ProvenanceFields {
    scan(cert).fields
}

/// Recover provenance from `cert`; both extensions are required.
pub fn extract_provenance(cert: &Certificate) -> VerifyResult<Provenance> {
    let Scan {
        fields,
        foreign_repository_uri,
    } = scan(cert);

    let reference = fields.reference.ok_or(VerifyError::MissingExtension {
        field: "repository reference",
        oid: "1.3.6.1.4.1.57264.1.6",
    })?;
    let path = match (fields.path, foreign_repository_uri) {
        (Some(path), _) => path,
        (None, Some(uri)) => return Err(VerifyError::MalformedPath { path: uri }),
        (None, None) => {
            return Err(VerifyError::MissingExtension {
                field: "repository path",
                oid: "1.3.6.1.4.1.57264.1.5",
            })
        }
    };

    Ok(Provenance { reference, path })
}

struct Scan {
    fields: ProvenanceFields,
    /// v2 repository URI that is not a GitHub repository.
    foreign_repository_uri: Option<String>,
}

fn scan(cert: &Certificate) -> Scan {
    let mut reference = None;
    let mut path = None;
    let mut reference_v2 = None;
    let mut repository_uri = None;

    for ext in cert.tbs_certificate.extensions.iter().flatten() {
        let oid = ext.extn_id;
        let value = ext.extn_value.as_bytes();
        let (slot, decoded) = if oid == OID_REPOSITORY_REF {
            (&mut reference, decode_raw_utf8(value))
        } else if oid == OID_REPOSITORY_PATH {
            (&mut path, decode_raw_utf8(value))
        } else if oid == OID_SOURCE_REPOSITORY_REF {
            (&mut reference_v2, decode_der_utf8(value))
        } else if oid == OID_SOURCE_REPOSITORY_URI {
            (&mut repository_uri, decode_der_utf8(value))
        } else {
            continue;
        };

        if decoded.is_none() {
            warn!(oid = %oid, "provenance extension is not a valid UTF-8 value");
        }
        *slot = decoded;
    }

    let mut foreign_repository_uri = None;
    let path = path.or_else(|| {
        let uri = repository_uri?;
        let normalized = normalize_github_uri(&uri);
        if normalized.is_none() {
            warn!(uri = %uri, "source repository is not hosted on GitHub");
            foreign_repository_uri = Some(uri);
        }
        normalized
    });

    Scan {
        fields: ProvenanceFields {
            reference: reference.or(reference_v2),
            path,
        },
        foreign_repository_uri,
    }
}

/// v1 values are the raw string bytes, returned exactly.
fn decode_raw_utf8(value: &[u8]) -> Option<String> {
    std::str::from_utf8(value).ok().map(String::from)
}

/// v2 values are a DER UTF8String.
fn decode_der_utf8(value: &[u8]) -> Option<String> {
    Utf8StringRef::from_der(value).ok().map(|s| s.to_string())
}

/// `https://github.com/org/repo` -> `org/repo`; anything else is `None`.
fn normalize_github_uri(uri: &str) -> Option<String> {
    let path = uri.strip_prefix(GITHUB_URI_PREFIX)?.trim_end_matches('/');
    (!path.is_empty()).then(|| path.to_string())
}
