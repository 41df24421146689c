//! Key material extraction from decoded entries.

use crate::entry::ProposedEntry;
use crate::error::{VerifyError, VerifyResult};

/// Return the base64 public key / certificate content embedded in `entry`.
///
/// The match is exhaustive: a new [`ProposedEntry`] variant does not
/// compile until its key path is added here.
pub fn extract_key_material(entry: &ProposedEntry) -> VerifyResult<&str> {
    let content = match entry {
        ProposedEntry::Rekord(rekord) => rekord.signature.public_key.content.as_str(),
        ProposedEntry::HashedRekord(hashed) => hashed.signature.public_key.content.as_str(),
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(VerifyError::malformed_entry(format!(
            "{} entry has empty signature.publicKey.content",
            entry.kind()
        )));
    }
    Ok(content)
}
