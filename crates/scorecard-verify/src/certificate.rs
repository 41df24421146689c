//! Certificate parsing from entry key material.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::debug;
use x509_cert::der::pem;
use x509_cert::Certificate;

use crate::error::{VerifyError, VerifyResult};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Decode base64 key material into PEM certificates, in encounter order.
///
/// Never returns an empty vector.
pub fn parse_certificates(key_material_b64: &str) -> VerifyResult<Vec<Certificate>> {
    let pem_bytes = BASE64
        .decode(key_material_b64.trim())
        .map_err(|e| VerifyError::encoding("public key content", e))?;

    parse_pem_certificates(&pem_bytes)
}

/// Parse one or more PEM `CERTIFICATE` blocks.
pub fn parse_pem_certificates(pem_bytes: &[u8]) -> VerifyResult<Vec<Certificate>> {
    let pem_bytes = pem_bytes.trim_ascii();
    if pem_bytes.is_empty() {
        return Err(VerifyError::NoCertificateFound {
            message: "key material is empty".to_string(),
        });
    }

    let label = pem::decode_label(pem_bytes).map_err(|e| VerifyError::PemDecode {
        message: e.to_string(),
    })?;
    if label != CERTIFICATE_LABEL {
        return Err(VerifyError::NoCertificateFound {
            message: format!("found PEM block labelled {:?}", label),
        });
    }

    let certs = Certificate::load_pem_chain(pem_bytes).map_err(|e| VerifyError::PemDecode {
        message: e.to_string(),
    })?;

    if certs.is_empty() {
        return Err(VerifyError::NoCertificateFound {
            message: "no certificates in PEM".to_string(),
        });
    }

    debug!(count = certs.len(), "parsed certificates from key material");
    Ok(certs)
}

/// The signing (first) certificate.
pub fn leaf_certificate(certs: &[Certificate]) -> VerifyResult<&Certificate> {
    certs.first().ok_or_else(|| VerifyError::NoCertificateFound {
        message: "certificate chain is empty".to_string(),
    })
}
