//! hex, base64, and PEM helpers used at the boundaries of the pipeline.
//!
//! PDF `/Contents` slots are upper-case hex; the workflow DTOs in §6
//! (`prepare`/`presign`/`finalize`/`verify`) exchange base64; certificates
//! and keys are handed around as PEM.

use crate::error::{Error, Result};

/// Encode bytes as upper-case hex, matching the case Acrobat and most PDF
/// tooling expect for `/Contents`.
pub fn hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string, tolerating either case (PDF producers disagree).
pub fn hex_decode(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim()).map_err(|e| Error::InputMalformed(format!("invalid hex: {e}")))
}

/// Decode standard base64 (the encoding used by the §6 workflow DTOs).
pub fn base64_decode(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| Error::InputMalformed(format!("invalid base64: {e}")))
}

/// Encode bytes as standard base64.
pub fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a PEM document, returning the DER payload of its first block.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<u8>> {
    let parsed = pem::parse(pem_str.trim())
        .map_err(|e| Error::InputMalformed(format!("invalid PEM: {e}")))?;
    Ok(parsed.contents().to_vec())
}

/// Encode DER bytes as a PEM document with the given block label
/// (e.g. `"CERTIFICATE"`, `"PRIVATE KEY"`).
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let p = pem::Pem::new(label, der);
    pem::encode(&p)
}
