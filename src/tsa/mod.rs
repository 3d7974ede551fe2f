//! RFC 3161 Time-Stamp Protocol client (spec.md §4.5).
//!
//! `TsaClient` is an injected collaborator, not a concrete type this
//! module hands out unconditionally — spec.md §9 asks for
//! "polymorphism-by-collaborators" so tests can substitute a fake
//! transport deterministically. Grounded in the teacher's stubbed
//! `create_pkcs7_signature` call site in `src/signatures/signer.rs`, which
//! already anticipated an external signing/timestamping step this crate
//! now actually implements.

use crate::asn1::{oid, rfc3161, rfc5652};
use crate::codec::digest::sha256;
use crate::error::{Error, Result};
use std::time::Duration;

/// The result of a successful timestamp request.
#[derive(Debug, Clone)]
pub struct TimestampResponse {
    /// The full `TimeStampToken` (a CMS `ContentInfo`) DER, unsignedAttrs-ready.
    pub token: Vec<u8>,
    pub gen_time: String,
    pub accuracy: Option<String>,
    pub serial: Option<String>,
}

/// Collaborator boundary for RFC 3161 timestamping.
pub trait TsaClient {
    fn timestamp(&self, data: &[u8], tsa_url: Option<&str>) -> Result<TimestampResponse>;
}

/// Render an [`rfc3161::ParsedAccuracy`] as spec.md §4.5's best-effort
/// human-readable `±Ns Nms Nµs`.
fn format_accuracy(acc: &rfc3161::ParsedAccuracy) -> Option<String> {
    if acc.seconds.is_none() && acc.millis.is_none() && acc.micros.is_none() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(s) = acc.seconds {
        parts.push(format!("{s}s"));
    }
    if let Some(ms) = acc.millis {
        parts.push(format!("{ms}ms"));
    }
    if let Some(us) = acc.micros {
        parts.push(format!("{us}\u{b5}s"));
    }
    Some(format!("\u{b1}{}", parts.join(" ")))
}

/// Decode a `TimeStampToken` DER into a [`TimestampResponse`]'s reporting
/// fields, shared by the HTTP client and any test double that wants to
/// produce a realistic response from a hand-built token.
pub fn describe_token(token_der: &[u8]) -> Result<(String, Option<String>, Option<String>)> {
    let ci = rfc5652::parse_content_info(token_der)?;
    if ci.content_type_oid != oid::ID_SIGNED_DATA {
        return Err(Error::TsaUnavailable(
            "timestamp token is not a CMS SignedData".to_string(),
        ));
    }
    let signed_data = rfc5652::parse_signed_data(&ci.content_der)?;
    let econtent = signed_data
        .econtent
        .ok_or_else(|| Error::TsaUnavailable("timestamp token has no TSTInfo content".to_string()))?;
    let tst_info = rfc3161::parse_tst_info(&econtent)?;

    let serial = Some(crate::codec::encoding::hex_upper(&tst_info.serial_number));
    let accuracy = tst_info.accuracy.as_ref().and_then(format_accuracy);
    Ok((tst_info.gen_time, accuracy, serial))
}

/// HTTP-based `TsaClient` (`POST tsaUrl`, spec.md §6).
pub struct HttpTsaClient {
    default_url: Option<String>,
    timeout: Duration,
}

impl HttpTsaClient {
    pub fn new(default_url: impl Into<String>) -> Self {
        HttpTsaClient {
            default_url: Some(default_url.into()),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn without_default_url() -> Self {
        HttpTsaClient {
            default_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl TsaClient for HttpTsaClient {
    fn timestamp(&self, data: &[u8], tsa_url: Option<&str>) -> Result<TimestampResponse> {
        let url = tsa_url
            .or(self.default_url.as_deref())
            .ok_or_else(|| Error::TsaUnavailable("no TSA URL configured".to_string()))?;

        let hashed = sha256(data);
        let nonce: u64 = rand::random();
        let req_der = rfc3161::build_time_stamp_req(&hashed, Some(nonce))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::TsaUnavailable(e.to_string()))?;

        let resp = client
            .post(url)
            .header("Content-Type", "application/timestamp-query")
            .body(req_der)
            .send()
            .map_err(|e| Error::TsaUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::TsaUnavailable(format!("TSA HTTP status {}", resp.status())));
        }
        let body = resp.bytes().map_err(|e| Error::TsaUnavailable(e.to_string()))?;

        let parsed = rfc3161::parse_time_stamp_resp(&body)
            .map_err(|e| Error::TsaUnavailable(format!("malformed TimeStampResp: {e}")))?;
        if parsed.status.status != 0 && parsed.status.status != 1 {
            return Err(Error::TsaRejected(parsed.status.status as i32));
        }
        let token = parsed
            .time_stamp_token_der
            .ok_or_else(|| Error::TsaUnavailable("TSA granted but returned no token".to_string()))?;

        let (gen_time, accuracy, serial) = describe_token(&token)?;
        Ok(TimestampResponse {
            token,
            gen_time,
            accuracy,
            serial,
        })
    }
}
