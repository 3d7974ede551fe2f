//! RFC 3161 Time-Stamp Protocol: `TimeStampReq`/`TimeStampResp`, `TSTInfo`,
//! `MessageImprint`, `Accuracy`, `PKIStatusInfo`.
//!
//! Module split mirrors `examples/indygreg-PyOxidizer/.../asn1/rfc3161.rs`
//! (one file per RFC, named after it) even though the encode/decode
//! approach is this crate's own hand-rolled [`crate::codec::der`], not
//! `bcder`'s `Constructed`/`Source` API.
//!
//! ```text
//! TimeStampReq ::= SEQUENCE {
//!     version         INTEGER { v1(1) },
//!     messageImprint  MessageImprint,
//!     reqPolicy       TSAPolicyId OPTIONAL,
//!     nonce           INTEGER OPTIONAL,
//!     certReq         BOOLEAN DEFAULT FALSE,
//!     extensions      [0] IMPLICIT Extensions OPTIONAL }
//!
//! MessageImprint ::= SEQUENCE {
//!     hashAlgorithm  AlgorithmIdentifier,
//!     hashedMessage  OCTET STRING }
//!
//! TimeStampResp ::= SEQUENCE {
//!     status          PKIStatusInfo,
//!     timeStampToken  TimeStampToken OPTIONAL }
//!
//! TSTInfo ::= SEQUENCE {
//!     version         INTEGER { v1(1) },
//!     policy          TSAPolicyId,
//!     messageImprint  MessageImprint,
//!     serialNumber    INTEGER,
//!     genTime         GeneralizedTime,
//!     accuracy        Accuracy OPTIONAL,
//!     ordering        BOOLEAN DEFAULT FALSE,
//!     nonce           INTEGER OPTIONAL,
//!     tsa             [0] GeneralName OPTIONAL,
//!     extensions      [1] IMPLICIT Extensions OPTIONAL }
//!
//! Accuracy ::= SEQUENCE {
//!     seconds  INTEGER OPTIONAL,
//!     millis   [0] INTEGER (1..999) OPTIONAL,
//!     micros   [1] INTEGER (1..999) OPTIONAL }
//! ```

use crate::asn1::ess;
use crate::codec::der;
use crate::error::{Error, Result};

/// `MessageImprint` over SHA-256.
pub fn build_message_imprint(hashed_message: &[u8]) -> Result<Vec<u8>> {
    let hash_algorithm = ess::sha256_algorithm_identifier()?;
    Ok(der::sequence(&[hash_algorithm, der::octet_string(hashed_message)]))
}

/// Build a `TimeStampReq` requesting `certReq = true` (spec §4.5 requires
/// the TSA to include its certificate in the response so `ChainBuilder`
/// isn't needed to validate the timestamp token's own signer).
pub fn build_time_stamp_req(hashed_message: &[u8], nonce: Option<u64>) -> Result<Vec<u8>> {
    let version = der::integer_u64(1);
    let message_imprint = build_message_imprint(hashed_message)?;
    let mut members = vec![version, message_imprint];
    if let Some(n) = nonce {
        members.push(der::integer_u64(n));
    }
    members.push(der::boolean(true)); // certReq
    Ok(der::sequence(&members))
}

/// A parsed `PKIStatusInfo`.
#[derive(Debug, Clone)]
pub struct ParsedPkiStatusInfo {
    pub status: i64,
    pub status_strings: Vec<String>,
}

/// A parsed `TimeStampResp`.
#[derive(Debug, Clone)]
pub struct ParsedTimeStampResp {
    pub status: ParsedPkiStatusInfo,
    /// Full DER (tag included) of the `TimeStampToken` (a `ContentInfo`), if present.
    pub time_stamp_token_der: Option<Vec<u8>>,
}

/// Parse a `TimeStampResp`.
pub fn parse_time_stamp_resp(data: &[u8]) -> Result<ParsedTimeStampResp> {
    let value = der::parse_der(data)?;
    if !value.is_sequence() {
        return Err(Error::InputMalformed("TimeStampResp is not a SEQUENCE".to_string()));
    }
    let fields = value.children()?;
    let status_seq = fields
        .first()
        .ok_or_else(|| Error::InputMalformed("TimeStampResp missing status".to_string()))?;
    if !status_seq.is_sequence() {
        return Err(Error::InputMalformed("PKIStatusInfo is not a SEQUENCE".to_string()));
    }
    let status_fields = status_seq.children()?;
    let status = status_fields
        .first()
        .ok_or_else(|| Error::InputMalformed("PKIStatusInfo missing status".to_string()))?
        .as_u64() as i64;

    let mut status_strings = Vec::new();
    for f in status_fields.iter().skip(1) {
        if f.tag == der::tag::SEQUENCE {
            if let Ok(children) = f.children() {
                for s in children {
                    status_strings.push(String::from_utf8_lossy(&s.contents).to_string());
                }
            }
        }
    }

    let time_stamp_token_der = fields.get(1).map(|f| f.raw.clone());
    Ok(ParsedTimeStampResp {
        status: ParsedPkiStatusInfo { status, status_strings },
        time_stamp_token_der,
    })
}

/// Accuracy, expressed in whole units (the spec's "best-effort
/// `±Ns Nms Nµs`" human-readable rendering is done by `TsaClient`, not here).
#[derive(Debug, Clone, Default)]
pub struct ParsedAccuracy {
    pub seconds: Option<u64>,
    pub millis: Option<u64>,
    pub micros: Option<u64>,
}

/// A parsed `TSTInfo`.
#[derive(Debug, Clone)]
pub struct ParsedTstInfo {
    pub version: u64,
    pub policy_oid: String,
    pub hash_algorithm_oid: String,
    pub hashed_message: Vec<u8>,
    pub serial_number: Vec<u8>,
    /// Raw `YYYYMMDDHHMMSS[.fff]Z` genTime string.
    pub gen_time: String,
    pub accuracy: Option<ParsedAccuracy>,
}

/// Parse a `TSTInfo` (the `eContent` of a timestamp token's `SignedData`).
pub fn parse_tst_info(data: &[u8]) -> Result<ParsedTstInfo> {
    let value = der::parse_der(data)?;
    if !value.is_sequence() {
        return Err(Error::InputMalformed("TSTInfo is not a SEQUENCE".to_string()));
    }
    let fields = value.children()?;
    let mut idx = 0;

    let version = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("TSTInfo missing version".to_string()))?
        .as_u64();
    idx += 1;

    let policy_oid = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("TSTInfo missing policy".to_string()))?
        .as_oid_string();
    idx += 1;

    let message_imprint = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("TSTInfo missing messageImprint".to_string()))?;
    idx += 1;
    let mi_fields = message_imprint.children()?;
    let hash_algorithm_oid = mi_fields
        .first()
        .ok_or_else(|| Error::InputMalformed("MessageImprint missing hashAlgorithm".to_string()))?
        .children()?
        .first()
        .ok_or_else(|| Error::InputMalformed("AlgorithmIdentifier missing OID".to_string()))?
        .as_oid_string();
    let hashed_message = mi_fields
        .get(1)
        .ok_or_else(|| Error::InputMalformed("MessageImprint missing hashedMessage".to_string()))?
        .contents
        .clone();

    let serial_number = fields
        .get(idx)
        .ok_or_else(|| Error::InputMalformed("TSTInfo missing serialNumber".to_string()))?
        .as_integer_bytes()
        .to_vec();
    idx += 1;

    let gen_time = String::from_utf8_lossy(
        &fields
            .get(idx)
            .ok_or_else(|| Error::InputMalformed("TSTInfo missing genTime".to_string()))?
            .contents,
    )
    .to_string();
    idx += 1;

    let mut accuracy = None;
    if let Some(f) = fields.get(idx) {
        if f.tag == der::tag::SEQUENCE {
            let mut acc = ParsedAccuracy::default();
            for af in f.children()? {
                let magnitude = af.contents.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
                match af.tag {
                    t if t == der::tag::INTEGER => acc.seconds = Some(magnitude),
                    0x80 => acc.millis = Some(magnitude),
                    0x81 => acc.micros = Some(magnitude),
                    _ => {}
                }
            }
            accuracy = Some(acc);
        }
    }

    Ok(ParsedTstInfo {
        version,
        policy_oid,
        hash_algorithm_oid,
        hashed_message,
        serial_number,
        gen_time,
        accuracy,
    })
}

/// Parameters to build a `TSTInfo`, used by test doubles that stand in for
/// a real TSA.
pub struct TstInfoParams<'a> {
    pub policy_oid: &'a str,
    pub hashed_message: &'a [u8],
    pub serial_magnitude: &'a [u8],
    pub gen_time: &'a chrono::DateTime<chrono::Utc>,
    pub accuracy_seconds: Option<u64>,
}

/// Build a `TSTInfo` SEQUENCE.
pub fn build_tst_info(params: TstInfoParams) -> Result<Vec<u8>> {
    let version = der::integer_u64(1);
    let policy = der::object_identifier(params.policy_oid)?;
    let message_imprint = build_message_imprint(params.hashed_message)?;
    let serial_number = der::integer_unsigned(params.serial_magnitude);
    let gen_time = der::generalized_time(params.gen_time);

    let mut members = vec![version, policy, message_imprint, serial_number, gen_time];
    if let Some(secs) = params.accuracy_seconds {
        let accuracy = der::sequence(&[der::integer_u64(secs)]);
        members.push(accuracy);
    }
    Ok(der::sequence(&members))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_time_stamp_req_includes_cert_req() {
        let req = build_time_stamp_req(&[0u8; 32], Some(12345)).unwrap();
        let value = der::parse_der(&req).unwrap();
        let fields = value.children().unwrap();
        // version, messageImprint, nonce, certReq
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3].tag, der::tag::BOOLEAN);
        assert_eq!(fields[3].contents, vec![0xff]);
    }

    #[test]
    fn test_build_time_stamp_req_without_nonce() {
        let req = build_time_stamp_req(&[0u8; 32], None).unwrap();
        let value = der::parse_der(&req).unwrap();
        let fields = value.children().unwrap();
        assert_eq!(fields.len(), 3); // version, messageImprint, certReq
    }

    #[test]
    fn test_parse_time_stamp_resp_granted() {
        let status = der::sequence(&[der::integer_u64(0)]);
        let token = der::sequence(&[der::integer_u64(7)]);
        let resp = der::sequence(&[status, token.clone()]);
        let parsed = parse_time_stamp_resp(&resp).unwrap();
        assert_eq!(parsed.status.status, 0);
        assert_eq!(parsed.time_stamp_token_der, Some(token));
    }

    #[test]
    fn test_parse_time_stamp_resp_rejection_without_token() {
        let status = der::sequence(&[der::integer_u64(2)]);
        let resp = der::sequence(&[status]);
        let parsed = parse_time_stamp_resp(&resp).unwrap();
        assert_eq!(parsed.status.status, 2);
        assert!(parsed.time_stamp_token_der.is_none());
    }

    #[test]
    fn test_tst_info_roundtrip_with_accuracy() {
        let gen_time = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let hashed = [0x42u8; 32];
        let built = build_tst_info(TstInfoParams {
            policy_oid: "1.2.3.4.5",
            hashed_message: &hashed,
            serial_magnitude: &[0x01],
            gen_time: &gen_time,
            accuracy_seconds: Some(1),
        })
        .unwrap();

        let parsed = parse_tst_info(&built).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.policy_oid, "1.2.3.4.5");
        assert_eq!(parsed.hashed_message, hashed.to_vec());
        assert_eq!(parsed.gen_time, "20240101000000Z");
        assert_eq!(parsed.accuracy.unwrap().seconds, Some(1));
    }

    #[test]
    fn test_tst_info_without_accuracy() {
        let gen_time = chrono::Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap();
        let built = build_tst_info(TstInfoParams {
            policy_oid: "1.2.3.4.5",
            hashed_message: &[0u8; 32],
            serial_magnitude: &[0x02],
            gen_time: &gen_time,
            accuracy_seconds: None,
        })
        .unwrap();
        let parsed = parse_tst_info(&built).unwrap();
        assert!(parsed.accuracy.is_none());
    }
}
