//! `Verifier` (spec.md §4.8): the end-to-end verify pipeline.
//!
//! Grounded in the teacher's `compliance` checker entry point
//! (`src/compliance/mod.rs`): locate structure, run every independent
//! check, never short-circuit on the first failure, return one report.

pub mod compliance;

use crate::asn1::{oid, rfc3161, rfc5652};
use crate::chain::{ChainValidator, ValidationOptions};
use crate::cms::parser::{self, ParsedCms};
use crate::codec::digest::sha256_concat;
use crate::error::{Error, Result};
use crate::pdf::locator::{self, ByteRange};
use crate::report::{RuleLevel, SignatureLevel, VerificationReport};
use crate::x509::Certificate;
use compliance::ComplianceChecker;

/// Options controlling [`verify`]. `now` is separated out (rather than
/// always `Utc::now()`) so tests can verify signatures against a fixed
/// clock without waiting for real certificates to expire.
pub struct VerifyOptions {
    pub now: chrono::DateTime<chrono::Utc>,
    pub trusted_roots: Vec<[u8; 32]>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            now: chrono::Utc::now(),
            trusted_roots: Vec::new(),
        }
    }
}

fn verify_rsa_signature(cert: &Certificate, signed_attrs_der: &[u8], signature: &[u8]) -> Result<bool> {
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier as _;
    use sha2::Sha256;
    use std::convert::TryFrom;

    let public_key = cert.rsa_public_key()?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let sig = Signature::try_from(signature)
        .map_err(|e| Error::SignatureInvalid(format!("malformed RSA signature: {e}")))?;
    Ok(verifying_key.verify(signed_attrs_der, &sig).is_ok())
}

/// Decode and sanity-check a timestamp token attribute's CMS SignedData
/// shape, returning `true` if it parses as a well-formed `TimeStampToken`.
fn timestamp_token_is_well_formed(token_der: &[u8]) -> bool {
    let Ok(content_info) = rfc5652::parse_content_info(token_der) else {
        return false;
    };
    if content_info.content_type_oid != oid::ID_SIGNED_DATA {
        return false;
    }
    let Ok(signed_data) = rfc5652::parse_signed_data(&content_info.content_der) else {
        return false;
    };
    let Some(econtent) = &signed_data.econtent else {
        return false;
    };
    rfc3161::parse_tst_info(econtent).is_ok()
}

/// Verify `pdf_bytes` end to end: locate the signature, parse the CMS,
/// check integrity, check the signature, build/validate the chain, run
/// every compliance rule, and classify the PAdES level. Never aborts early
/// on a single failing rule (spec.md §7) — a report is always returned.
pub fn verify(pdf_bytes: &[u8], options: &VerifyOptions) -> Result<VerificationReport> {
    let areas = match locator::locate_signature_areas(pdf_bytes, None) {
        Ok(areas) => areas,
        Err(e) => {
            log::debug!("verify: no signature dictionary found, reporting unsigned: {e}");
            return Ok(VerificationReport::unsigned("No CMS signature found"));
        }
    };
    let byte_range = areas.byte_range(pdf_bytes.len());
    if byte_range.validate(pdf_bytes.len()).is_err() {
        log::debug!("verify: located ByteRange does not validate, reporting unsigned");
        return Ok(VerificationReport::unsigned("No CMS signature found"));
    }

    let hex = std::str::from_utf8(&pdf_bytes[areas.contents_slot.clone()])
        .map_err(|_| Error::InputMalformed("Contents slot is not valid hex text".to_string()))?;
    // The slot is zero-padded to its fixed width; decode the whole thing and
    // let `parse_der` read only the real leading TLV, ignoring the trailing
    // zero-fill rather than guessing where the real DER ends by inspection.
    let padded = crate::codec::encoding::hex_decode(hex)?;
    let cms_der = match crate::codec::der::parse_der(&padded) {
        Ok(value) => value.raw,
        Err(e) => {
            log::debug!("verify: /Contents slot is not a parseable DER TLV, reporting unsigned: {e}");
            return Ok(VerificationReport::unsigned("No CMS signature found"));
        }
    };

    let cms = match parser::parse(&cms_der) {
        Ok(cms) => cms,
        Err(e) => {
            log::debug!("verify: CMS SignedData did not parse, reporting unsigned: {e}");
            return Ok(VerificationReport::unsigned(format!("No CMS signature found: {e}")));
        }
    };

    let mut reasons = Vec::new();

    let actual_digest = sha256_concat(&[&pdf_bytes[..byte_range.b as usize], &pdf_bytes[byte_range.c as usize..]]);
    let claimed_digest = parser::message_digest(&cms)?;
    let digest_matches = actual_digest.to_vec() == claimed_digest;
    if !digest_matches {
        log::warn!("verify: messageDigest does not match the signed byte ranges, content was modified");
        reasons.push("PDF content has been modified".to_string());
    }

    let signer_cert = parser::select_signer_certificate(&cms)?;
    let signed_attrs_der = parser::signed_attrs_der(&cms);
    let signature_valid = verify_rsa_signature(signer_cert, &signed_attrs_der, &cms.signer_info.signature)?;
    if !signature_valid {
        log::warn!("verify: RSA signature over signedAttrs does not verify");
        reasons.push("RSA signature does not verify".to_string());
    }

    let chain_validation = ChainValidator::validate(
        &cms.certificates,
        signer_cert,
        &ValidationOptions {
            now: options.now,
            check_validity_period: true,
            trusted_roots: options.trusted_roots.clone(),
        },
    )?;
    if !chain_validation.valid {
        for e in &chain_validation.errors {
            log::warn!("verify: certificate chain validation failed: {e}");
        }
        reasons.extend(chain_validation.errors.iter().cloned());
    }

    let timestamp_attr = parser::timestamp_attribute(&cms)?;
    let timestamped = timestamp_attr.is_some();
    let has_valid_timestamp_token = timestamp_attr
        .as_ref()
        .map(|t| timestamp_token_is_well_formed(&t.token_der))
        .unwrap_or(false);
    if timestamped && !has_valid_timestamp_token {
        reasons.push("signatureTimeStampToken present but does not parse as CMS SignedData".to_string());
    }

    let econtent_type = rfc5652::parse_content_info(&cms_der)
        .ok()
        .and_then(|ci| rfc5652::parse_signed_data(&ci.content_der).ok())
        .map(|sd| sd.econtent_type)
        .unwrap_or_default();
    let econtent_present = rfc5652::parse_content_info(&cms_der)
        .ok()
        .and_then(|ci| rfc5652::parse_signed_data(&ci.content_der).ok())
        .map(|sd| sd.econtent.is_some())
        .unwrap_or(true);
    let checks = ComplianceChecker::run(
        &cms,
        signer_cert,
        &econtent_type,
        econtent_present,
        options.now,
        has_valid_timestamp_token,
    );

    let mandatory_satisfied = compliance::all_mandatory_satisfied(&checks);
    for c in &checks {
        if c.level == RuleLevel::Mandatory && !c.satisfied {
            reasons.push(format!("{}: {}", c.requirement, c.details));
        }
    }

    let cryptographically_valid = digest_matches && signature_valid && chain_validation.valid;
    let pades_compliant = cryptographically_valid && mandatory_satisfied;

    let level = if !cryptographically_valid || !pades_compliant {
        SignatureLevel::Unknown
    } else if timestamped && has_valid_timestamp_token {
        SignatureLevel::BT
    } else {
        SignatureLevel::BB
    };

    log::info!(
        "verify: level={level}, cryptographically_valid={cryptographically_valid}, pades_compliant={pades_compliant}"
    );

    Ok(VerificationReport {
        cryptographically_valid,
        pades_compliant,
        timestamped: timestamped && has_valid_timestamp_token,
        level,
        reasons,
        checks,
    })
}

/// Re-export for callers that only need the located `ByteRange`, e.g. to
/// report it back verbatim (spec.md §6's `prepare` response).
pub fn byte_range_of(pdf_bytes: &[u8]) -> Result<ByteRange> {
    let areas = locator::locate_signature_areas(pdf_bytes, None)?;
    Ok(areas.byte_range(pdf_bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::assembler::{AssembleRequest, CmsAssembler};
    use crate::config::Config;
    use crate::pdf::preparer::{self, PrepareConfig};
    use crate::tsa::tests::FakeTsaClient;
    use crate::chain::builder::tests::FakeChainBuilder;
    use crate::chain::ChainBuildResult;
    use crate::attrs::AttrBuilder;

    fn fixture_cert() -> Certificate {
        Certificate::from_pem(include_str!("../tests/fixtures/signer_cert.pem")).unwrap()
    }

    fn fixture_key() -> rsa::RsaPrivateKey {
        use rsa::pkcs8::DecodePrivateKey;
        rsa::RsaPrivateKey::from_pkcs8_pem(include_str!("../tests/fixtures/signer_key_pkcs8.pem")).unwrap()
    }

    fn sign_with_fixture_key(signed_attrs_der: &[u8]) -> Vec<u8> {
        use rsa::pkcs1v15::SigningKey;
        use rsa::signature::{RandomizedSigner, SignatureEncoding};
        use sha2::Sha256;

        let key = fixture_key();
        let signing_key = SigningKey::<Sha256>::new(key);
        let mut rng = rand::thread_rng();
        signing_key.sign_with_rng(&mut rng, signed_attrs_der).to_vec()
    }

    fn no_timestamp_client() -> FakeTsaClient {
        FakeTsaClient {
            gen_time: chrono::Utc::now(),
            serial: 1,
            fail: true,
        }
    }

    fn noop_chain_builder() -> FakeChainBuilder {
        FakeChainBuilder {
            result: ChainBuildResult {
                chain: Vec::new(),
                errors: Vec::new(),
            },
        }
    }

    fn happy_path_pdf(with_timestamp: bool) -> Vec<u8> {
        let demo = preparer::generate_demo_pdf("Demo Document");
        let prepare_cfg = PrepareConfig::new("Dr. Test").with_reason("Testing").with_location("Paris");
        let prepared = preparer::prepare(&demo, &prepare_cfg).unwrap();

        let cert = fixture_cert();
        let signed_attrs_der = AttrBuilder::build(&cert, &prepared.message_digest).unwrap();
        let signature = sign_with_fixture_key(&signed_attrs_der);

        let cfg = Config::default();
        let tsa = if with_timestamp {
            crate::tsa::tests::FakeTsaClient {
                gen_time: chrono::Utc::now(),
                serial: 1,
                fail: false,
            }
        } else {
            no_timestamp_client()
        };
        let chain_builder = noop_chain_builder();

        let assembled = CmsAssembler::assemble(
            AssembleRequest {
                signed_attrs_der: &signed_attrs_der,
                signature: &signature,
                signer_cert: &cert,
                chain: &[],
                with_timestamp,
                tsa_url: Some("https://tsa.example.org"),
            },
            &cfg,
            &tsa,
            &chain_builder,
        )
        .unwrap();

        let areas = locator::locate_signature_areas(&prepared.bytes, Some(&prepare_cfg.field_name)).unwrap();
        locator::embed_cms(
            &prepared.bytes,
            &areas,
            prepared.byte_range,
            &assembled.cms_der,
            Some(&prepared.message_digest),
        )
        .unwrap()
    }

    /// P4 / scenario 1 (Happy B-B).
    #[test]
    fn test_happy_path_bb_verifies_as_cryptographically_valid_bb() {
        let signed_pdf = happy_path_pdf(false);
        let report = verify(&signed_pdf, &VerifyOptions::default()).unwrap();
        assert!(report.cryptographically_valid, "reasons: {:?}", report.reasons);
        assert!(report.pades_compliant, "reasons: {:?}", report.reasons);
        assert_eq!(report.level, SignatureLevel::BB);
        assert!(!report.timestamped);
    }

    /// Scenario 2 (Happy B-T).
    #[test]
    fn test_happy_path_bt_verifies_as_level_bt() {
        let signed_pdf = happy_path_pdf(true);
        let report = verify(&signed_pdf, &VerifyOptions::default()).unwrap();
        assert!(report.cryptographically_valid, "reasons: {:?}", report.reasons);
        assert_eq!(report.level, SignatureLevel::BT);
        assert!(report.timestamped);
    }

    /// P5 / scenario 3 (Tamper).
    #[test]
    fn test_tamper_inside_signed_region_is_detected() {
        let mut signed_pdf = happy_path_pdf(false);
        let byte_range = byte_range_of(&signed_pdf).unwrap();
        let flip_at = (byte_range.b as usize + 25).min(signed_pdf.len() - 1);
        signed_pdf[flip_at] ^= 0xff;

        let report = verify(&signed_pdf, &VerifyOptions::default()).unwrap();
        assert!(!report.cryptographically_valid);
        assert!(report.reasons.iter().any(|r| r.contains("modified")));
    }

    /// P6 / scenario 5 (TSA outage): finalize still verifies as B-B.
    #[test]
    fn test_tsa_outage_during_finalize_still_verifies_as_bb() {
        let demo = preparer::generate_demo_pdf("Demo Document");
        let prepare_cfg = PrepareConfig::new("Dr. Test");
        let prepared = preparer::prepare(&demo, &prepare_cfg).unwrap();

        let cert = fixture_cert();
        let signed_attrs_der = AttrBuilder::build(&cert, &prepared.message_digest).unwrap();
        let signature = sign_with_fixture_key(&signed_attrs_der);

        let cfg = Config::default();
        let failing_tsa = FakeTsaClient {
            gen_time: chrono::Utc::now(),
            serial: 1,
            fail: true,
        };
        let chain_builder = noop_chain_builder();

        let assembled = CmsAssembler::assemble(
            AssembleRequest {
                signed_attrs_der: &signed_attrs_der,
                signature: &signature,
                signer_cert: &cert,
                chain: &[],
                with_timestamp: true,
                tsa_url: Some("https://tsa.example.org"),
            },
            &cfg,
            &failing_tsa,
            &chain_builder,
        )
        .unwrap();
        assert!(!assembled.timestamped);

        let areas = locator::locate_signature_areas(&prepared.bytes, Some(&prepare_cfg.field_name)).unwrap();
        let signed_pdf = locator::embed_cms(
            &prepared.bytes,
            &areas,
            prepared.byte_range,
            &assembled.cms_der,
            Some(&prepared.message_digest),
        )
        .unwrap();

        let report = verify(&signed_pdf, &VerifyOptions::default()).unwrap();
        assert!(report.cryptographically_valid, "reasons: {:?}", report.reasons);
        assert_eq!(report.level, SignatureLevel::BB);
    }

    /// Scenario 6 (Unsigned PDF): verifying `prepare`'s output (before
    /// `finalize`) reports Unknown with the placeholder zero-filled hex.
    #[test]
    fn test_verifying_prepared_but_unfinalized_pdf_reports_unsigned() {
        let demo = preparer::generate_demo_pdf("Demo Document");
        let prepare_cfg = PrepareConfig::new("Dr. Test");
        let prepared = preparer::prepare(&demo, &prepare_cfg).unwrap();

        let report = verify(&prepared.bytes, &VerifyOptions::default()).unwrap();
        assert_eq!(report.level, SignatureLevel::Unknown);
        assert!(report.reasons.iter().any(|r| r.contains("No CMS signature")));
    }
}
