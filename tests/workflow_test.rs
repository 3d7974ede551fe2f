//! Black-box integration tests for the public `prepare` / `presign` /
//! `finalize` / `verify` surface (spec.md §6), driven only through the
//! base64/PEM DTOs an HTTP adapter would use — no crate-internal test
//! doubles. `HttpTsaClient`/`HttpChainBuilder` are used directly: the
//! fixture certificate is self-signed, so `HttpChainBuilder::build` stops at
//! it without any network access, and every case here asks for
//! `withTimestamp: false`, so `HttpTsaClient` never dials out either.

use pades_core::chain::HttpChainBuilder;
use pades_core::config::Config;
use pades_core::pdf::preparer;
use pades_core::tsa::HttpTsaClient;
use pades_core::workflow::{self, FinalizeRequest, PrepareRequest, PresignRequest, VerifyRequest};

use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::RandomizedSigner;
use sha2::Sha256;

fn fixture_cert_pem() -> String {
    include_str!("fixtures/signer_cert.pem").to_string()
}

fn fixture_key() -> rsa::RsaPrivateKey {
    rsa::RsaPrivateKey::from_pkcs8_pem(include_str!("fixtures/signer_key_pkcs8.pem")).unwrap()
}

fn sign(signed_attrs_der: &[u8]) -> Vec<u8> {
    let signing_key = SigningKey::<Sha256>::new(fixture_key());
    signing_key.sign_with_rng(&mut rand::thread_rng(), signed_attrs_der).to_vec()
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(s: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s).unwrap()
}

/// The full remote-signing round trip as an external caller would drive it:
/// `prepare` a demo PDF, `presign` to get the bytes to sign, sign them with
/// the fixture key exactly as an external HSM would, then `finalize` and
/// `verify` the result.
#[test]
fn full_workflow_round_trips_through_the_public_api() {
    let cfg = Config::new("Dr. Test").with_reason("Integration test").with_location("Paris");
    let demo = preparer::generate_demo_pdf("Integration Demo");

    let prepared = workflow::prepare(
        PrepareRequest {
            pdf_base64: base64_encode(&demo),
        },
        &cfg,
    )
    .expect("prepare should succeed on a freshly generated demo PDF");

    let presigned = workflow::presign(PresignRequest {
        message_digest_b64: prepared.message_digest_b64.clone(),
        signer_cert_pem: fixture_cert_pem(),
    })
    .expect("presign should succeed for a valid certificate");

    let signed_attrs_der = base64_decode(&presigned.signed_attrs_der_b64);
    let signature = sign(&signed_attrs_der);

    let finalized = workflow::finalize(
        FinalizeRequest {
            prepared_pdf_base64: prepared.prepared_pdf_base64,
            byte_range: prepared.byte_range,
            signed_attrs_der_b64: presigned.signed_attrs_der_b64,
            signature_b64: base64_encode(&signature),
            signer_cert_pem: fixture_cert_pem(),
            certificate_chain_pem: None,
            with_timestamp: Some(false),
            tsa_url: None,
        },
        &cfg,
        &HttpTsaClient::without_default_url(),
        &HttpChainBuilder::new(),
    )
    .expect("finalize should succeed with a byte-identical signedAttrs and a valid signature");

    let report = workflow::verify(
        VerifyRequest {
            pdf_base64: finalized.signed_pdf_base64.clone(),
        },
        &cfg,
    )
    .expect("verify should succeed on a well-formed signed PDF");

    assert!(report.cryptographically_valid);
    assert!(report.pades_compliant);
    assert!(!report.timestamped);
    assert_eq!(report.level.to_string(), "B-B");
    assert!(report.reasons.is_empty(), "unexpected reasons: {:?}", report.reasons);

    // Round-tripping the finalized PDF through base64 again must still
    // verify: finalize's output is exactly what an HTTP client would receive
    // and persist.
    let finalized_bytes = base64_decode(&finalized.signed_pdf_base64);
    assert!(finalized_bytes.starts_with(b"%PDF-"));
}

/// Tampering with a signed byte after `finalize` must be caught: the digest
/// embedded in `messageDigest` no longer matches the ByteRange-excluded
/// content.
#[test]
fn tampering_with_signed_bytes_after_finalize_is_detected() {
    let cfg = Config::new("Dr. Test");
    let demo = preparer::generate_demo_pdf("Tamper Target");

    let prepared = workflow::prepare(
        PrepareRequest {
            pdf_base64: base64_encode(&demo),
        },
        &cfg,
    )
    .unwrap();

    let presigned = workflow::presign(PresignRequest {
        message_digest_b64: prepared.message_digest_b64.clone(),
        signer_cert_pem: fixture_cert_pem(),
    })
    .unwrap();

    let signed_attrs_der = base64_decode(&presigned.signed_attrs_der_b64);
    let signature = sign(&signed_attrs_der);

    let finalized = workflow::finalize(
        FinalizeRequest {
            prepared_pdf_base64: prepared.prepared_pdf_base64,
            byte_range: prepared.byte_range,
            signed_attrs_der_b64: presigned.signed_attrs_der_b64,
            signature_b64: base64_encode(&signature),
            signer_cert_pem: fixture_cert_pem(),
            certificate_chain_pem: None,
            with_timestamp: Some(false),
            tsa_url: None,
        },
        &cfg,
        &HttpTsaClient::without_default_url(),
        &HttpChainBuilder::new(),
    )
    .unwrap();

    let mut tampered = base64_decode(&finalized.signed_pdf_base64);
    // Flip a byte well inside the signed content, past the header, before
    // the signature dictionary.
    let flip_at = tampered.iter().position(|&b| b == b'D').expect("demo PDF contains the letter D");
    tampered[flip_at] ^= 0xff;

    let report = workflow::verify(
        VerifyRequest {
            pdf_base64: base64_encode(&tampered),
        },
        &cfg,
    )
    .unwrap();

    assert!(!report.cryptographically_valid, "tampering inside the signed region must be detected");
}

/// `presign`ing against one signer certificate and `finalize`ing with a
/// signature produced over a mismatched `signedAttrs` must be rejected
/// before any CMS container is assembled (spec.md §5's ordering guarantee).
#[test]
fn finalize_rejects_a_signature_over_the_wrong_signed_attrs() {
    let cfg = Config::new("Dr. Test");
    let demo = preparer::generate_demo_pdf("Ordering Guard");

    let prepared = workflow::prepare(
        PrepareRequest {
            pdf_base64: base64_encode(&demo),
        },
        &cfg,
    )
    .unwrap();

    // A presign call against an unrelated digest, as if this signedAttrs
    // had come from a different prepare() invocation entirely.
    let other_demo = preparer::generate_demo_pdf("A Different Document");
    let other_prepared = workflow::prepare(
        PrepareRequest {
            pdf_base64: base64_encode(&other_demo),
        },
        &cfg,
    )
    .unwrap();
    let mismatched_presign = workflow::presign(PresignRequest {
        message_digest_b64: other_prepared.message_digest_b64,
        signer_cert_pem: fixture_cert_pem(),
    })
    .unwrap();

    let signed_attrs_der = base64_decode(&mismatched_presign.signed_attrs_der_b64);
    let signature = sign(&signed_attrs_der);

    let result = workflow::finalize(
        FinalizeRequest {
            prepared_pdf_base64: prepared.prepared_pdf_base64,
            byte_range: prepared.byte_range,
            signed_attrs_der_b64: mismatched_presign.signed_attrs_der_b64,
            signature_b64: base64_encode(&signature),
            signer_cert_pem: fixture_cert_pem(),
            certificate_chain_pem: None,
            with_timestamp: Some(false),
            tsa_url: None,
        },
        &cfg,
        &HttpTsaClient::without_default_url(),
        &HttpChainBuilder::new(),
    );

    assert!(result.is_err(), "finalize must reject signedAttrs built over a different prepare() digest");
}

/// Verifying a `prepare`d-but-not-yet-`finalize`d PDF must report "unsigned"
/// rather than erroring or crashing — the placeholder `/Contents` slot is
/// all zero bytes at that point.
#[test]
fn verifying_a_prepared_but_unfinalized_pdf_reports_unsigned() {
    let cfg = Config::new("Dr. Test");
    let demo = preparer::generate_demo_pdf("Never Finalized");

    let prepared = workflow::prepare(
        PrepareRequest {
            pdf_base64: base64_encode(&demo),
        },
        &cfg,
    )
    .unwrap();

    let report = workflow::verify(
        VerifyRequest {
            pdf_base64: prepared.prepared_pdf_base64,
        },
        &cfg,
    )
    .unwrap();

    assert!(!report.cryptographically_valid);
    assert_eq!(report.level.to_string(), "Unknown");
}

/// The workflow DTOs serialize with the camelCase field names spec.md §6's
/// HTTP surface describes, so a JSON request body an adapter receives over
/// the wire deserializes directly into `PrepareRequest`.
#[test]
fn prepare_request_deserializes_from_camel_case_json() {
    let demo = preparer::generate_demo_pdf("JSON Surface");
    let body = serde_json::json!({ "pdfBase64": base64_encode(&demo) });
    let req: PrepareRequest = serde_json::from_value(body).unwrap();

    let cfg = Config::new("Dr. Test");
    let prepared = workflow::prepare(req, &cfg).unwrap();

    let encoded = serde_json::to_value(&prepared).unwrap();
    assert!(encoded.get("preparedPdfBase64").is_some());
    assert!(encoded.get("byteRange").is_some());
    assert!(encoded.get("messageDigestB64").is_some());
}
