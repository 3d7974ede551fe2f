//! Hand-rolled ASN.1 structures for CMS (RFC 5652), ESS (RFC 5035), and
//! the Time-Stamp Protocol (RFC 3161), built on [`crate::codec::der`].
//!
//! Every OID this crate ever emits or matches against lives in [`oid`] so
//! there is one place to check against the spec's dotted strings.

pub mod attributes;
pub mod ess;
pub mod rfc3161;
pub mod rfc5652;

/// Dotted-string OIDs used throughout the crate.
pub mod oid {
    pub const SHA256: &str = "2.16.840.1.101.3.4.2.1";
    pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
    pub const SHA256_WITH_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.11";

    pub const ID_DATA: &str = "1.2.840.113549.1.7.1";
    pub const ID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
    pub const ID_CT_TST_INFO: &str = "1.2.840.113549.1.9.16.1.4";

    pub const CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
    pub const MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
    pub const SIGNING_TIME: &str = "1.2.840.113549.1.9.5";
    pub const SIGNING_CERTIFICATE_V2: &str = "1.2.840.113549.1.9.16.2.47";
    pub const ID_AA_SIGNATURE_TIME_STAMP_TOKEN: &str = "1.2.840.113549.1.9.16.2.14";

    pub const AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";
    pub const AD_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";
}
