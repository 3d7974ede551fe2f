//! Low-level encoding primitives: digests, canonical DER, and the
//! hex/base64/PEM conversions used at the edges of the pipeline.
//!
//! Nothing above this module touches a byte of ASN.1 directly — [`crate::asn1`]
//! builds on [`der`] to assemble the CMS/ESS/TSP structures, and everything
//! else consumes those.

pub mod der;
pub mod digest;
pub mod encoding;
