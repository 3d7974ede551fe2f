//! X.509 certificate parsing, DN comparison, and signature-verification glue.

pub mod certificate;

pub use certificate::Certificate;
