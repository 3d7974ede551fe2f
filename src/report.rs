//! `VerificationReport` (spec.md §3, §4.8): the verifier's output shape.
//!
//! Grounded in the teacher's `compliance` module (`src/compliance/report.rs`
//! style — a report struct plus a list of individual checks), generalized
//! from PDF/A rules to the PAdES compliance rule table.

use serde::Serialize;

/// PAdES baseline level a signature was classified at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignatureLevel {
    #[serde(rename = "B-B")]
    BB,
    #[serde(rename = "B-T")]
    BT,
    Unknown,
}

impl std::fmt::Display for SignatureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureLevel::BB => write!(f, "B-B"),
            SignatureLevel::BT => write!(f, "B-T"),
            SignatureLevel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Severity of one compliance rule (spec.md §4.9's M/R column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleLevel {
    Mandatory,
    Recommended,
}

/// One row of the compliance rule table, evaluated against a parsed
/// signature.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceCheck {
    pub requirement: String,
    pub satisfied: bool,
    pub level: RuleLevel,
    pub details: String,
}

/// The full verification outcome for one PDF.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub cryptographically_valid: bool,
    pub pades_compliant: bool,
    pub timestamped: bool,
    pub level: SignatureLevel,
    pub reasons: Vec<String>,
    pub checks: Vec<ComplianceCheck>,
}

impl VerificationReport {
    /// A report for input that never reached a parseable CMS signature at
    /// all (scenario 6: verifying the output of `prepare` before
    /// `finalize`).
    pub fn unsigned(reason: impl Into<String>) -> Self {
        VerificationReport {
            cryptographically_valid: false,
            pades_compliant: false,
            timestamped: false,
            level: SignatureLevel::Unknown,
            reasons: vec![reason.into()],
            checks: Vec::new(),
        }
    }
}
