//! `Config`: the enumerated options from spec.md §6, plus the §9 CPS
//! heuristic decided in `DESIGN.md`.
//!
//! Grounded in the teacher's `SignOptions` (`src/signatures/types.rs`): a
//! plain struct with sensible defaults, populated through builder methods
//! rather than a constructor with a dozen positional arguments.

/// Baseline signature level this crate targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureLevel {
    /// PAdES-B-B: signature only, no timestamp.
    BB,
    /// PAdES-B-T: signature plus an RFC 3161 timestamp token.
    BT,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub signer_name: String,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub signature_level: SignatureLevel,
    pub timestamp_url: Option<String>,
    pub placeholder_hex_size: usize,
    pub max_chain_length: usize,
    pub trusted_roots: Vec<[u8; 32]>,
    /// `(subject DN, issuer DN) -> looks like a CPS certificate`. Defaults
    /// to the exact substring match spec.md §4.4 names; see
    /// `DESIGN.md`'s "CPS heuristic trigger" decision.
    pub cps_trigger: fn(&str, &str) -> bool,
}

fn default_cps_trigger(subject: &str, issuer: &str) -> bool {
    const MARKERS: [&str; 3] = ["ASIP-SANTE", "IGC-SANTE", "CPS"];
    MARKERS.iter().any(|m| subject.contains(m) || issuer.contains(m))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            signer_name: String::new(),
            reason: None,
            location: None,
            contact_info: None,
            signature_level: SignatureLevel::BB,
            timestamp_url: None,
            placeholder_hex_size: 16_384,
            max_chain_length: 10,
            trusted_roots: Vec::new(),
            cps_trigger: default_cps_trigger,
        }
    }
}

impl Config {
    pub fn new(signer_name: impl Into<String>) -> Self {
        Config {
            signer_name: signer_name.into(),
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_contact_info(mut self, contact_info: impl Into<String>) -> Self {
        self.contact_info = Some(contact_info.into());
        self
    }

    pub fn with_signature_level(mut self, level: SignatureLevel) -> Self {
        self.signature_level = level;
        self
    }

    pub fn with_timestamp_url(mut self, url: impl Into<String>) -> Self {
        self.timestamp_url = Some(url.into());
        self
    }

    pub fn with_placeholder_hex_size(mut self, size: usize) -> Self {
        self.placeholder_hex_size = size;
        self
    }

    pub fn with_max_chain_length(mut self, len: usize) -> Self {
        self.max_chain_length = len;
        self
    }

    pub fn with_trusted_roots(mut self, roots: Vec<[u8; 32]>) -> Self {
        self.trusted_roots = roots;
        self
    }

    pub fn looks_like_cps(&self, subject_dn: &str, issuer_dn: &str) -> bool {
        (self.cps_trigger)(subject_dn, issuer_dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cps_trigger_matches_markers() {
        assert!(default_cps_trigger("CN=Dr. Test,O=CPS", "CN=IGC-SANTE Root"));
        assert!(default_cps_trigger("CN=ASIP-SANTE Issuer", ""));
        assert!(!default_cps_trigger("CN=Dr. Test,O=PAdES Test", "CN=Dr. Test"));
    }

    #[test]
    fn test_config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.placeholder_hex_size, 16_384);
        assert_eq!(cfg.max_chain_length, 10);
        assert_eq!(cfg.signature_level, SignatureLevel::BB);
    }

    #[test]
    fn test_config_builder_chain() {
        let cfg = Config::new("Dr. Test")
            .with_reason("Testing")
            .with_location("Paris")
            .with_signature_level(SignatureLevel::BT)
            .with_timestamp_url("https://tsa.example.org");
        assert_eq!(cfg.signer_name, "Dr. Test");
        assert_eq!(cfg.reason.as_deref(), Some("Testing"));
        assert_eq!(cfg.signature_level, SignatureLevel::BT);
        assert_eq!(cfg.timestamp_url.as_deref(), Some("https://tsa.example.org"));
    }
}
