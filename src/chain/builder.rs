//! `ChainBuilder.build` (spec.md §4.6): walk Authority Information Access
//! CA-Issuers links from an end-entity certificate up to a self-signed
//! root, fetching each missing issuer over HTTP.
//!
//! An injected collaborator, like [`crate::tsa::TsaClient`] — spec.md §9's
//! "polymorphism-by-collaborators" applies equally here so tests run
//! without real network access.

use crate::error::{Error, Result};
use crate::x509::Certificate;
use std::time::Duration;

const DEFAULT_MAX_CHAIN_LENGTH: usize = 10;

/// The result of building a chain: `chain[0]` is the end-entity itself,
/// each following entry its issuer, up to (and possibly including) a
/// self-signed root.
#[derive(Debug, Clone)]
pub struct ChainBuildResult {
    pub chain: Vec<Certificate>,
    pub errors: Vec<String>,
}

/// Collaborator boundary for AIA-based chain discovery.
pub trait ChainBuilder {
    fn build(&self, end_entity: &Certificate, max_chain_length: usize) -> Result<ChainBuildResult>;
}

/// HTTP-based `ChainBuilder` (`GET aiaUrl`, spec.md §6).
pub struct HttpChainBuilder {
    timeout: Duration,
}

impl HttpChainBuilder {
    pub fn new() -> Self {
        HttpChainBuilder {
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn fetch_one(&self, url: &str) -> Result<Certificate> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::AiaFetchFailed(e.to_string()))?;
        let resp = client.get(url).send().map_err(|e| Error::AiaFetchFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::AiaFetchFailed(format!("AIA HTTP status {}", resp.status())));
        }
        let body = resp.bytes().map_err(|e| Error::AiaFetchFailed(e.to_string()))?.to_vec();

        if body.starts_with(b"-----BEGIN") {
            let pem_str = String::from_utf8(body).map_err(|e| Error::AiaFetchFailed(e.to_string()))?;
            Certificate::from_pem(&pem_str).map_err(|e| Error::AiaFetchFailed(e.to_string()))
        } else {
            Certificate::from_der(body).map_err(|e| Error::AiaFetchFailed(e.to_string()))
        }
    }
}

impl Default for HttpChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder for HttpChainBuilder {
    fn build(&self, end_entity: &Certificate, max_chain_length: usize) -> Result<ChainBuildResult> {
        let max_chain_length = if max_chain_length == 0 {
            DEFAULT_MAX_CHAIN_LENGTH
        } else {
            max_chain_length
        };
        let mut chain = vec![end_entity.clone()];
        let mut errors = Vec::new();

        loop {
            let current = chain.last().unwrap();
            if current.is_self_signed()? {
                break;
            }
            if chain.len() >= max_chain_length {
                let msg = "maxChainLength reached before a self-signed root was found";
                log::warn!("chain build stopped: {msg}");
                errors.push(msg.to_string());
                break;
            }

            let urls = current.aia_ca_issuer_urls()?;
            let Some(url) = urls.first() else {
                let msg = "no Authority Information Access CA-Issuers URL";
                log::warn!("chain build stopped: {msg}");
                errors.push(msg.to_string());
                break;
            };

            let fetched = match self.fetch_one(url) {
                Ok(cert) => cert,
                Err(e) => {
                    log::warn!("AIA fetch from {url} failed, chain build stopped: {e}");
                    errors.push(e.to_string());
                    break;
                }
            };

            if fetched.subject_canonical()? != current.issuer_canonical()? {
                let msg = "fetched certificate's subject does not match the issuer DN";
                log::warn!("chain build stopped: {msg}");
                errors.push(msg.to_string());
                break;
            }

            chain.push(fetched);
        }

        Ok(ChainBuildResult { chain, errors })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A deterministic `ChainBuilder` double for tests.
    pub(crate) struct FakeChainBuilder {
        pub result: ChainBuildResult,
    }

    impl ChainBuilder for FakeChainBuilder {
        fn build(&self, _end_entity: &Certificate, _max_chain_length: usize) -> Result<ChainBuildResult> {
            Ok(ChainBuildResult {
                chain: self.result.chain.clone(),
                errors: self.result.errors.clone(),
            })
        }
    }

    fn self_signed_cert() -> Certificate {
        let pem = include_str!("../../tests/fixtures/signer_cert.pem");
        Certificate::from_pem(pem).unwrap()
    }

    #[test]
    fn test_fake_chain_builder_returns_configured_result() {
        let cert = self_signed_cert();
        let fake = FakeChainBuilder {
            result: ChainBuildResult {
                chain: vec![cert.clone()],
                errors: Vec::new(),
            },
        };
        let result = fake.build(&cert, 10).unwrap();
        assert_eq!(result.chain.len(), 1);
        assert!(result.errors.is_empty());
    }
}
