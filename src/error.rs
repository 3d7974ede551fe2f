//! Error types for the PAdES signing/verification core.
//!
//! The taxonomy follows §7 of the design: most variants are surfaced to the
//! caller with a stable code; only TSA/AIA network failures are recovered
//! in-process (see [`crate::cms::assembler`] and [`crate::chain::builder`]).

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while preparing, signing, assembling, or
/// verifying a PAdES signature.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid base64/PEM/DER input, or a PDF missing a signature dictionary.
    #[error("malformed input: {0}")]
    InputMalformed(String),

    /// The assembled CMS DER is larger than the reserved `/Contents` hex slot.
    #[error("placeholder too small: CMS is {actual} bytes, slot holds {capacity} bytes")]
    PlaceholderTooSmall {
        /// Size of the CMS DER that did not fit.
        actual: usize,
        /// Maximum size (in raw bytes, not hex chars) the slot can hold.
        capacity: usize,
    },

    /// The ByteRange digest recomputed after embedding does not match the
    /// digest produced by `prepare`.
    #[error("digest drift after embedding signature")]
    DigestDrift,

    /// The signature dictionary could not be located by field name or by
    /// scanning for `/ByteRange`.
    #[error("signature dictionary not found")]
    SignatureDictionaryNotFound,

    /// `<<`/`>>` nesting could not be balanced while locating a dictionary.
    #[error("unbalanced dictionary near byte {0}")]
    UnbalancedDictionary(usize),

    /// The ByteRange digest computed during verification does not match the
    /// `messageDigest` signed attribute: the PDF content has been modified.
    #[error("PDF content has been modified")]
    IntegrityViolation,

    /// RSA verification failed, or no signer certificate could be located.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// The certificate chain could not be built or validated.
    #[error("certificate chain broken: {0}")]
    ChainBroken(String),

    /// The invalid X.509 certificate (bad DER, missing required field).
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// A TSA request failed to produce a token (timeout, connection refused).
    ///
    /// Recovered locally during `finalize` (falls back to B-B); surfaced as a
    /// non-fatal compliance failure during `verify` of a claimed B-T signature.
    #[error("TSA unavailable: {0}")]
    TsaUnavailable(String),

    /// The TSA responded with a PKIStatus other than granted/grantedWithMods.
    #[error("TSA rejected request: status {0}")]
    TsaRejected(i32),

    /// An AIA (CA Issuers) fetch failed.
    ///
    /// Recovered locally: `ChainBuilder` falls back to the caller-supplied
    /// chain, or an empty chain.
    #[error("AIA fetch failed: {0}")]
    AiaFetchFailed(String),

    /// Programmer error: a precondition the core itself should guarantee
    /// was violated. Never expected in normal operation.
    #[error("internal error: {0}")]
    Internal(String),

    /// IO error reading/writing PDF bytes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// `true` for errors that a caller can recover from by retrying with a
    /// different configuration (e.g. a larger placeholder), as opposed to
    /// errors that indicate malformed input or a broken invariant.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PlaceholderTooSmall { .. }
                | Error::TsaUnavailable(_)
                | Error::TsaRejected(_)
                | Error::AiaFetchFailed(_)
        )
    }
}
