//! SHA-256 hashing.
//!
//! PAdES baseline mandates SHA-256 throughout: the ByteRange digest, the
//! `certHash` in `ESSCertIDv2`, and the CMS `digestAlgorithm`. Every digest in
//! this crate goes through this module so there is exactly one place that
//! would need to change to support a stronger hash.

use sha2::{Digest, Sha256};

/// Length in bytes of a SHA-256 digest.
pub const SHA256_LEN: usize = 32;

/// Compute SHA-256 over a single buffer.
pub fn sha256(data: &[u8]) -> [u8; SHA256_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 over the concatenation of several buffers without
/// allocating an intermediate copy.
///
/// Used for the ByteRange digest, which hashes `bytes[a..a+b]` and
/// `bytes[c..c+d]` without ever materializing their concatenation.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; SHA256_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_concat_matches_single_buffer() {
        let a = b"hello ";
        let b = b"world";
        let mut combined = Vec::new();
        combined.extend_from_slice(a);
        combined.extend_from_slice(b);

        assert_eq!(sha256_concat(&[a, b]), sha256(&combined));
    }

    #[test]
    fn test_sha256_concat_empty_parts() {
        assert_eq!(sha256_concat(&[]), sha256(b""));
    }
}
