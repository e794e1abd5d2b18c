//! SHA-256 fingerprint hashing.
//!
//! Implements the `ContentHasher` trait from `memoria-core` using the
//! `sha2` crate (RustCrypto ecosystem).

use sha2::{Digest, Sha256};

use memoria_core::service::hash::ContentHasher;

/// SHA-256 implementation of `ContentHasher`.
///
/// Produces 64-character lowercase hex digests of the canonical call input.
#[derive(Debug, Clone, Copy)]
pub struct Sha256ContentHasher;

impl Sha256ContentHasher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Sha256ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        format!("{:x}", digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_known_value() {
        let hasher = Sha256ContentHasher::new();
        assert_eq!(
            hasher.compute_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_default_hasher_matches_new() {
        let input = "{\n  \"messages\": []\n}";
        assert_eq!(
            Sha256ContentHasher::default().compute_hash(input),
            Sha256ContentHasher::new().compute_hash(input)
        );
    }

    #[test]
    fn test_sha256_hash_deterministic() {
        let hasher = Sha256ContentHasher::new();
        let input = "{\n  \"x\": 1\n}";
        assert_eq!(hasher.compute_hash(input), hasher.compute_hash(input));
    }

    #[test]
    fn test_sha256_hash_fixed_length_lowercase_hex() {
        let hasher = Sha256ContentHasher::new();
        for input in ["a", "a much longer canonical input document", "héllo"] {
            let hash = hasher.compute_hash(input);
            assert_eq!(hash.len(), 64);
            assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
        assert_ne!(hasher.compute_hash("a"), hasher.compute_hash("b"));
    }
}
