//! Sensitive value masking via a keyed one-way digest.
//!
//! A masked value is `[MASKED] (<digest>)` where the digest is the
//! standard-base64 HMAC-SHA256 of the plaintext under the cached masking
//! key. Equal plaintexts under the same key always produce the same mask,
//! so masked fields still participate in equality comparison; nothing maps
//! a mask back to its plaintext. In contrast to key derivation this
//! operation costs microseconds.

use crate::error::Result;
use crate::key::{KdfConfig, KeyCache, MaskingKey, MASKING_KEY_LEN};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

/// Fixed textual envelope around the digest.
pub const MASK_PREFIX: &str = "[MASKED] (";

/// Closing delimiter of the envelope.
pub const MASK_SUFFIX: &str = ")";

/// Stateless encoder holding a handle to the derived masking key.
#[derive(Clone)]
pub struct MaskingEncoder {
    key: Arc<MaskingKey>,
}

impl MaskingEncoder {
    /// Encoder backed by a key cache, deriving the key on first use.
    pub fn from_cache(cache: &KeyCache, config: &KdfConfig) -> Result<Self> {
        Ok(MaskingEncoder {
            key: cache.get_or_derive(config)?,
        })
    }

    /// Encoder over explicit key bytes. For tests and fuzzing; production
    /// keys come from the cache.
    pub fn from_raw_key(bytes: [u8; MASKING_KEY_LEN]) -> Self {
        MaskingEncoder {
            key: Arc::new(MaskingKey::from_bytes(bytes)),
        }
    }

    /// Mask a plaintext value.
    pub fn mask(&self, plaintext: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.key.bytes())
            .expect("HMAC can take key of any size");
        mac.update(plaintext.as_bytes());
        let digest = mac.finalize().into_bytes();

        format!(
            "{}{}{}",
            MASK_PREFIX,
            base64::engine::general_purpose::STANDARD.encode(digest),
            MASK_SUFFIX
        )
    }

    /// Whether a value carries the masked envelope.
    pub fn is_masked(value: &str) -> bool {
        value.starts_with(MASK_PREFIX) && value.ends_with(MASK_SUFFIX)
    }
}

impl std::fmt::Debug for MaskingEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MaskingEncoder(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_encoder() -> MaskingEncoder {
        MaskingEncoder::from_raw_key([7u8; MASKING_KEY_LEN])
    }

    #[test]
    fn test_mask_deterministic() {
        let encoder = test_encoder();
        assert_eq!(encoder.mask("hunter2"), encoder.mask("hunter2"));
    }

    #[test]
    fn test_mask_envelope() {
        let masked = test_encoder().mask("hunter2");
        assert!(MaskingEncoder::is_masked(&masked));
        assert!(masked.starts_with("[MASKED] ("));
        assert!(masked.ends_with(')'));
    }

    #[test]
    fn test_mask_digest_is_base64() {
        let masked = test_encoder().mask("hunter2");
        let digest = &masked[MASK_PREFIX.len()..masked.len() - MASK_SUFFIX.len()];
        // 32-byte MAC -> 44 base64 chars including padding.
        assert_eq!(digest.len(), 44);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
    }

    #[test]
    fn test_mask_never_contains_plaintext() {
        let masked = test_encoder().mask("originalPlaintextPassword");
        assert!(!masked.contains("originalPlaintextPassword"));
    }

    #[test]
    fn test_distinct_plaintexts_distinct_masks() {
        let encoder = test_encoder();
        assert_ne!(encoder.mask("value1"), encoder.mask("value2"));
    }

    #[test]
    fn test_distinct_keys_distinct_masks() {
        let a = MaskingEncoder::from_raw_key([0u8; MASKING_KEY_LEN]);
        let b = MaskingEncoder::from_raw_key([1u8; MASKING_KEY_LEN]);
        assert_ne!(a.mask("same"), b.mask("same"));
    }

    #[test]
    fn test_is_masked_rejects_plain_values() {
        assert!(!MaskingEncoder::is_masked("hunter2"));
        assert!(!MaskingEncoder::is_masked("[MASKED] (unterminated"));
    }
}
