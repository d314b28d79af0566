//! Masking key derivation and the process-wide key cache.
//!
//! Deriving the masking key uses Argon2id and is deliberately expensive
//! (memory- and time-hard) to resist brute-force recovery. The cost is paid
//! exactly once per process: [`KeyCache`] runs the derivation behind a
//! single-initialization barrier and every later caller gets the cached
//! key. This derive-once/hash-many split is what keeps steady-state
//! fingerprinting sub-millisecond.

use crate::error::{FingerprintError, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use zeroize::Zeroize;

/// Key length for the HMAC-SHA256 masking digest.
pub const MASKING_KEY_LEN: usize = 32;

/// Minimum salt length accepted by the derivation step.
pub const MIN_SALT_LEN: usize = 8;

/// Argon2id parameters for the one-time masking key derivation.
///
/// The defaults target a derivation on the order of a second on commodity
/// hardware. Tests shrink them; production should not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Passphrase the masking key is derived from. Without one, no masked
    /// fingerprint can ever be produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,

    /// Derivation salt. Fixed by default so fingerprints are comparable
    /// across processes sharing the same passphrase.
    #[serde(default = "default_salt")]
    pub salt: String,

    /// Argon2id memory cost in KiB.
    #[serde(default = "default_memory_cost_kib")]
    pub memory_cost_kib: u32,

    /// Argon2id time cost (iterations).
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,

    /// Argon2id parallelism (lanes).
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_salt() -> String {
    "flowprint-masking-v1".to_string()
}

fn default_memory_cost_kib() -> u32 {
    64 * 1024
}

fn default_time_cost() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    4
}

impl Default for KdfConfig {
    fn default() -> Self {
        KdfConfig {
            passphrase: None,
            salt: default_salt(),
            memory_cost_kib: default_memory_cost_kib(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
        }
    }
}

impl KdfConfig {
    /// Config with a passphrase and default Argon2id parameters.
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        KdfConfig {
            passphrase: Some(passphrase.into()),
            ..KdfConfig::default()
        }
    }
}

/// The derived masking key.
///
/// Opaque 32 bytes, immutable after creation, zeroized on drop. The raw
/// bytes stay inside this crate: only the masking encoder reads them, and
/// `Debug` output is redacted.
pub struct MaskingKey {
    bytes: [u8; MASKING_KEY_LEN],
}

impl MaskingKey {
    pub(crate) fn from_bytes(bytes: [u8; MASKING_KEY_LEN]) -> Self {
        MaskingKey { bytes }
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for MaskingKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MaskingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MaskingKey(..)")
    }
}

/// Run the Argon2id derivation. Internal errors stay as plain strings so
/// the cache can store and replay them.
fn derive(config: &KdfConfig) -> std::result::Result<MaskingKey, String> {
    let passphrase = config
        .passphrase
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "no masking passphrase configured".to_string())?;

    if config.salt.len() < MIN_SALT_LEN {
        return Err(format!(
            "salt must be at least {} bytes, got {}",
            MIN_SALT_LEN,
            config.salt.len()
        ));
    }

    let params = Params::new(
        config.memory_cost_kib,
        config.time_cost,
        config.parallelism,
        Some(MASKING_KEY_LEN),
    )
    .map_err(|e| format!("invalid argon2 parameters: {}", e))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let started = Instant::now();
    let mut out = [0u8; MASKING_KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), config.salt.as_bytes(), &mut out)
        .map_err(|e| format!("argon2 derivation failed: {}", e))?;

    info!(
        memory_cost_kib = config.memory_cost_kib,
        time_cost = config.time_cost,
        parallelism = config.parallelism,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Masking key derived"
    );

    Ok(MaskingKey::from_bytes(out))
}

/// Exactly-once derivation barrier for the masking key.
///
/// The first caller pays the full Argon2id cost; callers racing the first
/// derivation block until it completes and then observe the same key.
/// A failed derivation is sticky: the error is stored and returned to all
/// pending and future callers, since the cache can never serve masked
/// fingerprints without the key.
pub struct KeyCache {
    slot: OnceCell<std::result::Result<Arc<MaskingKey>, String>>,
}

impl KeyCache {
    /// An empty, cold cache.
    pub const fn new() -> Self {
        KeyCache {
            slot: OnceCell::new(),
        }
    }

    /// The process-wide cache shared by all fingerprint pipelines.
    pub fn global() -> &'static KeyCache {
        static GLOBAL: KeyCache = KeyCache::new();
        &GLOBAL
    }

    /// Return the derived key, deriving it on first use.
    ///
    /// `config` is only consulted by whichever call performs the one-time
    /// derivation; later calls return the cached key regardless.
    pub fn get_or_derive(&self, config: &KdfConfig) -> Result<Arc<MaskingKey>> {
        let slot = self.slot.get_or_init(|| derive(config).map(Arc::new));
        match slot {
            Ok(key) => Ok(Arc::clone(key)),
            Err(reason) => Err(FingerprintError::KeyDerivation(reason.clone())),
        }
    }

    /// Whether a key has been successfully derived.
    pub fn is_warm(&self) -> bool {
        matches!(self.slot.get(), Some(Ok(_)))
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        KeyCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small parameters so tests stay fast; still real Argon2id.
    fn fast_config() -> KdfConfig {
        KdfConfig {
            passphrase: Some("test-passphrase".into()),
            memory_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
            ..KdfConfig::default()
        }
    }

    #[test]
    fn test_derive_once_same_key() {
        let cache = KeyCache::new();
        let k1 = cache.get_or_derive(&fast_config()).unwrap();
        let k2 = cache.get_or_derive(&fast_config()).unwrap();
        assert!(Arc::ptr_eq(&k1, &k2));
        assert!(cache.is_warm());
    }

    #[test]
    fn test_missing_passphrase_is_fatal() {
        let cache = KeyCache::new();
        let err = cache.get_or_derive(&KdfConfig::default()).unwrap_err();
        assert!(matches!(err, FingerprintError::KeyDerivation(_)));
        assert!(err.to_string().contains("passphrase"));
    }

    #[test]
    fn test_failure_is_sticky() {
        let cache = KeyCache::new();
        assert!(cache.get_or_derive(&KdfConfig::default()).is_err());

        // A valid config cannot revive a poisoned cache.
        let err = cache.get_or_derive(&fast_config()).unwrap_err();
        assert!(err.to_string().contains("passphrase"));
        assert!(!cache.is_warm());
    }

    #[test]
    fn test_short_salt_rejected() {
        let cache = KeyCache::new();
        let config = KdfConfig {
            salt: "abc".into(),
            ..fast_config()
        };
        let err = cache.get_or_derive(&config).unwrap_err();
        assert!(err.to_string().contains("salt"));
    }

    #[test]
    fn test_same_inputs_same_key_bytes() {
        let a = KeyCache::new().get_or_derive(&fast_config()).unwrap();
        let b = KeyCache::new().get_or_derive(&fast_config()).unwrap();
        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn test_different_passphrases_different_keys() {
        let a = KeyCache::new().get_or_derive(&fast_config()).unwrap();
        let other = KdfConfig {
            passphrase: Some("other-passphrase".into()),
            ..fast_config()
        };
        let b = KeyCache::new().get_or_derive(&other).unwrap();
        assert_ne!(a.bytes(), b.bytes());
    }

    #[test]
    fn test_concurrent_first_callers_share_one_derivation() {
        let cache = Arc::new(KeyCache::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                cache.get_or_derive(&fast_config()).unwrap()
            }));
        }
        let keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for key in &keys[1..] {
            assert!(Arc::ptr_eq(&keys[0], key));
        }
    }

    #[test]
    fn test_debug_never_prints_key_bytes() {
        let key = KeyCache::new().get_or_derive(&fast_config()).unwrap();
        assert_eq!(format!("{:?}", key), "MaskingKey(..)");
    }
}
