//! Reversible-encryption collaborator contract.
//!
//! Values tagged `encrypted` are stored as ciphertext and must be decrypted
//! before canonicalization. The service itself lives outside this workspace;
//! the pipeline only consumes its `decrypt` side.

use thiserror::Error;

/// Errors the decryption collaborator can report.
///
/// Wrong-key and corrupted-ciphertext failures are distinct so callers can
/// tell a key mismatch from damaged data.
#[derive(Error, Debug)]
pub enum DecryptError {
    /// The ciphertext is structurally invalid (bad encoding, truncated).
    #[error("ciphertext is corrupted: {0}")]
    Corrupted(String),

    /// The ciphertext is well-formed but was encrypted under another key.
    #[error("decryption key mismatch: {0}")]
    WrongKey(String),

    /// No decryption service is configured in this deployment.
    #[error("no decryption service configured")]
    Unavailable,
}

/// Decrypt-side contract of the reversible encryption service.
///
/// Implementations must fail with a [`DecryptError`] instead of returning
/// garbage plaintext; the fingerprint pipeline aborts on any failure rather
/// than emitting a partial fingerprint.
pub trait Decryptor: Send + Sync {
    /// Recover the plaintext for a stored ciphertext.
    fn decrypt(&self, ciphertext: &str) -> Result<String, DecryptError>;
}

/// Decryptor for deployments without a reversible-encryption service.
///
/// Any document that actually contains an encrypted value fails hard
/// instead of producing a fingerprint with unverifiable content.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecryption;

impl Decryptor for NoDecryption {
    fn decrypt(&self, _ciphertext: &str) -> Result<String, DecryptError> {
        Err(DecryptError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_decryption_always_fails() {
        let err = NoDecryption.decrypt("enc:anything").unwrap_err();
        assert!(matches!(err, DecryptError::Unavailable));
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let corrupted = DecryptError::Corrupted("bad base64".into()).to_string();
        let wrong_key = DecryptError::WrongKey("kid k2".into()).to_string();
        assert_ne!(corrupted, wrong_key);
        assert!(corrupted.contains("corrupted"));
        assert!(wrong_key.contains("mismatch"));
    }
}
