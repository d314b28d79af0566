//! Error types for the fingerprint pipeline.

use thiserror::Error;

/// Result type for fingerprint operations.
pub type Result<T> = std::result::Result<T, FingerprintError>;

/// Errors that can occur while producing a fingerprint.
///
/// Every error is surfaced to the immediate caller. Nothing here is ever
/// downgraded to a default or empty fingerprint: a plausible-looking but
/// wrong fingerprint would falsely report two different flows as equal.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// The input document is malformed.
    #[error("parse error: {0}")]
    Parse(#[from] fp_flow::ParseError),

    /// An encrypted attribute could not be decrypted.
    /// Carries the attribute name, never its value.
    #[error("decryption failed for attribute '{attribute}': {reason}")]
    Decryption { attribute: String, reason: String },

    /// The masking key could not be derived. Fatal at cache scope: every
    /// later call against the same cache fails with the same error.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The tree contained a shape the canonicalizer does not support.
    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    /// I/O error while loading or saving configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
