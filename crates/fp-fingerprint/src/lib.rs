//! Fingerprint pipeline for flow definitions.
//!
//! This crate turns a flow definition document into a deterministic,
//! content-derived fingerprint that two deployments can compare for drift
//! without ever exposing embedded secrets.
//!
//! # Key Features
//!
//! - **Canonicalization**: attribute ordering, sibling ordering, and value
//!   representation are normalized, so cosmetic formatting never changes
//!   the fingerprint.
//! - **Keyed masking**: sensitive values are replaced by an HMAC-SHA256
//!   digest under a key derived once per process with Argon2id. Masks are
//!   stable for equality comparison and irreversible.
//! - **Derive once, hash many**: the memory-hard derivation runs exactly
//!   once behind the [`KeyCache`] barrier; steady-state fingerprints cost
//!   parsing plus canonicalization only.
//! - **Fail-closed**: parse, decrypt, and derivation failures surface as
//!   errors; a partial or defaulted fingerprint is never returned.
//!
//! # Example
//!
//! ```no_run
//! use fp_fingerprint::{FingerprintConfig, Fingerprinter};
//!
//! let config = FingerprintConfig::with_passphrase("masking passphrase");
//! let fingerprinter = Fingerprinter::without_decryption(config).unwrap();
//!
//! let doc = br#"{"name": "flow", "attributes": {
//!     "password": { "value": "hunter2", "tag": "sensitive" }
//! }}"#;
//! let fingerprint = fingerprinter.create_fingerprint(doc).unwrap();
//! assert!(!fingerprint.contains("hunter2"));
//! ```

pub mod canonical;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod mask;

pub use canonical::{Canonicalizer, CANONICALIZATION_VERSION};
pub use config::{FingerprintConfig, OutputMode, CONFIG_SCHEMA_VERSION};
pub use error::{FingerprintError, Result};
pub use fingerprint::Fingerprinter;
pub use key::{KdfConfig, KeyCache, MaskingKey};
pub use mask::{MaskingEncoder, MASK_PREFIX, MASK_SUFFIX};
