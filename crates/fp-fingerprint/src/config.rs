//! Pipeline configuration.
//!
//! The configuration file carries the output mode and the key derivation
//! parameters. Because the KDF section can hold the masking passphrase,
//! saves go through a restricted-permission write on Unix.

use crate::error::Result;
use crate::key::KdfConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version for the configuration file.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// What `create_fingerprint` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// The canonical stream itself. Readable, diffable, variable length.
    #[default]
    Canonical,
    /// Hex SHA-256 of the canonical stream. Opaque, fixed size.
    Digest,
}

impl OutputMode {
    /// Parse from string.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "canonical" => Some(OutputMode::Canonical),
            "digest" => Some(OutputMode::Digest),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputMode::Canonical => "canonical",
            OutputMode::Digest => "digest",
        };
        write!(f, "{}", s)
    }
}

/// Fingerprint pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Output rendering mode.
    #[serde(default)]
    pub output: OutputMode,

    /// Key derivation parameters and secret material.
    #[serde(default)]
    pub kdf: KdfConfig,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            output: OutputMode::default(),
            kdf: KdfConfig::default(),
        }
    }
}

impl FingerprintConfig {
    /// Default configuration with a masking passphrase set.
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        FingerprintConfig {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            output: OutputMode::default(),
            kdf: KdfConfig::with_passphrase(passphrase),
        }
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FingerprintConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file with restricted permissions.
    ///
    /// On Unix, creates the file with 0600 permissions atomically since the
    /// KDF section may carry the passphrase.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(&path, &content)?;
        }

        Ok(())
    }
}
