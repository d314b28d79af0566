//! Fingerprint generation over flow definition documents.
//!
//! The [`Fingerprinter`] is the sole public entry point for callers that
//! need flow comparison or versioning: raw document bytes in, printable
//! fingerprint out. Parsing is delegated to the document adapter, masking
//! and decryption happen inside canonicalization, and the key derivation
//! cost is paid at construction (warming the cache), not per call.

use crate::canonical::Canonicalizer;
use crate::config::{FingerprintConfig, OutputMode};
use crate::error::Result;
use crate::key::KeyCache;
use crate::mask::MaskingEncoder;
use fp_flow::{Decryptor, FlowNode, NoDecryption};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Produces deterministic, secret-free fingerprints of flow definitions.
pub struct Fingerprinter {
    config: FingerprintConfig,
    encoder: MaskingEncoder,
    decryptor: Arc<dyn Decryptor>,
}

impl Fingerprinter {
    /// Fingerprinter backed by the process-wide key cache.
    ///
    /// The first construction in the process pays the one-time key
    /// derivation cost; construction fails if derivation fails, and that
    /// failure is permanent for the process.
    pub fn new(config: FingerprintConfig, decryptor: Arc<dyn Decryptor>) -> Result<Self> {
        Self::with_cache(config, KeyCache::global(), decryptor)
    }

    /// Fingerprinter for documents that contain no encrypted values.
    pub fn without_decryption(config: FingerprintConfig) -> Result<Self> {
        Self::new(config, Arc::new(NoDecryption))
    }

    /// Fingerprinter over an explicit key cache. Lets tests and embedders
    /// scope the derived key instead of sharing the process-wide slot.
    pub fn with_cache(
        config: FingerprintConfig,
        cache: &KeyCache,
        decryptor: Arc<dyn Decryptor>,
    ) -> Result<Self> {
        let encoder = MaskingEncoder::from_cache(cache, &config.kdf)?;
        Ok(Fingerprinter {
            config,
            encoder,
            decryptor,
        })
    }

    /// Fingerprinter over an already-built masking encoder.
    pub fn with_encoder(
        config: FingerprintConfig,
        encoder: MaskingEncoder,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Fingerprinter {
            config,
            encoder,
            decryptor,
        }
    }

    /// Compute the fingerprint of a raw flow definition document.
    pub fn create_fingerprint(&self, raw: &[u8]) -> Result<String> {
        let tree = fp_flow::parse(raw)?;
        self.fingerprint_node(&tree)
    }

    /// Compute the fingerprint of an already-parsed tree.
    pub fn fingerprint_node(&self, root: &FlowNode) -> Result<String> {
        let canonical =
            Canonicalizer::new(&self.encoder, self.decryptor.as_ref()).canonicalize(root)?;
        debug!(
            nodes = root.node_count(),
            canonical_bytes = canonical.len(),
            output = %self.config.output,
            "Canonical stream assembled"
        );

        Ok(match self.config.output {
            OutputMode::Canonical => canonical,
            OutputMode::Digest => hex::encode(Sha256::digest(canonical.as_bytes())),
        })
    }

    /// Whether two raw documents describe the same logical flow.
    pub fn matches(&self, a: &[u8], b: &[u8]) -> Result<bool> {
        Ok(self.create_fingerprint(a)? == self.create_fingerprint(b)?)
    }

    /// The configured output mode.
    pub fn output_mode(&self) -> OutputMode {
        self.config.output
    }
}
