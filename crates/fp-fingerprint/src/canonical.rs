//! Canonical serialization of flow definition trees.
//!
//! Two logically identical documents must canonicalize to byte-identical
//! streams no matter how their sources were formatted, and no two distinct
//! trees may share a stream. The encoding rules:
//!
//! - Every name, attribute key, and value token is length-prefixed
//!   (`<byte-len>:<bytes>`), and attribute/child lists carry explicit
//!   counts, so the framing is unambiguous.
//! - Attributes are emitted in lexical key order. Unknown or extension
//!   attributes are emitted like any other; dropping them would let two
//!   different documents share a fingerprint.
//! - Children are each canonicalized recursively and then ordered by the
//!   byte-wise order of their encodings, so sibling arrival order never
//!   matters. Byte-identical siblings are true duplicates.
//! - A null-valued attribute is omitted entirely: omitted and
//!   present-with-null canonicalize identically. Every non-null value is
//!   emitted as a type-prefixed token (`t`/`i`/`f`/`b`).
//! - Values tagged sensitive are replaced by their mask; values tagged
//!   encrypted are decrypted first (and then masked if also sensitive).
//!   A decrypt failure aborts the whole canonicalization.

use crate::error::{FingerprintError, Result};
use crate::mask::MaskingEncoder;
use fp_flow::{AttrValue, Decryptor, FlowNode, ScalarValue, ValueTag};

/// Current canonicalization rule version. Changes when the encoding or
/// ordering rules change, since that invalidates stored fingerprints.
pub const CANONICALIZATION_VERSION: &str = "1.0.0";

/// Serializes a flow tree into its canonical form.
pub struct Canonicalizer<'a> {
    encoder: &'a MaskingEncoder,
    decryptor: &'a dyn Decryptor,
}

impl<'a> Canonicalizer<'a> {
    /// Canonicalizer over a masking encoder and a decryption collaborator.
    pub fn new(encoder: &'a MaskingEncoder, decryptor: &'a dyn Decryptor) -> Self {
        Canonicalizer { encoder, decryptor }
    }

    /// Produce the canonical stream for the tree rooted at `root`.
    pub fn canonicalize(&self, root: &FlowNode) -> Result<String> {
        let mut out = String::new();
        self.write_node(root, &mut out)?;
        Ok(out)
    }

    fn write_node(&self, node: &FlowNode, out: &mut String) -> Result<()> {
        out.push('n');
        push_framed(out, &node.name);

        // BTreeMap iteration gives lexical key order. Null values are
        // resolved to None and skipped, so the count only covers emitted
        // attributes.
        let mut attrs: Vec<(&str, String)> = Vec::with_capacity(node.attributes.len());
        for (key, attr) in &node.attributes {
            if let Some(token) = self.value_token(key, attr)? {
                attrs.push((key, token));
            }
        }

        push_count(out, 'a', attrs.len());
        for (key, token) in attrs {
            push_framed(out, key);
            push_framed(out, &token);
        }

        // Children are ordered by their own canonical encodings, which is
        // a total order independent of arrival order.
        let mut encoded: Vec<String> = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let mut buf = String::new();
            self.write_node(child, &mut buf)?;
            encoded.push(buf);
        }
        encoded.sort_unstable();

        push_count(out, 'c', encoded.len());
        for child in encoded {
            out.push_str(&child);
        }

        Ok(())
    }

    /// Resolve an attribute to its canonical token, or `None` when the
    /// attribute canonicalizes to nothing (the null default policy).
    fn value_token(&self, name: &str, attr: &AttrValue) -> Result<Option<String>> {
        if attr.value.is_null() {
            return Ok(None);
        }

        match attr.tag {
            ValueTag::Plain => Ok(Some(scalar_token(&attr.value))),
            ValueTag::Sensitive => Ok(Some(self.encoder.mask(&attr.value.to_text()))),
            ValueTag::Encrypted => {
                let plaintext = self.decrypt_attr(name, attr)?;
                Ok(Some(text_token(&plaintext)))
            }
            ValueTag::EncryptedSensitive => {
                let plaintext = self.decrypt_attr(name, attr)?;
                Ok(Some(self.encoder.mask(&plaintext)))
            }
        }
    }

    fn decrypt_attr(&self, name: &str, attr: &AttrValue) -> Result<String> {
        let ciphertext = match &attr.value {
            ScalarValue::Text(s) => s,
            other => {
                return Err(FingerprintError::Canonicalization(format!(
                    "attribute '{}' is tagged encrypted but holds a {} value",
                    name,
                    other.type_label()
                )))
            }
        };

        self.decryptor
            .decrypt(ciphertext)
            .map_err(|e| FingerprintError::Decryption {
                attribute: name.to_string(),
                reason: e.to_string(),
            })
    }
}

fn push_framed(out: &mut String, s: &str) {
    out.push_str(&s.len().to_string());
    out.push(':');
    out.push_str(s);
}

fn push_count(out: &mut String, marker: char, count: usize) {
    out.push(marker);
    out.push_str(&count.to_string());
    out.push(':');
}

fn scalar_token(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Text(s) => text_token(s),
        ScalarValue::Integer(n) => format!("i{}", n),
        ScalarValue::Float(x) => format!("f{}", x),
        ScalarValue::Bool(b) => format!("b{}", b),
        // Nulls are filtered out before tokenization.
        ScalarValue::Null => String::new(),
    }
}

fn text_token(s: &str) -> String {
    format!("t{}", s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_flow::{DecryptError, NoDecryption};

    fn canon(root: &FlowNode) -> String {
        let encoder = MaskingEncoder::from_raw_key([3u8; 32]);
        Canonicalizer::new(&encoder, &NoDecryption)
            .canonicalize(root)
            .unwrap()
    }

    /// Test double for the reversible-encryption collaborator: ciphertext
    /// is `enc:<plaintext>`, anything else fails as corrupted.
    struct PrefixDecryptor;

    impl Decryptor for PrefixDecryptor {
        fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, DecryptError> {
            ciphertext
                .strip_prefix("enc:")
                .map(str::to_string)
                .ok_or_else(|| DecryptError::Corrupted("missing enc: prefix".into()))
        }
    }

    #[test]
    fn test_attribute_order_is_lexical() {
        let a = FlowNode::new("n")
            .with_attr("b", AttrValue::plain(2i64))
            .with_attr("a", AttrValue::plain(1i64));
        let b = FlowNode::new("n")
            .with_attr("a", AttrValue::plain(1i64))
            .with_attr("b", AttrValue::plain(2i64));
        assert_eq!(canon(&a), canon(&b));
    }

    #[test]
    fn test_child_arrival_order_is_irrelevant() {
        let first = FlowNode::new("root")
            .with_child(FlowNode::new("alpha"))
            .with_child(FlowNode::new("beta"));
        let second = FlowNode::new("root")
            .with_child(FlowNode::new("beta"))
            .with_child(FlowNode::new("alpha"));
        assert_eq!(canon(&first), canon(&second));
    }

    #[test]
    fn test_framing_prevents_boundary_collisions() {
        // "ab"+"c" vs "a"+"bc" must not share an encoding.
        let a = FlowNode::new("n")
            .with_attr("x", AttrValue::plain("ab"))
            .with_attr("y", AttrValue::plain("c"));
        let b = FlowNode::new("n")
            .with_attr("x", AttrValue::plain("a"))
            .with_attr("y", AttrValue::plain("bc"));
        assert_ne!(canon(&a), canon(&b));
    }

    #[test]
    fn test_value_types_are_distinguished() {
        let text = FlowNode::new("n").with_attr("v", AttrValue::plain("1"));
        let int = FlowNode::new("n").with_attr("v", AttrValue::plain(1i64));
        assert_ne!(canon(&text), canon(&int));
    }

    #[test]
    fn test_null_equals_absent() {
        let with_null =
            FlowNode::new("n").with_attr("opt", AttrValue::plain(ScalarValue::Null));
        let absent = FlowNode::new("n");
        assert_eq!(canon(&with_null), canon(&absent));
    }

    #[test]
    fn test_nesting_is_not_flattened() {
        // root(a(b)) vs root(a, b): same names, different shapes.
        let nested = FlowNode::new("root")
            .with_child(FlowNode::new("a").with_child(FlowNode::new("b")));
        let flat = FlowNode::new("root")
            .with_child(FlowNode::new("a"))
            .with_child(FlowNode::new("b"));
        assert_ne!(canon(&nested), canon(&flat));
    }

    #[test]
    fn test_sensitive_value_is_masked() {
        let tree = FlowNode::new("n").with_attr("password", AttrValue::sensitive("hunter2"));
        let stream = canon(&tree);
        assert!(!stream.contains("hunter2"));
        assert!(stream.contains("[MASKED] ("));
    }

    #[test]
    fn test_sensitive_plaintext_change_changes_stream() {
        let a = FlowNode::new("n").with_attr("password", AttrValue::sensitive("one"));
        let b = FlowNode::new("n").with_attr("password", AttrValue::sensitive("two"));
        assert_ne!(canon(&a), canon(&b));
    }

    #[test]
    fn test_encrypted_value_is_decrypted_into_stream() {
        let encoder = MaskingEncoder::from_raw_key([3u8; 32]);
        let canonicalizer = Canonicalizer::new(&encoder, &PrefixDecryptor);

        let tree = FlowNode::new("n").with_attr("url", AttrValue::encrypted("enc:https://x"));
        let stream = canonicalizer.canonicalize(&tree).unwrap();
        assert!(stream.contains("https://x"));
        assert!(!stream.contains("enc:"));
    }

    #[test]
    fn test_encrypted_sensitive_is_decrypted_then_masked() {
        let encoder = MaskingEncoder::from_raw_key([3u8; 32]);
        let canonicalizer = Canonicalizer::new(&encoder, &PrefixDecryptor);

        let tree = FlowNode::new("n")
            .with_attr("password", AttrValue::encrypted_sensitive("enc:hunter2"));
        let stream = canonicalizer.canonicalize(&tree).unwrap();
        assert!(!stream.contains("hunter2"));
        assert!(!stream.contains("enc:"));
        assert!(stream.contains("[MASKED] ("));

        // The mask must match a directly-sensitive value with the same
        // plaintext: the chain ends at the same keyed digest.
        let direct = FlowNode::new("n").with_attr("password", AttrValue::sensitive("hunter2"));
        let direct_stream = canonicalizer.canonicalize(&direct).unwrap();
        assert_eq!(stream, direct_stream);
    }

    #[test]
    fn test_decrypt_failure_aborts() {
        let encoder = MaskingEncoder::from_raw_key([3u8; 32]);
        let canonicalizer = Canonicalizer::new(&encoder, &PrefixDecryptor);

        let tree = FlowNode::new("n").with_attr("token", AttrValue::encrypted("garbage"));
        let err = canonicalizer.canonicalize(&tree).unwrap_err();
        match err {
            FingerprintError::Decryption { attribute, .. } => assert_eq!(attribute, "token"),
            other => panic!("expected decryption error, got {other}"),
        }
    }

    #[test]
    fn test_encrypted_non_text_is_invariant_error() {
        let tree = FlowNode::new("n").with_attr(
            "k",
            AttrValue {
                value: ScalarValue::Integer(5),
                tag: ValueTag::Encrypted,
            },
        );
        let encoder = MaskingEncoder::from_raw_key([3u8; 32]);
        let err = Canonicalizer::new(&encoder, &PrefixDecryptor)
            .canonicalize(&tree)
            .unwrap_err();
        assert!(matches!(err, FingerprintError::Canonicalization(_)));
    }

    #[test]
    fn test_deterministic_across_calls() {
        let tree = FlowNode::new("root")
            .with_attr("a", AttrValue::plain("x"))
            .with_child(FlowNode::new("child").with_attr("p", AttrValue::sensitive("s")));
        assert_eq!(canon(&tree), canon(&tree));
    }
}
