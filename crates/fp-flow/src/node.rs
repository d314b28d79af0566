//! Flow definition tree: nodes, scalar values, and value tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the fingerprint pipeline must treat an attribute value.
///
/// "sensitive" and "encrypted" are orthogonal properties, so they are
/// modeled as one tagged variant per attribute instead of two booleans:
/// a value may be neither, either, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueTag {
    /// Emit the value verbatim in canonical form.
    #[default]
    Plain,
    /// Replace the value with its keyed one-way mask.
    Sensitive,
    /// Decrypt via the reversible-encryption service, then emit the
    /// plaintext in canonical form.
    Encrypted,
    /// Decrypt, then mask the plaintext.
    EncryptedSensitive,
}

impl ValueTag {
    /// Parse a tag from its wire name.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(ValueTag::Plain),
            "sensitive" => Some(ValueTag::Sensitive),
            "encrypted" => Some(ValueTag::Encrypted),
            "encrypted_sensitive" => Some(ValueTag::EncryptedSensitive),
            _ => None,
        }
    }

    /// Whether the value must never appear in plaintext in any output.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, ValueTag::Sensitive | ValueTag::EncryptedSensitive)
    }

    /// Whether the value is stored encrypted and needs the decrypt step.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ValueTag::Encrypted | ValueTag::EncryptedSensitive)
    }
}

impl std::fmt::Display for ValueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueTag::Plain => "plain",
            ValueTag::Sensitive => "sensitive",
            ValueTag::Encrypted => "encrypted",
            ValueTag::EncryptedSensitive => "encrypted_sensitive",
        };
        write!(f, "{}", s)
    }
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// UTF-8 text.
    Text(String),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Explicit null. Canonicalizes identically to an absent attribute.
    Null,
}

impl ScalarValue {
    /// Canonical textual form of the value.
    ///
    /// This is the exact text that gets masked for sensitive values, so it
    /// must be deterministic: integers in decimal, floats in Rust's
    /// shortest round-trip form, booleans as `true`/`false`.
    pub fn to_text(&self) -> String {
        match self {
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Integer(n) => n.to_string(),
            ScalarValue::Float(x) => x.to_string(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Null => String::new(),
        }
    }

    /// Short type label used in error messages and canonical tokens.
    pub fn type_label(&self) -> &'static str {
        match self {
            ScalarValue::Text(_) => "text",
            ScalarValue::Integer(_) => "integer",
            ScalarValue::Float(_) => "float",
            ScalarValue::Bool(_) => "boolean",
            ScalarValue::Null => "null",
        }
    }

    /// Whether this is the explicit null value.
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Integer(n)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

/// A tagged attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrValue {
    /// The scalar payload.
    pub value: ScalarValue,

    /// How the pipeline must treat it.
    #[serde(default)]
    pub tag: ValueTag,
}

impl AttrValue {
    /// A plain (untagged) value.
    pub fn plain(value: impl Into<ScalarValue>) -> Self {
        AttrValue {
            value: value.into(),
            tag: ValueTag::Plain,
        }
    }

    /// A sensitive value that must be masked.
    pub fn sensitive(value: impl Into<ScalarValue>) -> Self {
        AttrValue {
            value: value.into(),
            tag: ValueTag::Sensitive,
        }
    }

    /// An encrypted value that must be decrypted before emission.
    pub fn encrypted(ciphertext: impl Into<String>) -> Self {
        AttrValue {
            value: ScalarValue::Text(ciphertext.into()),
            tag: ValueTag::Encrypted,
        }
    }

    /// An encrypted value whose plaintext must additionally be masked.
    pub fn encrypted_sensitive(ciphertext: impl Into<String>) -> Self {
        AttrValue {
            value: ScalarValue::Text(ciphertext.into()),
            tag: ValueTag::EncryptedSensitive,
        }
    }
}

/// A named node in a flow definition tree.
///
/// Attribute iteration order is the lexical key order of the `BTreeMap`,
/// which the canonicalizer relies on. Child order is arrival order and
/// carries no meaning; the canonicalizer imposes its own total order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Node name (e.g. element or component type).
    pub name: String,

    /// Attribute name -> tagged value.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,

    /// Child nodes, in document arrival order.
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl FlowNode {
    /// Create an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        FlowNode {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Builder-style child insertion.
    pub fn with_child(mut self, child: FlowNode) -> Self {
        self.children.push(child);
        self
    }

    /// Total node count of the subtree rooted here, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(FlowNode::node_count).sum::<usize>()
    }
}
