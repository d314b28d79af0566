//! Document adapter: JSON bytes -> [`FlowNode`] tree.
//!
//! The adapter accepts the JSON encoding of a flow definition:
//!
//! ```json
//! {
//!   "name": "processor",
//!   "attributes": {
//!     "url": "https://example.com",
//!     "password": { "value": "hunter2", "tag": "sensitive" }
//!   },
//!   "children": [ ... ]
//! }
//! ```
//!
//! A bare scalar attribute is shorthand for a plain value; the object form
//! carries an explicit tag. Malformed input is reported as a [`ParseError`]
//! with the path to the offending element, never as a partially-built tree.

use crate::node::{AttrValue, FlowNode, ScalarValue, ValueTag};
use thiserror::Error;

/// Errors produced by the document adapter.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The bytes are not valid JSON at all.
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is well-formed but does not describe a flow definition.
    #[error("invalid flow document at {path}: {reason}")]
    Structure {
        /// Path to the offending element (e.g. `children[2].attributes.password`).
        path: String,
        /// What was wrong there.
        reason: String,
    },
}

impl ParseError {
    fn structure(path: &str, reason: impl Into<String>) -> Self {
        ParseError::Structure {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse raw document bytes into a flow definition tree.
pub fn parse(bytes: &[u8]) -> Result<FlowNode, ParseError> {
    let doc: serde_json::Value = serde_json::from_slice(bytes)?;
    parse_node(&doc, "$")
}

fn parse_node(value: &serde_json::Value, path: &str) -> Result<FlowNode, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::structure(path, "node must be a JSON object"))?;

    for key in obj.keys() {
        if key != "name" && key != "attributes" && key != "children" {
            return Err(ParseError::structure(
                path,
                format!("unknown node field '{}'", key),
            ));
        }
    }

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ParseError::structure(path, "node is missing a string 'name'"))?;
    if name.is_empty() {
        return Err(ParseError::structure(path, "node name must not be empty"));
    }

    let mut node = FlowNode::new(name);

    if let Some(attrs) = obj.get("attributes") {
        let attrs = attrs.as_object().ok_or_else(|| {
            ParseError::structure(path, "'attributes' must be a JSON object")
        })?;
        for (attr_name, attr_value) in attrs {
            let attr_path = format!("{}.attributes.{}", path, attr_name);
            let parsed = parse_attr(attr_value, &attr_path)?;
            node.attributes.insert(attr_name.clone(), parsed);
        }
    }

    if let Some(children) = obj.get("children") {
        let children = children
            .as_array()
            .ok_or_else(|| ParseError::structure(path, "'children' must be a JSON array"))?;
        for (index, child) in children.iter().enumerate() {
            let child_path = format!("{}.children[{}]", path, index);
            node.children.push(parse_node(child, &child_path)?);
        }
    }

    Ok(node)
}

fn parse_attr(value: &serde_json::Value, path: &str) -> Result<AttrValue, ParseError> {
    // Object form: { "value": ..., "tag": "..." }
    if let Some(obj) = value.as_object() {
        for key in obj.keys() {
            if key != "value" && key != "tag" {
                return Err(ParseError::structure(
                    path,
                    format!("unknown attribute field '{}'", key),
                ));
            }
        }

        let scalar = obj
            .get("value")
            .ok_or_else(|| ParseError::structure(path, "tagged attribute is missing 'value'"))?;
        let scalar = parse_scalar(scalar, path)?;

        let tag = match obj.get("tag") {
            None => ValueTag::Plain,
            Some(serde_json::Value::String(s)) => ValueTag::parse_str(s).ok_or_else(|| {
                ParseError::structure(path, format!("unknown value tag '{}'", s))
            })?,
            Some(_) => return Err(ParseError::structure(path, "'tag' must be a string")),
        };

        if tag.is_encrypted() && !matches!(scalar, ScalarValue::Text(_)) {
            return Err(ParseError::structure(
                path,
                format!(
                    "encrypted attribute must hold ciphertext text, got {}",
                    scalar.type_label()
                ),
            ));
        }

        return Ok(AttrValue { value: scalar, tag });
    }

    // Shorthand: bare scalar means a plain value.
    Ok(AttrValue {
        value: parse_scalar(value, path)?,
        tag: ValueTag::Plain,
    })
}

fn parse_scalar(value: &serde_json::Value, path: &str) -> Result<ScalarValue, ParseError> {
    match value {
        serde_json::Value::String(s) => Ok(ScalarValue::Text(s.clone())),
        serde_json::Value::Bool(b) => Ok(ScalarValue::Bool(*b)),
        serde_json::Value::Null => Ok(ScalarValue::Null),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ScalarValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(ScalarValue::Float(f))
            } else {
                Err(ParseError::structure(
                    path,
                    format!("number {} is out of representable range", n),
                ))
            }
        }
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(ParseError::structure(
            path,
            "attribute values must be scalars",
        )),
    }
}
