//! Flow definition tree model for Flowprint.
//!
//! A flow definition is a tree of named nodes. Each node carries a map of
//! attributes, and each attribute value is tagged with how the fingerprint
//! pipeline must treat it: emitted as-is, masked, or decrypted first.
//!
//! This crate holds the data model and the two collaborator contracts the
//! pipeline consumes:
//!
//! - [`parse`]: the document adapter that turns raw JSON bytes into a
//!   [`FlowNode`] tree, reporting malformed input as a distinct
//!   [`ParseError`] rather than a corrupted tree.
//! - [`Decryptor`]: the reversible-encryption service used for values
//!   stored encrypted at rest. Only `decrypt` is consumed here.

pub mod decrypt;
pub mod node;
pub mod parse;

pub use decrypt::{DecryptError, Decryptor, NoDecryption};
pub use node::{AttrValue, FlowNode, ScalarValue, ValueTag};
pub use parse::{parse, ParseError};
