//! Comment tree reconstruction
//!
//! Extraction produces comments either as a flat map (id to parent and
//! ordered child ids) or as nested payload objects. Both end up in a
//! `FlatCommentMap` and go through the single `CommentTreeBuilder`.

mod builder;
mod payload;

use thiserror::Error;

pub use builder::{CommentNode, CommentTreeBuilder, DepthFirst, FlatComment, FlatCommentMap};
pub use payload::{build_from_payload, flatten_payload, parse_payload_entry, CommentPayload};

/// A comment entry that could not be read as a structured object
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("comment payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("comment payload has unsupported type {0}")]
    UnsupportedType(&'static str),

    #[error("comment payload has no id")]
    MissingId,
}
