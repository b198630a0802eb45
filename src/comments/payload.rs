//! Canonical nested comment payload
//!
//! Extraction files carry each post's comments as nested objects with a
//! `replies` list. Older files stored each comment as a JSON-encoded string
//! instead; those get exactly one fallback parse and are dropped otherwise.

use super::builder::{CommentNode, CommentTreeBuilder, FlatComment, FlatCommentMap};
use super::PayloadError;
use crate::records::raw::{lenient_f64, lenient_i64, lenient_string, null_as_empty};
use crate::records::CommentData;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One comment with its nested replies, as written to extraction files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score_dislikes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score_unvoted: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score_likes: Option<i64>,
    /// Replies stay untyped so one malformed reply cannot fail its parent
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replies: Vec<Value>,
}

impl CommentPayload {
    /// Serializes a built subtree back into the nested file shape
    pub fn from_node(node: &CommentNode) -> Result<Self, serde_json::Error> {
        let replies = node
            .children
            .iter()
            .map(|child| CommentPayload::from_node(child).and_then(serde_json::to_value))
            .collect::<Result<Vec<_>, _>>()?;

        let data = &node.comment.data;
        Ok(Self {
            id: Some(data.id.clone()),
            author: Some(data.author.clone()),
            created: Some(data.created.clone()),
            created_utc: data.created_utc,
            body_text: Some(data.body_text.clone()),
            score_dislikes: data.score_dislikes,
            score_unvoted: data.score_unvoted,
            score_likes: data.score_likes,
            replies,
        })
    }

    fn into_parts(self) -> Result<(CommentData, Vec<Value>), PayloadError> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(PayloadError::MissingId)?;

        let data = CommentData {
            id,
            author: self.author.unwrap_or_default(),
            created: self.created.unwrap_or_default(),
            created_utc: self.created_utc,
            body_text: self.body_text.unwrap_or_default(),
            score_dislikes: self.score_dislikes,
            score_unvoted: self.score_unvoted,
            score_likes: self.score_likes,
        };

        Ok((data, self.replies))
    }
}

/// Reads one comment entry
///
/// Objects are parsed directly. A string is given a single fallback parse
/// as encoded JSON. Anything else is malformed.
pub fn parse_payload_entry(value: &Value) -> Result<CommentPayload, PayloadError> {
    match value {
        Value::Object(_) => Ok(CommentPayload::deserialize(value)?),
        Value::String(encoded) => Ok(serde_json::from_str(encoded)?),
        Value::Null => Err(PayloadError::UnsupportedType("null")),
        Value::Array(_) => Err(PayloadError::UnsupportedType("array")),
        Value::Number(_) => Err(PayloadError::UnsupportedType("number")),
        Value::Bool(_) => Err(PayloadError::UnsupportedType("bool")),
    }
}

/// Flattens a post's nested comment payloads into a `FlatCommentMap`
///
/// A malformed entry is dropped together with its replies; siblings and the
/// rest of the post are unaffected.
pub fn flatten_payload(entries: &[Value], post_id: &str) -> FlatCommentMap {
    let mut map = FlatCommentMap::new();
    for entry in entries {
        flatten_entry(entry, None, &mut map, post_id);
    }
    map
}

/// Flattens and builds in one step
pub fn build_from_payload(entries: &[Value], post_id: &str) -> Vec<CommentNode> {
    let flat = flatten_payload(entries, post_id);
    CommentTreeBuilder::build(&flat, post_id)
}

fn flatten_entry(
    value: &Value,
    parent: Option<&str>,
    map: &mut FlatCommentMap,
    post_id: &str,
) -> Option<String> {
    let parsed = parse_payload_entry(value).and_then(CommentPayload::into_parts);
    let (data, replies) = match parsed {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(
                "Post {}: dropping comment under {}: {}",
                post_id,
                parent.unwrap_or("post"),
                e
            );
            return None;
        }
    };

    let id = data.id.clone();
    if !map.insert(FlatComment::new(data, parent.map(str::to_string), Vec::new())) {
        tracing::warn!("Post {}: duplicate comment {} ignored", post_id, id);
        return None;
    }

    for reply in &replies {
        if let Some(child_id) = flatten_entry(reply, Some(id.as_str()), map, post_id) {
            if let Some(entry) = map.get_mut(&id) {
                entry.child_ids.push(child_id);
            }
        }
    }

    Some(id)
}
