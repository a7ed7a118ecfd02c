//! Post (document) rows as stored in the `posts` table.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::PostId;
use super::vector;

/// A blog post row.
///
/// Only `content` is read and only `embedding` is written by the pipeline;
/// every other column is carried through untouched in `extra` so search
/// results echo the full row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Primary key.
    pub id: PostId,
    /// Post body text.
    #[serde(default, deserialize_with = "vector::deserialize_text_or_null")]
    pub content: String,
    /// Document embedding, absent until the pipeline has populated it.
    #[serde(default, deserialize_with = "vector::deserialize_optional")]
    pub embedding: Option<Vec<f32>>,
    /// Remaining columns (title, slug, timestamps, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    /// Creates a post with no embedding and no extra columns.
    pub fn new(id: impl Into<PostId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding: None,
            extra: Map::new(),
        }
    }
}
