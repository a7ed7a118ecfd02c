//! Rows of the `embeddings` table.

use serde::{Deserialize, Serialize};

use super::types::PostId;
use super::vector;

/// Content label of the row holding the table-wide mean vector.
pub const MEAN_EMBEDDING_LABEL: &str = "<MEAN_EMBEDDING>";

/// Prefix of content labels for rows that mirror a post's embedding.
pub const POST_LABEL_PREFIX: &str = "post:";

/// A row written to the `embeddings` table, keyed by `content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRecord {
    /// Upsert key: a vocabulary token, the mean marker, or a post label.
    pub content: String,
    /// Vector stored under the label.
    pub embedding: Vec<f32>,
    /// Owning post, for post-linked rows only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
}

impl EmbeddingRecord {
    /// Row for a single vocabulary token.
    pub fn token(token: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: token.into(),
            embedding,
            post_id: None,
        }
    }

    /// The reserved mean-vector row.
    pub fn mean(embedding: Vec<f32>) -> Self {
        Self::token(MEAN_EMBEDDING_LABEL, embedding)
    }

    /// Row mirroring a post's document embedding.
    pub fn post(post_id: PostId, embedding: Vec<f32>) -> Self {
        Self {
            content: format!("{}{}", POST_LABEL_PREFIX, post_id),
            embedding,
            post_id: Some(post_id),
        }
    }
}

/// A row read back from the `embeddings` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredEmbedding {
    /// Row label.
    pub content: String,
    /// Stored vector; rows with a null vector are kept but never ranked.
    #[serde(default, deserialize_with = "vector::deserialize_optional")]
    pub embedding: Option<Vec<f32>>,
    /// Owning post, if the row is post-linked.
    #[serde(default)]
    pub post_id: Option<PostId>,
}

impl StoredEmbedding {
    /// Returns whether this is the reserved mean-vector row.
    pub fn is_mean(&self) -> bool {
        self.content == MEAN_EMBEDDING_LABEL
    }

    /// Returns the post id and vector when the row is a search candidate.
    ///
    /// Vocabulary rows, the mean row and rows without a vector are not.
    pub fn candidate(&self) -> Option<(&PostId, &[f32])> {
        if self.is_mean() {
            return None;
        }
        match (&self.post_id, &self.embedding) {
            (Some(id), Some(values)) => Some((id, values.as_slice())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_record_serializes_without_post_id() {
        let record = EmbeddingRecord::token("sun", vec![1.0, 2.0]);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"content": "sun", "embedding": [1.0, 2.0]}));
    }

    #[test]
    fn post_record_label() {
        let record = EmbeddingRecord::post(PostId::from(9), vec![0.0]);
        assert_eq!(record.content, "post:9");
        assert_eq!(record.post_id, Some(PostId::Number(9)));
    }

    #[test]
    fn mean_row_is_never_a_candidate() {
        let row: StoredEmbedding = serde_json::from_value(json!({
            "content": MEAN_EMBEDDING_LABEL,
            "embedding": [0.5, 0.5],
            "post_id": 1
        }))
        .unwrap();
        assert!(row.is_mean());
        assert!(row.candidate().is_none());
    }

    #[test]
    fn vocabulary_row_is_not_a_candidate() {
        let row: StoredEmbedding =
            serde_json::from_value(json!({"id": 4, "content": "sun", "embedding": "[1,0]"}))
                .unwrap();
        assert!(row.candidate().is_none());
    }

    #[test]
    fn post_row_is_a_candidate() {
        let row: StoredEmbedding = serde_json::from_value(json!({
            "content": "post:3",
            "embedding": [1.0, 0.0],
            "post_id": 3
        }))
        .unwrap();
        let (id, values) = row.candidate().unwrap();
        assert_eq!(id, &PostId::Number(3));
        assert_eq!(values, &[1.0, 0.0]);
    }
}
