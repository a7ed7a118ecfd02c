//! Serde helpers for the store's `embedding` column.
//!
//! The REST backend returns pgvector columns in their text form
//! (`"[0.1,0.2]"`) while JSON columns come back as arrays; both decode to
//! `Vec<f32>`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum VectorColumn {
    Values(Vec<f32>),
    Text(String),
}

/// Parses the textual vector form, e.g. `[1,0.5,-2]`.
pub fn parse_vector_text(text: &str) -> Result<Vec<f32>, serde_json::Error> {
    serde_json::from_str(text.trim())
}

/// Deserializes a nullable vector column.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<VectorColumn>::deserialize(deserializer)? {
        None => Ok(None),
        Some(VectorColumn::Values(values)) => Ok(Some(values)),
        Some(VectorColumn::Text(text)) => parse_vector_text(&text)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid vector text: {}", e))),
    }
}

/// Deserializes a nullable text column, mapping null to the empty string.
pub fn deserialize_text_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "deserialize_optional")]
        embedding: Option<Vec<f32>>,
    }

    #[test]
    fn accepts_array_form() {
        let row: Row = serde_json::from_str(r#"{"embedding": [1.0, 0.5]}"#).unwrap();
        assert_eq!(row.embedding, Some(vec![1.0, 0.5]));
    }

    #[test]
    fn accepts_text_form() {
        let row: Row = serde_json::from_str(r#"{"embedding": "[1,0.5]"}"#).unwrap();
        assert_eq!(row.embedding, Some(vec![1.0, 0.5]));
    }

    #[test]
    fn null_and_missing_are_none() {
        let row: Row = serde_json::from_str(r#"{"embedding": null}"#).unwrap();
        assert!(row.embedding.is_none());
        let row: Row = serde_json::from_str("{}").unwrap();
        assert!(row.embedding.is_none());
    }

    #[test]
    fn rejects_garbage_text() {
        let result: Result<Row, _> = serde_json::from_str(r#"{"embedding": "not a vector"}"#);
        assert!(result.is_err());
    }
}
