//! Database query modules for CRUD operations.
//!
//! Each module provides plain functions over a `rusqlite::Connection`;
//! callers run them through `Database::with_conn` or `Database::transaction`.

pub mod embeddings;
pub mod posts;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};

use crate::domain::vector::parse_vector_text;
use crate::domain::PostId;

impl ToSql for PostId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            PostId::Number(n) => Ok(ToSqlOutput::from(*n)),
            PostId::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

impl FromSql for PostId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(n) => Ok(PostId::Number(n)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| PostId::Text(s.to_owned()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Encodes a vector as JSON text for storage.
pub(crate) fn encode_vector(values: &[f32]) -> rusqlite::Result<String> {
    serde_json::to_string(values).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Decodes a nullable JSON-text vector column.
pub(crate) fn decode_vector(column: usize, text: Option<String>) -> rusqlite::Result<Option<Vec<f32>>> {
    text.map(|text| {
        parse_vector_text(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
    })
    .transpose()
}
