//! Identifier types for stored entities.
//!
//! The hosted store hands out either integer or text primary keys, so the
//! post identifier keeps whichever shape it arrived in and serializes back
//! the same way.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a post (document) row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    /// Integer primary key.
    Number(i64),
    /// Text primary key (slug, uuid, ...).
    Text(String),
}

impl PostId {
    /// Renders the id as a PostgREST filter literal.
    ///
    /// Text ids are double-quoted so that commas and parentheses inside an
    /// `in.(...)` list are not read as separators.
    pub fn filter_literal(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => {
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            }
        }
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for PostId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}
