//! Post queries.
//!
//! Columns other than `id`, `content` and `embedding` live in the `extra`
//! JSON object.

use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Result, Row};
use serde_json::{Map, Value};

use super::{decode_vector, encode_vector};
use crate::domain::{Post, PostId};

const SELECT_POSTS: &str = "SELECT id, content, embedding, extra FROM posts";

/// Inserts a new post.
pub fn insert(conn: &Connection, post: &Post) -> Result<()> {
    let embedding = post.embedding.as_deref().map(encode_vector).transpose()?;
    let extra = serde_json::to_string(&post.extra)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    conn.execute(
        "INSERT INTO posts (id, content, embedding, extra) VALUES (?1, ?2, ?3, ?4)",
        params![post.id, post.content, embedding, extra],
    )?;
    Ok(())
}

/// Gets all posts in insertion order.
pub fn get_all(conn: &Connection) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY rowid", SELECT_POSTS))?;
    let posts = stmt.query_map([], map_row)?;
    posts.collect()
}

/// Gets the posts whose id is in `ids`, in insertion order.
///
/// Ids with no matching row are ignored.
pub fn get_by_ids(conn: &Connection, ids: &[PostId]) -> Result<Vec<Post>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "{} WHERE id IN ({}) ORDER BY rowid",
        SELECT_POSTS, placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt.query_map(params_from_iter(ids.iter()), map_row)?;
    posts.collect()
}

/// Sets a post's embedding. Returns the number of rows changed.
pub fn update_embedding(conn: &Connection, id: &PostId, embedding: &[f32]) -> Result<usize> {
    conn.execute(
        "UPDATE posts SET embedding = ?1 WHERE id = ?2",
        params![encode_vector(embedding)?, id],
    )
}

fn map_row(row: &Row<'_>) -> Result<Post> {
    let extra: String = row.get(3)?;
    let extra: Map<String, Value> = serde_json::from_str(&extra)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Post {
        id: row.get(0)?,
        content: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        embedding: decode_vector(2, row.get(2)?)?,
        extra,
    })
}
