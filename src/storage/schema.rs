//! SQL schema definitions as const strings.
//!
//! Mirrors the two hosted tables for the local SQLite store. Vectors are
//! stored as JSON text.

/// SQL to create the embeddings table.
///
/// `content` is the upsert key: a vocabulary token, the mean-vector marker
/// or a post label.
pub const CREATE_EMBEDDINGS: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    content TEXT PRIMARY KEY,
    embedding TEXT NOT NULL,
    post_id
)
"#;

/// SQL to create the posts table.
///
/// `id` is declared without a type so integer and text keys keep their
/// storage class.
pub const CREATE_POSTS: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id PRIMARY KEY NOT NULL,
    content TEXT,
    embedding TEXT,
    extra TEXT NOT NULL DEFAULT '{}'
)
"#;

/// SQL to index post-linked embedding rows.
pub const CREATE_EMBEDDINGS_POST_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_embeddings_post ON embeddings(post_id)
"#;

/// Returns all migrations in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![CREATE_EMBEDDINGS, CREATE_POSTS, CREATE_EMBEDDINGS_POST_INDEX]
}
