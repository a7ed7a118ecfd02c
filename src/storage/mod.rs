//! Store gateway and local storage.
//!
//! This module provides the storage layer for postvec:
//!
//! - [`StoreGateway`]: async access to the `embeddings` and `posts` tables
//! - [`RestStore`]: the hosted backend over HTTP
//! - [`SqliteStore`]: a local SQLite database for offline runs and tests
//! - Async-safe database operations via tokio::task::spawn_blocking

mod database;
pub mod queries;
mod rest;
mod schema;
mod sqlite;

pub use database::{Database, DatabaseError, Result};
pub use rest::{RestStore, EMBEDDINGS_TABLE, POSTS_TABLE};
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreSettings;
use crate::domain::{EmbeddingRecord, Post, PostId, StoredEmbedding};

/// URL scheme prefix selecting the local SQLite store.
pub const SQLITE_URL_PREFIX: &str = "sqlite:";

/// Errors from store gateway operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Service key is not a valid header value")]
    InvalidKey,

    #[error("Post not found: {0}")]
    NotFound(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Access to the two store tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Inserts or overwrites embedding rows keyed by `content`.
    async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> StoreResult<()>;

    /// Reads the whole embeddings table.
    async fn fetch_embeddings(&self) -> StoreResult<Vec<StoredEmbedding>>;

    /// Reads only the post-linked rows that carry a vector. The mean row
    /// and vocabulary rows are skipped by the store.
    async fn fetch_candidate_embeddings(&self) -> StoreResult<Vec<StoredEmbedding>>;

    /// Reads every post.
    async fn fetch_posts(&self) -> StoreResult<Vec<Post>>;

    /// Reads the posts with the given ids. Unknown ids are ignored.
    async fn fetch_posts_by_ids(&self, ids: &[PostId]) -> StoreResult<Vec<Post>>;

    /// Writes a post's embedding.
    async fn update_post_embedding(&self, id: &PostId, embedding: &[f32]) -> StoreResult<()>;
}

/// Opens the gateway named by the store settings.
///
/// `sqlite::memory:` opens an in-memory database, `sqlite:<path>` a file;
/// anything else is treated as the hosted backend's base URL.
pub async fn open_gateway(settings: &StoreSettings) -> StoreResult<Arc<dyn StoreGateway>> {
    match settings.url.strip_prefix(SQLITE_URL_PREFIX) {
        Some(":memory:") => {
            tracing::info!("Using in-memory SQLite store");
            Ok(Arc::new(SqliteStore::in_memory().await?))
        }
        Some(path) => {
            let path = path.strip_prefix("//").unwrap_or(path);
            tracing::info!(path, "Using SQLite store");
            Ok(Arc::new(SqliteStore::open(path).await?))
        }
        None => {
            tracing::info!(url = %settings.url, "Using hosted store");
            Ok(Arc::new(RestStore::new(
                &settings.url,
                &settings.service_key,
            )?))
        }
    }
}
