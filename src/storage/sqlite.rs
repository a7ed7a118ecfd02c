//! Local SQLite implementation of the store gateway.

use async_trait::async_trait;

use super::database::Database;
use super::queries::{embeddings, posts};
use super::{StoreError, StoreGateway, StoreResult};
use crate::domain::{EmbeddingRecord, Post, PostId, StoredEmbedding};

/// Store gateway backed by a local SQLite database.
///
/// Used for offline runs and tests. Vectors are stored as JSON text.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wraps an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens (or creates) a database file.
    pub async fn open(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Opens a fresh in-memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// Inserts posts. The hosted store owns its posts; locally they are
    /// seeded through here.
    pub async fn insert_posts(&self, new_posts: Vec<Post>) -> StoreResult<()> {
        self.db
            .transaction(move |tx| {
                for post in &new_posts {
                    posts::insert(tx, post)?;
                }
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StoreGateway for SqliteStore {
    async fn upsert_embeddings(&self, records: &[EmbeddingRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let records = records.to_vec();
        self.db
            .transaction(move |tx| Ok(embeddings::upsert_many(tx, &records)?))
            .await?;
        Ok(())
    }

    async fn fetch_embeddings(&self) -> StoreResult<Vec<StoredEmbedding>> {
        Ok(self
            .db
            .with_conn(|conn| Ok(embeddings::get_all(conn)?))
            .await?)
    }

    async fn fetch_candidate_embeddings(&self) -> StoreResult<Vec<StoredEmbedding>> {
        Ok(self
            .db
            .with_conn(|conn| Ok(embeddings::get_candidates(conn)?))
            .await?)
    }

    async fn fetch_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.db.with_conn(|conn| Ok(posts::get_all(conn)?)).await?)
    }

    async fn fetch_posts_by_ids(&self, ids: &[PostId]) -> StoreResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        Ok(self
            .db
            .with_conn(move |conn| Ok(posts::get_by_ids(conn, &ids)?))
            .await?)
    }

    async fn update_post_embedding(&self, id: &PostId, embedding: &[f32]) -> StoreResult<()> {
        let key = id.clone();
        let embedding = embedding.to_vec();
        let changed = self
            .db
            .with_conn(move |conn| Ok(posts::update_embedding(conn, &key, &embedding)?))
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
