//! Similarity search over stored post embeddings.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::domain::{Post, PostId};
use crate::embedding::{rank, DocumentEmbedder, EmbeddingTable};
use crate::storage::StoreGateway;

/// A post ranked against a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// The full post row.
    #[serde(flatten)]
    pub post: Post,
    /// Cosine similarity to the query.
    pub similarity_score: f64,
}

/// What the query tool prints: the hits, or an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    Hits(Vec<SearchHit>),
    Failure { error: String },
}

impl SearchOutcome {
    /// Builds a failure outcome.
    pub fn failure(message: impl fmt::Display) -> Self {
        Self::Failure {
            error: message.to_string(),
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Hits(_) => 0,
            Self::Failure { .. } => 1,
        }
    }

    /// Renders the outcome as a single JSON value.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Result<Vec<SearchHit>>> for SearchOutcome {
    fn from(result: Result<Vec<SearchHit>>) -> Self {
        match result {
            Ok(hits) => Self::Hits(hits),
            Err(e) => Self::failure(format!("{:#}", e)),
        }
    }
}

/// Ranks stored posts against free-text queries.
pub struct SearchService {
    store: Arc<dyn StoreGateway>,
    table: Arc<EmbeddingTable>,
}

impl SearchService {
    /// Creates a new search service.
    pub fn new(store: Arc<dyn StoreGateway>, table: Arc<EmbeddingTable>) -> Self {
        Self { store, table }
    }

    /// Returns up to `limit` posts most similar to `query`, best first.
    ///
    /// Only post-linked embedding rows are candidates. Winners whose post
    /// no longer exists are dropped. An empty store yields no hits.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
        let embedder = DocumentEmbedder::new(&self.table);
        let query_vector = embedder.embed_text(query);

        let rows = self.store.fetch_candidate_embeddings().await?;
        let mut seen = HashSet::new();
        let candidates = rows
            .iter()
            .filter_map(|row| row.candidate())
            .filter(|(id, _)| seen.insert(*id));
        let winners = rank(query_vector.as_ref(), candidates, limit);

        tracing::debug!(rows = rows.len(), winners = winners.len(), "Ranked candidates");
        if winners.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<PostId> = winners.iter().map(|w| w.id.clone()).collect();
        let mut posts: HashMap<PostId, Post> = self
            .store
            .fetch_posts_by_ids(&ids)
            .await?
            .into_iter()
            .map(|post| (post.id.clone(), post))
            .collect();

        let hits: Vec<SearchHit> = winners
            .into_iter()
            .filter_map(|winner| {
                let post = posts.remove(winner.id);
                if post.is_none() {
                    tracing::warn!(id = %winner.id, "Ranked post no longer exists");
                }
                post.map(|post| SearchHit {
                    post,
                    similarity_score: f64::from(winner.score),
                })
            })
            .collect();

        tracing::info!(query, hits = hits.len(), "Search finished");
        Ok(hits)
    }
}
