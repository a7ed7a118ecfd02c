//! Bulk upsert pipeline.
//!
//! The [`UploadService`] pushes the vocabulary, the mean vector and every
//! post's document embedding into the store. All writes are upserts or
//! keyed updates, so a run can be repeated or resumed safely.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::UploadSettings;
use crate::domain::{EmbeddingRecord, PostId};
use crate::embedding::{tokenize, DocumentEmbedder, EmbeddingTable};
use crate::storage::StoreGateway;

/// Where a vocabulary export begins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ExportStart {
    /// Export every entry.
    #[default]
    Beginning,
    /// Skip this many entries (in vocabulary order).
    Offset(usize),
    /// Skip this fraction of the entries, rounded down. Must be in `[0, 1)`.
    Fraction(f64),
}

impl ExportStart {
    /// Resolves the number of entries to skip out of `total`.
    pub fn resolve(&self, total: usize) -> Result<usize> {
        match *self {
            Self::Beginning => Ok(0),
            Self::Offset(offset) => Ok(offset.min(total)),
            Self::Fraction(fraction) => {
                if !(0.0..1.0).contains(&fraction) {
                    bail!("skip fraction must be in [0, 1), got {}", fraction);
                }
                Ok((total as f64 * fraction).floor() as usize)
            }
        }
    }
}

/// Options for a vocabulary export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Rows per upsert request.
    pub batch_size: usize,
    /// Pause between batches.
    pub pause: Duration,
    /// First entry to export.
    pub start: ExportStart,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&UploadSettings::default())
    }
}

impl From<&UploadSettings> for ExportOptions {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            pause: Duration::from_millis(settings.pause_ms),
            start: ExportStart::Beginning,
        }
    }
}

/// Result of a vocabulary export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Entries in the table.
    pub total: usize,
    /// Entries skipped before the start point.
    pub skipped: usize,
    /// Entries written successfully.
    pub uploaded: usize,
    /// Batches whose upsert failed.
    pub failed_batches: usize,
    /// Vocabulary position of the first row of the first failed batch.
    pub first_failed_row: Option<usize>,
    /// Errors encountered (non-fatal).
    pub errors: Vec<String>,
}

impl ExportReport {
    /// Returns true if every batch was written.
    pub fn is_success(&self) -> bool {
        self.failed_batches == 0
    }
}

/// Result of populating post embeddings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulateReport {
    /// Posts written successfully.
    pub succeeded: usize,
    /// Posts that failed, with the error message.
    pub failed: Vec<(PostId, String)>,
}

impl PopulateReport {
    /// Returns true if every post was written.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes embeddings into the store.
pub struct UploadService {
    store: Arc<dyn StoreGateway>,
    table: Arc<EmbeddingTable>,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(store: Arc<dyn StoreGateway>, table: Arc<EmbeddingTable>) -> Self {
        Self { store, table }
    }

    /// Upserts vocabulary entries in index order, in paced batches.
    ///
    /// A failed batch is logged and recorded; the export carries on with
    /// the next one.
    pub async fn export_vocabulary(&self, options: &ExportOptions) -> Result<ExportReport> {
        if options.batch_size == 0 {
            bail!("batch size must be at least 1");
        }

        let entries = self.table.entries();
        let total = entries.len();
        let skipped = options.start.resolve(total)?;
        let mut report = ExportReport {
            total,
            skipped,
            ..Default::default()
        };

        tracing::info!(
            total,
            skipped,
            batch_size = options.batch_size,
            "Exporting vocabulary"
        );

        let batches: Vec<_> = entries[skipped..].chunks(options.batch_size).collect();
        let batch_count = batches.len();

        for (number, batch) in batches.into_iter().enumerate() {
            let first_row = skipped + number * options.batch_size;
            let records: Vec<EmbeddingRecord> = batch
                .iter()
                .map(|entry| EmbeddingRecord::token(entry.token, entry.vector.to_vec()))
                .collect();

            match self.store.upsert_embeddings(&records).await {
                Ok(()) => {
                    report.uploaded += records.len();
                    tracing::debug!(batch = number + 1, of = batch_count, first_row, "Batch written");
                }
                Err(e) => {
                    tracing::warn!(batch = number + 1, first_row, error = %e, "Batch failed");
                    report.failed_batches += 1;
                    if report.first_failed_row.is_none() {
                        report.first_failed_row = Some(first_row);
                    }
                    report.errors.push(format!(
                        "rows {}..{}: {}",
                        first_row,
                        first_row + records.len(),
                        e
                    ));
                }
            }

            if number + 1 < batch_count && !options.pause.is_zero() {
                tokio::time::sleep(options.pause).await;
            }
        }

        tracing::info!(
            uploaded = report.uploaded,
            failed_batches = report.failed_batches,
            "Vocabulary export finished"
        );
        Ok(report)
    }

    /// Upserts the reserved mean-vector row.
    pub async fn upsert_mean_embedding(&self) -> Result<()> {
        let record = EmbeddingRecord::mean(self.table.mean_vector().to_vec());
        self.store.upsert_embeddings(std::slice::from_ref(&record)).await?;
        tracing::info!(dimension = self.table.dimension(), "Mean embedding written");
        Ok(())
    }

    /// Embeds every post and writes the vector back.
    ///
    /// Each post gets its `embedding` column updated and a post-linked row
    /// in the embeddings table. A post whose writes fail is recorded and
    /// skipped. Failing to read the posts at all is fatal.
    pub async fn populate_post_embeddings(&self) -> Result<PopulateReport> {
        let posts = self.store.fetch_posts().await?;
        let embedder = DocumentEmbedder::new(&self.table);
        let mut report = PopulateReport::default();

        tracing::info!(count = posts.len(), "Populating post embeddings");

        for post in posts {
            let tokens = tokenize(&post.content);
            let coverage = embedder.coverage(&tokens);
            tracing::debug!(
                id = %post.id,
                tokens = coverage.total,
                unknown = coverage.unknown(),
                "Embedding post"
            );
            let embedding = embedder.embed_tokens(&tokens).into_values();

            let written = match self.store.update_post_embedding(&post.id, &embedding).await {
                Ok(()) => {
                    let record = EmbeddingRecord::post(post.id.clone(), embedding);
                    self.store.upsert_embeddings(std::slice::from_ref(&record)).await
                }
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    tracing::warn!(id = %post.id, error = %e, "Failed to write post embedding");
                    report.failed.push((post.id, e.to_string()));
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Post embeddings populated"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Post;
    use crate::storage::{MockStoreGateway, SqliteStore, StoreError};
    use std::collections::HashMap;

    fn table() -> Arc<EmbeddingTable> {
        let stoi: HashMap<String, usize> = [("a", 0), ("b", 1), ("c", 2), ("d", 3), ("e", 4)]
            .iter()
            .map(|(t, i)| (t.to_string(), *i))
            .collect();
        let rows = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
            vec![2.0, 0.0],
        ];
        Arc::new(EmbeddingTable::from_parts(stoi, rows).unwrap())
    }

    fn options(batch_size: usize, start: ExportStart) -> ExportOptions {
        ExportOptions {
            batch_size,
            pause: Duration::ZERO,
            start,
        }
    }

    #[test]
    fn export_start_resolution() {
        assert_eq!(ExportStart::Beginning.resolve(10).unwrap(), 0);
        assert_eq!(ExportStart::Offset(4).resolve(10).unwrap(), 4);
        assert_eq!(ExportStart::Offset(40).resolve(10).unwrap(), 10);
        assert_eq!(ExportStart::Fraction(0.4).resolve(10).unwrap(), 4);
        assert_eq!(ExportStart::Fraction(0.4).resolve(7).unwrap(), 2);
        assert!(ExportStart::Fraction(1.0).resolve(10).is_err());
        assert!(ExportStart::Fraction(-0.1).resolve(10).is_err());
    }

    #[test]
    fn options_from_settings() {
        let options = ExportOptions::default();
        assert_eq!(options.batch_size, 10);
        assert_eq!(options.pause, Duration::from_secs(1));
        assert_eq!(options.start, ExportStart::Beginning);
    }

    #[tokio::test]
    async fn export_batches_in_vocabulary_order() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let service = UploadService::new(store.clone(), table());

        let report = service
            .export_vocabulary(&options(2, ExportStart::Beginning))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.uploaded, 5);
        let labels: Vec<String> = store
            .fetch_embeddings()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.content)
            .collect();
        assert_eq!(labels, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn export_resumes_from_offset() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let service = UploadService::new(store.clone(), table());

        let report = service
            .export_vocabulary(&options(10, ExportStart::Offset(3)))
            .await
            .unwrap();

        assert_eq!(report.skipped, 3);
        assert_eq!(report.uploaded, 2);
        let rows = store.fetch_embeddings().await.unwrap();
        assert_eq!(rows[0].content, "d");
    }

    #[tokio::test]
    async fn export_twice_is_idempotent() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let service = UploadService::new(store.clone(), table());

        service.export_vocabulary(&options(3, ExportStart::Beginning)).await.unwrap();
        service.export_vocabulary(&options(3, ExportStart::Beginning)).await.unwrap();

        assert_eq!(store.fetch_embeddings().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn export_continues_after_failed_batch() {
        let mut mock = MockStoreGateway::new();
        mock.expect_upsert_embeddings()
            .withf(|records| records[0].content == "c")
            .times(1)
            .returning(|_| Err(StoreError::InvalidResponse("rate limited".to_string())));
        mock.expect_upsert_embeddings()
            .withf(|records| records[0].content != "c")
            .times(2)
            .returning(|_| Ok(()));

        let service = UploadService::new(Arc::new(mock), table());
        let report = service
            .export_vocabulary(&options(2, ExportStart::Beginning))
            .await
            .unwrap();

        assert_eq!(report.uploaded, 3);
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.first_failed_row, Some(2));
        assert!(report.errors[0].contains("rate limited"));
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let service = UploadService::new(Arc::new(MockStoreGateway::new()), table());
        assert!(service
            .export_vocabulary(&options(0, ExportStart::Beginning))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn mean_row_is_written() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let service = UploadService::new(store.clone(), table());

        service.upsert_mean_embedding().await.unwrap();

        let rows = store.fetch_embeddings().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_mean());
        assert_eq!(rows[0].embedding, Some(vec![0.8, 0.4]));
    }

    #[tokio::test]
    async fn populate_writes_posts_and_linked_rows() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        store
            .insert_posts(vec![Post::new(1, "A b"), Post::new(2, "zzz")])
            .await
            .unwrap();
        let service = UploadService::new(store.clone(), table());

        let report = service.populate_post_embeddings().await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.succeeded, 2);
        let posts = store.fetch_posts().await.unwrap();
        assert_eq!(posts[0].embedding, Some(vec![0.5, 0.5]));
        assert_eq!(posts[1].embedding, Some(vec![0.8, 0.4]));

        let linked: Vec<PostId> = store
            .fetch_embeddings()
            .await
            .unwrap()
            .iter()
            .filter_map(|row| row.candidate().map(|(id, _)| id.clone()))
            .collect();
        assert_eq!(linked, vec![PostId::from(1), PostId::from(2)]);
    }

    #[tokio::test]
    async fn populate_collects_failures_and_continues() {
        let mut mock = MockStoreGateway::new();
        mock.expect_fetch_posts().times(1).returning(|| {
            Ok(vec![
                Post::new(1, "a"),
                Post::new(2, "b"),
                Post::new(3, "c"),
            ])
        });
        mock.expect_update_post_embedding()
            .withf(|id, _| *id == PostId::from(2))
            .times(1)
            .returning(|id, _| Err(StoreError::NotFound(id.to_string())));
        mock.expect_update_post_embedding()
            .withf(|id, _| *id != PostId::from(2))
            .times(2)
            .returning(|_, _| Ok(()));
        mock.expect_upsert_embeddings()
            .times(2)
            .returning(|_| Ok(()));

        let service = UploadService::new(Arc::new(mock), table());
        let report = service.populate_post_embeddings().await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PostId::from(2));
        assert!(report.failed[0].1.contains("not found"));
    }

    #[tokio::test]
    async fn populate_fails_when_posts_unreadable() {
        let mut mock = MockStoreGateway::new();
        mock.expect_fetch_posts().returning(|| {
            Err(StoreError::Api {
                status: 500,
                message: "down".to_string(),
            })
        });

        let service = UploadService::new(Arc::new(mock), table());
        assert!(service.populate_post_embeddings().await.is_err());
    }
}
