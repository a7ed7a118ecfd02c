//! Application bootstrap shared by the binaries.
//!
//! Loads settings, opens the store gateway and loads the embedding table,
//! in that order, so a missing secret fails before any heavy work.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::embedding::EmbeddingTable;
use crate::services::{SearchService, UploadService};
use crate::storage::{open_gateway, StoreGateway};

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` overrides the default `info` level. Stdout is left to the
/// commands' own output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Loaded settings, store and embedding table.
pub struct App {
    settings: Settings,
    store: Arc<dyn StoreGateway>,
    table: Arc<EmbeddingTable>,
}

impl App {
    /// Loads everything the pipelines need.
    ///
    /// `artifact` overrides the configured artifact path. `vocab` names the
    /// vocabulary file of a safetensors artifact when it is not the
    /// `<stem>.vocab.json` sidecar.
    pub async fn bootstrap(
        env_file: Option<&Path>,
        artifact: Option<PathBuf>,
        vocab: Option<PathBuf>,
    ) -> Result<Self> {
        let mut settings = Settings::load(env_file)?;
        if let Some(path) = artifact {
            settings.artifact_path = path;
        }

        let store = open_gateway(&settings.store)
            .await
            .context("failed to open store")?;

        let path = settings.artifact_path.clone();
        let table = tokio::task::spawn_blocking(move || match vocab {
            Some(vocab) => EmbeddingTable::load_safetensors(&path, &vocab),
            None => EmbeddingTable::load(&path),
        })
        .await?
        .with_context(|| {
            format!(
                "failed to load embedding table from {}",
                settings.artifact_path.display()
            )
        })?;

        Ok(Self::from_parts(settings, store, Arc::new(table)))
    }

    /// Assembles an app from already loaded parts.
    pub fn from_parts(
        settings: Settings,
        store: Arc<dyn StoreGateway>,
        table: Arc<EmbeddingTable>,
    ) -> Self {
        Self {
            settings,
            store,
            table,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the store gateway.
    pub fn store(&self) -> Arc<dyn StoreGateway> {
        self.store.clone()
    }

    /// Returns the embedding table.
    pub fn table(&self) -> Arc<EmbeddingTable> {
        self.table.clone()
    }

    /// Builds the bulk upsert service.
    pub fn upload_service(&self) -> UploadService {
        UploadService::new(self.store(), self.table())
    }

    /// Builds the search service.
    pub fn search_service(&self) -> SearchService {
        SearchService::new(self.store(), self.table())
    }
}
