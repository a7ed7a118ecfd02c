//! Pipeline settings and store credentials.
//!
//! Secrets come from a dotenv-style settings file (`.env` in the working
//! directory, or `~/.config/postvec/.env` or the platform equivalent).
//! Variables already present in the process environment win over the file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::DEFAULT_LIMIT;

/// Variable holding the store base URL.
pub const STORE_URL_VAR: &str = "PUBLIC_SUPABASE_URL";
/// Variable holding the store service-role key.
pub const STORE_KEY_VAR: &str = "PRIVATE_SUPABASE_ROLE_KEY";
/// Variable overriding the embedding artifact path.
pub const ARTIFACT_VAR: &str = "POSTVEC_ARTIFACT";
/// Settings file looked up in the working directory.
pub const DEFAULT_ENV_FILE: &str = ".env";
/// Artifact path used when nothing else is configured.
pub const DEFAULT_ARTIFACT: &str = "model_weights.safetensors";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("failed to read settings file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Hosted store credentials.
    pub store: StoreSettings,
    /// Pretrained embedding artifact.
    pub artifact_path: PathBuf,
    /// Bulk upload pacing.
    pub upload: UploadSettings,
    /// Query tool defaults.
    pub search: SearchSettings,
}

impl Settings {
    /// Loads settings from the given file, or from the default locations.
    ///
    /// An explicitly named file must exist; the default locations are
    /// optional. Fails when either store secret is missing or blank.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_vars = match env_file {
            Some(path) => read_env_file(path)?,
            None => match default_env_file() {
                Some(path) => read_env_file(&path)?,
                None => HashMap::new(),
            },
        };

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    /// Builds settings from a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let store = StoreSettings {
            url: required(STORE_URL_VAR)?,
            service_key: required(STORE_KEY_VAR)?,
        };
        let artifact_path = lookup(ARTIFACT_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT));

        Ok(Self {
            store,
            artifact_path,
            upload: UploadSettings::default(),
            search: SearchSettings::default(),
        })
    }
}

/// Credentials for the hosted table store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL (`https://<project>.supabase.co`, or `sqlite:<path>` for a
    /// local database).
    pub url: String,
    /// Service-role key sent with every request. Never written out.
    #[serde(skip_serializing)]
    pub service_key: String,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

/// Pacing for the bulk vocabulary upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Rows per upsert request.
    pub batch_size: usize,
    /// Pause between batches, in milliseconds.
    pub pause_ms: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            pause_ms: 1000,
        }
    }
}

/// Defaults for the query tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Results returned when no limit is given.
    pub default_limit: i64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let to_error = |source| ConfigError::File {
        path: path.to_path_buf(),
        source,
    };
    let vars = dotenvy::from_path_iter(path)
        .map_err(to_error)?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(to_error)?;
    tracing::debug!(path = %path.display(), count = vars.len(), "Read settings file");
    Ok(vars)
}

fn default_env_file() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_ENV_FILE);
    if local.is_file() {
        return Some(local);
    }
    directories::ProjectDirs::from("", "", "postvec")
        .map(|dirs| dirs.config_dir().join(DEFAULT_ENV_FILE))
        .filter(|path| path.is_file())
}
