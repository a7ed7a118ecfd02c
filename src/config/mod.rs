//! Configuration and settings management.
//!
//! Store credentials are read from a dotenv-style settings file at startup;
//! pipeline knobs carry defaults that the command line can override.

mod settings;

pub use settings::{
    ConfigError, SearchSettings, Settings, StoreSettings, UploadSettings, ARTIFACT_VAR,
    DEFAULT_ARTIFACT, DEFAULT_ENV_FILE, STORE_KEY_VAR, STORE_URL_VAR,
};
