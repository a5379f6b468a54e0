//! Client configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `BOOKSHELF_*` environment variables (`BOOKSHELF_BASE_URL`,
//! `BOOKSHELF_TIMEOUT_SECS`, `BOOKSHELF_SESSION_FILE`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ConfigError;
use crate::session::{FileSessionStore, MemorySessionStore, SessionStore};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const ENV_PREFIX: &str = "BOOKSHELF";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Where the session token is persisted. Defaults to the platform data
    /// dir.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Load defaults, then `file` if given, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layers(file, None)
    }

    /// `env` replaces the process environment when given.
    fn load_layers(
        file: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?;

        if let Some(file) = file {
            debug!(path = %file.display(), "reading client config");
            builder = builder.add_source(File::from(file).format(FileFormat::Toml));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// The base URL must be an absolute http(s) URL and the timeout
    /// non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let url = Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            _ => Err(ConfigError::UnsupportedScheme(self.base_url.clone())),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file.clone().or_else(FileSessionStore::default_path)
    }

    /// Persistent store at `session_path()`, or an in-memory one when the
    /// platform offers no data dir.
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        match self.session_path() {
            Some(path) => Arc::new(FileSessionStore::new(path)),
            None => {
                debug!("no data dir, session will not persist");
                Arc::new(MemorySessionStore::new())
            }
        }
    }
}
