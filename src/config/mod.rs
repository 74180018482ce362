//! Configuration management for modcat
//!
//! Handles loading and validating configuration from TOML files. The loaded
//! `Config` is passed explicitly into every component together with the store
//! handle; nothing reads ambient global state.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub github: GithubConfig,

    /// What to synchronize and from where
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where this config was loaded from (internal, not user-editable)
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API base URL (overridable so tests can target a local server)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Username for Basic authentication
    #[serde(default = "default_username")]
    pub username: String,

    /// Environment variable to read the access token from
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// User-Agent header identifying this client
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum pages followed per paginated collection
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Page size requested for collections
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            username: default_username(),
            token_env: default_token_env(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            per_page: default_per_page(),
        }
    }
}

impl GithubConfig {
    /// Read the access token from the configured environment variable.
    /// Absent means unauthenticated requests (fine against a test server).
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

/// Catalog source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// GitHub organization holding modules and pipelines
    #[serde(default = "default_org")]
    pub org: String,

    /// Repository publishing reusable modules
    #[serde(default = "default_modules_repo")]
    pub modules_repo: String,

    /// Git ref of the modules repository to walk
    #[serde(default = "default_modules_ref")]
    pub modules_ref: String,

    /// Top-level directory holding module metadata files
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Metadata filename to look for under the modules directory
    #[serde(default = "default_meta_filename")]
    pub meta_filename: String,

    /// Dependency lock file committed in each pipeline repository
    #[serde(default = "default_lock_file")]
    pub lock_file: String,

    /// Repositories that are tooling/infrastructure rather than pipelines
    #[serde(default)]
    pub ignored_repos: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            org: default_org(),
            modules_repo: default_modules_repo(),
            modules_ref: default_modules_ref(),
            modules_dir: default_modules_dir(),
            meta_filename: default_meta_filename(),
            lock_file: default_lock_file(),
            ignored_repos: Vec::new(),
        }
    }
}

impl CatalogConfig {
    /// The lock-file key under which module declarations are nested,
    /// e.g. `nf-core/modules`.
    pub fn modules_namespace(&self) -> String {
        format!("{}/{}", self.org, self.modules_repo)
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
        }
    }
}

impl Config {
    /// Default configuration directory
    pub fn default_base_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("modcat")
    }

    /// Default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&text)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Write this configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
