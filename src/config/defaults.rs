//! Default values for configuration

use std::path::PathBuf;

/// Default GitHub REST API base URL
pub fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Default GitHub username for Basic authentication (empty = token only)
pub fn default_username() -> String {
    String::new()
}

/// Default environment variable holding the API access token
pub fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

/// Default User-Agent sent on every API request
pub fn default_user_agent() -> String {
    format!("modcat/{}", env!("CARGO_PKG_VERSION"))
}

/// Default per-request timeout in seconds
pub fn default_timeout_secs() -> u64 {
    30
}

/// Default ceiling on pages followed per collection
pub fn default_max_pages() -> usize {
    100
}

/// Default retry attempts for transient failures
pub fn default_max_retries() -> u32 {
    3
}

/// Default base backoff between retries in milliseconds (doubles per attempt)
pub fn default_retry_backoff_ms() -> u64 {
    500
}

/// Default page size for collection requests
pub fn default_per_page() -> u32 {
    100
}

/// Default GitHub organization holding the catalog
pub fn default_org() -> String {
    "nf-core".to_string()
}

/// Default repository publishing reusable modules
pub fn default_modules_repo() -> String {
    "modules".to_string()
}

/// Default git ref of the modules repository to walk
pub fn default_modules_ref() -> String {
    "master".to_string()
}

/// Default top-level directory holding module metadata
pub fn default_modules_dir() -> String {
    "modules".to_string()
}

/// Default module metadata filename
pub fn default_meta_filename() -> String {
    "meta.yml".to_string()
}

/// Default dependency lock file committed in each pipeline
pub fn default_lock_file() -> String {
    "modules.json".to_string()
}

/// Default database file location
pub fn default_db_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modcat")
        .join("catalog.db")
}
