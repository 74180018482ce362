//! Custom error types for modcat

use thiserror::Error;

/// Main error type for catalog synchronization operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Invalid UTF-8 in decoded content: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is the expected "resource does not exist" case.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND
        )
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
