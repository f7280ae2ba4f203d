use thiserror::Error;

/// Session-level failure of an extraction attempt. Never retried.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid feed url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid element selector: {0:?}")]
    InvalidSelector(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {detail}")]
    Navigation { url: String, detail: String },
    #[error("browser session error: {0}")]
    Session(String),
    #[error("failed to read snapshot: {0}")]
    Snapshot(#[from] std::io::Error),
}

/// A single node failed to yield its text (stale or detached).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("node unavailable: {0}")]
pub struct ItemError(pub String);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no OPENAI_API_KEY configured")]
    MissingCredential,
    #[error("OPENAI_API_KEY contains characters not allowed in a header")]
    InvalidCredential,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("service returned no completion text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be true or false, got {value:?}")]
    InvalidBool { key: &'static str, value: String },
    #[error("failed to read secrets file: {0}")]
    SecretsIo(#[from] std::io::Error),
    #[error("failed to parse secrets file: {0}")]
    SecretsToml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid feed file: {0}")]
    Json(#[from] serde_json::Error),
}
