//! Error types for the chat subsystem.

use thiserror::Error;

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Persisted data parsed but failed validation.
    #[error("invalid stored data: {0}")]
    InvalidStoredData(String),
    /// Persisted data was written with a different schema version.
    #[error("unsupported schema version: found {found}, expected {expected}")]
    UnsupportedSchema {
        /// Version found in the stored envelope.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// HTTP request error.
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    /// HTTP client error from Rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// Completion error from Rig.
    #[error("completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),
    /// Generation endpoint answered with a non-success status.
    #[error("generation http status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// Generation endpoint answered without usable text.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
    /// Generation did not settle within the configured deadline.
    #[error("{provider} generation timed out after {secs}s")]
    Timeout {
        /// Provider label.
        provider: String,
        /// Deadline in seconds.
        secs: u64,
    },
    /// Provider needs an API key and none was configured.
    #[error("api key required for {0}")]
    MissingApiKey(String),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
