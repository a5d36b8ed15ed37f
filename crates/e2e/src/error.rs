//! Error types for the probe harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response body for {context}: {reason}")]
    UnexpectedBody { context: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProbeError {
    /// True when the server could not be reached at all
    pub fn is_connect(&self) -> bool {
        matches!(self, ProbeError::Http(e) if e.is_connect())
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;
