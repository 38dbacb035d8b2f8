use std::fmt;

use thiserror::Error;

/// Failure of a single request against the remote API.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl TransportError {
    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::Url(_) => false,
        }
    }
}

/// Resource kinds that are looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Project,
    ReleaseDefinition,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => f.write_str("Project"),
            Self::ReleaseDefinition => f.write_str("Release definition"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LeadTimeError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("Malformed data for release {release_id}: {reason}")]
    MalformedData { release_id: u64, reason: String },

    #[error("Network error while fetching {context}: {source}")]
    Network {
        context: String,
        #[source]
        source: TransportError,
    },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LeadTimeError {
    pub(crate) fn network(context: impl Into<String>, source: TransportError) -> Self {
        Self::Network {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LeadTimeError>;
