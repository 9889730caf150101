//! Top-level error types for issuebridge.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from {path}: {source}")]
    Load {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),
}

/// Forge (GitHub) API errors.
///
/// `NotFound` is an expected outcome for lookups of numbers that do not
/// exist. Every other variant is a transient failure: callers log it and
/// carry on.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("issue #{number} not found")]
    NotFound { number: u64 },

    #[error("{context} failed with status {status}")]
    Status {
        status: reqwest::StatusCode,
        context: &'static str,
    },

    #[error("forge request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to decode forge response: {0}")]
    Decode(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl ForgeError {
    /// Whether this error means the item definitively does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound { .. })
    }
}

/// Chat transport errors.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("{context} failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        context: &'static str,
        body: String,
    },

    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("adapter not started")]
    NotStarted,
}
