//! Error types for the bridge.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },
}

/// Errors raised while routing an activity through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No channel strategy registered for source {channel}")]
    UnsupportedChannel { channel: String },

    #[error("Roster fetch failed for conversation {conversation}: {source}")]
    RosterFetch {
        conversation: String,
        source: TransportError,
    },

    #[error("Message bus rejected event: {0}")]
    BusDelivery(String),
}

/// Connector transport failures. Escalated to the caller of the send
/// path; the bridge itself never retries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token acquisition failed: {0}")]
    Token(String),

    #[error("Activity has no service URL to reply to")]
    MissingServiceUrl,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

/// Result type alias for the bridge.
pub type Result<T> = std::result::Result<T, Error>;
