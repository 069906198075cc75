use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for PushSecure client operations
pub type Result<T> = std::result::Result<T, PushSecureError>;

/// PushSecure Client Error Types
#[derive(Error, Debug)]
pub enum PushSecureError {
    /// Connection refused, timeout, TLS failure and anything else the
    /// transport reports before a response arrives
    #[error("PushSecure request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("PushSecure API error: {status} - {body}")]
    Api { status: StatusCode, body: String },

    /// Response body was not the expected JSON (includes date parse failures)
    #[error("Failed to parse PushSecure response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Call was cancelled")]
    Cancelled,

    #[error("No tokio runtime available to enqueue the call")]
    NoRuntime,

    #[error("Failed to start a runtime for blocking execution: {0}")]
    Runtime(#[source] std::io::Error),
}

impl PushSecureError {
    /// HTTP status of a server error response, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_client_error())
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_server_error())
    }
}
