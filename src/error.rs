use std::path::PathBuf;

use thiserror::Error;

/// A statement submission rejected by the remote service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
    /// SQLSTATE reported by the backend, when it sends one.
    pub code: Option<String>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        ExecutionError {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        ExecutionError {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Failures of a resource client call made by a probe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Query failed with status {status}: {message}")]
    Query {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Authentication failed with status {status}: {message}")]
    Auth { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn message(&self) -> &str {
        match self {
            ClientError::Query { message, .. } | ClientError::Auth { message, .. } => message,
            ClientError::Transport(message) | ClientError::Decode(message) => message,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Problems with the migration source. Nothing runs when one of these occurs.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Migration source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Cannot read migration source {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration source {} contains no SQL", .0.display())]
    EmptySource(PathBuf),
}
