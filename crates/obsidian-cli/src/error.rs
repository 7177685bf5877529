//! CLI error types.

use obsidian_client::ClientError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// No credential, or the backend rejected it.
    #[error("not logged in; run `obsidian login --token <TOKEN>`")]
    NotAuthenticated,

    /// The service key is not registered.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// Command execution failed.
    #[error("command error: {0}")]
    Command(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// Error from the console engine.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
