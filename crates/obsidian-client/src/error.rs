//! Error types for the console engine.

use thiserror::Error;

/// Errors that can occur in console operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential storage failed.
    #[error("credential storage error: {0}")]
    Storage(String),

    /// The backend answered with a non-success status.
    #[error("request failed ({status}): {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status reason.
        message: String,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body had an unexpected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The backend rejected the credential, or none is held.
    #[error("not authenticated")]
    Unauthorized,

    /// A draft failed client-side checks.
    #[error("invalid input: {0}")]
    Validation(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Proto(#[from] obsidian_proto::ProtoError),
}

impl ClientError {
    /// Whether this error means the session is no longer usable.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Result type for console operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = ClientError::Http {
            status: 409,
            message: "Service ID already exists".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request failed (409): Service ID already exists"
        );
    }

    #[test]
    fn test_unauthorized() {
        assert!(ClientError::Unauthorized.is_unauthorized());
        assert!(!ClientError::Transport("refused".to_string()).is_unauthorized());
        assert_eq!(ClientError::Unauthorized.to_string(), "not authenticated");
    }

    #[test]
    fn test_from_proto_error() {
        let err: ClientError =
            obsidian_proto::ProtoError::Validation("name is required".to_string()).into();
        assert!(matches!(err, ClientError::Proto(_)));
        assert_eq!(
            err.to_string(),
            "protocol error: validation error: name is required"
        );
    }
}
