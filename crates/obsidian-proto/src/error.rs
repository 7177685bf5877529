//! Error types for the obsidian-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or validating wire types.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to encode a message.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a message.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtoError::MissingField("serviceId");
        assert_eq!(err.to_string(), "missing required field: serviceId");

        let err = ProtoError::Validation("name cannot be empty".to_string());
        assert_eq!(err.to_string(), "validation error: name cannot be empty");
    }
}
