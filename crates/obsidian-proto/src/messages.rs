//! Push channel frames and REST error bodies.
//!
//! Every push frame travels as a single JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Event name the backend uses for circuit breaker transitions.
pub const CIRCUIT_STATE_CHANGE: &str = "circuit:state-change";

/// One named event on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    /// Event name.
    pub event: String,
    /// Arbitrary payload. Absent payloads decode as `null`.
    #[serde(default)]
    pub data: Value,
}

impl ChannelFrame {
    /// Create a frame from an event name and raw payload.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Create a frame whose payload is the JSON encoding of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Encoding`] if the payload cannot be represented as JSON.
    pub fn encode<T: Serialize>(event: impl Into<String>, payload: &T) -> Result<Self, ProtoError> {
        let data =
            serde_json::to_value(payload).map_err(|e| ProtoError::Encoding(e.to_string()))?;
        Ok(Self::new(event, data))
    }

    /// Serialize the frame to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Encoding`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Parse a frame from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::Decoding`] if the text is not a frame.
    pub fn from_json(text: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(text).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Error body returned by the REST surface on failure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable failure reason.
    #[serde(default)]
    pub message: String,
}

impl ApiErrorBody {
    /// Extract the `message` of an error body, if the text is one.
    #[must_use]
    pub fn message_from(text: &str) -> Option<String> {
        serde_json::from_str::<Self>(text)
            .ok()
            .map(|body| body.message)
            .filter(|message| !message.is_empty())
    }
}
