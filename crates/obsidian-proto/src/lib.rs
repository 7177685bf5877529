//! # obsidian-proto
//!
//! Wire types shared between the Obsidian console and the monitoring backend.
//!
//! Two surfaces are described here:
//!
//! - the REST snapshot surface (`/services`, `/logs`), whose bodies are
//!   [`Service`], [`LogEntry`] and [`ApiErrorBody`];
//! - the push surface, a stream of [`ChannelFrame`]s whose only event of
//!   interest is [`CIRCUIT_STATE_CHANGE`] carrying a [`CircuitEvent`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod messages;
pub mod types;
pub mod validation;

pub use error::ProtoError;
pub use messages::{ApiErrorBody, ChannelFrame, CIRCUIT_STATE_CHANGE};
pub use types::{
    CircuitEvent, CircuitState, LogEntry, LogFilter, LogLevel, Service, ServiceDraft, ServiceId,
    ServiceStatus,
};
