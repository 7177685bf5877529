//! Push channel to the monitoring backend.
//!
//! A single [`TransportChannel`] is shared by every view. It owns one
//! WebSocket connection, reconnects on its own, and fans incoming frames out
//! to handlers registered per event name.

mod reconnect;
mod registry;
mod state;
mod transport;

pub use reconnect::ReconnectConfig;
pub use registry::{Handler, HandlerId, HandlerRegistry};
pub use state::ConnectionState;
pub use transport::TransportChannel;
