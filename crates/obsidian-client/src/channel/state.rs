//! Connection state types.

use std::fmt;

/// State of the push channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected, and not trying to be.
    #[default]
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Socket open; events flow.
    Connected,
    /// Connection lost or refused, will retry.
    Reconnecting,
    /// Permanently failed (max retries exceeded).
    Failed,
}

impl ConnectionState {
    /// Whether events can currently be received and emitted.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether a background connection task is expected to be running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    /// Short lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
