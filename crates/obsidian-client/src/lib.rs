//! # obsidian-client
//!
//! State synchronization engine for the Obsidian monitoring console.
//!
//! The console shows an authoritative snapshot of services and logs fetched
//! over REST, next to a live feed of circuit breaker transitions pushed over
//! a WebSocket. This crate keeps the two apart and gates both behind a
//! session:
//!
//! - [`channel::TransportChannel`]: one shared push connection with handler
//!   registration and automatic reconnection
//! - [`session::SessionStore`] and [`session::SessionGuard`]: the credential
//!   and the admit/redirect decision derived from it
//! - [`reconciler::EventReconciler`]: a bounded, newest-first event feed per view
//! - [`snapshot::SnapshotLoader`]: REST reads and service mutations
//! - [`views`]: headless controllers for the dashboard, services, service
//!   detail and logs pages
//!
//! ## Example
//!
//! ```rust,ignore
//! use obsidian_client::{Console, ConsoleConfig};
//!
//! let config = ConsoleConfig::default().with_overrides_from(|key| std::env::var(key).ok());
//! let console = Console::new(config)?;
//! console.channel().connect();
//!
//! let mut dashboard = console.dashboard();
//! dashboard.load().await;
//! println!("{:?}", dashboard.stats());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod console;
pub mod error;
pub mod reconciler;
pub mod session;
pub mod snapshot;
pub mod views;

pub use channel::{ConnectionState, HandlerId, ReconnectConfig, TransportChannel};
pub use config::{ConsoleConfig, ReconnectSettings};
pub use console::Console;
pub use error::{ClientError, ClientResult};
pub use reconciler::{EventFeed, EventReconciler, FeedEntry, FEED_CAPACITY};
pub use session::{
    entry_route, Credential, CredentialStorage, FileCredentialStorage, Gate, GuardState,
    MemoryCredentialStorage, Navigator, Route, SessionGuard, SessionState, SessionStore,
};
pub use snapshot::{ServiceApi, SnapshotLoader};
pub use views::{
    DashboardStats, DashboardView, LogsView, Notice, NoticeKind, Notifications,
    ServiceDetailView, ServicesView, SnapshotState, ViewScope,
};
