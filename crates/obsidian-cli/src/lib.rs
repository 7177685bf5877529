//! # obsidian-cli
//!
//! Terminal front end for the Obsidian monitoring console.
//!
//! Provides commands for:
//! - Session login and logout
//! - Dashboard status
//! - Service registry management
//! - Log search
//! - Following live circuit state changes
//!
//! # Architecture
//!
//! Every command builds one [`obsidian_client::Console`] from configuration
//! and drives the same headless views a graphical front end would.
//!
//! ```text
//! ┌──────────────┐   REST snapshot    ┌──────────────────┐
//! │ obsidian-cli │───────────────────►│                  │
//! │   (views)    │                    │ gateway backend  │
//! │              │◄───────────────────│                  │
//! └──────────────┘  push (WebSocket)  └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, ServiceCommands};
pub use error::CliError;
pub use output::OutputFormat;
