//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Obsidian - API gateway and circuit breaker console.
#[derive(Parser, Debug, Clone)]
#[command(name = "obsidian")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "OBSIDIAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// REST API base URL. Overrides the config file and environment.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Push channel URL. Overrides the config file and environment.
    #[arg(long)]
    pub socket_url: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store a credential for later commands.
    Login {
        /// Access token issued by the backend.
        #[arg(short, long, env = "OBSIDIAN_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Forget the stored credential.
    Logout,

    /// Show session state and dashboard numbers.
    Status,

    /// Service registry commands.
    Services {
        /// Services subcommand to execute.
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// Search centralized logs.
    Logs(LogsArgs),

    /// Follow live circuit state changes.
    Watch(WatchArgs),
}

/// Services subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ServiceCommands {
    /// List registered services.
    List,

    /// Show one service with its recent logs.
    Get {
        /// Service key.
        service_id: String,
    },

    /// Register a new service.
    Register(RegisterArgs),

    /// Change the name or target URL of a service.
    ///
    /// The service key cannot be changed.
    Update(UpdateArgs),

    /// Remove a service.
    Delete {
        /// Service key.
        service_id: String,
    },
}

/// Arguments for registering a service.
#[derive(Parser, Debug, Clone)]
pub struct RegisterArgs {
    /// Unique service key, e.g. `payment`.
    #[arg(required = true)]
    pub service_id: String,

    /// Display name.
    #[arg(short, long)]
    pub name: String,

    /// Upstream URL the gateway forwards to.
    #[arg(short, long)]
    pub target_url: String,
}

/// Arguments for updating a service.
#[derive(Parser, Debug, Clone)]
pub struct UpdateArgs {
    /// Service key.
    #[arg(required = true)]
    pub service_id: String,

    /// New display name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// New upstream URL.
    #[arg(short, long)]
    pub target_url: Option<String>,
}

/// Arguments for the logs command.
#[derive(Parser, Debug, Clone, Default)]
pub struct LogsArgs {
    /// Only this level (debug, info, warn, error).
    #[arg(short, long)]
    pub level: Option<String>,

    /// Only this service key.
    #[arg(short, long)]
    pub service: Option<String>,

    /// Free-text search.
    #[arg(short = 'q', long)]
    pub search: Option<String>,
}

/// Arguments for the watch command.
#[derive(Parser, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Only events of this service key.
    #[arg(short, long)]
    pub service: Option<String>,

    /// Exit after this many events.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}
