//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`auth`] - Login and logout
//! - [`status`] - Session and dashboard overview
//! - [`services`] - Service registry management
//! - [`logs`] - Log search
//! - [`watch`] - Live circuit events

pub mod auth;
pub mod logs;
pub mod services;
pub mod status;
pub mod watch;

pub use auth::AuthCommand;
pub use logs::LogsCommand;
pub use services::ServicesCommand;
pub use status::StatusCommand;
pub use watch::WatchCommand;

use obsidian_client::{
    Console, ConsoleConfig, GuardState, Navigator, Notifications, Route, SessionGuard,
};
use tracing::info;

use crate::cli::Cli;
use crate::error::CliError;

/// Navigator for a terminal session.
///
/// There is no page to move to, so redirects are recorded and logged; the
/// caller turns a redirect to the login route into
/// [`CliError::NotAuthenticated`].
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    redirects: Vec<Route>,
}

impl TerminalNavigator {
    /// Routes redirected to so far.
    #[must_use]
    pub fn redirects(&self) -> &[Route] {
        &self.redirects
    }
}

impl Navigator for TerminalNavigator {
    fn redirect(&mut self, route: &Route) {
        info!(route = %route, "redirect");
        self.redirects.push(route.clone());
    }
}

/// Assemble configuration: file, then `lookup`-provided environment, then flags.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn console_config<F>(cli: &Cli, lookup: F) -> Result<ConsoleConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::from_file(path)?,
        None => ConsoleConfig::default(),
    }
    .with_overrides_from(lookup);

    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(socket_url) = &cli.socket_url {
        config = config.with_socket_url(socket_url);
    }
    Ok(config)
}

/// Build the console for a parsed command line, reading the process environment.
///
/// # Errors
///
/// Returns an error if the configuration is unreadable or invalid.
pub fn build_console(cli: &Cli) -> Result<Console, CliError> {
    let config = console_config(cli, |key: &str| std::env::var(key).ok())?;
    Ok(Console::new(config)?)
}

/// Admit a protected command, or fail with [`CliError::NotAuthenticated`].
///
/// # Errors
///
/// Returns [`CliError::NotAuthenticated`] when the session holds no credential.
pub fn require_session(console: &Console) -> Result<(), CliError> {
    let mut guard = SessionGuard::new(TerminalNavigator::default());
    match guard.evaluate(&console.session().state()) {
        GuardState::Authenticated => Ok(()),
        GuardState::Loading | GuardState::Unauthenticated => Err(CliError::NotAuthenticated),
    }
}

/// Error for a snapshot that could not be loaded.
pub(crate) fn snapshot_failure(console: &Console, message: &str) -> CliError {
    if console.session().state().is_authenticated() {
        CliError::Command(message.to_string())
    } else {
        CliError::NotAuthenticated
    }
}

/// Error for a rejected mutation, taken from the newest error notice.
pub(crate) fn mutation_failure(console: &Console, notifications: &Notifications) -> CliError {
    if !console.session().state().is_authenticated() {
        return CliError::NotAuthenticated;
    }
    notifications.latest().map_or_else(
        || CliError::Command("operation failed".to_string()),
        |notice| CliError::Command(format!("{}: {}", notice.title, notice.description)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use obsidian_client::MemoryCredentialStorage;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn config_defaults_without_file_or_env() {
        let cli = Cli::parse_from(["obsidian", "status"]);
        let config = console_config(&cli, env(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.socket_url, "ws://localhost:3001");
    }

    #[test]
    fn config_flags_override_env_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obsidian.toml");
        std::fs::write(
            &path,
            "api_url = \"http://file:1\"\nsocket_url = \"ws://file:1\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "obsidian",
            "--config",
            path.to_str().unwrap(),
            "--api-url",
            "http://flag:3",
            "status",
        ]);
        let config =
            console_config(&cli, env(&[("OBSIDIAN_SOCKET_URL", "ws://env:2")])).unwrap();

        assert_eq!(config.api_url, "http://flag:3");
        assert_eq!(config.socket_url, "ws://env:2");
    }

    #[test]
    fn config_missing_file_is_error() {
        let cli = Cli::parse_from(["obsidian", "--config", "/nonexistent/obsidian.toml", "status"]);
        assert!(console_config(&cli, env(&[])).is_err());
    }

    #[test]
    fn require_session_rejects_anonymous() {
        let console =
            Console::with_storage(ConsoleConfig::default(), MemoryCredentialStorage::new())
                .unwrap();
        assert!(matches!(
            require_session(&console),
            Err(CliError::NotAuthenticated)
        ));

        console.session().login("tok").unwrap();
        assert!(require_session(&console).is_ok());
    }

    #[test]
    fn terminal_navigator_records_redirects() {
        let mut navigator = TerminalNavigator::default();
        navigator.redirect(&Route::Login);
        assert_eq!(navigator.redirects(), &[Route::Login]);
    }

    #[test]
    fn mutation_failure_uses_latest_notice() {
        let console =
            Console::with_storage(ConsoleConfig::default(), MemoryCredentialStorage::new())
                .unwrap();
        console.session().login("tok").unwrap();

        let mut notifications = Notifications::default();
        notifications.error("Operation failed", "Service ID already exists");
        let err = mutation_failure(&console, &notifications);
        assert_eq!(
            err.to_string(),
            "command error: Operation failed: Service ID already exists"
        );

        console.session().logout().unwrap();
        assert!(matches!(
            mutation_failure(&console, &notifications),
            CliError::NotAuthenticated
        ));
    }
}
