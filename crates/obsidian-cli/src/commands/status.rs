//! Status command implementation.
//!
//! Shows where the console points, whether a credential is held and, when it
//! is, the dashboard headline numbers.

use std::io::Write;

use obsidian_client::{entry_route, Console, DashboardStats};
use serde::Serialize;

use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for the status command.
pub struct StatusCommand<'a> {
    console: &'a Console,
}

impl<'a> StatusCommand<'a> {
    /// Creates a new status command handler.
    #[must_use]
    pub const fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Executes the status command.
    ///
    /// A failed dashboard fetch is reported in the output, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
    ) -> Result<(), CliError> {
        let config = self.console.config();
        let mut status = ConsoleStatus {
            api_url: config.api_url.clone(),
            socket_url: config.socket_url.clone(),
            authenticated: self.console.session().state().is_authenticated(),
            next_route: None,
            stats: None,
            error: None,
        };

        if status.authenticated {
            let mut dashboard = self.console.dashboard();
            dashboard.load().await;
            match dashboard.services().error() {
                Some(error) => status.error = Some(error.to_string()),
                None => status.stats = Some(dashboard.stats()),
            }
            dashboard.unmount();
        }

        // A rejected credential is dropped while loading, so read it again.
        let session = self.console.session().state();
        status.authenticated = session.is_authenticated();
        status.next_route = entry_route(&session).map(|route| route.path());

        format.write(out, &status)?;
        Ok(())
    }
}

/// Console status output.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleStatus {
    /// REST base URL.
    pub api_url: String,
    /// Push channel URL.
    pub socket_url: String,
    /// Whether a credential is held.
    pub authenticated: bool,
    /// Where the console would open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_route: Option<String>,
    /// Dashboard numbers, when they could be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DashboardStats>,
    /// Why the dashboard numbers are missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableDisplay for ConsoleStatus {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Obsidian Console")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "API:              {}", self.api_url)?;
        writeln!(writer, "Push channel:     {}", self.socket_url)?;
        if self.authenticated {
            writeln!(writer, "Session:          ✓ Authenticated")?;
        } else {
            writeln!(writer, "Session:          ✗ Not logged in")?;
            writeln!(writer)?;
            writeln!(writer, "Run `obsidian login --token <TOKEN>` to log in.")?;
        }

        if let Some(stats) = &self.stats {
            writeln!(writer)?;
            writeln!(writer, "Services")?;
            writeln!(writer, "  Total:          {}", stats.total)?;
            writeln!(writer, "  Healthy:        {}", stats.healthy)?;
            writeln!(writer, "  Open circuits:  {}", stats.open_circuits)?;
            writeln!(writer, "  Monitors:       {}", stats.active_monitors)?;
            writeln!(writer, "  System health:  {}%", stats.health_percent)?;
        }
        if let Some(error) = &self.error {
            writeln!(writer)?;
            writeln!(writer, "Dashboard unavailable: {error}")?;
        }
        Ok(())
    }
}
