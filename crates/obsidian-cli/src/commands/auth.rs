//! Login and logout.

use std::io::Write;

use obsidian_client::{entry_route, Console, Route};

use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Handler for the login and logout commands.
pub struct AuthCommand<'a> {
    console: &'a Console,
}

impl<'a> AuthCommand<'a> {
    /// Creates a new auth command handler.
    #[must_use]
    pub const fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Stores `token` as the session credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is blank or cannot be persisted.
    pub fn login<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        token: &str,
    ) -> Result<(), CliError> {
        self.console.session().login(token)?;

        let route = entry_route(&self.console.session().state()).unwrap_or(Route::Dashboard);
        format.write(out, &Message::success(format!("Logged in, continue at {route}")))?;
        Ok(())
    }

    /// Forgets the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored credential cannot be removed.
    pub fn logout<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let was_authenticated = self.console.session().state().is_authenticated();
        self.console.session().logout()?;

        let message = if was_authenticated {
            Message::success("Logged out")
        } else {
            Message::info("No credential was stored")
        };
        format.write(out, &message)?;
        Ok(())
    }
}
