//! Logs command implementation.
//!
//! Searches centralized logs by level, service and free text.

use std::io::Write;

use obsidian_client::Console;
use obsidian_proto::{LogEntry, LogFilter};
use serde::Serialize;

use super::{require_session, snapshot_failure};
use crate::cli::LogsArgs;
use crate::error::CliError;
use crate::output::{format_optional_time, truncate, OutputFormat, TableDisplay};

/// Handler for the logs command.
pub struct LogsCommand<'a> {
    console: &'a Console,
}

impl<'a> LogsCommand<'a> {
    /// Creates a new logs command handler.
    #[must_use]
    pub const fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Executes the logs command.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is missing or the logs cannot be fetched.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &LogsArgs,
    ) -> Result<(), CliError> {
        require_session(self.console)?;

        let mut view = self.console.logs();
        view.set_filter(filter_from(args)).await;

        let logs = match (view.logs().data(), view.logs().error()) {
            (Some(logs), _) => logs.clone(),
            (None, Some(error)) => return Err(snapshot_failure(self.console, error)),
            (None, None) => Vec::new(),
        };

        let output = LogsOutput {
            filter: view.filter().clone(),
            logs,
        };
        format.write(out, &output)?;
        Ok(())
    }
}

/// Translate command-line filters. Missing and empty values mean "no constraint".
fn filter_from(args: &LogsArgs) -> LogFilter {
    let mut filter = LogFilter::new();
    if let Some(level) = &args.level {
        filter = filter.with_level(level.to_lowercase());
    }
    if let Some(service) = &args.service {
        filter = filter.with_service_id(service);
    }
    if let Some(search) = &args.search {
        filter = filter.with_search(search);
    }
    filter
}

// Output types

/// Logs output.
#[derive(Debug, Clone, Serialize)]
pub struct LogsOutput {
    /// Filter the logs were fetched under.
    pub filter: LogFilter,
    /// Matching log entries, in backend order.
    pub logs: Vec<LogEntry>,
}

impl TableDisplay for LogsOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.logs.is_empty() {
            writeln!(writer, "No logs found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<19}  {:<5}  {:<20}  MESSAGE",
            "TIMESTAMP", "LEVEL", "SERVICE"
        )?;
        writeln!(writer, "{}", "─".repeat(96))?;

        for log in &self.logs {
            writeln!(
                writer,
                "{:<19}  {:<5}  {:<20}  {}",
                format_optional_time(log.timestamp.as_ref()),
                log.level.as_str().to_uppercase(),
                truncate(log.service_label(), 20),
                log.message
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} log(s)", self.logs.len())?;
        Ok(())
    }
}
