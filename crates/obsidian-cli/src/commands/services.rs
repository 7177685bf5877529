//! Service registry commands.

use std::io::Write;

use obsidian_client::{Console, Notifications, ServicesView};
use obsidian_proto::{LogEntry, Service, ServiceDraft, ServiceId, ServiceStatus};
use serde::Serialize;

use super::{mutation_failure, require_session, snapshot_failure};
use crate::cli::{RegisterArgs, ServiceCommands, UpdateArgs};
use crate::error::CliError;
use crate::output::{format_optional_time, truncate, Message, OutputFormat, TableDisplay};

/// Handler for service commands.
pub struct ServicesCommand<'a> {
    console: &'a Console,
}

impl<'a> ServicesCommand<'a> {
    /// Creates a new services command handler.
    #[must_use]
    pub const fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Executes a services subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is missing, a fetch fails or the
    /// backend rejects a mutation.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &ServiceCommands,
    ) -> Result<(), CliError> {
        require_session(self.console)?;

        match command {
            ServiceCommands::List => self.list(out, format).await,
            ServiceCommands::Get { service_id } => self.get(out, format, service_id).await,
            ServiceCommands::Register(args) => self.register(out, format, args).await,
            ServiceCommands::Update(args) => self.update(out, format, args).await,
            ServiceCommands::Delete { service_id } => self.delete(out, format, service_id).await,
        }
    }

    async fn list<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let mut view = self.console.services();
        view.refresh().await;

        let services = self.loaded(&view)?;
        format.write(out, &ServiceList { services })?;
        Ok(())
    }

    async fn get<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        service_id: &str,
    ) -> Result<(), CliError> {
        let mut view = self.console.service_detail(service_id);
        view.load().await;
        view.unmount();

        let service = match (view.service().data(), view.service().error()) {
            (Some(service), _) => service.clone(),
            (None, Some(error)) => return Err(snapshot_failure(self.console, error)),
            (None, None) => return Err(CliError::ServiceNotFound(service_id.to_string())),
        };
        // Logs are secondary; show the service even if they failed.
        let logs = view.logs().data().cloned().unwrap_or_default();

        format.write(out, &ServiceDetail { service, logs })?;
        Ok(())
    }

    async fn register<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &RegisterArgs,
    ) -> Result<(), CliError> {
        let draft = ServiceDraft::new(&args.name, args.service_id.as_str(), &args.target_url);
        let mut view = self.console.services();

        if !view.register(&draft).await {
            return Err(mutation_failure(self.console, view.notifications()));
        }
        report(out, format, view.notifications_mut())
    }

    async fn update<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &UpdateArgs,
    ) -> Result<(), CliError> {
        if args.name.is_none() && args.target_url.is_none() {
            return Err(CliError::Command(
                "nothing to update, pass --name or --target-url".to_string(),
            ));
        }

        let service_id = ServiceId::new(&args.service_id);
        let mut view = self.console.services();
        view.refresh().await;
        self.loaded(&view)?;

        let mut draft = view
            .edit_draft(&service_id)
            .ok_or_else(|| CliError::ServiceNotFound(args.service_id.clone()))?;
        if let Some(name) = &args.name {
            draft.name.clone_from(name);
        }
        if let Some(target_url) = &args.target_url {
            draft.target_url.clone_from(target_url);
        }
        // The fetch notices are not part of this command's outcome.
        view.notifications_mut().drain();

        if !view.update(&service_id, &draft).await {
            return Err(mutation_failure(self.console, view.notifications()));
        }
        report(out, format, view.notifications_mut())
    }

    async fn delete<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        service_id: &str,
    ) -> Result<(), CliError> {
        let mut view = self.console.services();
        if !view.delete(&ServiceId::new(service_id)).await {
            return Err(mutation_failure(self.console, view.notifications()));
        }
        report(out, format, view.notifications_mut())
    }

    fn loaded(&self, view: &ServicesView) -> Result<Vec<Service>, CliError> {
        match (view.services().data(), view.services().error()) {
            (Some(services), _) => Ok(services.clone()),
            (None, Some(error)) => Err(snapshot_failure(self.console, error)),
            (None, None) => Ok(Vec::new()),
        }
    }
}

/// Print every pending notice, oldest first.
fn report<W: Write>(
    out: &mut W,
    format: &OutputFormat,
    notifications: &mut Notifications,
) -> Result<(), CliError> {
    for notice in notifications.drain() {
        format.write(out, &Message::from(&notice))?;
    }
    Ok(())
}

fn status_label(status: ServiceStatus) -> &'static str {
    match status {
        ServiceStatus::Healthy => "● healthy",
        ServiceStatus::Degraded => "◐ degraded",
        ServiceStatus::CircuitOpen => "○ circuit-open",
        ServiceStatus::Unknown => "? unknown",
    }
}

// Output types

/// List of services for display.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceList {
    /// Registered services.
    pub services: Vec<Service>,
}

impl TableDisplay for ServiceList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.services.is_empty() {
            writeln!(writer, "No services registered")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<20}  {:<24}  {:<36}  {:<16}",
            "SERVICE ID", "NAME", "TARGET URL", "STATUS"
        )?;
        writeln!(writer, "{}", "─".repeat(102))?;

        for service in &self.services {
            writeln!(
                writer,
                "{:<20}  {:<24}  {:<36}  {:<16}",
                truncate(service.service_id.as_str(), 20),
                truncate(&service.name, 24),
                truncate(&service.target_url, 36),
                status_label(service.status)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} service(s)", self.services.len())?;
        Ok(())
    }
}

/// One service and its recent logs.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDetail {
    /// The service.
    pub service: Service,
    /// Its logs, as returned by the backend.
    pub logs: Vec<LogEntry>,
}

impl TableDisplay for ServiceDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let service = &self.service;
        writeln!(writer, "Service: {}", service.name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Service ID:  {}", service.service_id)?;
        writeln!(writer, "Target URL:  {}", service.target_url)?;
        writeln!(writer, "Status:      {}", status_label(service.status))?;
        writeln!(writer)?;

        if self.logs.is_empty() {
            writeln!(writer, "Logs: None")?;
            return Ok(());
        }
        writeln!(writer, "Logs")?;
        for log in &self.logs {
            writeln!(
                writer,
                "  {}  {:<5}  {}",
                format_optional_time(log.timestamp.as_ref()),
                log.level.as_str(),
                log.message
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use chrono::{TimeZone, Utc};
    use obsidian_proto::LogLevel;

    fn service(key: &str, status: ServiceStatus) -> Service {
        Service {
            id: format!("id-{key}"),
            name: format!("{key} service"),
            service_id: ServiceId::new(key),
            target_url: format!("http://{key}:8080"),
            status,
        }
    }

    #[test]
    fn service_list_table() {
        let list = ServiceList {
            services: vec![
                service("payment", ServiceStatus::Healthy),
                service("orders", ServiceStatus::CircuitOpen),
            ],
        };
        let output = OutputFormat::new(Format::Table).to_string(&list).unwrap();

        assert!(output.contains("SERVICE ID"));
        assert!(output.contains("payment"));
        assert!(output.contains("● healthy"));
        assert!(output.contains("○ circuit-open"));
        assert!(output.contains("Total: 2 service(s)"));
    }

    #[test]
    fn service_list_empty() {
        let list = ServiceList { services: vec![] };
        let output = OutputFormat::new(Format::Table).to_string(&list).unwrap();
        assert_eq!(output, "No services registered\n");
    }

    #[test]
    fn service_list_json_uses_wire_names() {
        let list = ServiceList {
            services: vec![service("payment", ServiceStatus::Degraded)],
        };
        let output = OutputFormat::new(Format::Json).to_string(&list).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["services"][0]["serviceId"], "payment");
        assert_eq!(parsed["services"][0]["status"], "degraded");
    }

    #[test]
    fn service_detail_table_with_logs() {
        let detail = ServiceDetail {
            service: service("payment", ServiceStatus::Healthy),
            logs: vec![LogEntry {
                id: "1".into(),
                level: LogLevel::Error,
                message: "upstream timeout".into(),
                timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
                service_id: ServiceId::new("payment"),
                service_name: None,
            }],
        };
        let output = OutputFormat::new(Format::Table).to_string(&detail).unwrap();

        assert!(output.contains("Service ID:  payment"));
        assert!(output.contains("2024-03-01 12:00:00"));
        assert!(output.contains("upstream timeout"));
    }

    #[test]
    fn service_detail_table_without_logs() {
        let detail = ServiceDetail {
            service: service("payment", ServiceStatus::Unknown),
            logs: vec![],
        };
        let output = OutputFormat::new(Format::Table).to_string(&detail).unwrap();
        assert!(output.contains("Logs: None"));
        assert!(output.contains("? unknown"));
    }
}
