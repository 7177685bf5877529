//! Watch command implementation.
//!
//! Connects the push channel and prints circuit state changes as they
//! arrive, either for every service or for one.

use std::io::Write;

use chrono::{DateTime, Utc};
use obsidian_client::{
    ConnectionState, Console, DashboardView, EventReconciler, FeedEntry, GuardState,
    ServiceDetailView, SessionGuard,
};
use obsidian_proto::{CircuitState, ServiceId};
use serde::Serialize;
use tracing::{info, warn};

use super::{require_session, TerminalNavigator};
use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output::{format_time, Message, OutputFormat, TableDisplay};

/// Handler for the watch command.
pub struct WatchCommand<'a> {
    console: &'a Console,
}

/// The view whose feed is followed.
enum Watched {
    All(DashboardView),
    One(ServiceDetailView),
}

impl Watched {
    fn feed_mut(&mut self) -> &mut EventReconciler {
        match self {
            Self::All(view) => view.feed_mut(),
            Self::One(view) => view.feed_mut(),
        }
    }

    fn recent_events(&self) -> Vec<FeedEntry> {
        match self {
            Self::All(view) => view.recent_events(),
            Self::One(view) => view.recent_events(),
        }
    }

    fn unmount(&mut self) {
        match self {
            Self::All(view) => view.unmount(),
            Self::One(view) => view.unmount(),
        }
    }
}

impl<'a> WatchCommand<'a> {
    /// Creates a new watch command handler.
    #[must_use]
    pub const fn new(console: &'a Console) -> Self {
        Self { console }
    }

    /// Follows circuit events until interrupted, `--count` events were
    /// printed, or the session ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is missing or lost, the push channel
    /// gives up reconnecting, or writing fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &WatchArgs,
    ) -> Result<(), CliError> {
        require_session(self.console)?;

        let mut watched = match &args.service {
            Some(service_id) => Watched::One(self.console.service_detail(service_id.as_str())),
            None => Watched::All(self.console.dashboard()),
        };

        let channel = self.console.channel();
        channel.connect();
        if !format.is_json() {
            let target = args.service.as_deref().unwrap_or("all services");
            format.write(
                out,
                &Message::info(format!(
                    "Watching circuit events for {target} on {} (Ctrl-C to stop)",
                    channel.url()
                )),
            )?;
        }

        let result = self.follow(out, format, args.count, &mut watched).await;

        watched.unmount();
        self.console.shutdown();
        result
    }

    async fn follow<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        count: Option<usize>,
        watched: &mut Watched,
    ) -> Result<(), CliError> {
        let mut guard = SessionGuard::new(TerminalNavigator::default());
        guard.evaluate(&self.console.session().state());
        let mut session = self.console.session().subscribe();
        let mut connection = self.console.channel().watch_state();

        let mut newest: Option<String> = None;
        let mut printed = 0usize;

        loop {
            tokio::select! {
                () = watched.feed_mut().changed() => {
                    let entries = watched.recent_events();
                    let fresh = fresh_entries(&entries, newest.as_deref());
                    for entry in fresh.iter().rev() {
                        format.write_record(out, &WatchEvent::from(entry))?;
                        printed += 1;
                        if count.is_some_and(|limit| printed >= limit) {
                            return Ok(());
                        }
                    }
                    newest = entries.first().map(|entry| entry.receipt_id.clone());
                }
                change = guard.next_change(&mut session) => {
                    if change != Some(GuardState::Authenticated) {
                        return Err(CliError::NotAuthenticated);
                    }
                }
                changed = connection.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let state = *connection.borrow_and_update();
                    info!(state = %state, "push channel");
                    if state == ConnectionState::Failed {
                        return Err(CliError::Command(
                            "push channel gave up reconnecting".to_string(),
                        ));
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!(error = %e, "could not listen for Ctrl-C");
                    }
                    return Ok(());
                }
            }
        }
    }
}

/// Entries received after `newest`, newest first.
///
/// With no previous entry every entry is fresh. If `newest` fell off the
/// bounded feed, everything still held is fresh.
fn fresh_entries<'e>(entries: &'e [FeedEntry], newest: Option<&str>) -> &'e [FeedEntry] {
    let end = newest
        .and_then(|id| entries.iter().position(|entry| entry.receipt_id == id))
        .unwrap_or(entries.len());
    &entries[..end]
}

// Output types

/// One circuit event as printed.
#[derive(Debug, Clone, Serialize)]
pub struct WatchEvent {
    /// Id this console assigned on receipt.
    pub receipt_id: String,
    /// Id the backend attached, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// When this console received it.
    pub received_at: DateTime<Utc>,
    /// Service key.
    pub service_id: ServiceId,
    /// Service display name.
    pub service_name: String,
    /// New breaker state.
    pub state: CircuitState,
    /// When the backend recorded the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&FeedEntry> for WatchEvent {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            receipt_id: entry.receipt_id.clone(),
            event_id: entry.event.id.clone(),
            received_at: entry.received_at,
            service_id: entry.event.service_id.clone(),
            service_name: entry.event.service_name.clone(),
            state: entry.event.state,
            timestamp: entry.event.timestamp,
        }
    }
}

impl TableDisplay for WatchEvent {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let name = if self.service_name.is_empty() {
            self.service_id.as_str()
        } else {
            &self.service_name
        };
        writeln!(
            writer,
            "{}  {:<9}  {} ({})",
            format_time(&self.received_at),
            self.state.as_str(),
            name,
            self.service_id
        )?;
        Ok(())
    }
}
