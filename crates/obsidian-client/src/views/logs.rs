use std::sync::Arc;

use obsidian_proto::{LogEntry, LogFilter, Service};
use tracing::warn;

use super::{Notifications, SnapshotState, ViewScope};
use crate::snapshot::ServiceApi;

/// Log search under a filter.
pub struct LogsView {
    api: Arc<dyn ServiceApi>,
    scope: ViewScope,
    filter: LogFilter,
    logs: SnapshotState<Vec<LogEntry>>,
    services: SnapshotState<Vec<Service>>,
    notifications: Notifications,
}

impl LogsView {
    /// Mount the view with an unconstrained filter.
    pub fn mount(api: Arc<dyn ServiceApi>) -> Self {
        Self {
            api,
            scope: ViewScope::new(),
            filter: LogFilter::default(),
            logs: SnapshotState::new(),
            services: SnapshotState::new(),
            notifications: Notifications::default(),
        }
    }

    /// Fetch logs and the service list used for the filter choices.
    pub async fn load(&mut self) -> bool {
        self.services.begin();
        let Some(services) = self.scope.run(self.api.list_services()).await else {
            self.services.cancel();
            return false;
        };
        if let Err(e) = &services {
            warn!(error = %e, "failed to fetch services for log filter");
        }
        self.services.apply(services);

        self.refresh().await
    }

    /// Re-fetch logs under the current filter.
    pub async fn refresh(&mut self) -> bool {
        self.logs.begin();
        let Some(result) = self.scope.run(self.api.list_logs(&self.filter)).await else {
            self.logs.cancel();
            return false;
        };

        if let Err(e) = &result {
            warn!(error = %e, "failed to fetch logs");
            self.notifications
                .error("Failed to fetch logs", "Could not load logs. Please try again.");
        }
        self.logs.apply(result);
        true
    }

    /// Replace the filter and re-fetch. An unchanged filter does not re-fetch.
    pub async fn set_filter(&mut self, filter: LogFilter) -> bool {
        let filter = LogFilter::new()
            .with_level(filter.level.unwrap_or_default())
            .with_service_id(filter.service_id.unwrap_or_default())
            .with_search(filter.search.unwrap_or_default());
        if filter == self.filter && self.logs.data().is_some() {
            return true;
        }
        self.filter = filter;
        self.refresh().await
    }

    /// Current filter.
    #[must_use]
    pub const fn filter(&self) -> &LogFilter {
        &self.filter
    }

    /// Logs snapshot state.
    #[must_use]
    pub const fn logs(&self) -> &SnapshotState<Vec<LogEntry>> {
        &self.logs
    }

    /// Service list for filter choices.
    #[must_use]
    pub const fn services(&self) -> &SnapshotState<Vec<Service>> {
        &self.services
    }

    /// Pending notifications.
    #[must_use]
    pub const fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Mutable notifications, for dismissal.
    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.notifications
    }

    /// Handle that unmounts this view from elsewhere.
    #[must_use]
    pub fn scope(&self) -> ViewScope {
        self.scope.clone()
    }

    /// Unmount: abandon in-flight fetches.
    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}
