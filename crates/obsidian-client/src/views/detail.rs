use std::sync::Arc;

use obsidian_proto::{LogEntry, LogFilter, Service, ServiceId};
use tracing::warn;

use super::{SnapshotState, ViewScope};
use crate::channel::TransportChannel;
use crate::reconciler::{EventReconciler, FeedEntry};
use crate::snapshot::ServiceApi;

/// One service, its logs and the circuit events that concern it.
pub struct ServiceDetailView {
    api: Arc<dyn ServiceApi>,
    service_id: ServiceId,
    scope: ViewScope,
    service: SnapshotState<Service>,
    logs: SnapshotState<Vec<LogEntry>>,
    feed: EventReconciler,
}

impl ServiceDetailView {
    /// Mount the view for `service_id`, subscribing a feed scoped to it.
    pub fn mount(
        api: Arc<dyn ServiceApi>,
        channel: &TransportChannel,
        service_id: impl Into<ServiceId>,
    ) -> Self {
        let service_id = service_id.into();
        let mut feed = EventReconciler::scoped(channel, service_id.clone());
        feed.subscribe();
        Self {
            api,
            service_id,
            scope: ViewScope::new(),
            service: SnapshotState::new(),
            logs: SnapshotState::new(),
            feed,
        }
    }

    /// Fetch the service and its logs concurrently.
    ///
    /// Returns `false` if the view unmounted first.
    pub async fn load(&mut self) -> bool {
        self.service.begin();
        self.logs.begin();

        let filter = LogFilter::new().with_service_id(self.service_id.as_str());
        let fetch = async {
            tokio::join!(
                self.api.get_service(&self.service_id),
                self.api.list_logs(&filter)
            )
        };

        let Some((service, logs)) = self.scope.run(fetch).await else {
            self.service.cancel();
            self.logs.cancel();
            return false;
        };

        if let Err(e) = &service {
            warn!(service_id = %self.service_id, error = %e, "failed to fetch service");
        }
        if let Err(e) = &logs {
            warn!(service_id = %self.service_id, error = %e, "failed to fetch service logs");
        }
        self.service.apply(service);
        self.logs.apply(logs);
        true
    }

    /// Key of the service shown.
    #[must_use]
    pub const fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    /// Service snapshot state.
    #[must_use]
    pub const fn service(&self) -> &SnapshotState<Service> {
        &self.service
    }

    /// Logs snapshot state.
    #[must_use]
    pub const fn logs(&self) -> &SnapshotState<Vec<LogEntry>> {
        &self.logs
    }

    /// Recent circuit events for this service, newest first.
    #[must_use]
    pub fn recent_events(&self) -> Vec<FeedEntry> {
        self.feed.entries()
    }

    /// The view's event feed.
    pub fn feed_mut(&mut self) -> &mut EventReconciler {
        &mut self.feed
    }

    /// Handle that unmounts this view from elsewhere.
    #[must_use]
    pub fn scope(&self) -> ViewScope {
        self.scope.clone()
    }

    /// Unmount: abandon in-flight fetches and drop the feed.
    pub fn unmount(&mut self) {
        self.scope.unmount();
        self.feed.unsubscribe();
    }
}
