use std::sync::Arc;

use obsidian_proto::{Service, ServiceStatus};
use serde::Serialize;
use tracing::warn;

use super::{SnapshotState, ViewScope};
use crate::channel::TransportChannel;
use crate::reconciler::{EventReconciler, FeedEntry, FEED_CAPACITY};
use crate::snapshot::ServiceApi;

/// Headline numbers of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardStats {
    /// Registered services.
    pub total: usize,
    /// Services reported healthy.
    pub healthy: usize,
    /// Services whose breaker is open.
    pub open_circuits: usize,
    /// Services being monitored.
    pub active_monitors: usize,
    /// Share of healthy services, rounded, 0 when there are none.
    pub health_percent: u32,
}

impl DashboardStats {
    /// Compute stats from a services snapshot.
    #[must_use]
    pub fn from_services(services: &[Service]) -> Self {
        let total = services.len();
        let healthy = services
            .iter()
            .filter(|s| s.status == ServiceStatus::Healthy)
            .count();
        let open_circuits = services
            .iter()
            .filter(|s| s.status == ServiceStatus::CircuitOpen)
            .count();
        let health_percent = if total == 0 {
            0
        } else {
            ((healthy as f64 / total as f64) * 100.0).round() as u32
        };

        Self {
            total,
            healthy,
            open_circuits,
            active_monitors: total,
            health_percent,
        }
    }
}

/// Overview of every service plus the live event feed.
pub struct DashboardView {
    api: Arc<dyn ServiceApi>,
    scope: ViewScope,
    services: SnapshotState<Vec<Service>>,
    feed: EventReconciler,
}

impl DashboardView {
    /// Mount the view: subscribe the feed. Call [`load`](Self::load) to fetch.
    pub fn mount(api: Arc<dyn ServiceApi>, channel: &TransportChannel) -> Self {
        Self::mount_with_capacity(api, channel, FEED_CAPACITY)
    }

    /// Mount with a feed of `capacity` entries.
    pub fn mount_with_capacity(
        api: Arc<dyn ServiceApi>,
        channel: &TransportChannel,
        capacity: usize,
    ) -> Self {
        let mut feed = EventReconciler::new(channel).with_capacity(capacity);
        feed.subscribe();
        Self {
            api,
            scope: ViewScope::new(),
            services: SnapshotState::new(),
            feed,
        }
    }

    /// Fetch the services snapshot. Returns `false` if the view unmounted first.
    pub async fn load(&mut self) -> bool {
        self.services.begin();
        let Some(result) = self.scope.run(self.api.list_services()).await else {
            self.services.cancel();
            return false;
        };
        if let Err(e) = &result {
            warn!(error = %e, "dashboard snapshot failed");
        }
        self.services.apply(result);
        true
    }

    /// Services snapshot state.
    #[must_use]
    pub const fn services(&self) -> &SnapshotState<Vec<Service>> {
        &self.services
    }

    /// Stats over the last good snapshot.
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        self.services
            .data()
            .map(|services| DashboardStats::from_services(services))
            .unwrap_or_default()
    }

    /// Recent circuit events, newest first.
    #[must_use]
    pub fn recent_events(&self) -> Vec<FeedEntry> {
        self.feed.entries()
    }

    /// The view's event feed, e.g. to await [`EventReconciler::changed`].
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
