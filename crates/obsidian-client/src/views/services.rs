use std::sync::Arc;

use obsidian_proto::{Service, ServiceDraft, ServiceId};
use tracing::{info, warn};

use super::{failure_reason, Notifications, SnapshotState, ViewScope};
use crate::snapshot::ServiceApi;

/// Service registry management.
///
/// Every mutation reports its outcome as a notification. Success re-fetches
/// the table; failure leaves it untouched.
pub struct ServicesView {
    api: Arc<dyn ServiceApi>,
    scope: ViewScope,
    services: SnapshotState<Vec<Service>>,
    notifications: Notifications,
}

impl ServicesView {
    /// Mount the view. Call [`refresh`](Self::refresh) to fetch.
    pub fn mount(api: Arc<dyn ServiceApi>) -> Self {
        Self {
            api,
            scope: ViewScope::new(),
            services: SnapshotState::new(),
            notifications: Notifications::default(),
        }
    }

    /// Fetch the services table. A failure keeps the previous table.
    pub async fn refresh(&mut self) -> bool {
        self.services.begin();
        let Some(result) = self.scope.run(self.api.list_services()).await else {
            self.services.cancel();
            return false;
        };

        if let Err(e) = &result {
            warn!(error = %e, "failed to fetch services");
            self.notifications.error(
                "Failed to fetch services",
                "Could not load services. Please try again.",
            );
        }
        self.services.apply(result);
        true
    }

    /// Register a new service. Returns whether the backend accepted it.
    pub async fn register(&mut self, draft: &ServiceDraft) -> bool {
        let Some(result) = self.scope.run(self.api.create_service(draft)).await else {
            return false;
        };

        match result {
            Ok(()) => {
                info!(service_id = %draft.service_id, "service registered");
                self.notifications
                    .success("Service created", "Service has been registered successfully.");
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notifications.error(
                    "Operation failed",
                    failure_reason(&e, "Failed to save service."),
                );
                false
            }
        }
    }

    /// Update an existing service. Returns whether the backend accepted it.
    pub async fn update(&mut self, service_id: &ServiceId, draft: &ServiceDraft) -> bool {
        let Some(result) = self
            .scope
            .run(self.api.update_service(service_id, draft))
            .await
        else {
            return false;
        };

        match result {
            Ok(()) => {
                info!(service_id = %service_id, "service updated");
                self.notifications
                    .success("Service updated", "Service has been updated successfully.");
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notifications.error(
                    "Operation failed",
                    failure_reason(&e, "Failed to save service."),
                );
                false
            }
        }
    }

    /// Delete a service. Returns whether the backend accepted it.
    pub async fn delete(&mut self, service_id: &ServiceId) -> bool {
        let Some(result) = self.scope.run(self.api.delete_service(service_id)).await else {
            return false;
        };

        match result {
            Ok(()) => {
                info!(service_id = %service_id, "service deleted");
                self.notifications
                    .success("Service deleted", "Service has been removed successfully.");
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notifications.error(
                    "Delete failed",
                    failure_reason(&e, "Could not delete service. Please try again."),
                );
                false
            }
        }
    }

    /// Draft pre-filled from a listed service, for editing.
    #[must_use]
    pub fn edit_draft(&self, service_id: &ServiceId) -> Option<ServiceDraft> {
        self.services
            .data()?
            .iter()
            .find(|s| s.service_id == *service_id)
            .map(ServiceDraft::from)
    }

    /// Services table state.
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

    /// Unmount: abandon in-flight requests.
    pub fn unmount(&mut self) {
        self.scope.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::views::fake::{service, FakeApi};
    use crate::views::NoticeKind;
    use obsidian_proto::ServiceStatus;

    fn keys(view: &ServicesView) -> Vec<String> {
        view.services()
            .data()
            .map(|s| s.iter().map(|s| s.service_id.to_string()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_register_refetches() {
        let api = Arc::new(FakeApi::default());
        let mut view = ServicesView::mount(api);
        view.refresh().await;
        assert!(keys(&view).is_empty());

        let draft = ServiceDraft::new("Payment", "payment", "http://payments:8080");
        assert!(view.register(&draft).await);

        assert_eq!(keys(&view), vec!["payment".to_string()]);
        let notice = view.notifications().latest().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.title, "Service created");
    }

    #[tokio::test]
    async fn test_register_failure_keeps_table() {
        let api = Arc::new(FakeApi::with_services(vec![service("a", ServiceStatus::Healthy)]));
        let mut view = ServicesView::mount(Arc::clone(&api) as Arc<dyn ServiceApi>);
        view.refresh().await;

        api.fail_next(ClientError::Http {
            status: 409,
            message: "Service ID already exists".to_string(),
        });
        let draft = ServiceDraft::new("A again", "a", "http://a:8080");
        assert!(!view.register(&draft).await);

        assert_eq!(keys(&view), vec!["a".to_string()]);
        let notice = view.notifications().latest().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.description, "Service ID already exists");
    }

    #[tokio::test]
    async fn test_delete_then_failed_refetch_keeps_service_listed() {
        let api = Arc::new(FakeApi::with_services(vec![
            service("a", ServiceStatus::Healthy),
            service("b", ServiceStatus::Degraded),
        ]));
        let mut view = ServicesView::mount(Arc::clone(&api) as Arc<dyn ServiceApi>);
        view.refresh().await;

        api.fail_next_list(ClientError::Transport("refused".to_string()));
        assert!(view.delete(&ServiceId::new("a")).await);

        assert_eq!(keys(&view), vec!["a".to_string(), "b".to_string()]);
        assert!(view.services().error().is_some());

        let titles: Vec<&str> = view
            .notifications()
            .items()
            .iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Service deleted", "Failed to fetch services"]);
    }

    #[tokio::test]
    async fn test_delete_failure_notifies() {
        let api = Arc::new(FakeApi::with_services(vec![service("a", ServiceStatus::Healthy)]));
        let mut view = ServicesView::mount(Arc::clone(&api) as Arc<dyn ServiceApi>);
        view.refresh().await;

        api.fail_next(ClientError::Transport("refused".to_string()));
        assert!(!view.delete(&ServiceId::new("a")).await);

        let notice = view.notifications().latest().unwrap();
        assert_eq!(notice.title, "Delete failed");
        assert_eq!(notice.description, "Could not delete service. Please try again.");
        assert_eq!(keys(&view), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_update_and_edit_draft() {
        let api = Arc::new(FakeApi::with_services(vec![service("a", ServiceStatus::Healthy)]));
        let mut view = ServicesView::mount(api);
        view.refresh().await;

        let mut draft = view.edit_draft(&ServiceId::new("a")).unwrap();
        assert_eq!(draft.target_url, "http://a:8080");
        draft.name = "Renamed".to_string();

        assert!(view.update(&ServiceId::new("a"), &draft).await);
        let services = view.services().data().unwrap();
        assert_eq!(services[0].name, "Renamed");
        assert_eq!(view.notifications().latest().unwrap().title, "Service updated");
        assert!(view.edit_draft(&ServiceId::new("missing")).is_none());
    }
}
