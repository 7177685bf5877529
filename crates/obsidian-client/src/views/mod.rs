//! Headless view controllers.
//!
//! Each controller composes the snapshot loader, an event reconciler and a
//! [`ViewScope`]. Front ends render from the controller's state; nothing here
//! knows about terminals or widgets.

mod dashboard;
mod detail;
mod logs;
mod services;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

pub use dashboard::{DashboardStats, DashboardView};
pub use detail::ServiceDetailView;
pub use logs::LogsView;
pub use services::ServicesView;

/// Lifetime of a mounted view.
///
/// Work run through the scope is abandoned once the view unmounts, so a
/// late response never lands in a view that is gone.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    /// A fresh, mounted scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` unless the scope is unmounted first.
    pub async fn run<F: Future>(&self, work: F) -> Option<F::Output> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            output = work => Some(output),
        }
    }

    /// Unmount; pending and future work is dropped.
    pub fn unmount(&self) {
        self.token.cancel();
    }

    /// Whether the view is still mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// State of one dataset a view displays.
///
/// A failed fetch keeps the last good data and records the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotState<T> {
    data: Option<T>,
    error: Option<String>,
    loading: bool,
}

impl<T> Default for SnapshotState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

impl<T> SnapshotState<T> {
    /// Empty state, not loading.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a fetch as started.
    pub fn begin(&mut self) {
        self.loading = true;
    }

    /// Record a fetch result.
    pub fn apply(&mut self, result: Result<T, ClientError>) {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Abandon a started fetch without a result.
    pub fn cancel(&mut self) {
        self.loading = false;
    }

    /// Last good data.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Error of the latest fetch, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }
}

/// Kind of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// An operation succeeded.
    Success,
    /// An operation failed.
    Error,
}

/// A dismissible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Handle for [`Notifications::dismiss`].
    pub id: u64,
    /// Success or error.
    pub kind: NoticeKind,
    /// Short headline.
    pub title: String,
    /// Detail text.
    pub description: String,
}

/// Pending notifications, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    next_id: u64,
    items: Vec<Notice>,
}

impl Notifications {
    /// Add a success notice and return its id.
    pub fn success(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(NoticeKind::Success, title.into(), description.into())
    }

    /// Add an error notice and return its id.
    pub fn error(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(NoticeKind::Error, title.into(), description.into())
    }

    fn push(&mut self, kind: NoticeKind, title: String, description: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Notice {
            id,
            kind,
            title,
            description,
        });
        id
    }

    /// Remove a notice. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|notice| notice.id != id);
        self.items.len() != before
    }

    /// Remove and return every notice.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.items)
    }

    /// Pending notices.
    #[must_use]
    pub fn items(&self) -> &[Notice] {
        &self.items
    }

    /// Most recent notice.
    #[must_use]
    pub fn latest(&self) -> Option<&Notice> {
        self.items.last()
    }
}

/// Human-readable reason for a failed mutation.
pub(crate) fn failure_reason(error: &ClientError, fallback: &str) -> String {
    match error {
        ClientError::Http { message, .. } | ClientError::Validation(message) => message.clone(),
        ClientError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory [`ServiceApi`] for controller tests.

    use std::collections::VecDeque;

    use async_trait::async_trait;
    use obsidian_proto::{LogEntry, LogFilter, Service, ServiceDraft, ServiceId, ServiceStatus};
    use parking_lot::Mutex;

    use crate::error::{ClientError, ClientResult};
    use crate::snapshot::ServiceApi;

    #[derive(Debug, Default)]
    pub struct FakeApi {
        pub services: Mutex<Vec<Service>>,
        pub logs: Mutex<Vec<LogEntry>>,
        pub log_queries: Mutex<Vec<LogFilter>>,
        /// Errors returned by the next calls, in order, before normal behavior resumes.
        pub failures: Mutex<VecDeque<ClientError>>,
        /// Errors returned by the next `list_services` calls only.
        pub list_failures: Mutex<VecDeque<ClientError>>,
        pub list_delay: Mutex<Option<std::time::Duration>>,
    }

    pub fn service(key: &str, status: ServiceStatus) -> Service {
        Service {
            id: format!("id-{key}"),
            name: key.to_uppercase(),
            service_id: ServiceId::new(key),
            target_url: format!("http://{key}:8080"),
            status,
        }
    }

    impl FakeApi {
        pub fn with_services(services: Vec<Service>) -> Self {
            Self {
                services: Mutex::new(services),
                ..Self::default()
            }
        }

        pub fn fail_next(&self, error: ClientError) {
            self.failures.lock().push_back(error);
        }

        pub fn fail_next_list(&self, error: ClientError) {
            self.list_failures.lock().push_back(error);
        }

        fn take_failure(&self) -> ClientResult<()> {
            match self.failures.lock().pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ServiceApi for FakeApi {
        async fn list_services(&self) -> ClientResult<Vec<Service>> {
            let delay = *self.list_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = self.list_failures.lock().pop_front() {
                return Err(error);
            }
            self.take_failure()?;
            Ok(self.services.lock().clone())
        }

        async fn get_service(&self, service_id: &ServiceId) -> ClientResult<Service> {
            self.take_failure()?;
            self.services
                .lock()
                .iter()
                .find(|s| s.service_id == *service_id)
                .cloned()
                .ok_or_else(|| ClientError::Http {
                    status: 404,
                    message: "Service not found".to_string(),
                })
        }

        async fn list_logs(&self, filter: &LogFilter) -> ClientResult<Vec<LogEntry>> {
            self.take_failure()?;
            self.log_queries.lock().push(filter.clone());
            let logs = self.logs.lock();
            Ok(logs
                .iter()
                .filter(|log| {
                    filter
                        .service_id
                        .as_deref()
                        .is_none_or(|key| log.service_id == key)
                })
                .filter(|log| {
                    filter
                        .level
                        .as_deref()
                        .is_none_or(|level| log.level.as_str().eq_ignore_ascii_case(level))
                })
                .filter(|log| {
                    filter
                        .search
                        .as_deref()
                        .is_none_or(|needle| log.message.contains(needle))
                })
                .cloned()
                .collect())
        }

        async fn create_service(&self, draft: &ServiceDraft) -> ClientResult<()> {
            self.take_failure()?;
            let mut services = self.services.lock();
            let id = format!("id-{}", services.len() + 1);
            services.push(Service {
                id,
                name: draft.name.clone(),
                service_id: draft.service_id.clone(),
                target_url: draft.target_url.clone(),
                status: ServiceStatus::Unknown,
            });
            Ok(())
        }

        async fn update_service(
            &self,
            service_id: &ServiceId,
            draft: &ServiceDraft,
        ) -> ClientResult<()> {
            self.take_failure()?;
            let mut services = self.services.lock();
            let service = services
                .iter_mut()
                .find(|s| s.service_id == *service_id)
                .ok_or_else(|| ClientError::Http {
                    status: 404,
                    message: "Service not found".to_string(),
                })?;
            service.name.clone_from(&draft.name);
            service.target_url.clone_from(&draft.target_url);
            Ok(())
        }

        async fn delete_service(&self, service_id: &ServiceId) -> ClientResult<()> {
            self.take_failure()?;
            self.services.lock().retain(|s| s.service_id != *service_id);
            Ok(())
        }
    }
}
