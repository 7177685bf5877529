//! Request/response access to the backend's authoritative state.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use obsidian_proto::{ApiErrorBody, LogEntry, LogFilter, ProtoError, Service, ServiceDraft, ServiceId};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::session::SessionStore;

/// Snapshot and mutation operations on services and logs.
///
/// Every call is a single request with no retry.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// `GET /services`
    async fn list_services(&self) -> ClientResult<Vec<Service>>;

    /// `GET /services/:serviceId`
    async fn get_service(&self, service_id: &ServiceId) -> ClientResult<Service>;

    /// `GET /logs` with the filter's non-empty fields as query parameters.
    async fn list_logs(&self, filter: &LogFilter) -> ClientResult<Vec<LogEntry>>;

    /// `POST /services`
    async fn create_service(&self, draft: &ServiceDraft) -> ClientResult<()>;

    /// `PUT /services/:serviceId`. The draft may not change the key.
    async fn update_service(&self, service_id: &ServiceId, draft: &ServiceDraft)
    -> ClientResult<()>;

    /// `DELETE /services/:serviceId`
    async fn delete_service(&self, service_id: &ServiceId) -> ClientResult<()>;
}

/// HTTP implementation of [`ServiceApi`].
///
/// Attaches the session's bearer token to every request. A `401` response
/// invalidates the session.
#[derive(Clone)]
pub struct SnapshotLoader {
    http: reqwest::Client,
    base: Url,
    session: SessionStore,
}

impl SnapshotLoader {
    /// Create a loader for the REST surface at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments or the
    /// HTTP client cannot be built.
    pub fn new(base: Url, session: SessionStore, timeout: Duration) -> ClientResult<Self> {
        if base.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "api_url '{base}' cannot be used as a base URL"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            session,
        })
    }

    /// Base URL of the REST surface.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config(format!("'{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Transport("request timed out".to_string())
            } else {
                ClientError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "snapshot response");

        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = ApiErrorBody::message_from(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            warn!(status = status.as_u16(), message = %message, "snapshot request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl fmt::Debug for SnapshotLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotLoader")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

fn validate_draft(draft: &ServiceDraft) -> ClientResult<()> {
    draft.validate().map_err(|e| match e {
        ProtoError::Validation(message) => ClientError::Validation(message),
        other => ClientError::Proto(other),
    })
}

#[async_trait]
impl ServiceApi for SnapshotLoader {
    async fn list_services(&self) -> ClientResult<Vec<Service>> {
        let url = self.endpoint(&["services"])?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn get_service(&self, service_id: &ServiceId) -> ClientResult<Service> {
        let url = self.endpoint(&["services", service_id.as_str()])?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn list_logs(&self, filter: &LogFilter) -> ClientResult<Vec<LogEntry>> {
        let mut url = self.endpoint(&["logs"])?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn create_service(&self, draft: &ServiceDraft) -> ClientResult<()> {
        validate_draft(draft)?;
        let url = self.endpoint(&["services"])?;
        self.send(self.request(Method::POST, url).json(draft)).await?;
        debug!(service_id = %draft.service_id, "service created");
        Ok(())
    }

    async fn update_service(
        &self,
        service_id: &ServiceId,
        draft: &ServiceDraft,
    ) -> ClientResult<()> {
        if draft.service_id != *service_id {
            return Err(ClientError::Validation(format!(
                "serviceId cannot change (was '{service_id}', got '{}')",
                draft.service_id
            )));
        }
        validate_draft(draft)?;

        let url = self.endpoint(&["services", service_id.as_str()])?;
        self.send(self.request(Method::PUT, url).json(draft)).await?;
        debug!(service_id = %service_id, "service updated");
        Ok(())
    }

    async fn delete_service(&self, service_id: &ServiceId) -> ClientResult<()> {
        let url = self.endpoint(&["services", service_id.as_str()])?;
        self.send(self.request(Method::DELETE, url)).await?;
        debug!(service_id = %service_id, "service deleted");
        Ok(())
    }
}
