//! The console context.

use std::sync::Arc;

use obsidian_proto::ServiceId;
use tracing::info;

use crate::channel::TransportChannel;
use crate::config::ConsoleConfig;
use crate::error::ClientResult;
use crate::session::{
    CredentialStorage, FileCredentialStorage, MemoryCredentialStorage, SessionStore,
};
use crate::snapshot::{ServiceApi, SnapshotLoader};
use crate::views::{DashboardView, LogsView, ServiceDetailView, ServicesView};

/// Owner of the session, the push channel and the snapshot loader.
///
/// Build one per process and hand it to views by reference.
#[derive(Clone)]
pub struct Console {
    config: ConsoleConfig,
    session: SessionStore,
    channel: TransportChannel,
    api: Arc<dyn ServiceApi>,
}

impl Console {
    /// Build a console from configuration and initialize its session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ConsoleConfig) -> ClientResult<Self> {
        config.validate()?;

        let session = match config.credential_path() {
            Some(path) => SessionStore::new(FileCredentialStorage::new(path)),
            None => SessionStore::new(MemoryCredentialStorage::new()),
        };
        Self::with_session(config, session)
    }

    /// Build a console around a custom credential store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_storage(
        config: ConsoleConfig,
        storage: impl CredentialStorage + 'static,
    ) -> ClientResult<Self> {
        config.validate()?;
        Self::with_session(config, SessionStore::new(storage))
    }

    fn with_session(config: ConsoleConfig, session: SessionStore) -> ClientResult<Self> {
        session.init();

        let loader = SnapshotLoader::new(
            config.api_base()?,
            session.clone(),
            config.request_timeout(),
        )?;
        let channel = TransportChannel::with_reconnect(
            config.socket_endpoint()?.as_str(),
            config.reconnect.to_reconnect_config(),
        );

        info!(api = %config.api_url, socket = %config.socket_url, "console ready");
        Ok(Self {
            config,
            session,
            channel,
            api: Arc::new(loader),
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// The session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The shared push channel.
    #[must_use]
    pub const fn channel(&self) -> &TransportChannel {
        &self.channel
    }

    /// The snapshot API.
    #[must_use]
    pub fn api(&self) -> Arc<dyn ServiceApi> {
        Arc::clone(&self.api)
    }

    /// Mount the dashboard.
    #[must_use]
    pub fn dashboard(&self) -> DashboardView {
        DashboardView::mount_with_capacity(self.api(), &self.channel, self.config.feed_capacity)
    }

    /// Mount the services registry.
    #[must_use]
    pub fn services(&self) -> ServicesView {
        ServicesView::mount(self.api())
    }

    /// Mount the detail view of one service.
    #[must_use]
    pub fn service_detail(&self, service_id: impl Into<ServiceId>) -> ServiceDetailView {
        ServiceDetailView::mount(self.api(), &self.channel, service_id)
    }

    /// Mount the log search.
    #[must_use]
    pub fn logs(&self) -> LogsView {
        LogsView::mount(self.api())
    }

    /// Disconnect the push channel.
    pub fn shutdown(&self) {
        self.channel.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credential;

    #[test]
    fn test_console_initializes_session() {
        let storage = MemoryCredentialStorage::with_credential(Credential::new("tok").unwrap());
        let console = Console::with_storage(ConsoleConfig::default(), storage).unwrap();

        assert!(console.session().state().is_authenticated());
        assert!(!console.channel().is_connected());
        assert_eq!(console.channel().url(), "ws://localhost:3001/");
    }

    #[test]
    fn test_console_rejects_invalid_config() {
        let config = ConsoleConfig::default().with_api_url("not a url");
        assert!(Console::with_storage(config, MemoryCredentialStorage::new()).is_err());
    }

    #[test]
    fn test_console_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ConsoleConfig::default().with_credential_path(dir.path().join("credential.json"));

        let console = Console::new(config.clone()).unwrap();
        assert!(!console.session().state().is_authenticated());
        console.session().login("tok").unwrap();

        let reopened = Console::new(config).unwrap();
        assert!(reopened.session().state().is_authenticated());
    }

    #[test]
    fn test_views_share_channel() {
        let console =
            Console::with_storage(ConsoleConfig::default(), MemoryCredentialStorage::new())
                .unwrap();
        let _dashboard = console.dashboard();
        let _detail = console.service_detail("payment");

        assert_eq!(
            console
                .channel()
                .handler_count(obsidian_proto::CIRCUIT_STATE_CHANGE),
            2
        );
    }
}
