//! The process-wide session store.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::storage::{Credential, CredentialStorage};
use crate::error::ClientResult;

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Current credential, if any.
    pub credential: Option<Credential>,
    /// True until the persisted credential has been read.
    pub loading: bool,
}

impl SessionState {
    /// Whether privileged content may be shown.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !self.loading && self.credential.is_some()
    }

    /// The bearer token, if a credential is held.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.credential.as_ref().map(Credential::token)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            credential: None,
            loading: true,
        }
    }
}

/// Holder of the console's credential.
///
/// Constructed explicitly and shared by cloning; every clone sees the same
/// state. Dependents learn about changes through [`subscribe`](Self::subscribe).
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    storage: Box<dyn CredentialStorage>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Create a store backed by `storage`. The store starts in the loading
    /// state; call [`init`](Self::init) to read the persisted credential.
    #[must_use]
    pub fn new(storage: impl CredentialStorage + 'static) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(StoreInner {
                storage: Box::new(storage),
                state,
            }),
        }
    }

    /// Read the persisted credential and leave the loading state.
    ///
    /// A storage failure is logged and treated as "no credential".
    pub fn init(&self) {
        let credential = match self.inner.storage.load() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "could not read stored credential");
                None
            }
        };

        info!(authenticated = credential.is_some(), "session initialized");
        self.inner.state.send_replace(SessionState {
            credential,
            loading: false,
        });
    }

    /// Accept a new credential and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is blank or cannot be persisted; the
    /// session is left unchanged in that case.
    pub fn login(&self, token: impl Into<String>) -> ClientResult<()> {
        let credential = Credential::new(token)?;
        self.inner.storage.save(&credential)?;

        self.inner.state.send_replace(SessionState {
            credential: Some(credential),
            loading: false,
        });
        info!("session authenticated");
        Ok(())
    }

    /// Drop the credential from memory and from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted copy cannot be removed. The in-memory
    /// credential is cleared regardless.
    pub fn logout(&self) -> ClientResult<()> {
        self.clear_memory();
        info!("session logged out");
        self.inner.storage.clear()
    }

    /// Drop the credential after the backend rejected it.
    ///
    /// The persisted copy is removed best-effort.
    pub fn invalidate(&self) {
        if !self.clear_memory() {
            return;
        }
        warn!("credential rejected, session invalidated");
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "could not remove stored credential");
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token().map(str::to_string)
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Returns whether anything changed.
    fn clear_memory(&self) -> bool {
        self.inner
            .state
            .send_if_modified(|state| state.credential.take().is_some())
    }
}
