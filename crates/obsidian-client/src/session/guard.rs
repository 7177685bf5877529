//! Gating privileged views on the session.

use std::fmt;

use obsidian_proto::ServiceId;
use tokio::sync::watch;
use tracing::debug;

use super::store::SessionState;

/// Navigable locations of the console.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Entry point; resolves to [`Route::Dashboard`] or [`Route::Login`].
    Root,
    /// Login entry point.
    Login,
    /// Overview of all services.
    Dashboard,
    /// Service registry management.
    Services,
    /// One service, its logs and its events.
    ServiceDetail(ServiceId),
    /// Log search.
    Logs,
}

impl Route {
    /// URL-style path of the route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::Services => "/services".to_string(),
            Self::ServiceDetail(id) => format!("/services/{id}"),
            Self::Logs => "/logs".to_string(),
        }
    }

    /// Whether the route requires a credential.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        !matches!(self, Self::Root | Self::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Where [`Route::Root`] leads. `None` while the session is still loading.
#[must_use]
pub fn entry_route(state: &SessionState) -> Option<Route> {
    if state.loading {
        None
    } else if state.credential.is_some() {
        Some(Route::Dashboard)
    } else {
        Some(Route::Login)
    }
}

/// Something that can move the user to another route.
pub trait Navigator {
    /// Navigate to `route`.
    fn redirect(&mut self, route: &Route);
}

/// Guard classification of a session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Credential not read yet.
    Loading,
    /// No credential.
    Unauthenticated,
    /// Credential present.
    Authenticated,
}

impl From<&SessionState> for GuardState {
    fn from(state: &SessionState) -> Self {
        if state.loading {
            Self::Loading
        } else if state.credential.is_some() {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

/// What a guarded view should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate<T> {
    /// Session still loading: show a placeholder.
    Placeholder,
    /// Not authenticated: render nothing.
    Hidden,
    /// Authenticated: the wrapped content.
    Content(T),
}

impl<T> Gate<T> {
    /// The content, if admitted.
    pub fn content(self) -> Option<T> {
        match self {
            Self::Content(content) => Some(content),
            Self::Placeholder | Self::Hidden => None,
        }
    }
}

/// Admits or redirects based on the session.
///
/// Redirects to [`Route::Login`] exactly once per transition into the
/// unauthenticated state.
#[derive(Debug)]
pub struct SessionGuard<N> {
    navigator: N,
    last: Option<GuardState>,
}

impl<N: Navigator> SessionGuard<N> {
    /// Create a guard that redirects through `navigator`.
    pub const fn new(navigator: N) -> Self {
        Self {
            navigator,
            last: None,
        }
    }

    /// Re-evaluate against `state`, redirecting if it just became
    /// unauthenticated.
    pub fn evaluate(&mut self, state: &SessionState) -> GuardState {
        let current = GuardState::from(state);
        if current == GuardState::Unauthenticated && self.last != Some(current) {
            debug!("session unauthenticated, redirecting to login");
            self.navigator.redirect(&Route::Login);
        }
        self.last = Some(current);
        current
    }

    /// Evaluate and produce the content only when authenticated.
    pub fn render<T>(&mut self, state: &SessionState, content: impl FnOnce() -> T) -> Gate<T> {
        match self.evaluate(state) {
            GuardState::Loading => Gate::Placeholder,
            GuardState::Unauthenticated => Gate::Hidden,
            GuardState::Authenticated => Gate::Content(content()),
        }
    }

    /// Wait for the next session change and evaluate it.
    ///
    /// Returns `None` once the session store is gone.
    pub async fn next_change(
        &mut self,
        session: &mut watch::Receiver<SessionState>,
    ) -> Option<GuardState> {
        session.changed().await.ok()?;
        let state = session.borrow_and_update().clone();
        Some(self.evaluate(&state))
    }

    /// The last evaluated classification.
    pub const fn last(&self) -> Option<GuardState> {
        self.last
    }

    /// Borrow the navigator.
    pub const fn navigator(&self) -> &N {
        &self.navigator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credential, MemoryCredentialStorage, SessionStore};

    #[derive(Debug, Default)]
    struct RecordingNavigator {
        redirects: Vec<Route>,
    }

    impl Navigator for RecordingNavigator {
        fn redirect(&mut self, route: &Route) {
            self.redirects.push(route.clone());
        }
    }

    fn state(credential: Option<&str>, loading: bool) -> SessionState {
        SessionState {
            credential: credential.map(|t| Credential::new(t).unwrap()),
            loading,
        }
    }

    #[test]
    fn test_loading_shows_placeholder_without_redirect() {
        let mut guard = SessionGuard::new(RecordingNavigator::default());
        let gate = guard.render(&state(None, true), || "dashboard");
        assert_eq!(gate, Gate::Placeholder);
        assert!(guard.navigator().redirects.is_empty());

        // Loading wins even if a credential is already present.
        let gate = guard.render(&state(Some("tok"), true), || "dashboard");
        assert_eq!(gate, Gate::Placeholder);
        assert!(guard.navigator().redirects.is_empty());
    }

    #[test]
    fn test_authenticated_renders_content() {
        let mut guard = SessionGuard::new(RecordingNavigator::default());
        let gate = guard.render(&state(Some("tok"), false), || "dashboard");
        assert_eq!(gate.content(), Some("dashboard"));
        assert!(guard.navigator().redirects.is_empty());
    }

    #[test]
    fn test_unauthenticated_redirects_once() {
        let mut guard = SessionGuard::new(RecordingNavigator::default());
        let anonymous = state(None, false);

        assert_eq!(guard.render(&anonymous, || ()), Gate::Hidden);
        assert_eq!(guard.render(&anonymous, || ()), Gate::Hidden);
        assert_eq!(guard.navigator().redirects, vec![Route::Login]);
    }

    #[test]
    fn test_redirect_per_transition() {
        let mut guard = SessionGuard::new(RecordingNavigator::default());

        guard.evaluate(&state(None, true));
        guard.evaluate(&state(Some("tok"), false));
        guard.evaluate(&state(None, false));
        guard.evaluate(&state(Some("tok2"), false));
        guard.evaluate(&state(None, false));

        assert_eq!(guard.navigator().redirects, vec![Route::Login, Route::Login]);
    }

    #[test]
    fn test_content_closure_not_called_when_hidden() {
        let mut guard = SessionGuard::new(RecordingNavigator::default());
        let gate: Gate<()> = guard.render(&state(None, false), || unreachable!());
        assert_eq!(gate, Gate::Hidden);
    }

    #[tokio::test]
    async fn test_follows_store_logout() {
        let store = SessionStore::new(MemoryCredentialStorage::new());
        store.init();
        store.login("tok").unwrap();

        let mut rx = store.subscribe();
        let mut guard = SessionGuard::new(RecordingNavigator::default());
        assert_eq!(
            guard.evaluate(&rx.borrow_and_update().clone()),
            GuardState::Authenticated
        );

        store.invalidate();
        assert_eq!(
            guard.next_change(&mut rx).await,
            Some(GuardState::Unauthenticated)
        );
        assert_eq!(guard.navigator().redirects, vec![Route::Login]);
    }

    #[test]
    fn test_entry_route() {
        assert_eq!(entry_route(&state(None, true)), None);
        assert_eq!(entry_route(&state(None, false)), Some(Route::Login));
        assert_eq!(entry_route(&state(Some("tok"), false)), Some(Route::Dashboard));
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::ServiceDetail(ServiceId::new("payment")).path(), "/services/payment");
        assert!(Route::Logs.is_protected());
        assert!(!Route::Login.is_protected());
    }
}
