//! Session state and access gating.

mod guard;
mod storage;
mod store;

pub use guard::{entry_route, Gate, GuardState, Navigator, Route, SessionGuard};
pub use storage::{Credential, CredentialStorage, FileCredentialStorage, MemoryCredentialStorage};
pub use store::{SessionState, SessionStore};
