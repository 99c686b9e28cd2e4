use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use super::storage::{FileStore, MemoryStore};
use super::tokens::{Credential, TokenStore};

/// Explicit session state: the token store plus the in-memory login flag.
///
/// The flag starts out as "an access credential is present" and is never
/// persisted. Every change is published on a watch channel so the router
/// can rebuild its table.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct SessionContext {
    tokens: TokenStore,
    logged_in: Arc<watch::Sender<bool>>,
}

impl SessionContext {
    pub fn new(tokens: TokenStore) -> Self {
        let initial = tokens.has(Credential::Access);
        let (tx, _rx) = watch::channel(initial);
        Self {
            tokens,
            logged_in: Arc::new(tx),
        }
    }

    /// Fresh context over in-memory stores, one per test.
    pub fn in_memory() -> Self {
        Self::new(TokenStore::in_memory())
    }

    /// Persistent scope on disk under `data_dir`, session scope in memory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let persistent = FileStore::open_in(data_dir)?;
        let tokens = TokenStore::new(Arc::new(persistent), Arc::new(MemoryStore::new()));
        Ok(Self::new(tokens))
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn is_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }

    /// Update the login flag. Subscribers are only notified on a change.
    pub fn set_logged_in(&self, logged_in: bool) {
        let changed = self.logged_in.send_if_modified(|current| {
            if *current == logged_in {
                false
            } else {
                *current = logged_in;
                true
            }
        });
        if changed {
            info!(logged_in, "Login state changed");
        }
    }

    /// Subscribe to login-state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.logged_in.subscribe()
    }

    /// Drop every credential and the remember-me flag, and mark the
    /// session logged out.
    pub fn clear(&self) {
        self.tokens.remove_all();
        self.tokens.clear_remember_me();
        self.set_logged_in(false);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("tokens", &self.tokens)
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_follows_access_credential() {
        let tokens = TokenStore::in_memory();
        assert!(!SessionContext::new(tokens.clone()).is_logged_in());

        tokens.store(Credential::Access, "a");
        assert!(SessionContext::new(tokens).is_logged_in());
    }

    #[test]
    fn test_refresh_alone_does_not_log_in() {
        let tokens = TokenStore::in_memory();
        tokens.store(Credential::Refresh, "r");
        assert!(!SessionContext::new(tokens).is_logged_in());
    }

    #[test]
    fn test_subscribers_see_only_changes() {
        let session = SessionContext::in_memory();
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        session.set_logged_in(false);
        assert!(!rx.has_changed().unwrap());

        session.set_logged_in(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionContext::in_memory();
        let other = session.clone();
        other.set_logged_in(true);
        assert!(session.is_logged_in());

        other.tokens().store(Credential::Access, "a");
        assert!(session.tokens().has(Credential::Access));
    }

    #[test]
    fn test_clear_logs_out_and_drops_everything() {
        let session = SessionContext::in_memory();
        session.tokens().set_remember_me();
        session.tokens().store(Credential::Access, "a");
        session.tokens().store(Credential::Refresh, "r");
        session.set_logged_in(true);

        session.clear();
        assert!(!session.is_logged_in());
        assert!(!session.tokens().has(Credential::Access));
        assert!(!session.tokens().has(Credential::Refresh));
        assert!(!session.tokens().remember_me());
    }

    #[test]
    fn test_open_reads_persistent_tokens() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let session = SessionContext::open(dir.path()).expect("open");
            session.tokens().set_remember_me();
            session.tokens().store(Credential::Access, "kept");
        }

        let session = SessionContext::open(dir.path()).expect("reopen");
        assert!(session.is_logged_in());
        assert_eq!(session.tokens().get(Credential::Access).as_deref(), Some("kept"));
    }
}
