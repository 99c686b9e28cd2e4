use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::storage::{KeyValueStore, MemoryStore};

/// Storage key for the remember-me flag. Only its presence matters.
pub const REMEMBER_ME_KEY: &str = "RememberMe";

/// Value written for the remember-me flag
const REMEMBER_ME_VALUE: &str = "true";

/// The two credentials a session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    Access,
    Refresh,
}

impl Credential {
    pub const ALL: [Credential; 2] = [Credential::Access, Credential::Refresh];

    /// Fixed storage key for this credential
    pub fn key(&self) -> &'static str {
        match self {
            Credential::Access => "AccessToken",
            Credential::Refresh => "RefreshToken",
        }
    }

    /// Field name carrying this credential in API response bodies
    pub fn response_field(&self) -> &'static str {
        match self {
            Credential::Access => "access",
            Credential::Refresh => "refresh",
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which backend a credential lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Persistent,
    Session,
}

/// Reads and writes credentials across the persistent and session scopes.
///
/// Reads prefer the persistent scope. Writes go to exactly one scope, picked
/// by the remember-me flag. Removal always clears both.
///
/// A write does not clear the opposite scope, so a stale session copy can
/// outlive a newer persistent one until it is removed.
#[derive(Clone)]
pub struct TokenStore {
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// Both scopes in memory. Used by tests and short-lived tools.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn get(&self, credential: Credential) -> Option<String> {
        let key = credential.key();
        self.persistent.get(key).or_else(|| self.session.get(key))
    }

    pub fn has(&self, credential: Credential) -> bool {
        self.get(credential).is_some()
    }

    /// Write `value`, returning the scope it landed in.
    pub fn store(&self, credential: Credential, value: &str) -> Scope {
        let scope = self.write_scope();
        match scope {
            Scope::Persistent => self.persistent.set(credential.key(), value),
            Scope::Session => self.session.set(credential.key(), value),
        }
        debug!(credential = %credential, ?scope, "Stored credential");
        scope
    }

    pub fn remove(&self, credential: Credential) {
        self.persistent.remove(credential.key());
        self.session.remove(credential.key());
        debug!(credential = %credential, "Removed credential from both scopes");
    }

    /// Remove every credential. The remember-me flag is left alone.
    pub fn remove_all(&self) {
        for credential in Credential::ALL {
            self.remove(credential);
        }
    }

    pub fn remember_me(&self) -> bool {
        self.persistent.contains(REMEMBER_ME_KEY)
    }

    pub fn set_remember_me(&self) {
        self.persistent.set(REMEMBER_ME_KEY, REMEMBER_ME_VALUE);
    }

    pub fn clear_remember_me(&self) {
        self.persistent.remove(REMEMBER_ME_KEY);
    }

    /// Scope the next `store` call will write to
    pub fn write_scope(&self) -> Scope {
        if self.remember_me() {
            Scope::Persistent
        } else {
            Scope::Session
        }
    }

    /// Value held in one specific scope, bypassing the persistent-first lookup
    pub fn get_in(&self, scope: Scope, credential: Credential) -> Option<String> {
        match scope {
            Scope::Persistent => self.persistent.get(credential.key()),
            Scope::Session => self.session.get(credential.key()),
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Credential values stay out of logs
        f.debug_struct("TokenStore")
            .field("access", &self.has(Credential::Access))
            .field("refresh", &self.has(Credential::Refresh))
            .field("remember_me", &self.remember_me())
            .finish()
    }
}
