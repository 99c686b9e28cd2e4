//! Authentication state for the client.
//!
//! This module provides:
//! - `TokenStore`: access/refresh credentials split across a persistent and
//!   a session scope, selected by the remember-me flag
//! - `SessionContext`: the token store plus the in-memory login flag, with
//!   change notifications for the router
//! - `KeyValueStore` backends: `FileStore` (persistent) and `MemoryStore`
//!   (session)

pub mod session;
pub mod storage;
pub mod tokens;

pub use session::SessionContext;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tokens::{Credential, Scope, TokenStore, REMEMBER_ME_KEY};
