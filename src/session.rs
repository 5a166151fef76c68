//! Cross-request session registry.
//!
//! Maps a caller-supplied context id to the session handle the claude CLI
//! reported in its `init` message, enabling `--resume` on the next turn of
//! the same conversation. The store is injected into the executor so tests
//! can observe and seed it directly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Keyed store of claude session handles, one per conversation context.
///
/// Implementations must provide per-key atomic get/set; concurrent
/// executions on different contexts must not interfere.
pub trait SessionStore: Send + Sync {
    /// Look up the session handle recorded for `context_id`.
    fn get(&self, context_id: &str) -> Option<String>;

    /// Record (or overwrite) the session handle for `context_id`.
    ///
    /// Later `init` messages replace the stored handle wholesale; entries
    /// never expire.
    fn set(&self, context_id: &str, session_id: String);
}

/// Process-local [`SessionStore`] backed by a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contexts with a recorded session handle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no context has a recorded handle yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, context_id: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(context_id)
            .cloned()
    }

    fn set(&self, context_id: &str, session_id: String) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context_id.to_owned(), session_id);
    }
}
