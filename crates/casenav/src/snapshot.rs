//! Best-effort session snapshot of the last committed state
//!
//! Nothing here ever fails outward. Writes that the host refuses are
//! dropped; reads that fail or return garbage yield `None`. The store does
//! not validate what it loads, the controller does.

use crate::host::{NavigationKind, SessionStorage};
use crate::state::NavigationState;
use serde_json::Value;
use tracing::trace;

/// Snapshot slot in session storage
pub struct SessionSnapshotStore {
    storage: Box<dyn SessionStorage>,
    key: String,
}

impl std::fmt::Debug for SessionSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSnapshotStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl SessionSnapshotStore {
    /// Store writing under `key`
    pub fn new(storage: impl SessionStorage + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.into(),
        }
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write `state`, ignoring every failure
    pub fn save(&self, state: &NavigationState) {
        let text = match serde_json::to_string(state) {
            Ok(text) => text,
            Err(e) => {
                trace!("snapshot not serialized: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.write(&self.key, &text) {
            trace!(key = %self.key, "snapshot not saved: {e}");
        }
    }

    /// Read the last snapshot as an unvalidated payload
    #[must_use]
    pub fn load(&self) -> Option<Value> {
        let text = match self.storage.read(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                trace!(key = %self.key, "snapshot not read: {e}");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                trace!(key = %self.key, "snapshot not parsed: {e}");
                None
            }
        }
    }

    /// Whether the current load looks like a reload of the same page
    #[must_use]
    pub fn is_reload(&self) -> bool {
        self.storage.navigation_kind() == NavigationKind::Reload
    }
}
