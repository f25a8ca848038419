//! casenav - navigation state synchronizer
//!
//! Keeps the application-level "current view" of the case-documentation
//! tracker consistent with browser-style back/forward history:
//! - Validates every candidate state before committing it
//! - Serializes committed states to URLs and history entries
//! - Replays back/forward navigations from untrusted history entries
//! - Restores the last valid state whenever something goes wrong
//! - Snapshots the state into session storage for reloads
//!
//! The host (history stack, session storage, clock) is injected through the
//! traits in [`host`]; [`test_harness`] provides in-memory versions.
//!
//! # Example
//!
//! ```rust,ignore
//! use casenav::prelude::*;
//! use casenav::test_harness::{ManualClock, MemoryHistory, MemorySessionStorage};
//!
//! let controller = NavigationController::new(
//!     NavigationConfig::new(),
//!     MemoryHistory::new("/"),
//!     MemorySessionStorage::new(),
//!     ManualClock::new(),
//! )?;
//! let nav = NavigationHandle::attach(controller);
//! nav.navigate_to_view("settings", None);
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod query;
pub mod restore;
pub mod snapshot;
pub mod state;
pub mod test_harness;

pub use config::NavigationConfig;
pub use controller::{NavigationController, NavigationHandle, StateListener};
pub use error::{ConfigError, HostError, HostOperation, NavigationError, UrlError, ValidationError};
pub use host::{
    Clock, HistoryEvent, HistoryHandler, HistoryHost, NavigationKind, NoSessionStorage,
    SessionStorage, SubscriptionId, SystemClock,
};
pub use restore::RestoreWindow;
pub use snapshot::SessionSnapshotStore;
pub use state::{NavigationState, StateUpdate, StateValidator, UpdateOptions};

/// Re-export test harness for external use
pub use test_harness::{run_simulator, SimulatorConfig, TestHarness};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with casenav
    pub use crate::{
        HistoryEvent, HistoryHost, NavigationConfig, NavigationController, NavigationHandle,
        NavigationState, SessionStorage, StateUpdate, SystemClock, UpdateOptions,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
