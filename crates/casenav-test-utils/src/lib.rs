//! Testing utilities for the casenav workspace
//!
//! Shared fixtures: a controller wired to an in-memory host, state
//! builders and a catalogue of corrupted history payloads.

#![allow(missing_docs)]

use casenav::test_harness::{ManualClock, MemoryHistory, MemorySessionStorage};
use casenav::{NavigationConfig, NavigationController, NavigationHandle, NavigationKind, NavigationState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_VIEW: &str = "dashboard";

/// Controller attached to an in-memory host, with the host kept reachable
pub struct TestNavigator {
    pub nav: NavigationHandle,
    pub history: Arc<MemoryHistory>,
    pub storage: Arc<MemorySessionStorage>,
    pub clock: Arc<ManualClock>,
}

impl TestNavigator {
    /// Navigator whose host starts at `/`
    pub fn new() -> Self {
        Self::at("/")
    }

    /// Navigator whose host starts at `url`
    pub fn at(url: &str) -> Self {
        Self::build(url, MemorySessionStorage::new(), NavigationConfig::default())
    }

    /// Navigator with full control over the host and configuration
    pub fn build(url: &str, storage: MemorySessionStorage, config: NavigationConfig) -> Self {
        let history = Arc::new(MemoryHistory::new(url));
        let storage = Arc::new(storage);
        let clock = Arc::new(ManualClock::new());
        let controller = NavigationController::new(
            config,
            Arc::clone(&history),
            Arc::clone(&storage),
            Arc::clone(&clock),
        )
        .unwrap();
        Self {
            nav: NavigationHandle::attach(controller),
            history,
            storage,
            clock,
        }
    }

    /// Current controller state
    pub fn state(&self) -> NavigationState {
        self.nav.state()
    }

    /// Let the restore window elapse
    pub fn settle(&self) {
        self.clock.advance(Duration::from_secs(1));
    }
}

impl Default for TestNavigator {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage pretending the page was reloaded, holding `snapshot` under the default key
pub fn reloaded_storage_with(snapshot: &str) -> MemorySessionStorage {
    let storage = MemorySessionStorage::new().with_navigation_kind(NavigationKind::Reload);
    storage.set(&NavigationConfig::default().snapshot_key, snapshot);
    storage
}

/// State with every field set to something non-default
pub fn full_state() -> NavigationState {
    NavigationState::initial("staff-42")
        .with_staff("42")
        .with_search("overdue notes")
}

/// Payloads that must never be accepted
pub fn corrupted_payloads() -> Vec<Value> {
    vec![
        json!({"activeView": null}),
        json!({"activeView": null, "activeStaffId": null, "searchTerm": ""}),
        json!({"activeView": "", "activeStaffId": null, "searchTerm": ""}),
        json!({"activeView": 3, "activeStaffId": null, "searchTerm": ""}),
        json!({"activeView": "clients", "activeStaffId": {}, "searchTerm": ""}),
        json!({"activeView": "clients", "activeStaffId": [], "searchTerm": ""}),
        json!({"activeView": "clients", "activeStaffId": 1, "searchTerm": ""}),
        json!({"activeView": "clients", "activeStaffId": null}),
        json!({"activeView": "clients", "activeStaffId": null, "searchTerm": false}),
        json!({}),
    ]
}
