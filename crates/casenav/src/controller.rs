//! Navigation controller
//!
//! The single source of truth for where the UI currently is. It:
//! - Merges partial updates into candidate states and validates them
//! - Commits valid candidates, records them as the last valid state and
//!   mirrors them into host history and the session snapshot
//! - Replays back/forward navigations reported by the host
//! - Restores the last valid state whenever a candidate, a history entry or
//!   a history call goes wrong
//!
//! No operation returns an error or panics on bad input. The worst a caller
//! observes is a navigation silently reverting to the previous valid screen.
//!
//! # Example
//!
//! ```rust,ignore
//! use casenav::{NavigationConfig, NavigationController, NavigationHandle, SystemClock};
//!
//! let controller = NavigationController::new(config, history, storage, SystemClock::new())?;
//! let nav = NavigationHandle::attach(controller);
//! nav.navigate_to_staff("42");
//! assert_eq!(nav.state().active_view, "staff-42");
//! ```

use crate::config::NavigationConfig;
use crate::error::NavigationError;
use crate::host::{Clock, HistoryEvent, HistoryHandler, HistoryHost, SessionStorage, SubscriptionId};
use crate::query;
use crate::restore::RestoreWindow;
use crate::snapshot::SessionSnapshotStore;
use crate::state::{NavigationState, StateUpdate, StateValidator, UpdateOptions, STAFF_VIEW_PREFIX};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked once per committed state
pub type StateListener = Box<dyn FnMut(&NavigationState) + Send>;

/// Owner of the current navigation state
pub struct NavigationController {
    config: NavigationConfig,
    history: Box<dyn HistoryHost>,
    snapshots: SessionSnapshotStore,
    clock: Box<dyn Clock>,
    current: NavigationState,
    last_valid: NavigationState,
    restore_window: RestoreWindow,
    listener: Option<StateListener>,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("config", &self.config)
            .field("current", &self.current)
            .field("last_valid", &self.last_valid)
            .field("restore_window", &self.restore_window)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl NavigationController {
    /// Create a controller and derive its initial state from the host
    ///
    /// The current URL wins when it carries navigation parameters. A bare
    /// URL on a reload adopts the session snapshot if it validates. A URL
    /// that cannot be parsed leaves the default state in place and rewrites
    /// the entry. No history entry is pushed.
    ///
    /// # Errors
    /// Fails only when `config` is invalid.
    pub fn new(
        config: NavigationConfig,
        history: impl HistoryHost + 'static,
        storage: impl SessionStorage + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self, NavigationError> {
        config.validate()?;

        let initial = NavigationState::initial(&config.default_view);
        let mut controller = Self {
            snapshots: SessionSnapshotStore::new(storage, config.snapshot_key.clone()),
            restore_window: RestoreWindow::new(config.restore_window()),
            config,
            history: Box::new(history),
            clock: Box::new(clock),
            current: initial.clone(),
            last_valid: initial,
            listener: None,
        };
        controller.initialize();
        Ok(controller)
    }

    fn initialize(&mut self) {
        let url = self.history.current_url();
        let from_url = match query::from_url(&url, &self.config.default_view) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring initial location: {e}");
                self.replace_entry();
                return;
            }
        };

        if !query::has_navigation_params(&url) {
            if let Some(snapshot) = self.reload_snapshot() {
                debug!(view = %snapshot.active_view, "Adopting session snapshot");
                self.adopt(snapshot);
                self.replace_entry();
                return;
            }
        }

        match StateValidator::validate(&from_url) {
            Ok(()) => self.adopt(from_url),
            Err(e) => warn!(%url, "Ignoring initial location: {e}"),
        }
    }

    fn reload_snapshot(&self) -> Option<NavigationState> {
        if !self.config.restore_snapshot_on_reload || !self.snapshots.is_reload() {
            return None;
        }
        let payload = self.snapshots.load()?;
        match StateValidator::validate_payload(&payload) {
            Ok(state) => Some(state),
            Err(e) => {
                debug!("Discarding session snapshot: {e}");
                None
            }
        }
    }

    fn adopt(&mut self, state: NavigationState) {
        self.current = state.clone();
        self.last_valid = state;
    }

    // ---------------------------------------------------------------------
    // Read-only accessors
    // ---------------------------------------------------------------------

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &NavigationState {
        &self.current
    }

    /// Currently displayed screen
    #[inline]
    #[must_use]
    pub fn active_view(&self) -> &str {
        &self.current.active_view
    }

    /// Associated staff id
    #[inline]
    #[must_use]
    pub fn active_staff_id(&self) -> Option<&str> {
        self.current.active_staff_id.as_deref()
    }

    /// Active search filter
    #[inline]
    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.current.search_term
    }

    /// Recovery anchor
    #[inline]
    #[must_use]
    pub fn last_valid_state(&self) -> &NavigationState {
        &self.last_valid
    }

    /// Whether the post-restore window is open
    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.restore_window.peek(self.clock.as_ref())
    }

    /// URL of the current state
    #[must_use]
    pub fn current_url(&self) -> String {
        query::to_url(&self.current, &self.config.default_view)
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Register the commit listener, replacing any previous one
    pub fn set_on_state_change(&mut self, listener: impl FnMut(&NavigationState) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Remove the commit listener
    pub fn clear_on_state_change(&mut self) {
        self.listener = None;
    }

    // ---------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------

    /// Merge `update` onto the current state and commit it if valid
    ///
    /// An invalid candidate is dropped and the last valid state restored.
    pub fn update_state(&mut self, update: StateUpdate, options: UpdateOptions) {
        let candidate = update.apply_to(&self.current);

        if !options.skip_validation {
            if let Err(e) = StateValidator::validate(&candidate) {
                self.recover(e.into());
                return;
            }
        }

        self.commit(candidate, options.push_history);
    }

    fn commit(&mut self, state: NavigationState, push_history: bool) {
        debug_assert!(
            StateValidator::validate(&state).is_ok(),
            "committing unvalidated state {state:?}"
        );
        self.adopt(state);

        if push_history {
            if self.restore_window.is_open(self.clock.as_ref()) {
                debug!("History push suppressed while restoring");
            } else {
                self.push_entry();
            }
        }

        self.snapshots.save(&self.current);
        debug!(
            view = %self.current.active_view,
            staff = ?self.current.active_staff_id,
            "Committed navigation state"
        );

        if let Some(listener) = self.listener.as_mut() {
            listener(&self.current);
        }
    }

    /// Revert to the last valid state and rewrite the current history entry
    ///
    /// Opens the `restoring` window so pushes issued right after are not
    /// mixed up with the restore. Calling it repeatedly is harmless.
    pub fn restore_valid_state(&mut self) {
        self.current = self.last_valid.clone();
        self.restore_window.open(self.clock.as_ref());
        warn!(
            view = %self.current.active_view,
            window = ?self.restore_window.length(),
            "Restoring last valid navigation state"
        );
        self.replace_entry();
    }

    /// React to a back/forward navigation reported by the host
    ///
    /// A payload that is a JSON object is authoritative; otherwise the
    /// entry URL is parsed. Anything that does not validate triggers a
    /// restore. History is never pushed, the host has already moved.
    pub fn on_history_event(&mut self, event: &HistoryEvent) {
        match self.resolve_event(event) {
            Ok(state) => {
                self.update_state(StateUpdate::replace_with(state), UpdateOptions::replay());
            }
            Err(e) => {
                debug!(url = %event.url, "Rejected history entry");
                self.recover(e);
            }
        }
    }

    fn resolve_event(&self, event: &HistoryEvent) -> Result<NavigationState, NavigationError> {
        if let Some(payload @ Value::Object(_)) = &event.state {
            return Ok(StateValidator::validate_payload(payload)?);
        }
        let state = query::from_url(&event.url, &self.config.default_view)?;
        StateValidator::validate(&state)?;
        Ok(state)
    }

    /// Show `view`, optionally associated with a staff member
    pub fn navigate_to_view(&mut self, view: &str, staff_id: Option<&str>) {
        self.update_state(
            StateUpdate::new()
                .view(view)
                .staff(staff_id.map(str::to_owned)),
            UpdateOptions::default(),
        );
    }

    /// Show the page of staff member `staff_id`
    pub fn navigate_to_staff(&mut self, staff_id: &str) {
        self.update_state(
            StateUpdate::new()
                .view(format!("{STAFF_VIEW_PREFIX}{staff_id}"))
                .staff(Some(staff_id.to_string())),
            UpdateOptions::default(),
        );
    }

    /// Change the search filter without creating a history entry
    pub fn update_search(&mut self, term: &str) {
        self.update_state(StateUpdate::new().search(term), UpdateOptions::without_history());
    }

    /// Ask the host to move one entry back
    pub fn go_back(&mut self) {
        if let Err(e) = self.history.back() {
            self.recover(e.into());
        }
    }

    /// Ask the host to move one entry forward
    pub fn go_forward(&mut self) {
        if let Err(e) = self.history.forward() {
            self.recover(e.into());
        }
    }

    /// Restore when `error` may have left state or history inconsistent,
    /// otherwise just log it
    fn recover(&mut self, error: NavigationError) {
        if error.requires_restore() {
            warn!("Navigation failed: {error}");
            self.restore_valid_state();
        } else {
            debug!("Ignoring navigation side failure: {error}");
        }
    }

    // ---------------------------------------------------------------------
    // History writes
    // ---------------------------------------------------------------------

    fn push_entry(&self) {
        let url = self.current_url();
        let payload = self.current.to_payload();
        if let Err(e) = self.history.push(payload.clone(), &url) {
            warn!(%url, "History push failed, rewriting current entry: {e}");
            if let Err(e) = self.history.replace(payload, &url) {
                warn!(%url, "History replace failed: {e}");
            }
        }
    }

    fn replace_entry(&self) {
        let url = self.current_url();
        if let Err(e) = self.history.replace(self.current.to_payload(), &url) {
            warn!(%url, "History replace failed: {e}");
        }
    }

    fn subscribe(&self, handler: HistoryHandler) -> Option<SubscriptionId> {
        match self.history.subscribe(handler) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Cannot listen to history changes: {e}");
                None
            }
        }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.history.unsubscribe(id);
    }
}

/// Events that arrived while the controller was busy, oldest first
type DeferredEvents = Arc<Mutex<VecDeque<HistoryEvent>>>;

/// Shared handle wiring a controller to host history events
///
/// Dropping the handle stops listening. Listeners run while the controller
/// is locked and must not call back into the handle. A history event the
/// host delivers while the controller is locked is queued and replayed, in
/// arrival order, as soon as the current operation finishes.
pub struct NavigationHandle {
    controller: Arc<Mutex<NavigationController>>,
    deferred: DeferredEvents,
    subscription: Option<SubscriptionId>,
}

impl std::fmt::Debug for NavigationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationHandle")
            .field("subscription", &self.subscription)
            .field("deferred", &self.deferred.lock().len())
            .finish_non_exhaustive()
    }
}

impl NavigationHandle {
    /// Take ownership of `controller` and subscribe it to history events
    pub fn attach(controller: NavigationController) -> Self {
        let shared = Arc::new(Mutex::new(controller));
        let deferred: DeferredEvents = Arc::default();
        let weak = Arc::downgrade(&shared);
        let queue = Arc::clone(&deferred);

        let handler: HistoryHandler = Box::new(move |event: &HistoryEvent| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let Some(mut controller) = shared.try_lock() else {
                debug!(url = %event.url, "Deferring history event received mid-transition");
                queue.lock().push_back(event.clone());
                return;
            };
            controller.on_history_event(event);
            drop(controller);
            drain(&shared, &queue);
        });

        let subscription = shared.lock().subscribe(handler);
        Self {
            controller: shared,
            deferred,
            subscription,
        }
    }

    /// Whether host history events reach the controller
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Number of history events waiting to be replayed
    #[must_use]
    pub fn deferred_events(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Stop listening to history events
    pub fn detach(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.controller.lock().unsubscribe(id);
        }
    }

    /// Run `f` against the controller, then replay deferred events
    pub fn with<R>(&self, f: impl FnOnce(&mut NavigationController) -> R) -> R {
        let result = f(&mut self.controller.lock());
        drain(&self.controller, &self.deferred);
        result
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> NavigationState {
        self.with(|c| c.state().clone())
    }

    /// See [`NavigationController::navigate_to_view`]
    pub fn navigate_to_view(&self, view: &str, staff_id: Option<&str>) {
        self.with(|c| c.navigate_to_view(view, staff_id));
    }

    /// See [`NavigationController::navigate_to_staff`]
    pub fn navigate_to_staff(&self, staff_id: &str) {
        self.with(|c| c.navigate_to_staff(staff_id));
    }

    /// See [`NavigationController::update_search`]
    pub fn update_search(&self, term: &str) {
        self.with(|c| c.update_search(term));
    }

    /// See [`NavigationController::go_back`]
    pub fn go_back(&self) {
        self.with(NavigationController::go_back);
    }

    /// See [`NavigationController::go_forward`]
    pub fn go_forward(&self) {
        self.with(NavigationController::go_forward);
    }

    /// See [`NavigationController::restore_valid_state`]
    pub fn restore_valid_state(&self) {
        self.with(NavigationController::restore_valid_state);
    }

    /// See [`NavigationController::set_on_state_change`]
    pub fn set_on_state_change(&self, listener: impl FnMut(&NavigationState) + Send + 'static) {
        self.with(|c| c.set_on_state_change(listener));
    }
}

/// Replay queued events until the queue is empty
///
/// Stops early if another caller holds the controller; that caller drains
/// the rest when it finishes.
fn drain(controller: &Mutex<NavigationController>, deferred: &Mutex<VecDeque<HistoryEvent>>) {
    loop {
        let Some(mut guard) = controller.try_lock() else {
            return;
        };
        let Some(event) = deferred.lock().pop_front() else {
            return;
        };
        guard.on_history_event(&event);
    }
}

impl Drop for NavigationHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HostError, HostOperation};
    use crate::host::{MockHistoryHost, NoSessionStorage};
    use crate::test_harness::{ManualClock, MemoryHistory, MemorySessionStorage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn controller_at(url: &str) -> (NavigationController, Arc<MemoryHistory>, Arc<ManualClock>) {
        let history = Arc::new(MemoryHistory::new(url));
        let clock = Arc::new(ManualClock::new());
        let controller = NavigationController::new(
            NavigationConfig::default(),
            Arc::clone(&history),
            MemorySessionStorage::new(),
            Arc::clone(&clock),
        )
        .unwrap();
        (controller, history, clock)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = NavigationController::new(
            NavigationConfig::new().with_default_view(""),
            MemoryHistory::new("/"),
            NoSessionStorage,
            ManualClock::new(),
        );
        assert!(matches!(result, Err(NavigationError::Config(_))));
    }

    #[test]
    fn empty_view_update_restores() {
        let (mut controller, history, _) = controller_at("/");
        controller.navigate_to_view("settings", None);
        let pushes = history.push_count();

        controller.update_state(StateUpdate::new().view(""), UpdateOptions::default());

        assert_eq!(controller.active_view(), "settings");
        assert_eq!(history.push_count(), pushes);
        assert_eq!(history.replace_count(), 1);
        assert!(controller.is_restoring());
    }

    #[test]
    fn pushes_suppressed_inside_restore_window() {
        let (mut controller, history, clock) = controller_at("/");
        controller.restore_valid_state();

        controller.navigate_to_view("clients", None);
        assert_eq!(controller.active_view(), "clients");
        assert_eq!(history.push_count(), 0);

        clock.advance(Duration::from_millis(100));
        controller.navigate_to_view("reports", None);
        assert_eq!(history.push_count(), 1);
    }

    #[test]
    fn skip_validation_trusts_caller() {
        let (mut controller, history, _) = controller_at("/");
        controller.update_state(
            StateUpdate::replace_with(NavigationState::initial("care-plans")),
            UpdateOptions::replay(),
        );
        assert_eq!(controller.active_view(), "care-plans");
        assert_eq!(controller.last_valid_state().active_view, "care-plans");
        assert_eq!(history.push_count(), 0);
    }

    #[test]
    fn listener_sees_commits_only() {
        let (mut controller, _, _) = controller_at("/");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.set_on_state_change(move |state| sink.lock().push(state.active_view.clone()));

        controller.navigate_to_view("settings", None);
        controller.update_state(StateUpdate::new().view(""), UpdateOptions::default());
        controller.restore_valid_state();
        controller.navigate_to_staff("5");

        assert_eq!(*seen.lock(), vec!["settings".to_string(), "staff-5".to_string()]);

        controller.clear_on_state_change();
        controller.navigate_to_view("dashboard", None);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn payload_object_wins_over_url() {
        let (mut controller, _, _) = controller_at("/");
        let event = HistoryEvent::new(
            Some(json!({"activeView": "reports", "activeStaffId": null, "searchTerm": ""})),
            "/?view=clients",
        );
        controller.on_history_event(&event);
        assert_eq!(controller.active_view(), "reports");
    }

    #[test]
    fn non_object_payload_falls_back_to_url() {
        let (mut controller, _, _) = controller_at("/");
        controller.on_history_event(&HistoryEvent::new(Some(json!("junk")), "/?view=clients&staff=3"));
        assert_eq!(controller.active_view(), "clients");
        assert_eq!(controller.active_staff_id(), Some("3"));
    }

    #[test]
    fn unparseable_event_url_restores() {
        let (mut controller, history, _) = controller_at("/?view=settings");
        controller.on_history_event(&HistoryEvent::bare("http://[::1"));
        assert_eq!(controller.active_view(), "settings");
        assert_eq!(history.current_url(), "/?view=settings");
    }

    #[test]
    fn push_failure_falls_back_to_replace() {
        let mut history = MockHistoryHost::new();
        history.expect_current_url().return_const("/".to_string());
        history
            .expect_push()
            .times(1)
            .returning(|_, _| Err(HostError::rejected(HostOperation::Push, "SecurityError")));
        history
            .expect_replace()
            .withf(|_, url| url.contains("view=settings"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut controller = NavigationController::new(
            NavigationConfig::default(),
            history,
            NoSessionStorage,
            ManualClock::new(),
        )
        .unwrap();
        controller.navigate_to_view("settings", None);
        assert_eq!(controller.active_view(), "settings");
    }

    #[test]
    fn back_and_forward_call_through_once() {
        let mut history = MockHistoryHost::new();
        history.expect_current_url().return_const("/?view=settings".to_string());
        history
            .expect_back()
            .times(1)
            .returning(|| Err(HostError::rejected(HostOperation::Back, "detached")));
        history.expect_forward().times(1).returning(|| Ok(()));
        history.expect_replace().times(1).returning(|_, _| Ok(()));
        history.expect_push().never();

        let mut controller = NavigationController::new(
            NavigationConfig::default(),
            history,
            NoSessionStorage,
            ManualClock::new(),
        )
        .unwrap();

        controller.go_back();
        controller.go_forward();
        assert_eq!(controller.active_view(), "settings");
    }

    #[test]
    fn failing_replace_during_restore_keeps_last_valid() {
        let (mut controller, history, _) = controller_at("/");
        controller.navigate_to_view("settings", None);
        history.fail_on(HostOperation::Replace);

        controller.update_state(StateUpdate::new().view(""), UpdateOptions::default());
        controller.restore_valid_state();

        assert_eq!(controller.active_view(), "settings");
        assert_eq!(controller.last_valid_state().active_view, "settings");
        assert!(controller.is_restoring());
        assert_eq!(history.replace_count(), 0);
        assert_eq!(history.current_url(), "/?view=settings");
    }

    #[test]
    fn push_and_replace_failure_still_commits() {
        let (mut controller, history, _) = controller_at("/");
        history.fail_on(HostOperation::Push);
        history.fail_on(HostOperation::Replace);

        controller.navigate_to_view("settings", None);

        assert_eq!(controller.active_view(), "settings");
        assert_eq!(controller.last_valid_state().active_view, "settings");
        assert!(!controller.is_restoring());
        assert_eq!(history.current_url(), "/");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn storage_side_failures_do_not_restore() {
        let (mut controller, history, _) = controller_at("/");
        controller.recover(HostError::QuotaExceeded { key: "k".to_string() }.into());
        assert!(!controller.is_restoring());
        assert_eq!(history.replace_count(), 0);

        controller.recover(HostError::rejected(HostOperation::Back, "detached").into());
        assert!(controller.is_restoring());
        assert_eq!(history.replace_count(), 1);
    }

    #[test]
    fn failing_subscribe_leaves_handle_detached() {
        let history = Arc::new(MemoryHistory::new("/"));
        history.fail_on(HostOperation::Subscribe);
        let controller = NavigationController::new(
            NavigationConfig::default(),
            Arc::clone(&history),
            MemorySessionStorage::new(),
            ManualClock::new(),
        )
        .unwrap();

        let nav = NavigationHandle::attach(controller);
        assert!(!nav.is_attached());
        assert_eq!(history.subscriber_count(), 0);

        nav.navigate_to_staff("42");
        assert_eq!(nav.state().active_view, "staff-42");
        assert_eq!(history.current_url(), "/?view=staff-42&staff=42");
    }

    #[test]
    fn event_delivered_mid_operation_is_replayed() {
        let history = Arc::new(MemoryHistory::new("/"));
        let controller = NavigationController::new(
            NavigationConfig::default(),
            Arc::clone(&history),
            MemorySessionStorage::new(),
            ManualClock::new(),
        )
        .unwrap();
        let nav = NavigationHandle::attach(controller);
        nav.navigate_to_view("clients", None);

        history.back().unwrap();
        let pump = Arc::clone(&history);
        nav.with(move |c| {
            pump.dispatch_pending();
            assert_eq!(c.active_view(), "clients");
        });

        assert_eq!(nav.deferred_events(), 0);
        assert_eq!(nav.state(), NavigationState::initial("dashboard"));
    }

    #[test]
    fn unparseable_initial_url_keeps_default() {
        let (controller, history, _) = controller_at("http://[::1");
        assert!(controller.state().is_default("dashboard"));
        assert_eq!(history.current_url(), "/");
    }
}
