//! In-memory host: history stack, session storage and a manual clock
//!
//! Behaves like a browser where it matters to the controller: push and
//! replace never emit events, back/forward queue one event for the entry
//! moved to, and queued events are only delivered by
//! [`MemoryHistory::dispatch_pending`], mirroring the asynchronous
//! `popstate` delivery of real hosts.

use crate::error::{HostError, HostOperation};
use crate::host::{
    Clock, HistoryEvent, HistoryHandler, HistoryHost, NavigationKind, SessionStorage,
    SubscriptionId,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// One entry of the in-memory history stack
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    /// Attached payload
    pub state: Option<Value>,
    /// Entry URL
    pub url: String,
}

#[derive(Debug, Default)]
struct HistoryStack {
    entries: Vec<MemoryEntry>,
    index: usize,
    pending: VecDeque<HistoryEvent>,
    failing: HashSet<HostOperation>,
    pushes: usize,
    replaces: usize,
    backs: usize,
    forwards: usize,
}

impl HistoryStack {
    fn check(&self, operation: HostOperation) -> Result<(), HostError> {
        if self.failing.contains(&operation) {
            return Err(HostError::rejected(operation, "injected failure"));
        }
        Ok(())
    }

    fn current(&self) -> &MemoryEntry {
        &self.entries[self.index]
    }

    fn enqueue_current(&mut self) {
        let entry = self.current().clone();
        self.pending.push_back(HistoryEvent::new(entry.state, entry.url));
    }
}

/// In-memory history stack
pub struct MemoryHistory {
    stack: Mutex<HistoryStack>,
    handlers: Mutex<Vec<(SubscriptionId, HistoryHandler)>>,
    next_subscription: Mutex<u64>,
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("stack", &*self.stack.lock())
            .field("subscribers", &self.handlers.lock().len())
            .finish()
    }
}

impl MemoryHistory {
    /// History holding a single entry at `url` with no payload
    pub fn new(url: impl Into<String>) -> Self {
        let stack = HistoryStack {
            entries: vec![MemoryEntry {
                state: None,
                url: url.into(),
            }],
            ..HistoryStack::default()
        };
        Self {
            stack: Mutex::new(stack),
            handlers: Mutex::new(Vec::new()),
            next_subscription: Mutex::new(0),
        }
    }

    /// Make `operation` fail until [`Self::recover`] is called
    pub fn fail_on(&self, operation: HostOperation) {
        self.stack.lock().failing.insert(operation);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: HostOperation) {
        self.stack.lock().failing.remove(&operation);
    }

    /// Push an entry the way foreign code would, bypassing failure injection
    pub fn push_foreign(&self, state: Option<Value>, url: impl Into<String>) {
        let mut stack = self.stack.lock();
        let next = stack.index + 1;
        stack.entries.truncate(next);
        stack.entries.push(MemoryEntry {
            state,
            url: url.into(),
        });
        stack.index = next;
    }

    /// Overwrite the payload of the current entry
    pub fn corrupt_current(&self, state: Option<Value>) {
        let mut stack = self.stack.lock();
        let index = stack.index;
        stack.entries[index].state = state;
    }

    /// Queue an arbitrary event
    pub fn emit(&self, event: HistoryEvent) {
        self.stack.lock().pending.push_back(event);
    }

    /// Queue `event` and deliver everything pending
    pub fn deliver(&self, event: HistoryEvent) -> usize {
        self.emit(event);
        self.dispatch_pending()
    }

    /// Deliver queued events to every subscriber, returning how many
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(event) = self.stack.lock().pending.pop_front() else {
                break;
            };
            let mut handlers = std::mem::take(&mut *self.handlers.lock());
            for (_, handler) in &mut handlers {
                handler(&event);
            }
            let mut slot = self.handlers.lock();
            handlers.append(&mut slot);
            *slot = handlers;
            delivered += 1;
        }
        delivered
    }

    /// Payload of the current entry
    #[must_use]
    pub fn current_state(&self) -> Option<Value> {
        self.stack.lock().current().state.clone()
    }

    /// Current entry
    #[must_use]
    pub fn current_entry(&self) -> MemoryEntry {
        self.stack.lock().current().clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.lock().entries.len()
    }

    /// Whether the stack is empty (never, kept for clippy)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.lock().entries.is_empty()
    }

    /// Position of the current entry
    #[must_use]
    pub fn index(&self) -> usize {
        self.stack.lock().index
    }

    /// Events waiting for [`Self::dispatch_pending`]
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.stack.lock().pending.len()
    }

    /// Successful pushes made through [`HistoryHost::push`]
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.stack.lock().pushes
    }

    /// Successful replaces
    #[must_use]
    pub fn replace_count(&self) -> usize {
        self.stack.lock().replaces
    }

    /// Calls to [`HistoryHost::back`], failed or not
    #[must_use]
    pub fn back_count(&self) -> usize {
        self.stack.lock().backs
    }

    /// Calls to [`HistoryHost::forward`], failed or not
    #[must_use]
    pub fn forward_count(&self) -> usize {
        self.stack.lock().forwards
    }

    /// Registered handlers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl HistoryHost for MemoryHistory {
    fn current_url(&self) -> String {
        self.stack.lock().current().url.clone()
    }

    fn push(&self, state: Value, url: &str) -> Result<(), HostError> {
        self.stack.lock().check(HostOperation::Push)?;
        self.push_foreign(Some(state), url);
        self.stack.lock().pushes += 1;
        Ok(())
    }

    fn replace(&self, state: Value, url: &str) -> Result<(), HostError> {
        let mut stack = self.stack.lock();
        stack.check(HostOperation::Replace)?;
        let index = stack.index;
        stack.entries[index] = MemoryEntry {
            state: Some(state),
            url: url.to_string(),
        };
        stack.replaces += 1;
        Ok(())
    }

    fn back(&self) -> Result<(), HostError> {
        let mut stack = self.stack.lock();
        stack.backs += 1;
        stack.check(HostOperation::Back)?;
        if stack.index > 0 {
            stack.index -= 1;
            stack.enqueue_current();
        }
        Ok(())
    }

    fn forward(&self) -> Result<(), HostError> {
        let mut stack = self.stack.lock();
        stack.forwards += 1;
        stack.check(HostOperation::Forward)?;
        if stack.index + 1 < stack.entries.len() {
            stack.index += 1;
            stack.enqueue_current();
        }
        Ok(())
    }

    fn subscribe(&self, handler: HistoryHandler) -> Result<SubscriptionId, HostError> {
        self.stack.lock().check(HostOperation::Subscribe)?;
        let id = {
            let mut next = self.next_subscription.lock();
            *next += 1;
            SubscriptionId(*next)
        };
        self.handlers.lock().push((id, handler));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.lock().retain(|(sub, _)| *sub != id);
    }
}

/// In-memory session storage
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    values: Mutex<HashMap<String, String>>,
    navigation_kind: NavigationKind,
    failing: Mutex<HashSet<HostOperation>>,
}

impl MemorySessionStorage {
    /// Empty storage for a fresh navigation
    #[must_use]
    pub fn new() -> Self {
        Self {
            navigation_kind: NavigationKind::Navigate,
            ..Self::default()
        }
    }

    /// Report `kind` as the page load kind
    #[must_use]
    pub fn with_navigation_kind(mut self, kind: NavigationKind) -> Self {
        self.navigation_kind = kind;
        self
    }

    /// Seed a value
    pub fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    /// Inspect a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// Make reads or writes fail
    pub fn fail_on(&self, operation: HostOperation) {
        self.failing.lock().insert(operation);
    }
}

impl SessionStorage for MemorySessionStorage {
    fn read(&self, key: &str) -> Result<Option<String>, HostError> {
        if self.failing.lock().contains(&HostOperation::Read) {
            return Err(HostError::rejected(HostOperation::Read, "injected failure"));
        }
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), HostError> {
        if self.failing.lock().contains(&HostOperation::Write) {
            return Err(HostError::QuotaExceeded {
                key: key.to_string(),
            });
        }
        self.set(key, value);
        Ok(())
    }

    fn navigation_kind(&self) -> NavigationKind {
        self.navigation_kind
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Clock at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn push_truncates_forward_entries() {
        let history = MemoryHistory::new("/");
        history.push(json!({}), "/?view=a").unwrap();
        history.push(json!({}), "/?view=b").unwrap();
        history.back().unwrap();
        history.push(json!({}), "/?view=c").unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history.current_url(), "/?view=c");
        assert_eq!(history.push_count(), 3);
    }

    #[test]
    fn back_and_forward_queue_events() {
        let history = MemoryHistory::new("/");
        history.push(json!({"n": 1}), "/?view=a").unwrap();

        history.back().unwrap();
        assert_eq!(history.pending_events(), 1);
        assert_eq!(history.current_url(), "/");

        history.forward().unwrap();
        assert_eq!(history.pending_events(), 2);
        assert_eq!(history.current_state(), Some(json!({"n": 1})));
    }

    #[test]
    fn back_at_start_is_a_no_op() {
        let history = MemoryHistory::new("/");
        history.back().unwrap();
        assert_eq!(history.pending_events(), 0);
        assert_eq!(history.back_count(), 1);
    }

    #[test]
    fn dispatch_reaches_subscribers() {
        let history = MemoryHistory::new("/");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = history
            .subscribe(Box::new(move |event| sink.lock().push(event.url.clone())))
            .unwrap();

        assert_eq!(history.deliver(HistoryEvent::bare("/?view=x")), 1);
        assert_eq!(*seen.lock(), vec!["/?view=x".to_string()]);

        history.unsubscribe(id);
        assert_eq!(history.subscriber_count(), 0);
        history.deliver(HistoryEvent::bare("/?view=y"));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn injected_failures() {
        let history = MemoryHistory::new("/");
        history.fail_on(HostOperation::Push);
        assert!(history.push(json!({}), "/?view=a").is_err());
        assert_eq!(history.len(), 1);

        history.recover(HostOperation::Push);
        assert!(history.push(json!({}), "/?view=a").is_ok());
    }

    #[test]
    fn storage_failures() {
        let storage = MemorySessionStorage::new();
        storage.fail_on(HostOperation::Write);
        assert!(matches!(
            storage.write("k", "v"),
            Err(HostError::QuotaExceeded { .. })
        ));
        assert_eq!(storage.get("k"), None);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(30));
        clock.advance(Duration::from_millis(20));
        assert_eq!(clock.now(), Duration::from_millis(50));
    }
}
