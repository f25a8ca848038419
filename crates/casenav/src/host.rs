//! Host capabilities consumed by the controller
//!
//! The controller never talks to a browser directly. Everything it needs
//! from the host runtime (history stack, session storage, a clock) is
//! injected through these traits, so tests and the simulator substitute
//! in-memory fakes.

use crate::error::HostError;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A back/forward navigation reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    /// State payload attached to the entry, if any. Untrusted.
    pub state: Option<Value>,
    /// URL of the entry the host moved to
    pub url: String,
}

impl HistoryEvent {
    /// Event carrying a payload
    #[inline]
    pub fn new(state: Option<Value>, url: impl Into<String>) -> Self {
        Self {
            state,
            url: url.into(),
        }
    }

    /// Event with no payload
    #[inline]
    pub fn bare(url: impl Into<String>) -> Self {
        Self::new(None, url)
    }
}

/// Callback invoked for every history event
pub type HistoryHandler = Box<dyn FnMut(&HistoryEvent) + Send>;

/// Token returned by [`HistoryHost::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Browser-style history stack
#[cfg_attr(test, mockall::automock)]
pub trait HistoryHost: Send + Sync {
    /// URL of the current entry
    fn current_url(&self) -> String;

    /// Push a new entry after the current one
    fn push(&self, state: Value, url: &str) -> Result<(), HostError>;

    /// Overwrite the current entry
    fn replace(&self, state: Value, url: &str) -> Result<(), HostError>;

    /// Move one entry back
    fn back(&self) -> Result<(), HostError>;

    /// Move one entry forward
    fn forward(&self) -> Result<(), HostError>;

    /// Register a handler for back/forward navigations
    fn subscribe(&self, handler: HistoryHandler) -> Result<SubscriptionId, HostError>;

    /// Remove a handler registered with [`Self::subscribe`]
    fn unsubscribe(&self, id: SubscriptionId);
}

/// How the current page load came about
///
/// Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationKind {
    /// Fresh navigation to the page
    Navigate,
    /// Reload of the same page
    Reload,
    /// Arrived through back/forward
    BackForward,
    /// Host cannot tell
    #[default]
    Unknown,
}

/// Session-scoped key/value storage
#[cfg_attr(test, mockall::automock)]
pub trait SessionStorage: Send + Sync {
    /// Read a value
    fn read(&self, key: &str) -> Result<Option<String>, HostError>;

    /// Write a value
    fn write(&self, key: &str, value: &str) -> Result<(), HostError>;

    /// How the current page load came about
    fn navigation_kind(&self) -> NavigationKind;
}

/// Storage for hosts that have none
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionStorage;

impl SessionStorage for NoSessionStorage {
    fn read(&self, _key: &str) -> Result<Option<String>, HostError> {
        Err(HostError::Unavailable {
            capability: "session storage",
        })
    }

    fn write(&self, _key: &str, _value: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable {
            capability: "session storage",
        })
    }

    fn navigation_kind(&self) -> NavigationKind {
        NavigationKind::Unknown
    }
}

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock measured from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl<T: HistoryHost + ?Sized> HistoryHost for Arc<T> {
    fn current_url(&self) -> String {
        (**self).current_url()
    }

    fn push(&self, state: Value, url: &str) -> Result<(), HostError> {
        (**self).push(state, url)
    }

    fn replace(&self, state: Value, url: &str) -> Result<(), HostError> {
        (**self).replace(state, url)
    }

    fn back(&self) -> Result<(), HostError> {
        (**self).back()
    }

    fn forward(&self) -> Result<(), HostError> {
        (**self).forward()
    }

    fn subscribe(&self, handler: HistoryHandler) -> Result<SubscriptionId, HostError> {
        (**self).subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id);
    }
}

impl<T: SessionStorage + ?Sized> SessionStorage for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, HostError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), HostError> {
        (**self).write(key, value)
    }

    fn navigation_kind(&self) -> NavigationKind {
        (**self).navigation_kind()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
