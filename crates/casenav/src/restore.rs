//! The `restoring` meta-state
//!
//! After a restore the controller ignores its own history pushes for a
//! short window, so the self-issued replace is not read back as an external
//! navigation. The window is a deadline against an injected [`Clock`]
//! rather than a timer callback; opening it again before it closes moves
//! the deadline to the later of the two.

use crate::host::Clock;
use std::time::Duration;

/// Debounce window following a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreWindow {
    length: Duration,
    closes_at: Option<Duration>,
}

impl RestoreWindow {
    /// Closed window of the given length
    #[inline]
    #[must_use]
    pub fn new(length: Duration) -> Self {
        Self {
            length,
            closes_at: None,
        }
    }

    /// Configured window length
    #[inline]
    #[must_use]
    pub fn length(&self) -> Duration {
        self.length
    }

    /// Open (or extend) the window starting now
    pub fn open(&mut self, clock: &dyn Clock) {
        let closes_at = clock.now() + self.length;
        self.closes_at = Some(self.closes_at.map_or(closes_at, |prev| prev.max(closes_at)));
    }

    /// Whether the window is still open
    ///
    /// Lazily forgets the deadline once it has passed.
    pub fn is_open(&mut self, clock: &dyn Clock) -> bool {
        match self.closes_at {
            Some(deadline) if clock.now() < deadline => true,
            Some(_) => {
                self.closes_at = None;
                false
            }
            None => false,
        }
    }

    /// Read-only variant of [`Self::is_open`]
    #[must_use]
    pub fn peek(&self, clock: &dyn Clock) -> bool {
        self.closes_at.is_some_and(|deadline| clock.now() < deadline)
    }
}
