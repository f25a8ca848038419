//! Error types for casenav
//!
//! Provides the error taxonomy for:
//! - Structurally invalid navigation states
//! - URLs that cannot be parsed
//! - Host capability failures (history, session storage)
//! - Configuration loading
//!
//! None of these ever escape a controller operation. The controller
//! catches them, logs them and either ignores them or restores the last
//! valid state.

use std::path::PathBuf;

/// Main casenav error type
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// Candidate state failed structural validation
    #[error("invalid navigation state: {0}")]
    InvalidState(#[from] ValidationError),

    /// URL could not be parsed into a state
    #[error("url error: {0}")]
    Url(#[from] UrlError),

    /// Host capability failed
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Configuration is unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl NavigationError {
    /// Check if this error may leave the navigation state itself inconsistent
    ///
    /// Side-channel failures (session storage) do not; anything touching the
    /// candidate state or the history stack does.
    #[must_use]
    pub fn requires_restore(&self) -> bool {
        match self {
            Self::InvalidState(_) | Self::Url(_) => true,
            Self::Host(e) => e.affects_history(),
            Self::Config(_) => false,
        }
    }
}

/// Structural validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Payload is not a JSON object
    #[error("payload is not an object")]
    NotAnObject,

    /// `activeView` key is absent
    #[error("activeView is missing")]
    MissingView,

    /// `activeView` is not a string
    #[error("activeView is not a string")]
    ViewNotString,

    /// `activeView` is the empty string
    #[error("activeView is empty")]
    EmptyView,

    /// `activeStaffId` is absent
    #[error("activeStaffId is missing")]
    MissingStaffId,

    /// `activeStaffId` is neither null nor a string
    #[error("activeStaffId is neither null nor a string")]
    StaffIdNotString,

    /// `searchTerm` is absent
    #[error("searchTerm is missing")]
    MissingSearchTerm,

    /// `searchTerm` is not a string
    #[error("searchTerm is not a string")]
    SearchTermNotString,
}

/// URL parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// The URL could not be parsed at all
    #[error("cannot parse url {url:?}: {reason}")]
    Unparseable {
        /// Offending input
        url: String,
        /// Parser message
        reason: String,
    },
}

/// Host capability failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Capability does not exist on this host
    #[error("{capability} is unavailable")]
    Unavailable {
        /// Capability name
        capability: &'static str,
    },

    /// Host refused the operation
    #[error("{operation} rejected: {reason}")]
    Rejected {
        /// Operation name
        operation: HostOperation,
        /// Host message
        reason: String,
    },

    /// Session storage is full
    #[error("storage quota exceeded writing {key:?}")]
    QuotaExceeded {
        /// Storage key
        key: String,
    },
}

impl HostError {
    /// Create a rejection for the given operation
    #[inline]
    pub fn rejected(operation: HostOperation, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }

    /// Whether the failed call touched the history stack
    #[must_use]
    pub fn affects_history(&self) -> bool {
        match self {
            Self::Rejected { operation, .. } => operation.is_history(),
            Self::Unavailable { capability } => *capability == "history",
            Self::QuotaExceeded { .. } => false,
        }
    }
}

/// Host operations that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    /// Push a history entry
    Push,
    /// Replace the current history entry
    Replace,
    /// Step back
    Back,
    /// Step forward
    Forward,
    /// Subscribe to history changes
    Subscribe,
    /// Read session storage
    Read,
    /// Write session storage
    Write,
}

impl HostOperation {
    /// Whether this operation touches the history stack
    #[inline]
    #[must_use]
    pub fn is_history(self) -> bool {
        !matches!(self, Self::Read | Self::Write)
    }
}

impl std::fmt::Display for HostOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Push => "push",
            Self::Replace => "replace",
            Self::Back => "back",
            Self::Forward => "forward",
            Self::Subscribe => "subscribe",
            Self::Read => "read",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Default view must be a non-empty identifier
    #[error("default_view must not be empty")]
    EmptyDefaultView,

    /// TOML could not be parsed
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
