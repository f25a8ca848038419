//! Navigation state and structural validation
//!
//! A [`NavigationState`] is the three-field value describing which screen,
//! which associated staff id and which search filter are active. States
//! built in Rust are typed, so only the non-empty view rule can fail; states
//! arriving from history entries or session snapshots are untrusted JSON and
//! go through [`StateValidator::validate_payload`].

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload key for the active view
pub const KEY_ACTIVE_VIEW: &str = "activeView";
/// Payload key for the active staff id
pub const KEY_ACTIVE_STAFF_ID: &str = "activeStaffId";
/// Payload key for the search term
pub const KEY_SEARCH_TERM: &str = "searchTerm";

/// Prefix used for per-staff views
pub const STAFF_VIEW_PREFIX: &str = "staff-";

/// Where the UI currently is
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    /// Currently displayed screen, e.g. `dashboard` or `staff-42`
    pub active_view: String,
    /// Associated staff identifier, if any
    pub active_staff_id: Option<String>,
    /// Free-text filter, empty by default
    pub search_term: String,
}

impl NavigationState {
    /// Default state for the given default view
    #[must_use]
    pub fn initial(default_view: impl Into<String>) -> Self {
        Self {
            active_view: default_view.into(),
            active_staff_id: None,
            search_term: String::new(),
        }
    }

    /// Set the view
    #[inline]
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.active_view = view.into();
        self
    }

    /// Set the staff association
    #[inline]
    #[must_use]
    pub fn with_staff(mut self, staff_id: impl Into<String>) -> Self {
        self.active_staff_id = Some(staff_id.into());
        self
    }

    /// Set the search term
    #[inline]
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    /// Whether every field holds its default for `default_view`
    #[must_use]
    pub fn is_default(&self, default_view: &str) -> bool {
        self.active_view == default_view
            && self.active_staff_id.is_none()
            && self.search_term.is_empty()
    }

    /// Encode as a history/snapshot payload
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert(KEY_ACTIVE_VIEW.to_string(), Value::String(self.active_view.clone()));
        map.insert(
            KEY_ACTIVE_STAFF_ID.to_string(),
            self.active_staff_id
                .clone()
                .map_or(Value::Null, Value::String),
        );
        map.insert(KEY_SEARCH_TERM.to_string(), Value::String(self.search_term.clone()));
        Value::Object(map)
    }
}

/// Partial update merged onto the current state
///
/// `None` leaves a field untouched. `active_staff_id` is doubly optional so
/// an update can clear the association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    /// New view
    pub active_view: Option<String>,
    /// New staff association
    pub active_staff_id: Option<Option<String>>,
    /// New search term
    pub search_term: Option<String>,
}

impl StateUpdate {
    /// Empty update
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the view
    #[inline]
    #[must_use]
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.active_view = Some(view.into());
        self
    }

    /// Change the staff association
    #[inline]
    #[must_use]
    pub fn staff(mut self, staff_id: Option<String>) -> Self {
        self.active_staff_id = Some(staff_id);
        self
    }

    /// Change the search term
    #[inline]
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Replace every field with the ones from `state`
    #[must_use]
    pub fn replace_with(state: NavigationState) -> Self {
        Self {
            active_view: Some(state.active_view),
            active_staff_id: Some(state.active_staff_id),
            search_term: Some(state.search_term),
        }
    }

    /// Merge onto `base`, producing a candidate
    #[must_use]
    pub fn apply_to(self, base: &NavigationState) -> NavigationState {
        NavigationState {
            active_view: self.active_view.unwrap_or_else(|| base.active_view.clone()),
            active_staff_id: self
                .active_staff_id
                .unwrap_or_else(|| base.active_staff_id.clone()),
            search_term: self.search_term.unwrap_or_else(|| base.search_term.clone()),
        }
    }
}

/// Options for a single transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Push a history entry on commit
    pub push_history: bool,
    /// Candidate was already validated inside the crate
    pub(crate) skip_validation: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            push_history: true,
            skip_validation: false,
        }
    }
}

impl UpdateOptions {
    /// Commit without touching history
    #[inline]
    #[must_use]
    pub fn without_history() -> Self {
        Self {
            push_history: false,
            ..Self::default()
        }
    }

    /// Replay of a history event that was validated already
    #[inline]
    #[must_use]
    pub(crate) fn replay() -> Self {
        Self {
            push_history: false,
            skip_validation: true,
        }
    }
}

/// Structural validator for navigation states
///
/// Only the shape is checked. Whether a view or staff id refers to
/// something that exists is not this validator's concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateValidator;

impl StateValidator {
    /// Validate a typed candidate
    pub fn validate(state: &NavigationState) -> Result<(), ValidationError> {
        if state.active_view.is_empty() {
            return Err(ValidationError::EmptyView);
        }
        Ok(())
    }

    /// Validate an untrusted payload and decode it
    pub fn validate_payload(payload: &Value) -> Result<NavigationState, ValidationError> {
        let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        let active_view = match object.get(KEY_ACTIVE_VIEW) {
            None => return Err(ValidationError::MissingView),
            Some(Value::String(view)) => view.clone(),
            Some(_) => return Err(ValidationError::ViewNotString),
        };

        let active_staff_id = match object.get(KEY_ACTIVE_STAFF_ID) {
            None => return Err(ValidationError::MissingStaffId),
            Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(ValidationError::StaffIdNotString),
        };

        let search_term = match object.get(KEY_SEARCH_TERM) {
            None => return Err(ValidationError::MissingSearchTerm),
            Some(Value::String(term)) => term.clone(),
            Some(_) => return Err(ValidationError::SearchTermNotString),
        };

        let state = NavigationState {
            active_view,
            active_staff_id,
            search_term,
        };
        Self::validate(&state)?;
        Ok(state)
    }

    /// Boolean form of [`Self::validate_payload`]
    #[inline]
    #[must_use]
    pub fn is_valid_payload(payload: &Value) -> bool {
        Self::validate_payload(payload).is_ok()
    }
}
