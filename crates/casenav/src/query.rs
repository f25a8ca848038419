//! State ⇄ URL serialization
//!
//! Only non-default fields are written: `view` when it differs from the
//! configured default view, `staff` when an association is present and
//! `search` when the term is non-empty. A fully default state serializes to
//! `/`. Parsing accepts absolute URLs as well as paths relative to the
//! application origin.

use crate::error::UrlError;
use crate::state::NavigationState;
use url::form_urlencoded;
use url::{ParseError, Url};

/// Query parameter carrying the active view
pub const PARAM_VIEW: &str = "view";
/// Query parameter carrying the staff id
pub const PARAM_STAFF: &str = "staff";
/// Query parameter carrying the search term
pub const PARAM_SEARCH: &str = "search";

/// Origin used to resolve relative URLs reported by the host
const LOCAL_ORIGIN: &str = "http://localhost/";

/// Serialize a state to the URL of its history entry
#[must_use]
pub fn to_url(state: &NavigationState, default_view: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if state.active_view != default_view {
        query.append_pair(PARAM_VIEW, &state.active_view);
    }
    if let Some(staff) = &state.active_staff_id {
        query.append_pair(PARAM_STAFF, staff);
    }
    if !state.search_term.is_empty() {
        query.append_pair(PARAM_SEARCH, &state.search_term);
    }

    let query = query.finish();
    if query.is_empty() {
        "/".to_string()
    } else {
        format!("/?{query}")
    }
}

/// Parse a URL into a state
///
/// Missing parameters take their defaults; an empty `view` also falls back
/// to `default_view`. Repeated parameters resolve to their first occurrence.
pub fn from_url(url: &str, default_view: &str) -> Result<NavigationState, UrlError> {
    let parsed = parse(url)?;

    let mut view = None;
    let mut staff = None;
    let mut search = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            PARAM_VIEW if view.is_none() => view = Some(value.into_owned()),
            PARAM_STAFF if staff.is_none() => staff = Some(value.into_owned()),
            PARAM_SEARCH if search.is_none() => search = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(NavigationState {
        active_view: view
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_view.to_string()),
        active_staff_id: staff,
        search_term: search.unwrap_or_default(),
    })
}

/// Whether the URL carries any navigation parameter
///
/// Unparseable URLs carry none.
#[must_use]
pub fn has_navigation_params(url: &str) -> bool {
    parse(url).is_ok_and(|parsed| {
        parsed
            .query_pairs()
            .any(|(key, _)| matches!(key.as_ref(), PARAM_VIEW | PARAM_STAFF | PARAM_SEARCH))
    })
}

fn parse(url: &str) -> Result<Url, UrlError> {
    let parsed = match Url::parse(url) {
        Err(ParseError::RelativeUrlWithoutBase) => {
            Url::parse(LOCAL_ORIGIN).and_then(|base| base.join(url))
        }
        other => other,
    };
    parsed.map_err(|e| UrlError::Unparseable {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
