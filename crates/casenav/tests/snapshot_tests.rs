//! Session snapshot persistence and reload recovery

use casenav::test_harness::MemorySessionStorage;
use casenav::{HistoryHost, HostOperation, NavigationConfig, NavigationKind, NavigationState};
use casenav_test_utils::{full_state, reloaded_storage_with, TestNavigator, DEFAULT_VIEW};
use pretty_assertions::assert_eq;

fn snapshot_text(state: &NavigationState) -> String {
    serde_json::to_string(state).unwrap()
}

#[test]
fn test_commits_are_snapshotted() {
    let t = TestNavigator::new();
    t.nav.navigate_to_staff("5");
    t.nav.update_search("notes");

    let key = NavigationConfig::default().snapshot_key;
    let saved: NavigationState = serde_json::from_str(&t.storage.get(&key).unwrap()).unwrap();
    assert_eq!(saved, t.state());
}

#[test]
fn test_reload_adopts_snapshot() {
    let target = full_state();
    let t = TestNavigator::build(
        "/",
        reloaded_storage_with(&snapshot_text(&target)),
        NavigationConfig::default(),
    );

    assert_eq!(t.state(), target);
    assert_eq!(t.history.push_count(), 0);
    assert_eq!(t.history.current_url(), "/?view=staff-42&staff=42&search=overdue+notes");
}

#[test]
fn test_url_params_win_over_snapshot() {
    let t = TestNavigator::build(
        "/?view=clients",
        reloaded_storage_with(&snapshot_text(&full_state())),
        NavigationConfig::default(),
    );

    assert_eq!(t.state(), NavigationState::initial("clients"));
    assert_eq!(t.history.replace_count(), 0);
}

#[test]
fn test_fresh_navigation_ignores_snapshot() {
    let storage = MemorySessionStorage::new().with_navigation_kind(NavigationKind::Navigate);
    storage.set(
        &NavigationConfig::default().snapshot_key,
        &snapshot_text(&full_state()),
    );

    let t = TestNavigator::build("/", storage, NavigationConfig::default());

    assert_eq!(t.state(), NavigationState::initial(DEFAULT_VIEW));
}

#[test]
fn test_invalid_snapshot_is_ignored() {
    for text in [
        r#"{"activeView": "", "activeStaffId": null, "searchTerm": ""}"#,
        r#"{"activeView": "clients"}"#,
        "[1, 2, 3]",
        "not json at all",
    ] {
        let t = TestNavigator::build("/", reloaded_storage_with(text), NavigationConfig::default());
        assert_eq!(t.state(), NavigationState::initial(DEFAULT_VIEW), "snapshot {text}");
        assert_eq!(t.history.replace_count(), 0);
    }
}

#[test]
fn test_snapshot_restore_can_be_disabled() {
    let t = TestNavigator::build(
        "/",
        reloaded_storage_with(&snapshot_text(&full_state())),
        NavigationConfig::default().with_snapshot_restore(false),
    );

    assert_eq!(t.state(), NavigationState::initial(DEFAULT_VIEW));
}

#[test]
fn test_custom_snapshot_key() {
    let storage = MemorySessionStorage::new().with_navigation_kind(NavigationKind::Reload);
    storage.set("tracker.nav", &snapshot_text(&NavigationState::initial("reports")));

    let t = TestNavigator::build(
        "/",
        storage,
        NavigationConfig::default().with_snapshot_key("tracker.nav"),
    );

    assert_eq!(t.state().active_view, "reports");
}

#[test]
fn test_storage_failures_do_not_affect_navigation() {
    let storage = MemorySessionStorage::new();
    storage.fail_on(HostOperation::Write);
    storage.fail_on(HostOperation::Read);
    let t = TestNavigator::build("/", storage, NavigationConfig::default());

    t.nav.navigate_to_view("clients", None);
    t.nav.update_search("x");

    assert_eq!(t.state(), NavigationState::initial("clients").with_search("x"));
    assert_eq!(t.history.push_count(), 1);
    assert_eq!(t.history.replace_count(), 0);
}
