use casenav::{query, HistoryEvent, NavigationState, StateValidator};
use casenav_test_utils::{TestNavigator, DEFAULT_VIEW};
use proptest::prelude::*;
use serde_json::json;

fn non_default_state() -> impl Strategy<Value = NavigationState> {
    (
        "[a-z][a-z0-9-]{0,15}".prop_filter("must differ from default", |v| v != DEFAULT_VIEW),
        "[ -~]{1,12}",
        "[ -~]{1,24}",
    )
        .prop_map(|(view, staff, search)| {
            NavigationState::initial(view)
                .with_staff(staff)
                .with_search(search)
        })
}

#[derive(Debug, Clone)]
enum Op {
    View(String),
    Staff(String),
    Search(String),
    Back,
    Forward,
    Restore,
    Garbage(serde_json::Value),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{0,6}".prop_map(Op::View),
        "[0-9]{1,3}".prop_map(Op::Staff),
        "[a-z ]{0,6}".prop_map(Op::Search),
        Just(Op::Back),
        Just(Op::Forward),
        Just(Op::Restore),
        prop_oneof![
            Just(json!({"activeView": null})),
            Just(json!({"activeView": 1, "activeStaffId": null, "searchTerm": ""})),
            Just(json!({"activeView": "x", "activeStaffId": [], "searchTerm": ""})),
            Just(json!({"activeView": "x", "activeStaffId": null})),
        ]
        .prop_map(Op::Garbage),
    ]
}

proptest! {
    #[test]
    fn prop_url_round_trip(state in non_default_state()) {
        let url = query::to_url(&state, DEFAULT_VIEW);
        let parsed = query::from_url(&url, DEFAULT_VIEW).unwrap();
        prop_assert_eq!(parsed, state);
    }

    #[test]
    fn prop_payload_round_trip(state in non_default_state()) {
        let decoded = StateValidator::validate_payload(&state.to_payload()).unwrap();
        prop_assert_eq!(decoded, state);
    }

    #[test]
    fn prop_state_always_valid(ops in proptest::collection::vec(op(), 1..40)) {
        let t = TestNavigator::new();

        for op in ops {
            let before = t.state();
            match op {
                Op::View(view) => {
                    let rejected = view.is_empty();
                    t.nav.navigate_to_view(&view, None);
                    if rejected {
                        prop_assert_eq!(t.state(), before.clone());
                    }
                }
                Op::Staff(id) => t.nav.navigate_to_staff(&id),
                Op::Search(term) => t.nav.update_search(&term),
                Op::Back => t.nav.go_back(),
                Op::Forward => t.nav.go_forward(),
                Op::Restore => t.nav.restore_valid_state(),
                Op::Garbage(payload) => {
                    t.history.emit(HistoryEvent::new(Some(payload), "/"));
                }
            }
            t.history.dispatch_pending();

            let (current, last_valid) =
                t.nav.with(|c| (c.state().clone(), c.last_valid_state().clone()));
            prop_assert!(StateValidator::validate(&current).is_ok());
            prop_assert_eq!(current, last_valid);
        }
    }
}
