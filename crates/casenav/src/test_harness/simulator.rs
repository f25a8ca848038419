//! Navigation simulator - randomized driver for the controller
//!
//! Generates a seeded stream of valid navigations, edge cases (failing host
//! calls, foreign history entries, restores) and corrupted history events,
//! runs each against a controller attached to an in-memory host, and checks
//! the controller invariants after every step.

use super::memory::{ManualClock, MemoryHistory, MemorySessionStorage};
use crate::config::NavigationConfig;
use crate::controller::{NavigationController, NavigationHandle};
use crate::error::{HostOperation, NavigationError};
use crate::host::{HistoryEvent, HistoryHost};
use crate::state::{NavigationState, StateUpdate, StateValidator, UpdateOptions, STAFF_VIEW_PREFIX};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const VIEWS: &[&str] = &["dashboard", "clients", "care-plans", "reports", "time-entries", "settings"];
const STAFF_IDS: &[&str] = &["1", "7", "42", "a9f3", "staff with space"];
const SEARCH_TERMS: &[&str] = &["", "smith", "care plan", "a&b=c", "ü"];

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Distribution of operation types
    pub operation_distribution: OperationDistribution,
    /// Controller configuration under test
    pub navigation: NavigationConfig,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Stop once this many violations were recorded
    pub stop_on_error_count: Option<usize>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 10_000,
            operation_distribution: OperationDistribution::default(),
            navigation: NavigationConfig::default(),
            stop_on_first_violation: true,
            stop_on_error_count: None,
        }
    }
}

/// Probability distribution for operation generation
#[derive(Debug, Clone)]
pub struct OperationDistribution {
    /// Ordinary navigation
    pub valid_ops: f64,
    /// Host failures, foreign entries, restores, clock movement
    pub edge_cases: f64,
    /// Transitions and history events that must be rejected
    pub invalid_ops: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            valid_ops: 0.70,
            edge_cases: 0.20,
            invalid_ops: 0.10,
        }
    }
}

/// All operations the simulator can generate
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    /// Show a view, optionally with a staff member
    NavigateToView(String, Option<String>),
    /// Show a staff member's page
    NavigateToStaff(String),
    /// Edit the search filter
    UpdateSearch(String),
    /// Host back
    GoBack,
    /// Host forward
    GoForward,

    /// Move the clock by this many milliseconds
    AdvanceClock(u64),
    /// Explicit restore
    Restore,
    /// Entry pushed by code other than the controller
    ForeignPush(Option<Value>, String),
    /// Navigate while the host rejects pushes
    NavigateWithFailingPush(String),
    /// Back while the host rejects it
    FailingBack,
    /// Forward while the host rejects it
    FailingForward,

    /// Transition to an empty view
    EmptyView,
    /// History event carrying an invalid payload
    CorruptEvent(Value),
    /// History event whose URL cannot be parsed
    UnparseableEvent(String),
}

/// What an operation must do to the observable state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedOutcome {
    /// State becomes exactly this
    Commit(NavigationState),
    /// State stays as it was
    Unchanged,
    /// Host-dependent, only invariants apply
    Any,
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// Operation outcome didn't match expectation
    UnexpectedOutcome {
        /// Position in the operation stream
        operation_index: u64,
        /// Offending operation
        operation: SimulatedOperation,
        /// What should have happened
        expected: ExpectedOutcome,
        /// State observed afterwards
        actual: NavigationState,
    },
    /// Invariant was violated
    Invariant(InvariantViolation),
}

/// A specific invariant violation
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Position in the operation stream
    pub operation_index: u64,
    /// Failed check
    pub check: InvariantCheck,
    /// Human-readable context
    pub details: String,
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    /// Current state passes validation
    CurrentStateIsValid,
    /// Current state equals the recovery anchor
    CurrentEqualsLastValid,
    /// Search edits add no history entry
    SearchEditsNeverPush,
    /// A restore rewrites the entry the host shows
    RestoreRewritesCurrentEntry,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    /// Operations executed
    pub total_operations: u64,
    /// Operations that changed the state
    pub committed: u64,
    /// Operations that left the state alone
    pub unchanged: u64,
    /// Operations that rewrote the current history entry
    pub entry_rewrites: u64,
    /// Counts keyed by operation name
    pub operations_by_type: HashMap<String, u64>,
}

impl OperationStats {
    fn record(&mut self, operation: &SimulatedOperation, changed: bool, rewritten: bool) {
        self.total_operations += 1;

        let type_name = format!("{operation:?}")
            .split('(')
            .next()
            .unwrap_or("Unknown")
            .to_string();
        *self.operations_by_type.entry(type_name).or_insert(0) += 1;

        if changed {
            self.committed += 1;
        } else {
            self.unchanged += 1;
        }
        if rewritten {
            self.entry_rewrites += 1;
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Operation counters
    pub stats: OperationStats,
    /// Everything that went wrong
    pub violations: Vec<Violation>,
    /// Controller state after the last operation
    pub final_state: NavigationState,
    /// Entries on the history stack at the end
    pub history_length: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Navigation Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("State Changes: {}\n", self.stats.committed));
        report.push_str(&format!("No Change: {}\n", self.stats.unchanged));
        report.push_str(&format!("Entry Rewrites: {}\n", self.stats.entry_rewrites));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));
        report.push_str(&format!("History Entries: {}\n", self.history_length));
        report.push_str(&format!("Final View: {}\n", self.final_state.active_view));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Run the navigation simulator
///
/// # Errors
/// Fails if `config.navigation` is invalid.
pub fn run_simulator(config: SimulatorConfig) -> Result<SimulatorReport, NavigationError> {
    let history = Arc::new(MemoryHistory::new("/"));
    let clock = Arc::new(ManualClock::new());
    let controller = NavigationController::new(
        config.navigation.clone(),
        Arc::clone(&history),
        MemorySessionStorage::new(),
        Arc::clone(&clock),
    )?;
    let handle = NavigationHandle::attach(controller);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();

    for i in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &config.operation_distribution);

        let before = handle.state();
        let pushes_before = history.push_count();
        let replaces_before = history.replace_count();

        let expected = expected_outcome(&operation, &before);
        execute_operation(&handle, &history, &clock, &operation);

        let after = handle.state();
        let outcome_matches = match &expected {
            ExpectedOutcome::Commit(state) => after == *state,
            ExpectedOutcome::Unchanged => after == before,
            ExpectedOutcome::Any => true,
        };

        if !outcome_matches {
            violations.push(Violation::UnexpectedOutcome {
                operation_index: i,
                operation: operation.clone(),
                expected,
                actual: after.clone(),
            });

            if config.stop_on_first_violation {
                break;
            }

            if let Some(max_errors) = config.stop_on_error_count {
                if violations.len() >= max_errors {
                    break;
                }
            }
        }

        let restored = history.replace_count() > replaces_before;
        let step = Step {
            index: i,
            operation: &operation,
            pushes_before,
            restored,
        };
        if let Err(inv_violations) = check_invariants(&handle, &history, &step) {
            violations.extend(inv_violations.into_iter().map(Violation::Invariant));
            if config.stop_on_first_violation {
                break;
            }
        }

        stats.record(&operation, after != before, restored);
    }

    let final_state = handle.state();
    Ok(SimulatorReport {
        config,
        stats,
        violations,
        final_state,
        history_length: history.len(),
    })
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

/// Generate a random operation based on the distribution
fn generate_operation(rng: &mut StdRng, distribution: &OperationDistribution) -> SimulatedOperation {
    let r: f64 = rng.gen();

    if r < distribution.valid_ops {
        generate_valid_operation(rng)
    } else if r < distribution.valid_ops + distribution.edge_cases {
        generate_edge_case_operation(rng)
    } else {
        generate_invalid_operation(rng)
    }
}

fn generate_valid_operation(rng: &mut StdRng) -> SimulatedOperation {
    match rng.gen_range(0..5) {
        0 => SimulatedOperation::NavigateToView(
            pick(rng, VIEWS).to_string(),
            rng.gen_bool(0.3).then(|| pick(rng, STAFF_IDS).to_string()),
        ),
        1 => SimulatedOperation::NavigateToStaff(pick(rng, STAFF_IDS).to_string()),
        2 => SimulatedOperation::UpdateSearch(pick(rng, SEARCH_TERMS).to_string()),
        3 => SimulatedOperation::GoBack,
        _ => SimulatedOperation::GoForward,
    }
}

fn generate_edge_case_operation(rng: &mut StdRng) -> SimulatedOperation {
    match rng.gen_range(0..6) {
        0 => SimulatedOperation::AdvanceClock(rng.gen_range(10..250)),
        1 => SimulatedOperation::Restore,
        2 => {
            let view = pick(rng, VIEWS);
            let state = if rng.gen_bool(0.5) {
                Some(NavigationState::initial(view).to_payload())
            } else {
                None
            };
            SimulatedOperation::ForeignPush(state, format!("/?view={view}"))
        }
        3 => SimulatedOperation::NavigateWithFailingPush(pick(rng, VIEWS).to_string()),
        4 => SimulatedOperation::FailingBack,
        _ => SimulatedOperation::FailingForward,
    }
}

/// Generate an operation that should be rejected
fn generate_invalid_operation(rng: &mut StdRng) -> SimulatedOperation {
    match rng.gen_range(0..7) {
        0 => SimulatedOperation::EmptyView,
        1 => SimulatedOperation::CorruptEvent(json!({"activeView": null})),
        2 => SimulatedOperation::CorruptEvent(
            json!({"activeView": "", "activeStaffId": null, "searchTerm": ""}),
        ),
        3 => SimulatedOperation::CorruptEvent(
            json!({"activeView": "clients", "activeStaffId": 7, "searchTerm": ""}),
        ),
        4 => SimulatedOperation::CorruptEvent(
            json!({"activeView": "clients", "activeStaffId": null}),
        ),
        5 => SimulatedOperation::CorruptEvent(json!({})),
        _ => SimulatedOperation::UnparseableEvent("http://[::1".to_string()),
    }
}

fn expected_outcome(operation: &SimulatedOperation, before: &NavigationState) -> ExpectedOutcome {
    use SimulatedOperation::*;
    match operation {
        NavigateToView(view, staff) => ExpectedOutcome::Commit(
            StateUpdate::new()
                .view(view.clone())
                .staff(staff.clone())
                .apply_to(before),
        ),
        NavigateToStaff(id) => ExpectedOutcome::Commit(
            StateUpdate::new()
                .view(format!("{STAFF_VIEW_PREFIX}{id}"))
                .staff(Some(id.clone()))
                .apply_to(before),
        ),
        NavigateWithFailingPush(view) => ExpectedOutcome::Commit(
            StateUpdate::new().view(view.clone()).staff(None).apply_to(before),
        ),
        UpdateSearch(term) => {
            ExpectedOutcome::Commit(StateUpdate::new().search(term.clone()).apply_to(before))
        }
        GoBack | GoForward => ExpectedOutcome::Any,
        AdvanceClock(_) | Restore | ForeignPush(..) | FailingBack | FailingForward => {
            ExpectedOutcome::Unchanged
        }
        EmptyView | CorruptEvent(_) | UnparseableEvent(_) => ExpectedOutcome::Unchanged,
    }
}

fn execute_operation(
    handle: &NavigationHandle,
    history: &MemoryHistory,
    clock: &ManualClock,
    operation: &SimulatedOperation,
) {
    use SimulatedOperation::*;
    match operation {
        NavigateToView(view, staff) => handle.navigate_to_view(view, staff.as_deref()),
        NavigateToStaff(id) => handle.navigate_to_staff(id),
        UpdateSearch(term) => handle.update_search(term),
        GoBack => handle.go_back(),
        GoForward => handle.go_forward(),
        AdvanceClock(ms) => clock.advance(Duration::from_millis(*ms)),
        Restore => handle.restore_valid_state(),
        ForeignPush(state, url) => history.push_foreign(state.clone(), url.clone()),
        NavigateWithFailingPush(view) => {
            history.fail_on(HostOperation::Push);
            handle.navigate_to_view(view, None);
            history.recover(HostOperation::Push);
        }
        FailingBack => {
            history.fail_on(HostOperation::Back);
            handle.go_back();
            history.recover(HostOperation::Back);
        }
        FailingForward => {
            history.fail_on(HostOperation::Forward);
            handle.go_forward();
            history.recover(HostOperation::Forward);
        }
        EmptyView => handle.with(|c| c.update_state(StateUpdate::new().view(""), UpdateOptions::default())),
        CorruptEvent(payload) => {
            history.emit(HistoryEvent::new(Some(payload.clone()), history.current_url()));
        }
        UnparseableEvent(url) => history.emit(HistoryEvent::bare(url.clone())),
    }
    history.dispatch_pending();
}

struct Step<'a> {
    index: u64,
    operation: &'a SimulatedOperation,
    pushes_before: usize,
    restored: bool,
}

/// Invariant checks run after every operation
fn check_invariants(
    handle: &NavigationHandle,
    history: &MemoryHistory,
    step: &Step<'_>,
) -> Result<(), Vec<InvariantViolation>> {
    let mut violations = Vec::new();
    let mut fail = |check, details: String| {
        violations.push(InvariantViolation {
            operation_index: step.index,
            check,
            details,
        });
    };

    let (current, last_valid, url) =
        handle.with(|c| (c.state().clone(), c.last_valid_state().clone(), c.current_url()));

    if let Err(e) = StateValidator::validate(&current) {
        fail(InvariantCheck::CurrentStateIsValid, e.to_string());
    }

    if current != last_valid {
        fail(
            InvariantCheck::CurrentEqualsLastValid,
            format!("current {current:?} vs last valid {last_valid:?}"),
        );
    }

    if matches!(step.operation, SimulatedOperation::UpdateSearch(_))
        && history.push_count() != step.pushes_before
    {
        fail(
            InvariantCheck::SearchEditsNeverPush,
            format!("{} pushes -> {}", step.pushes_before, history.push_count()),
        );
    }

    let restore_expected = matches!(
        step.operation,
        SimulatedOperation::Restore
            | SimulatedOperation::EmptyView
            | SimulatedOperation::CorruptEvent(_)
            | SimulatedOperation::UnparseableEvent(_)
            | SimulatedOperation::FailingBack
            | SimulatedOperation::FailingForward
    );
    if restore_expected && (!step.restored || history.current_url() != url) {
        fail(
            InvariantCheck::RestoreRewritesCurrentEntry,
            format!("entry {:?} for state url {url:?}", history.current_url()),
        );
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
