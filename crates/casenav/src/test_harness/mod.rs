//! Test harness module
//!
//! In-memory host and navigation simulator

pub mod memory;
pub mod simulator;

pub use memory::*;
pub use simulator::*;

use crate::error::NavigationError;

/// Test harness for running stress tests and certification
pub struct TestHarness;

impl TestHarness {
    /// Run one long simulation with the default mix
    ///
    /// # Errors
    /// Fails only if the default configuration is rejected.
    pub fn run_stress_test(iterations: u64) -> Result<StressTestReport, NavigationError> {
        tracing::info!("Running stress test with {} iterations", iterations);

        let config = SimulatorConfig {
            seed: 12345,
            total_operations: iterations,
            stop_on_first_violation: false,
            ..Default::default()
        };

        let report = run_simulator(config)?;

        Ok(StressTestReport {
            iterations,
            violations: report.violations.len(),
            history_length: report.history_length,
            success: report.passed(),
        })
    }

    /// Run the simulator across several seeds
    ///
    /// # Errors
    /// Fails only if the default configuration is rejected.
    pub fn run_certification(
        seeds: u64,
        operations_per_seed: u64,
    ) -> Result<CertificationReport, NavigationError> {
        tracing::info!("Running certification simulation across {} seeds", seeds);

        let mut total_violations = 0;
        for seed in 0..seeds {
            let config = SimulatorConfig {
                seed,
                total_operations: operations_per_seed,
                ..Default::default()
            };
            total_violations += run_simulator(config)?.violations.len();
        }

        Ok(CertificationReport {
            passed: total_violations == 0,
            total_violations,
            seeds_tested: seeds,
        })
    }
}

/// Report from a stress test
#[derive(Debug, Clone)]
pub struct StressTestReport {
    /// Operations executed
    pub iterations: u64,
    /// Violations detected
    pub violations: usize,
    /// Entries left on the history stack
    pub history_length: usize,
    /// No violations
    pub success: bool,
}

/// Report from certification
#[derive(Debug, Clone)]
pub struct CertificationReport {
    /// Every seed passed
    pub passed: bool,
    /// Violations summed over all seeds
    pub total_violations: usize,
    /// Number of seeds run
    pub seeds_tested: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_test_passes() {
        let report = TestHarness::run_stress_test(1_000).unwrap();
        assert!(report.success);
        assert_eq!(report.violations, 0);
        assert!(report.history_length >= 1);
    }

    #[test]
    fn certification_passes() {
        let report = TestHarness::run_certification(3, 300).unwrap();
        assert!(report.passed);
        assert_eq!(report.seeds_tested, 3);
    }
}
