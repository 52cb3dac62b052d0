//! Certification run
//!
//! Runs the checks in a fixed order and stops at the first one that fails.
//! The outcome is returned, never acted upon: deciding to exit the process
//! is left to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use yee_fdtd::Component;

use crate::accumulator::SteadyStateFt;
use crate::checks;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::log::Logger;
use crate::solver::FieldSolver;
use crate::sweep::{Sweep, SweepRecord};

/// One certification check, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    /// Resolution sweep in 1D (informational)
    #[value(name = "1d")]
    #[serde(rename = "1d")]
    Resolution1d,
    /// Resolution sweep in 2D, TM polarization
    #[value(name = "2d-tm")]
    #[serde(rename = "2d-tm")]
    Tm2d,
    /// Resolution sweep in 2D, TE polarization
    #[value(name = "2d-te")]
    #[serde(rename = "2d-te")]
    Te2d,
    /// Resolution sweep in cylindrical coordinates (informational, opt-in)
    Cylindrical,
    /// Absorber thickness sweep in 1D
    Thickness,
}

impl Check {
    pub const ALL: [Check; 5] = [
        Check::Resolution1d,
        Check::Tm2d,
        Check::Te2d,
        Check::Cylindrical,
        Check::Thickness,
    ];

    /// Message identifying the physical configuration that failed
    pub fn diagnostic(&self) -> &'static str {
        match self {
            Check::Resolution1d => "not a pml in 1d.",
            Check::Tm2d => "not a pml in 2d TM.",
            Check::Te2d => "not a pml in 2d TE.",
            Check::Cylindrical => "not a pml in cylindrical co-ordinates.",
            Check::Thickness => "pml doesn't scale properly with length.",
        }
    }

    pub fn sweep(&self, config: &HarnessConfig) -> Result<Sweep> {
        match self {
            Check::Resolution1d => Ok(checks::resolution_1d(config)),
            Check::Tm2d => checks::resolution_2d(Component::Ez, config),
            Check::Te2d => checks::resolution_2d(Component::Hz, config),
            Check::Cylindrical => Ok(checks::cylindrical(config)),
            Check::Thickness => Ok(checks::thickness(config)),
        }
    }
}

/// Checks to run, always in [`Check::ALL`] order.
///
/// An empty selection means the default set: everything except the
/// cylindrical sweep, which needs `include_cylindrical`.
pub fn plan(selection: &[Check], include_cylindrical: bool) -> Vec<Check> {
    Check::ALL
        .into_iter()
        .filter(|check| {
            if selection.is_empty() {
                *check != Check::Cylindrical || include_cylindrical
            } else {
                selection.contains(check)
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub check: Check,
    pub record: SweepRecord,
}

/// Records of a run in which every check passed
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CertificationReport {
    pub checks: Vec<CheckReport>,
}

/// First failing check and what went wrong
#[derive(Debug, Error)]
#[error("{diagnostic}")]
pub struct CheckFailure {
    pub check: Check,
    pub diagnostic: &'static str,
    #[source]
    pub source: HarnessError,
    /// Checks that passed before the failure
    pub completed: CertificationReport,
}

impl CheckFailure {
    /// Whether the failure is a physical regression rather than a bad request
    pub fn is_tolerance_violation(&self) -> bool {
        self.source.is_tolerance_violation()
    }
}

/// Run the planned checks, stopping at the first failure
pub fn certify<V: FieldSolver>(
    solver: &V,
    config: &HarnessConfig,
    selection: &[Check],
    logger: &dyn Logger,
) -> std::result::Result<CertificationReport, CheckFailure> {
    let ft = SteadyStateFt::new(config.freq, &config.steady_state);
    let mut report = CertificationReport::default();

    logger.log("Running PML tests...");
    for check in plan(selection, config.include_cylindrical) {
        info!(target: "pml_check", ?check, "starting check");
        let outcome = check.sweep(config).and_then(|sweep| sweep.run(solver, &ft, logger));
        match outcome {
            Ok(record) => report.checks.push(CheckReport { check, record }),
            Err(source) => {
                error!(target: "pml_check", ?check, %source, "check failed");
                return Err(CheckFailure {
                    check,
                    diagnostic: check.diagnostic(),
                    source,
                    completed: report,
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLogger;
    use crate::sweep::tests::ScriptedSolver;
    use pretty_assertions::assert_eq;

    /// Doubled pairs giving a constant metric (baseline 1.001, reference 1)
    fn steady_amplitudes(points: usize) -> Vec<f64> {
        std::iter::repeat([1.001, 1.0]).take(points).flatten().collect()
    }

    fn small_config() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.sweeps.resolution_1d = 2;
        config.sweeps.resolution_2d = 3;
        config.sweeps.cylindrical = 2;
        config.sweeps.thickness = 2;
        config
    }

    #[test]
    fn test_plan_order_and_cylindrical_opt_in() {
        assert_eq!(
            plan(&[], false),
            vec![Check::Resolution1d, Check::Tm2d, Check::Te2d, Check::Thickness]
        );
        assert_eq!(plan(&[], true).len(), 5);
        assert_eq!(
            plan(&[Check::Thickness, Check::Cylindrical, Check::Tm2d], false),
            vec![Check::Tm2d, Check::Cylindrical, Check::Thickness]
        );
    }

    #[test]
    fn test_first_failure_stops_run() {
        // 1D (2 pairs) passes; TM metric stays flat, which violates the decay at index 2
        let mut amplitudes = steady_amplitudes(2);
        amplitudes.extend(steady_amplitudes(3));
        let solver = ScriptedSolver::new(&amplitudes);
        let logger = MemoryLogger::new();

        let failure = certify(&solver, &small_config(), &[], &logger).unwrap_err();
        assert_eq!(failure.check, Check::Tm2d);
        assert_eq!(failure.to_string(), "not a pml in 2d TM.");
        assert!(failure.is_tolerance_violation());
        assert_eq!(failure.completed.checks.len(), 1);
        assert_eq!(failure.completed.checks[0].check, Check::Resolution1d);
        assert_eq!(solver.builds.get(), 10);

        let lines = logger.lines();
        assert_eq!(lines[0], "Running PML tests...");
        assert!(lines.contains(&"passed 1d PML check.".to_string()));
        assert!(!lines.iter().any(|l| l.contains("2d TE")));
    }

    #[test]
    fn test_all_checks_pass() {
        // 1D: 2 pairs; TM/TE: 3 decaying pairs; thickness: 2 trials in band
        let mut amplitudes = steady_amplitudes(2);
        for _ in 0..2 {
            amplitudes.extend([1.1, 1.0, 1.01, 1.0, 1.0001, 1.0]);
        }
        amplitudes.extend([1.0, 1.0 + 2e-5]);
        let solver = ScriptedSolver::new(&amplitudes);
        let logger = MemoryLogger::new();

        let report = certify(&solver, &small_config(), &[], &logger).unwrap();
        let order: Vec<_> = report.checks.iter().map(|c| c.check).collect();
        assert_eq!(order, vec![Check::Resolution1d, Check::Tm2d, Check::Te2d, Check::Thickness]);
        assert_eq!(report.checks[3].record.points.len(), 1);
        assert_eq!(logger.lines().last().map(String::as_str), Some("pml scales correctly with length."));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["checks"][1]["check"], "2d-tm");
        assert_eq!(json["checks"][0]["record"]["mode"], "informational");
    }

    #[test]
    fn test_thickness_failure_diagnostic() {
        // Identical trials: zero reflection is below the band
        let solver = ScriptedSolver::new(&[1.0, 1.0]);
        let failure = certify(&solver, &small_config(), &[Check::Thickness], &MemoryLogger::new()).unwrap_err();
        assert_eq!(failure.diagnostic, "pml doesn't scale properly with length.");
        assert_eq!(solver.builds.get(), 2);
    }
}
