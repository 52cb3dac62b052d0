//! Parameterized sweep runner
//!
//! Every convergence check is the same loop: walk a parameter schedule, run
//! trials at each value, turn the amplitudes into a reflection metric, log
//! it and hold it against a tolerance policy. The checks only differ in the
//! schedule, how trials are paired and which scaling law they expect.

use num_complex::Complex64;
use serde::Serialize;
use tracing::{info, warn};

use crate::accumulator::{DecayCriterion, SteadyStateFt};
use crate::error::{Result, ToleranceViolation};
use crate::log::{Logger, format_g};
use crate::metric::reflection;
use crate::solver::{FieldSolver, Probe, TrialConfig};
use crate::trial::{TrialPair, run_pair, run_trial};

/// Sequence of swept parameter values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterSchedule {
    /// `start + step·i`
    Linear { start: f64, step: f64, count: usize },
    /// `base^i`
    Geometric { base: f64, count: usize },
}

impl ParameterSchedule {
    pub fn len(&self) -> usize {
        match *self {
            ParameterSchedule::Linear { count, .. } | ParameterSchedule::Geometric { count, .. } => count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> f64 {
        match *self {
            ParameterSchedule::Linear { start, step, .. } => start + step * index as f64,
            ParameterSchedule::Geometric { base, .. } => base.powi(index as i32),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(|i| self.value(i))
    }
}

pub type PairBuilder = Box<dyn Fn(f64) -> Result<TrialPair>>;
pub type TrialBuilder = Box<dyn Fn(f64) -> Result<(TrialConfig, Probe)>>;

/// How the two amplitudes of a metric are obtained
pub enum Pairing {
    /// Baseline and doubled-absorber reference at the same parameter
    Doubled(PairBuilder),
    /// One trial per parameter, compared against the previous parameter's
    /// trial. The first value yields no metric and a point is reported
    /// under the previous parameter.
    Consecutive(TrialBuilder),
}

impl std::fmt::Debug for Pairing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pairing::Doubled(_) => f.write_str("Doubled"),
            Pairing::Consecutive(_) => f.write_str("Consecutive"),
        }
    }
}

/// Expected scaling of the metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TolerancePolicy {
    /// No expectation; values are only recorded
    None,
    /// `metric ≤ prev · (prev_param/param)^exponent · margin`
    PowerLawDecay {
        exponent: f64,
        margin: f64,
        from_index: usize,
    },
    /// `lower·(scale/param)^exponent ≤ metric ≤ upper·(scale/param)^exponent`
    PowerLawBand {
        lower: f64,
        upper: f64,
        scale: f64,
        exponent: f64,
        from_index: usize,
    },
}

impl TolerancePolicy {
    /// Allowed range for the metric at `value`, given the previous point
    fn bounds(&self, index: usize, value: f64, previous: Option<(f64, f64)>) -> Option<(Option<f64>, f64)> {
        match *self {
            TolerancePolicy::None => None,
            TolerancePolicy::PowerLawDecay {
                exponent,
                margin,
                from_index,
            } => {
                let (prev_value, prev_metric) = previous.filter(|_| index >= from_index)?;
                Some((None, prev_metric * (prev_value / value).powf(exponent) * margin))
            }
            TolerancePolicy::PowerLawBand {
                lower,
                upper,
                scale,
                exponent,
                from_index,
            } => {
                if index < from_index {
                    return None;
                }
                let factor = (scale / value).powf(exponent);
                Some((Some(lower * factor), upper * factor))
            }
        }
    }

    /// Bounds are written as `metric <= upper` (and `metric >= lower`), so a
    /// NaN metric fails every enforced bound on purpose. A plain
    /// `metric > upper` test would let it through.
    fn check(
        &self,
        label: &str,
        point: &SweepPoint,
        value: f64,
        previous: Option<(f64, f64)>,
    ) -> Option<ToleranceViolation> {
        let (lower, upper) = self.bounds(point.index, value, previous)?;
        let metric = point.reflection;
        let within = metric <= upper && lower.map_or(true, |l| metric >= l);
        if within {
            return None;
        }
        Some(ToleranceViolation {
            label: label.to_string(),
            index: point.index,
            parameter: point.parameter,
            reflection: metric,
            lower,
            upper,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Violations fail the sweep
    Enforced,
    /// Violations are logged as warnings and recorded
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    pub index: usize,
    /// Parameter the point is reported under
    pub parameter: f64,
    pub reflection: f64,
}

/// Outcome of one completed sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRecord {
    pub label: String,
    pub mode: CheckMode,
    pub points: Vec<SweepPoint>,
    /// Violations tolerated in informational mode
    pub advisories: Vec<ToleranceViolation>,
}

/// One convergence check
#[derive(Debug)]
pub struct Sweep {
    pub label: &'static str,
    pub banner: String,
    /// Prefix of a progress line logged before each point
    pub progress: Option<String>,
    pub success: String,
    pub schedule: ParameterSchedule,
    pub pairing: Pairing,
    pub policy: TolerancePolicy,
    pub mode: CheckMode,
}

impl Sweep {
    pub fn run<V: FieldSolver, D: DecayCriterion>(
        &self,
        solver: &V,
        ft: &SteadyStateFt<D>,
        logger: &dyn Logger,
    ) -> Result<SweepRecord> {
        logger.log(&self.banner);
        let mut record = SweepRecord {
            label: self.label.to_string(),
            mode: self.mode,
            points: Vec::with_capacity(self.schedule.len()),
            advisories: Vec::new(),
        };
        // (parameter, amplitude) of the previous consecutive trial
        let mut last_trial: Option<(f64, Complex64)> = None;
        // (parameter, metric) of the previous point
        let mut previous: Option<(f64, f64)> = None;

        for (index, value) in self.schedule.values().enumerate() {
            if let Some(prefix) = &self.progress {
                logger.log(&format!("{prefix} {}...", format_g(value)));
            }

            let (parameter, metric) = match &self.pairing {
                Pairing::Doubled(build) => {
                    let pair = build(value)?;
                    let (ft1, ft2) = run_pair(solver, ft, &pair)?.amplitudes();
                    (value, reflection(ft1, ft2))
                }
                Pairing::Consecutive(build) => {
                    let (trial, probe) = build(value)?;
                    let amplitude = run_trial(solver, ft, &trial, &probe)?.amplitude;
                    match last_trial.replace((value, amplitude)) {
                        Some((prev_value, prev_amplitude)) => {
                            (prev_value, reflection(amplitude, prev_amplitude))
                        }
                        None => continue,
                    }
                }
            };

            logger.log(&format!(
                "{}:, {}, {}",
                self.label,
                format_g(parameter),
                format_g(metric)
            ));
            let point = SweepPoint {
                index,
                parameter,
                reflection: metric,
            };

            if let Some(violation) = self.policy.check(self.label, &point, value, previous) {
                match self.mode {
                    CheckMode::Enforced => return Err(violation.into()),
                    CheckMode::Informational => {
                        warn!(target: "pml_check", %violation, "informational check out of tolerance");
                        record.advisories.push(violation);
                    }
                }
            }

            record.points.push(point);
            previous = Some((value, metric));
        }

        info!(target: "pml_check", label = self.label, points = record.points.len(), "sweep complete");
        logger.log(&self.success);
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::accumulator::tests::Synthetic;
    use crate::config::SteadyStateSettings;
    use crate::error::HarnessError;
    use crate::log::MemoryLogger;
    use crate::solver::PointSource;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use yee_fdtd::{Component, GaussianSrc, Volume, pml, uniform, vec1d};

    /// Solver replaying scripted amplitudes, one per build
    pub(crate) struct ScriptedSolver {
        pub amplitudes: RefCell<Vec<f64>>,
        pub builds: Cell<usize>,
    }

    impl ScriptedSolver {
        pub fn new(amplitudes: &[f64]) -> Self {
            Self {
                amplitudes: RefCell::new(amplitudes.iter().rev().copied().collect()),
                builds: Cell::new(0),
            }
        }
    }

    impl FieldSolver for ScriptedSolver {
        type Simulation = Synthetic<Box<dyn Fn(f64) -> f64>>;

        fn build(&self, _trial: &TrialConfig) -> Result<Self::Simulation> {
            self.builds.set(self.builds.get() + 1);
            let amplitude = self.amplitudes.borrow_mut().pop().unwrap_or(1.0);
            // One nonzero sample at t = 0, so the accumulated amplitude is exactly `amplitude`
            let field: Box<dyn Fn(f64) -> f64> = Box::new(move |t: f64| if t < 0.25 { amplitude } else { 0.0 });
            Ok(Synthetic::new(0.5, 1.0, field))
        }
    }

    pub(crate) fn dummy_trial() -> (TrialConfig, Probe) {
        let trial = TrialConfig {
            volume: Volume::one_d(12.0, 10.0).unwrap(),
            boundary: pml(1.0),
            symmetry: None,
            permittivity: uniform(1.0),
            source: PointSource {
                src: GaussianSrc::new(1.0, 0.05),
                component: Component::Ex,
                position: vec1d(1.1),
            },
        };
        let probe = Probe {
            component: Component::Ex,
            point: vec1d(10.9),
        };
        (trial, probe)
    }

    fn dummy_consecutive(_value: f64) -> Result<(TrialConfig, Probe)> {
        Ok(dummy_trial())
    }

    pub(crate) fn dummy_pair(_value: f64) -> Result<TrialPair> {
        let (trial, probe) = dummy_trial();
        Ok(TrialPair {
            baseline: trial.clone(),
            reference: trial,
            probe,
        })
    }

    fn doubled(policy: TolerancePolicy, mode: CheckMode, count: usize) -> Sweep {
        Sweep {
            label: "refl2d",
            banner: "Checking resolution convergence...".into(),
            progress: None,
            success: "passed.".into(),
            schedule: ParameterSchedule::Linear {
                start: 10.0,
                step: 6.0,
                count,
            },
            pairing: Pairing::Doubled(Box::new(dummy_pair)),
            policy,
            mode,
        }
    }

    const DECAY: TolerancePolicy = TolerancePolicy::PowerLawDecay {
        exponent: 8.0,
        margin: 1.1,
        from_index: 2,
    };

    /// Reference amplitude 1 and baseline `1 + sqrt(metric)` give exactly `metric`
    fn amplitudes_for(metrics: &[f64]) -> Vec<f64> {
        metrics.iter().flat_map(|m| [1.0 + m.sqrt(), 1.0]).collect()
    }

    fn ft() -> SteadyStateFt {
        SteadyStateFt::new(1.0, &SteadyStateSettings::default())
    }

    #[test]
    fn test_schedules() {
        let linear = ParameterSchedule::Linear {
            start: 10.0,
            step: 10.0,
            count: 8,
        };
        assert_eq!(linear.values().collect::<Vec<_>>(), vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]);
        let geometric = ParameterSchedule::Geometric { base: 2.0, count: 7 };
        assert_eq!(geometric.values().collect::<Vec<_>>(), vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]);
    }

    #[test]
    fn test_decay_policy_passes_and_logs() {
        // Allowances: 5e-3 · (16/22)^8 · 1.1 ≈ 4.3e-4, then 1e-4 · (22/28)^8 · 1.1 ≈ 1.6e-5
        let metrics = [1e-3, 5e-3, 1e-4, 1e-6];
        let solver = ScriptedSolver::new(&amplitudes_for(&metrics));
        let logger = MemoryLogger::new();
        let record = doubled(DECAY, CheckMode::Enforced, 4).run(&solver, &ft(), &logger).unwrap();

        assert_eq!(solver.builds.get(), 8);
        assert_eq!(record.points.len(), 4);
        for (point, expected) in record.points.iter().zip(metrics) {
            assert!((point.reflection - expected).abs() < 1e-9 * expected);
        }
        let lines = logger.lines();
        assert_eq!(lines.first().map(String::as_str), Some("Checking resolution convergence..."));
        assert!(lines[1].starts_with("refl2d:, 10, "));
        assert!(lines[4].starts_with("refl2d:, 28, "));
        assert_eq!(lines.last().map(String::as_str), Some("passed."));
    }

    #[test]
    fn test_decay_policy_ignores_first_two_points() {
        // Second point grows, but only index 2 onwards is checked
        let metrics = [1e-6, 1e-2, 1e-4];
        let solver = ScriptedSolver::new(&amplitudes_for(&metrics));
        let record = doubled(DECAY, CheckMode::Enforced, 3)
            .run(&solver, &ft(), &MemoryLogger::new())
            .unwrap();
        assert_eq!(record.points.len(), 3);
    }

    #[test]
    fn test_decay_policy_failure_reports_point() {
        // Index 2 allowed ≈ 1e-4 · (16/22)^8 · 1.1 ≈ 8.6e-6
        let metrics = [1e-3, 1e-4, 1e-5];
        let solver = ScriptedSolver::new(&amplitudes_for(&metrics));
        let logger = MemoryLogger::new();
        let err = doubled(DECAY, CheckMode::Enforced, 4).run(&solver, &ft(), &logger).unwrap_err();

        match err {
            HarnessError::Tolerance(violation) => {
                assert_eq!(violation.label, "refl2d");
                assert_eq!(violation.index, 2);
                assert_eq!(violation.parameter, 22.0);
                assert_eq!(violation.lower, None);
                let allowed = 1e-4 * (16.0f64 / 22.0).powi(8) * 1.1;
                assert!((violation.upper - allowed).abs() < 1e-12);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Stopped at the failing point; no success line
        assert_eq!(solver.builds.get(), 6);
        assert!(!logger.lines().contains(&"passed.".to_string()));
    }

    #[test]
    fn test_non_finite_metric_violates() {
        // Zero reference amplitude at index 2; an all-zero trace counts as decayed
        let amplitudes = [1.1, 1.0, 1.01, 1.0, 1.0, 0.0];
        let solver = ScriptedSolver::new(&amplitudes);
        let ft = ft().with_criterion(|window_max: f64, emax: f64| window_max <= 1e-6 * emax);
        let err = doubled(DECAY, CheckMode::Enforced, 3)
            .run(&solver, &ft, &MemoryLogger::new())
            .unwrap_err();
        assert!(err.is_tolerance_violation());
    }

    #[test]
    fn test_nan_metric_fails_band_and_decay() {
        let point = SweepPoint {
            index: 2,
            parameter: 8.0,
            reflection: f64::NAN,
        };
        let band = TolerancePolicy::PowerLawBand {
            lower: 1e-10,
            upper: 1e-9,
            scale: 2.0,
            exponent: 6.0,
            from_index: 1,
        };
        let violation = band.check("refl1d", &point, 2.0, None).unwrap();
        assert!(violation.reflection.is_nan());
        assert_eq!(violation.index, 2);

        let violation = DECAY.check("refl2d", &point, 22.0, Some((16.0, 1e-6))).unwrap();
        assert!(violation.lower.is_none());

        // An ordinary metric inside the same band passes
        let inside = SweepPoint {
            reflection: 5e-10,
            ..point
        };
        assert!(band.check("refl1d", &inside, 2.0, None).is_none());
    }

    #[test]
    fn test_informational_mode_never_fails() {
        let metrics = [1e-6, 1e-5, 1e-4, 1e-3];
        let solver = ScriptedSolver::new(&amplitudes_for(&metrics));
        let record = doubled(DECAY, CheckMode::Informational, 4)
            .run(&solver, &ft(), &MemoryLogger::new())
            .unwrap();
        assert_eq!(record.points.len(), 4);
        assert_eq!(record.advisories.len(), 2);
        assert_eq!(record.advisories[0].index, 2);
    }

    #[test]
    fn test_consecutive_pairing_with_band() {
        // Amplitudes a_i; metric_i = (a_i - a_{i-1})² / a_{i-1}²
        // d = 2: band [1e-10, 1e-9]; d = 4: band [1.5625e-12, 1.5625e-11]
        let a0 = 1.0;
        let a1 = a0 * (1.0 + 2e-5); // metric 4e-10
        let a2 = a1 * (1.0 + 3e-6); // metric 9e-12
        let solver = ScriptedSolver::new(&[a0, a1, a2]);
        let logger = MemoryLogger::new();
        let sweep = Sweep {
            label: "refl1d",
            banner: "Checking thickness convergence of 1d PML...".into(),
            progress: None,
            success: "pml scales correctly with length.".into(),
            schedule: ParameterSchedule::Geometric { base: 2.0, count: 3 },
            pairing: Pairing::Consecutive(Box::new(dummy_consecutive)),
            policy: TolerancePolicy::PowerLawBand {
                lower: 1e-10,
                upper: 1e-9,
                scale: 2.0,
                exponent: 6.0,
                from_index: 1,
            },
            mode: CheckMode::Enforced,
        };
        let record = sweep.run(&solver, &ft(), &logger).unwrap();

        assert_eq!(solver.builds.get(), 3);
        let indices: Vec<_> = record.points.iter().map(|p| (p.index, p.parameter)).collect();
        assert_eq!(indices, vec![(1, 1.0), (2, 2.0)]);
        assert!((record.points[0].reflection - 4e-10).abs() < 1e-15);
        assert!((record.points[1].reflection - 9e-12).abs() < 1e-16);
        let lines = logger.lines();
        assert!(lines[1].starts_with("refl1d:, 1, 4"));
        assert!(lines[2].starts_with("refl1d:, 2, 9"));
    }

    #[test]
    fn test_band_rejects_too_small_metric() {
        // Suspiciously perfect absorption is also a failure
        let solver = ScriptedSolver::new(&[1.0, 1.0]);
        let sweep = Sweep {
            label: "refl1d",
            banner: String::new(),
            progress: None,
            success: String::new(),
            schedule: ParameterSchedule::Geometric { base: 2.0, count: 2 },
            pairing: Pairing::Consecutive(Box::new(dummy_consecutive)),
            policy: TolerancePolicy::PowerLawBand {
                lower: 1e-10,
                upper: 1e-9,
                scale: 2.0,
                exponent: 6.0,
                from_index: 1,
            },
            mode: CheckMode::Enforced,
        };
        match sweep.run(&solver, &ft(), &MemoryLogger::new()) {
            Err(HarnessError::Tolerance(violation)) => {
                assert_eq!(violation.reflection, 0.0);
                assert_eq!(violation.lower, Some(1e-10));
                assert_eq!(violation.upper, 1e-9);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_progress_lines() {
        let solver = ScriptedSolver::new(&[]);
        let logger = MemoryLogger::new();
        let mut sweep = doubled(TolerancePolicy::None, CheckMode::Informational, 2);
        sweep.progress = Some("    checking cylindrical resolution".into());
        sweep.run(&solver, &ft(), &logger).unwrap();
        let lines = logger.lines();
        assert_eq!(lines[1], "    checking cylindrical resolution 10...");
        assert_eq!(lines[2], "refl2d:, 10, 0");
        assert_eq!(lines[3], "    checking cylindrical resolution 16...");
    }
}
