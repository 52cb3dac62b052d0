//! Paired trials
//!
//! A pair is a baseline trial and a reference with a thicker absorber, both
//! excited by the same source and sampled at the same probe. Each trial gets
//! its own simulation, dropped as soon as its amplitude is known.

use num_complex::Complex64;
use tracing::debug;

use crate::accumulator::{DecayCriterion, FtResult, SteadyStateFt};
use crate::error::{HarnessError, Result};
use crate::solver::{FieldSolver, Probe, TrialConfig};

#[derive(Debug, Clone)]
pub struct TrialPair {
    pub baseline: TrialConfig,
    pub reference: TrialConfig,
    pub probe: Probe,
}

impl TrialPair {
    /// Both trials must share source spectrum, component and position
    pub fn validate(&self) -> Result<()> {
        let (a, b) = (&self.baseline.source, &self.reference.source);
        if a.src != b.src {
            return Err(HarnessError::MismatchedPair(format!(
                "source spectra differ: {:?} vs {:?}",
                a.src, b.src
            )));
        }
        if a.component != b.component {
            return Err(HarnessError::MismatchedPair(format!(
                "source components differ: {} vs {}",
                a.component, b.component
            )));
        }
        if a.position != b.position {
            return Err(HarnessError::MismatchedPair(format!(
                "source positions differ: {:?} vs {:?}",
                a.position.as_slice(),
                b.position.as_slice()
            )));
        }
        Ok(())
    }
}

/// Amplitudes of both members of a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairResult {
    pub baseline: FtResult,
    pub reference: FtResult,
}

impl PairResult {
    pub fn amplitudes(&self) -> (Complex64, Complex64) {
        (self.baseline.amplitude, self.reference.amplitude)
    }
}

/// Build, run and discard one simulation
pub fn run_trial<V: FieldSolver, D: DecayCriterion>(
    solver: &V,
    ft: &SteadyStateFt<D>,
    trial: &TrialConfig,
    probe: &Probe,
) -> Result<FtResult> {
    let mut sim = solver.build(trial)?;
    ft.run(&mut sim, probe)
}

/// Run both trials of a pair in sequence
pub fn run_pair<V: FieldSolver, D: DecayCriterion>(
    solver: &V,
    ft: &SteadyStateFt<D>,
    pair: &TrialPair,
) -> Result<PairResult> {
    pair.validate()?;
    let baseline = run_trial(solver, ft, &pair.baseline, &pair.probe)?;
    let reference = run_trial(solver, ft, &pair.reference, &pair.probe)?;
    debug!(
        baseline_steps = baseline.steps,
        reference_steps = reference.steps,
        "pair finished"
    );
    Ok(PairResult {
        baseline,
        reference,
    })
}
