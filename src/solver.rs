//! Solver seam
//!
//! The harness drives any field solver through two traits: [`FieldSolver`]
//! turns a [`TrialConfig`] into a fresh simulation, and [`SteppedSimulation`]
//! is the handle it steps and probes. [`YeeSolver`] adapts the bundled
//! `yee_fdtd` engine.

use num_complex::Complex64;
use yee_fdtd::{
    Boundary, Component, Fields, GaussianSrc, Permittivity, Point, Structure, Symmetry, Volume,
};

use crate::error::Result;

/// A time-stepped field simulation
pub trait SteppedSimulation {
    /// Advance by one time step
    fn step(&mut self);

    /// Current simulation time
    fn time(&self) -> f64;

    /// Time after which every source is switched off
    fn last_source_time(&self) -> f64;

    /// Field value at a point; purely real solvers return a zero imaginary part
    fn field(&self, component: Component, point: &Point) -> Complex64;
}

/// Builds a fresh simulation per trial
pub trait FieldSolver {
    type Simulation: SteppedSimulation;

    fn build(&self, trial: &TrialConfig) -> Result<Self::Simulation>;
}

impl<S: FieldSolver + ?Sized> FieldSolver for &S {
    type Simulation = S::Simulation;

    fn build(&self, trial: &TrialConfig) -> Result<Self::Simulation> {
        (**self).build(trial)
    }
}

/// Single Gaussian point excitation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    pub src: GaussianSrc,
    pub component: Component,
    pub position: Point,
}

/// Where the steady-state amplitude is sampled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub component: Component,
    pub point: Point,
}

/// Complete description of one simulation
#[derive(Clone)]
pub struct TrialConfig {
    pub volume: Volume,
    pub boundary: Boundary,
    pub symmetry: Option<Symmetry>,
    pub permittivity: Permittivity,
    pub source: PointSource,
}

impl TrialConfig {
    pub fn structure(&self) -> Structure {
        let structure = Structure::new(
            self.volume.clone(),
            self.permittivity.clone(),
            self.boundary.clone(),
        );
        match &self.symmetry {
            Some(symmetry) => structure.with_symmetry(symmetry.clone()),
            None => structure,
        }
    }
}

impl std::fmt::Debug for TrialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialConfig")
            .field("volume", &self.volume)
            .field("boundary", &self.boundary)
            .field("symmetry", &self.symmetry)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// [`FieldSolver`] backed by `yee_fdtd`
#[derive(Debug, Clone, Copy)]
pub struct YeeSolver {
    pub courant: f64,
}

impl Default for YeeSolver {
    fn default() -> Self {
        Self {
            courant: yee_fdtd::DEFAULT_COURANT,
        }
    }
}

impl FieldSolver for YeeSolver {
    type Simulation = Fields;

    fn build(&self, trial: &TrialConfig) -> Result<Fields> {
        let mut fields = Fields::with_courant(&trial.structure(), self.courant)?;
        let source = &trial.source;
        fields.add_point_source(source.component, source.src, source.position)?;
        Ok(fields)
    }
}

impl SteppedSimulation for Fields {
    fn step(&mut self) {
        Fields::step(self);
    }

    fn time(&self) -> f64 {
        Fields::time(self)
    }

    fn last_source_time(&self) -> f64 {
        Fields::last_source_time(self)
    }

    fn field(&self, component: Component, point: &Point) -> Complex64 {
        Complex64::new(self.get_field(component, point), 0.0)
    }
}
