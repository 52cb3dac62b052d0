//! pml-check: convergence gate for FDTD absorbing boundaries
//!
//! This crate provides:
//! - Steady-state extraction of a single-frequency amplitude from a
//!   time-stepped simulation, with an adaptive decay-based stopping rule
//! - Paired trials (baseline vs. thicker absorber) and the reflection metric
//!   `|ft - ft2|² / |ft2|²`
//! - One parameterized sweep runner with power-law tolerance policies
//! - The PML checks (1D, 2D TM/TE, cylindrical, thickness) and a sequencer
//!   that stops at the first failing check
//!
//! The field solver is reached only through [`FieldSolver`] and
//! [`SteppedSimulation`]; [`YeeSolver`] plugs in the bundled `yee_fdtd`
//! engine. Output lines go through an injected [`Logger`].

pub mod accumulator;
pub mod checks;
pub mod config;
pub mod error;
pub mod log;
pub mod metric;
pub mod sequencer;
pub mod solver;
pub mod sweep;
pub mod trial;

pub use accumulator::{DecayCriterion, FtResult, RatioDecay, SteadyStateFt, steady_state_ft};
pub use config::{HarnessConfig, SteadyStateSettings, SweepLengths};
pub use error::{HarnessError, Result, ToleranceViolation};
pub use log::{Logger, MemoryLogger, TracingLogger, format_g};
pub use metric::reflection;
pub use sequencer::{CertificationReport, Check, CheckFailure, CheckReport, certify, plan};
pub use solver::{FieldSolver, PointSource, Probe, SteppedSimulation, TrialConfig, YeeSolver};
pub use sweep::{CheckMode, Pairing, ParameterSchedule, Sweep, SweepPoint, SweepRecord, TolerancePolicy};
pub use trial::{PairResult, TrialPair, run_pair, run_trial};
