//! Harness errors
//!
//! Two families: configuration errors (the request itself is malformed or the
//! solver refuses it) and tolerance violations (the absorber did not behave as
//! the scaling law requires). Neither terminates the process; only the binary
//! decides that.

use serde::Serialize;
use thiserror::Error;
use yee_fdtd::Component;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unimplemented component check: {component} in {sweep}")]
    UnsupportedComponent {
        sweep: &'static str,
        component: Component,
    },

    #[error("trial pair is not matched: {0}")]
    MismatchedPair(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("solver rejected trial: {0}")]
    Solver(#[from] yee_fdtd::Error),

    #[error(transparent)]
    Tolerance(#[from] ToleranceViolation),

    #[error(
        "no steady state after {windows} windows (peak {emax:.3e}, last window {window_max:.3e})"
    )]
    NoSteadyState {
        windows: usize,
        emax: f64,
        window_max: f64,
    },
}

impl HarnessError {
    /// Whether this error reports a physical regression rather than a bad request
    pub fn is_tolerance_violation(&self) -> bool {
        matches!(self, HarnessError::Tolerance(_))
    }
}

/// A reflection metric outside its expected decay band
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error(
    "{label} point {index} (parameter {parameter}): reflection {reflection:.3e} outside [{}, {upper:.3e}]",
    lower_bound(.lower)
)]
pub struct ToleranceViolation {
    pub label: String,
    pub index: usize,
    pub parameter: f64,
    pub reflection: f64,
    pub lower: Option<f64>,
    pub upper: f64,
}

fn lower_bound(lower: &Option<f64>) -> String {
    lower.map_or_else(|| "-inf".to_string(), |l| format!("{l:.3e}"))
}

pub type Result<T> = std::result::Result<T, HarnessError>;
