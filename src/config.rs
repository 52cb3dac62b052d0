//! Harness configuration
//!
//! Defaults reproduce the reference PML test: unit frequency, a Gaussian
//! pulse twenty times narrower in frequency, 50-unit decay windows, a 1e-6
//! decay threshold and the sweep lengths of each check.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Stopping rule of the steady-state accumulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteadyStateSettings {
    /// Length of each decay-detection window, in simulation time units
    pub window: f64,
    /// A window whose peak is below `decay_ratio` times the all-time peak ends accumulation
    pub decay_ratio: f64,
    /// Give up after this many windows; `None` waits for decay indefinitely
    pub max_windows: Option<usize>,
}

impl Default for SteadyStateSettings {
    fn default() -> Self {
        Self {
            window: 50.0,
            decay_ratio: 1e-6,
            max_windows: None,
        }
    }
}

/// Number of points swept by each check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepLengths {
    pub resolution_1d: usize,
    pub resolution_2d: usize,
    pub cylindrical: usize,
    pub thickness: usize,
}

impl Default for SweepLengths {
    fn default() -> Self {
        Self {
            resolution_1d: 8,
            resolution_2d: 4,
            cylindrical: 5,
            thickness: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Frequency at which the steady-state amplitude is extracted
    pub freq: f64,
    /// Source bandwidth is `freq / bandwidth_ratio`
    pub bandwidth_ratio: f64,
    /// Solver Courant number
    pub courant: f64,
    pub steady_state: SteadyStateSettings,
    pub sweeps: SweepLengths,
    /// Run the cylindrical sweep (informational only)
    pub include_cylindrical: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            freq: 1.0,
            bandwidth_ratio: 20.0,
            courant: yee_fdtd::DEFAULT_COURANT,
            steady_state: SteadyStateSettings::default(),
            sweeps: SweepLengths::default(),
            include_cylindrical: false,
        }
    }
}

impl HarnessConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| HarnessError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn fwidth(&self) -> f64 {
        self.freq / self.bandwidth_ratio
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.freq > 0.0 && self.freq.is_finite()) {
            return Err(HarnessError::Config(format!("freq must be positive, got {}", self.freq)));
        }
        if !(self.bandwidth_ratio > 0.0) {
            return Err(HarnessError::Config(format!(
                "bandwidth_ratio must be positive, got {}",
                self.bandwidth_ratio
            )));
        }
        if !(self.steady_state.window > 0.0) {
            return Err(HarnessError::Config(format!(
                "steady_state.window must be positive, got {}",
                self.steady_state.window
            )));
        }
        if !(self.steady_state.decay_ratio > 0.0 && self.steady_state.decay_ratio < 1.0) {
            return Err(HarnessError::Config(format!(
                "steady_state.decay_ratio must lie in (0, 1), got {}",
                self.steady_state.decay_ratio
            )));
        }
        if self.steady_state.max_windows == Some(0) {
            return Err(HarnessError::Config("steady_state.max_windows must be at least 1".into()));
        }
        Ok(())
    }
}
