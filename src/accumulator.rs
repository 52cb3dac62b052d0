//! Steady-state Fourier accumulator
//!
//! Drives a simulation forward and sums `field · exp(i·2π·f·t)` at one probe
//! on every step. Accumulation runs through the source's active period and
//! then in fixed windows until a window's peak is negligible next to the
//! all-time peak, at which point the transient is considered gone and the
//! sum is the steady-state amplitude.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

use crate::config::SteadyStateSettings;
use crate::error::{HarnessError, Result};
use crate::solver::{Probe, SteppedSimulation};

/// Decides whether the field at the probe has decayed
pub trait DecayCriterion {
    fn decayed(&self, window_max: f64, emax: f64) -> bool;
}

impl<F: Fn(f64, f64) -> bool> DecayCriterion for F {
    fn decayed(&self, window_max: f64, emax: f64) -> bool {
        self(window_max, emax)
    }
}

/// Window peak below a fixed fraction of the all-time peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioDecay {
    pub ratio: f64,
}

impl Default for RatioDecay {
    fn default() -> Self {
        Self { ratio: 1e-6 }
    }
}

impl DecayCriterion for RatioDecay {
    fn decayed(&self, window_max: f64, emax: f64) -> bool {
        window_max < self.ratio * emax
    }
}

/// Amplitude plus the bookkeeping of how it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FtResult {
    #[serde(serialize_with = "serialize_complex")]
    pub amplitude: Complex64,
    pub steps: usize,
    pub windows: usize,
    pub final_time: f64,
    pub emax: f64,
}

fn serialize_complex<S: serde::Serializer>(z: &Complex64, s: S) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeTuple;
    let mut tuple = s.serialize_tuple(2)?;
    tuple.serialize_element(&z.re)?;
    tuple.serialize_element(&z.im)?;
    tuple.end()
}

/// Running sums of one trial
#[derive(Debug, Default)]
struct FtState {
    sum: Complex64,
    emax: f64,
    steps: usize,
}

impl FtState {
    /// Sample the probe, fold it in and advance one step; returns |field|
    fn advance<S: SteppedSimulation + ?Sized>(&mut self, sim: &mut S, probe: &Probe, omega: f64) -> f64 {
        let value = sim.field(probe.component, &probe.point);
        self.sum += value * Complex64::from_polar(1.0, omega * sim.time());
        let magnitude = value.norm();
        self.emax = self.emax.max(magnitude);
        sim.step();
        self.steps += 1;
        magnitude
    }
}

/// Steady-state extraction at one frequency
#[derive(Debug, Clone, Copy)]
pub struct SteadyStateFt<D = RatioDecay> {
    pub freq: f64,
    pub window: f64,
    pub max_windows: Option<usize>,
    criterion: D,
}

impl SteadyStateFt<RatioDecay> {
    pub fn new(freq: f64, settings: &SteadyStateSettings) -> Self {
        Self {
            freq,
            window: settings.window,
            max_windows: settings.max_windows,
            criterion: RatioDecay {
                ratio: settings.decay_ratio,
            },
        }
    }
}

impl<D: DecayCriterion> SteadyStateFt<D> {
    /// Replace the decay predicate
    pub fn with_criterion<E: DecayCriterion>(self, criterion: E) -> SteadyStateFt<E> {
        SteadyStateFt {
            freq: self.freq,
            window: self.window,
            max_windows: self.max_windows,
            criterion,
        }
    }

    /// Consume the simulation's remaining evolution into a steady-state amplitude.
    ///
    /// Without `max_windows` this only returns once the decay criterion holds.
    pub fn run<S: SteppedSimulation + ?Sized>(&self, sim: &mut S, probe: &Probe) -> Result<FtResult> {
        let omega = 2.0 * PI * self.freq;
        let mut state = FtState::default();

        while sim.time() < sim.last_source_time() {
            state.advance(sim, probe, omega);
        }

        let mut windows = 0;
        loop {
            let end = sim.time() + self.window;
            let mut window_max: f64 = 0.0;
            while sim.time() < end {
                window_max = window_max.max(state.advance(sim, probe, omega));
            }
            windows += 1;

            if self.criterion.decayed(window_max, state.emax) {
                break;
            }
            if self.max_windows.is_some_and(|cap| windows >= cap) {
                return Err(HarnessError::NoSteadyState {
                    windows,
                    emax: state.emax,
                    window_max,
                });
            }
        }

        let result = FtResult {
            amplitude: state.sum,
            steps: state.steps,
            windows,
            final_time: sim.time(),
            emax: state.emax,
        };
        debug!(
            steps = result.steps,
            windows,
            t = result.final_time,
            emax = result.emax,
            re = result.amplitude.re,
            im = result.amplitude.im,
            "steady state reached"
        );
        Ok(result)
    }
}

/// Steady-state amplitude with the default ratio criterion
pub fn steady_state_ft<S: SteppedSimulation + ?Sized>(
    sim: &mut S,
    probe: &Probe,
    freq: f64,
    settings: &SteadyStateSettings,
) -> Result<FtResult> {
    SteadyStateFt::new(freq, settings).run(sim, probe)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use yee_fdtd::{Component, vec1d};

    /// Field given as a closure of time, sampled on a fixed step
    pub(crate) struct Synthetic<F> {
        pub step: usize,
        pub dt: f64,
        pub last_source: f64,
        pub field: F,
    }

    impl<F: Fn(f64) -> f64> Synthetic<F> {
        pub fn new(dt: f64, last_source: f64, field: F) -> Self {
            Self {
                step: 0,
                dt,
                last_source,
                field,
            }
        }
    }

    impl<F: Fn(f64) -> f64> SteppedSimulation for Synthetic<F> {
        fn step(&mut self) {
            self.step += 1;
        }

        fn time(&self) -> f64 {
            self.step as f64 * self.dt
        }

        fn last_source_time(&self) -> f64 {
            self.last_source
        }

        fn field(&self, _component: Component, _point: &yee_fdtd::Point) -> Complex64 {
            Complex64::new((self.field)(self.time()), 0.0)
        }
    }

    fn probe() -> Probe {
        Probe {
            component: Component::Ex,
            point: vec1d(0.0),
        }
    }

    #[test]
    fn test_stops_after_decay() {
        let mut sim = Synthetic::new(0.5, 10.0, |t: f64| (-t / 5.0).exp());
        let result = steady_state_ft(&mut sim, &probe(), 1.0, &SteadyStateSettings::default()).unwrap();

        // Window peaks: e^-2, e^-12 (above 1e-6), e^-22 (below)
        assert_eq!(result.windows, 3);
        assert!((result.final_time - 160.0).abs() < 1e-9);
        assert_eq!(result.steps, 320);
        assert_eq!(result.emax, 1.0);
    }

    #[test]
    fn test_amplitude_of_finite_tone() {
        let freq = 1.0;
        let mut sim = Synthetic::new(0.05, 10.0, move |t: f64| {
            if t < 10.0 - 1e-9 { (2.0 * PI * freq * t).cos() } else { 0.0 }
        });
        let result = steady_state_ft(&mut sim, &probe(), freq, &SteadyStateSettings::default()).unwrap();

        // Σ cos²(ωt) over ten whole periods of twenty samples
        assert!((result.amplitude.re - 100.0).abs() < 1e-9);
        assert!(result.amplitude.im.abs() < 1e-9);
        assert_eq!(result.windows, 1);
    }

    #[test]
    fn test_cap_reports_no_steady_state() {
        let mut sim = Synthetic::new(0.5, 1.0, |_: f64| 1.0);
        let settings = SteadyStateSettings {
            max_windows: Some(4),
            ..SteadyStateSettings::default()
        };
        let err = steady_state_ft(&mut sim, &probe(), 1.0, &settings).unwrap_err();
        match err {
            HarnessError::NoSteadyState {
                windows,
                emax,
                window_max,
            } => {
                assert_eq!(windows, 4);
                assert_eq!(emax, 1.0);
                assert_eq!(window_max, 1.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!((sim.time() - 201.0).abs() < 1e-9);
    }

    #[test]
    fn test_injected_criterion() {
        let mut sim = Synthetic::new(0.5, 2.0, |_: f64| 1.0);
        let ft = SteadyStateFt::new(1.0, &SteadyStateSettings::default())
            .with_criterion(|_window_max: f64, _emax: f64| true);
        let result = ft.run(&mut sim, &probe()).unwrap();
        assert_eq!(result.windows, 1);
        assert!((result.final_time - 52.0).abs() < 1e-9);
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let field = |t: f64| (-t / 7.0).exp() * (2.0 * PI * 0.8 * t).sin();
        let settings = SteadyStateSettings::default();
        let a = steady_state_ft(&mut Synthetic::new(0.05, 20.0, field), &probe(), 1.0, &settings).unwrap();
        let b = steady_state_ft(&mut Synthetic::new(0.05, 20.0, field), &probe(), 1.0, &settings).unwrap();
        assert_eq!(a.amplitude.re.to_bits(), b.amplitude.re.to_bits());
        assert_eq!(a.amplitude.im.to_bits(), b.amplitude.im.to_bits());
        assert_eq!(a.steps, b.steps);
    }

    #[test]
    fn test_ratio_decay() {
        let criterion = RatioDecay::default();
        assert!(criterion.decayed(0.9e-6, 1.0));
        assert!(!criterion.decayed(1e-6, 1.0));
        assert!(!criterion.decayed(0.0, 0.0));
    }
}
