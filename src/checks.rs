//! The PML convergence checks
//!
//! Each constructor returns a [`Sweep`] wired with the geometry of one check.
//! All trials are vacuum (ε = 1) driven by a Gaussian pulse at `freq` with
//! bandwidth `freq / bandwidth_ratio`; the doubled reference grows the cell
//! by exactly the extra absorber so the probe sits 0.1 in front of the layer
//! in both trials.

use yee_fdtd::{
    Boundary, Component, Direction, GaussianSrc, Side, Volume, mirror, pml, pml_along, uniform,
    vec1d, vec2d, veccyl,
};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::solver::{PointSource, Probe, TrialConfig};
use crate::sweep::{CheckMode, Pairing, ParameterSchedule, Sweep, TolerancePolicy};
use crate::trial::TrialPair;

/// Absorber thickness of the resolution checks
const DPML: f64 = 1.0;

/// Gap between the probe (or source) and the inner face of the absorber
const STANDOFF: f64 = 0.1;

/// Reflection of a graded absorber falls off as resolution^-8
const RESOLUTION_DECAY: TolerancePolicy = TolerancePolicy::PowerLawDecay {
    exponent: 8.0,
    margin: 1.1,
    from_index: 2,
};

const THICKNESS_RESOLUTION: f64 = 20.0;

/// Conductivity multiplier of the thickness sweep's layers.
///
/// The reflection of the graded profile is linear in its onset curvature,
/// so the metric goes as strength². At 1.5 the Yee lattice sits 2.4 times
/// above the band; 0.75 lands near 6e-10·(2/d)^6 while the wall behind the
/// layer still returns less than 1e-11 of the field.
const THICKNESS_STRENGTH: f64 = 0.75;

fn vacuum_trial(volume: Volume, boundary: Boundary, source: PointSource) -> TrialConfig {
    TrialConfig {
        volume,
        boundary,
        symmetry: None,
        permittivity: uniform(1.0),
        source,
    }
}

/// Resolution sweep of a centered 1D cell, source and probe just inside opposite layers
pub fn resolution_1d(config: &HarnessConfig) -> Sweep {
    let src = GaussianSrc::new(config.freq, config.fwidth());
    let sz = 10.0 + 2.0 * DPML;
    let sz2 = 10.0 + 4.0 * DPML;
    let source = PointSource {
        src,
        component: Component::Ex,
        position: vec1d(-0.5 * sz + DPML + STANDOFF),
    };
    let probe = Probe {
        component: Component::Ex,
        point: vec1d(0.5 * sz - DPML - STANDOFF),
    };

    Sweep {
        label: "refl1d",
        banner: "Checking resolution convergence of 1d PML...".into(),
        progress: None,
        success: "passed 1d PML check.".into(),
        schedule: ParameterSchedule::Linear {
            start: 10.0,
            step: 10.0,
            count: config.sweeps.resolution_1d,
        },
        pairing: Pairing::Doubled(Box::new(move |res: f64| -> Result<TrialPair> {
            Ok(TrialPair {
                baseline: vacuum_trial(Volume::one_d(sz, res)?.center_origin(), pml(DPML), source),
                reference: vacuum_trial(
                    Volume::one_d(sz2, res)?.center_origin(),
                    pml(2.0 * DPML),
                    source,
                ),
                probe,
            })
        })),
        policy: RESOLUTION_DECAY,
        mode: CheckMode::Informational,
    }
}

/// Resolution sweep of a square cell with mirror symmetry.
///
/// `Ez` gives the TM check (even mirrors), `Hz` the TE check (odd mirrors).
/// Any other component is rejected before a simulation is built.
pub fn resolution_2d(component: Component, config: &HarnessConfig) -> Result<Sweep> {
    let (name, phase) = match component {
        Component::Ez => ("TM", 1.0),
        Component::Hz => ("TE", -1.0),
        _ => {
            return Err(HarnessError::UnsupportedComponent {
                sweep: "refl2d",
                component,
            });
        }
    };
    let src = GaussianSrc::new(config.freq, config.fwidth());
    let sxy = 5.0 + 2.0 * DPML;
    let sxy2 = 5.0 + 4.0 * DPML;
    let probe = Probe {
        component,
        point: vec2d(0.5 * sxy - DPML - STANDOFF, 0.0),
    };

    let trial = move |size: f64, dpml: f64, res: f64| -> Result<TrialConfig> {
        let volume = Volume::two_d(size, size, res)?.center_origin();
        let symmetry = mirror(Direction::X) * phase + mirror(Direction::Y) * phase;
        let source = PointSource {
            src,
            component,
            position: volume.center(),
        };
        Ok(TrialConfig {
            symmetry: Some(symmetry),
            ..vacuum_trial(volume, pml(dpml), source)
        })
    };

    Ok(Sweep {
        label: "refl2d",
        banner: format!("Checking resolution convergence of 2d {name} PML..."),
        progress: None,
        success: format!("passed 2d {name} PML check."),
        schedule: ParameterSchedule::Linear {
            start: 10.0,
            step: 6.0,
            count: config.sweeps.resolution_2d,
        },
        pairing: Pairing::Doubled(Box::new(move |res: f64| -> Result<TrialPair> {
            Ok(TrialPair {
                baseline: trial(sxy, DPML, res)?,
                reference: trial(sxy2, 2.0 * DPML, res)?,
                probe,
            })
        })),
        policy: RESOLUTION_DECAY,
        mode: CheckMode::Enforced,
    })
}

/// Resolution sweep in cylindrical coordinates (m = 0).
///
/// The cylindrical absorber is a quasi-PML (r is not properly stretched), so
/// its reflection does not vanish with resolution; nothing is asserted.
pub fn cylindrical(config: &HarnessConfig) -> Sweep {
    let src = GaussianSrc::new(config.freq, config.fwidth());
    let (sr, sz) = (5.0 + DPML, 1.0 + 2.0 * DPML);
    let (sr2, sz2) = (5.0 + 2.0 * DPML, 1.0 + 4.0 * DPML);
    let source = PointSource {
        src,
        component: Component::Ez,
        position: veccyl(0.1, 0.1),
    };
    let probe = Probe {
        component: Component::Ez,
        point: veccyl(sr - DPML - STANDOFF, 0.0),
    };

    Sweep {
        label: "reflcyl",
        banner: "Checking resolution convergence of cylindrical PML...".into(),
        progress: Some("    checking cylindrical resolution".into()),
        success: "passed cylindrical PML check.".into(),
        schedule: ParameterSchedule::Linear {
            start: 10.0,
            step: 6.0,
            count: config.sweeps.cylindrical,
        },
        pairing: Pairing::Doubled(Box::new(move |res: f64| -> Result<TrialPair> {
            Ok(TrialPair {
                baseline: vacuum_trial(
                    Volume::cylindrical(sr, sz, res)?.center_origin(),
                    pml(DPML),
                    source,
                ),
                reference: vacuum_trial(
                    Volume::cylindrical(sr2, sz2, res)?.center_origin(),
                    pml(2.0 * DPML),
                    source,
                ),
                probe,
            })
        })),
        policy: TolerancePolicy::None,
        mode: CheckMode::Informational,
    }
}

/// Thickness sweep of an asymmetric 1D absorber.
///
/// At thickness `d` the cell carries `2d` of absorber below and `d` above,
/// both at 0.75 times the default conductivity. Each trial is compared
/// with the previous (half as thick) one, and the reflection must follow
/// `(2/d)^6` inside a one-decade band.
pub fn thickness(config: &HarnessConfig) -> Sweep {
    let src = GaussianSrc::new(config.freq, config.fwidth());

    Sweep {
        label: "refl1d",
        banner: "Checking thickness convergence of 1d PML...".into(),
        progress: None,
        success: "pml scales correctly with length.".into(),
        schedule: ParameterSchedule::Geometric {
            base: 2.0,
            count: config.sweeps.thickness,
        },
        pairing: Pairing::Consecutive(Box::new(move |d: f64| -> Result<(TrialConfig, Probe)> {
            let sz = 3.0 * d + 10.0;
            let boundary = (pml_along(2.0 * d, Direction::Z, Side::Low)
                + pml_along(d, Direction::Z, Side::High))
                * THICKNESS_STRENGTH;
            let source = PointSource {
                src,
                component: Component::Ex,
                position: vec1d(2.0 * d + STANDOFF),
            };
            let probe = Probe {
                component: Component::Ex,
                point: vec1d(sz - d - STANDOFF),
            };
            let volume = Volume::one_d(sz, THICKNESS_RESOLUTION)?;
            Ok((vacuum_trial(volume, boundary, source), probe))
        })),
        policy: TolerancePolicy::PowerLawBand {
            lower: 1e-10,
            upper: 1e-9,
            scale: 2.0,
            exponent: 6.0,
            from_index: 1,
        },
        mode: CheckMode::Enforced,
    }
}
