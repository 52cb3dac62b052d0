//! Simulation setup and time-stepping
//!
//! A [`Structure`] describes the cell, its permittivity, absorbing layers and
//! symmetry. [`Fields`] owns the field arrays built from it, the point
//! sources, and the clock.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::grid::{Dimensions, Point, Stencil, Volume};
use crate::lattice::Lattice;
use crate::pml::{Boundary, Side};
use crate::source::GaussianSrc;
use crate::symmetry::Symmetry;
use crate::DEFAULT_COURANT;

/// Field component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Ex,
    Ey,
    Ez,
    Hx,
    Hy,
    Hz,
    /// Radial E (cylindrical)
    Er,
    /// Azimuthal H (cylindrical)
    Hp,
}

impl Component {
    pub fn is_magnetic(&self) -> bool {
        matches!(
            self,
            Component::Hx | Component::Hy | Component::Hz | Component::Hp
        )
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Ex => "Ex",
            Component::Ey => "Ey",
            Component::Ez => "Ez",
            Component::Hx => "Hx",
            Component::Hy => "Hy",
            Component::Hz => "Hz",
            Component::Er => "Er",
            Component::Hp => "Hp",
        };
        write!(f, "{name}")
    }
}

/// Relative permittivity as a function of position
pub type Permittivity = Arc<dyn Fn(&Point) -> f64 + Send + Sync>;

/// Homogeneous medium
pub fn uniform(eps: f64) -> Permittivity {
    Arc::new(move |_: &Point| eps)
}

/// Everything needed to build field arrays
#[derive(Clone)]
pub struct Structure {
    pub volume: Volume,
    pub eps: Permittivity,
    pub boundary: Boundary,
    pub symmetry: Option<Symmetry>,
}

impl Structure {
    pub fn new(volume: Volume, eps: Permittivity, boundary: Boundary) -> Self {
        Self {
            volume,
            eps,
            boundary,
            symmetry: None,
        }
    }

    pub fn with_symmetry(mut self, symmetry: Symmetry) -> Self {
        self.symmetry = Some(symmetry);
        self
    }

    /// Reject layers that are malformed or leave no interior
    fn validate(&self) -> Result<()> {
        self.boundary.validate()?;
        let v = &self.volume;
        let extent = v.extent();
        let axes = match v.dims {
            Dimensions::D1 => 1,
            _ => 2,
        };
        for axis in 0..axes {
            let direction = v.dims.axes()[axis];
            let low = if v.dims == Dimensions::Cylindrical && axis == 0 {
                0.0
            } else {
                self.boundary.thickness(direction, Side::Low)
            };
            let total = low + self.boundary.thickness(direction, Side::High);
            if total >= extent[axis] {
                return Err(Error::LayersOverlap {
                    direction,
                    total,
                    size: extent[axis],
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("volume", &self.volume)
            .field("boundary", &self.boundary)
            .field("symmetry", &self.symmetry)
            .finish_non_exhaustive()
    }
}

struct ActiveSource {
    src: GaussianSrc,
    component: Component,
    stencil: Stencil,
    /// 1/ε at the source for electric currents, 1 for magnetic ones
    scale: f64,
}

/// Time-domain fields of one simulation
pub struct Fields {
    volume: Volume,
    symmetry: Option<Symmetry>,
    eps: Permittivity,
    lattice: Lattice,
    sources: Vec<ActiveSource>,
    dt: f64,
    time_step: usize,
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fields")
            .field("volume", &self.volume)
            .field("symmetry", &self.symmetry)
            .field("dt", &self.dt)
            .field("time_step", &self.time_step)
            .finish_non_exhaustive()
    }
}

impl Fields {
    /// Build zeroed fields with the default Courant number
    pub fn new(structure: &Structure) -> Result<Self> {
        Self::with_courant(structure, DEFAULT_COURANT)
    }

    pub fn with_courant(structure: &Structure, courant: f64) -> Result<Self> {
        structure.validate()?;
        let dims = structure.volume.dims;
        let limit = match dims {
            Dimensions::D1 => 1.0,
            Dimensions::D2 | Dimensions::Cylindrical => std::f64::consts::FRAC_1_SQRT_2,
        };
        if !(courant > 0.0 && courant <= limit) {
            return Err(Error::UnstableCourant {
                courant,
                dims,
                limit,
            });
        }

        let dt = courant * structure.volume.delta();
        debug!(
            dims = %dims,
            cells = ?structure.volume.cells(),
            resolution = structure.volume.resolution,
            dt,
            "building fields"
        );

        Ok(Self {
            volume: structure.volume.clone(),
            symmetry: structure.symmetry.clone(),
            eps: structure.eps.clone(),
            lattice: Lattice::new(structure, dt),
            sources: Vec::new(),
            dt,
            time_step: 0,
        })
    }

    /// Add a point source; must be called before stepping
    pub fn add_point_source(
        &mut self,
        component: Component,
        src: GaussianSrc,
        position: Point,
    ) -> Result<()> {
        let outside = || Error::SourceOutsideCell {
            x: position.x,
            y: position.y,
            z: position.z,
        };
        if !self.volume.contains(&position) {
            return Err(outside());
        }
        if let Some(symmetry) = &self.symmetry {
            symmetry.check_source(&self.volume, component, &position)?;
        }
        self.lattice.ensure(component)?;

        let axes = self.volume.to_axes(&position);
        let stencil = self
            .lattice
            .plane(component)
            .and_then(|p| p.stencil(axes))
            .ok_or_else(outside)?;
        let scale = if component.is_magnetic() {
            1.0
        } else {
            1.0 / (self.eps)(&position)
        };

        debug!(%component, ?axes, freq = src.freq, fwidth = src.fwidth, "adding point source");
        self.sources.push(ActiveSource {
            src,
            component,
            stencil,
            scale,
        });
        Ok(())
    }

    /// Advance simulation by one time step
    pub fn step(&mut self) {
        let t = self.time();
        let dt = self.dt;

        // Leapfrog: H at half-integer steps, E at integer steps
        self.lattice.step_h(dt);
        self.apply_sources(true, t);
        self.lattice.step_e(dt);
        self.apply_sources(false, t + 0.5 * dt);
        self.time_step += 1;
    }

    fn apply_sources(&mut self, magnetic: bool, t: f64) {
        let dt = self.dt;
        for s in self.sources.iter().filter(|s| s.component.is_magnetic() == magnetic) {
            let value = -dt * s.scale * s.src.current(t, dt);
            if let Some(plane) = self.lattice.plane_mut(s.component) {
                plane.deposit(&s.stencil, value);
            }
        }
    }

    /// Current simulation time
    pub fn time(&self) -> f64 {
        self.time_step as f64 * self.dt
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Time after which no source emits any more (0 without sources)
    pub fn last_source_time(&self) -> f64 {
        self.sources
            .iter()
            .map(|s| s.src.last_time())
            .fold(0.0, f64::max)
    }

    /// Field value at a point, interpolated from the component's sub-lattice.
    ///
    /// Components that were never excited, and points outside the cell, read as zero.
    pub fn get_field(&self, component: Component, point: &Point) -> f64 {
        let axes = self.volume.to_axes(point);
        self.lattice
            .plane(component)
            .and_then(|p| p.stencil(axes).map(|st| p.sample(&st)))
            .unwrap_or(0.0)
    }

    /// Sum of squared field values (unnormalized), for diagnostics
    pub fn field_energy(&self) -> f64 {
        self.lattice.energy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{vec1d, vec2d, veccyl};
    use crate::pml::{pml, Direction};
    use crate::symmetry::mirror;

    fn one_d(dpml: f64) -> Fields {
        let sz = 10.0 + 2.0 * dpml;
        let v = Volume::one_d(sz, 10.0).unwrap().center_origin();
        let s = Structure::new(v, uniform(1.0), pml(dpml));
        let mut f = Fields::new(&s).unwrap();
        f.add_point_source(Component::Ex, GaussianSrc::new(1.0, 0.05), vec1d(-0.5 * sz + dpml + 0.1))
            .unwrap();
        f
    }

    #[test]
    fn test_fdtd_1d_propagation() {
        let mut f = one_d(1.0);
        let probe = vec1d(4.9);
        let mut peak = 0.0f64;
        while f.time() < f.last_source_time() {
            peak = peak.max(f.get_field(Component::Ex, &probe).abs());
            f.step();
        }
        // the pulse travelled ~9.8 units and was seen at the probe
        assert!(peak > 1e-3, "peak = {peak}");
    }

    #[test]
    fn test_pml_absorption() {
        // Without PML the pulse bounces between the walls forever
        let build = |boundary: Boundary| {
            let v = Volume::one_d(12.0, 10.0).unwrap().center_origin();
            let s = Structure::new(v, uniform(1.0), boundary);
            let mut f = Fields::new(&s).unwrap();
            f.add_point_source(Component::Ex, GaussianSrc::new(1.0, 0.5), vec1d(0.0))
                .unwrap();
            f
        };
        let mut with_pml = build(pml(1.0));
        let mut without_pml = build(Boundary::none());

        let t_end = with_pml.last_source_time() + 60.0;
        let mut peak = 0.0f64;
        while with_pml.time() < t_end {
            with_pml.step();
            without_pml.step();
            peak = peak.max(without_pml.field_energy());
        }

        let energy_pml = with_pml.field_energy();
        let energy_no_pml = without_pml.field_energy();
        assert!(energy_no_pml > 0.1 * peak);
        assert!(
            energy_pml < 1e-3 * energy_no_pml,
            "PML should absorb energy: with_pml={energy_pml:.2e}, without_pml={energy_no_pml:.2e}"
        );
    }

    #[test]
    fn test_identical_runs_are_bitwise_equal() {
        let mut a = one_d(1.0);
        let mut b = one_d(1.0);
        for _ in 0..500 {
            a.step();
            b.step();
        }
        let p = vec1d(2.0);
        assert_eq!(
            a.get_field(Component::Ex, &p).to_bits(),
            b.get_field(Component::Ex, &p).to_bits()
        );
    }

    #[test]
    fn test_unsupported_component() {
        let v = Volume::one_d(12.0, 10.0).unwrap();
        let mut f = Fields::new(&Structure::new(v, uniform(1.0), pml(1.0))).unwrap();
        let err = f
            .add_point_source(Component::Ez, GaussianSrc::new(1.0, 0.05), vec1d(6.0))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedComponent { dims: Dimensions::D1, .. }));
    }

    #[test]
    fn test_source_outside_cell() {
        let v = Volume::one_d(12.0, 10.0).unwrap();
        let mut f = Fields::new(&Structure::new(v, uniform(1.0), pml(1.0))).unwrap();
        assert!(matches!(
            f.add_point_source(Component::Ex, GaussianSrc::new(1.0, 0.05), vec1d(-3.0)),
            Err(Error::SourceOutsideCell { .. })
        ));
    }

    #[test]
    fn test_layers_must_leave_interior() {
        let v = Volume::one_d(2.0, 10.0).unwrap();
        assert!(matches!(
            Fields::new(&Structure::new(v, uniform(1.0), pml(1.0))),
            Err(Error::LayersOverlap { .. })
        ));
    }

    #[test]
    fn test_unstable_courant_rejected() {
        let v = Volume::two_d(7.0, 7.0, 10.0).unwrap();
        assert!(matches!(
            Fields::with_courant(&Structure::new(v, uniform(1.0), pml(1.0)), 0.9),
            Err(Error::UnstableCourant { .. })
        ));
    }

    #[test]
    fn test_2d_tm_and_te_are_allocated_on_demand() {
        let v = Volume::two_d(7.0, 7.0, 10.0).unwrap().center_origin();
        let s = Structure::new(v.clone(), uniform(1.0), pml(1.0))
            .with_symmetry(mirror(Direction::X) + mirror(Direction::Y));
        let mut f = Fields::new(&s).unwrap();
        f.add_point_source(Component::Ez, GaussianSrc::new(1.0, 0.5), v.center())
            .unwrap();
        for _ in 0..200 {
            f.step();
        }
        let p = vec2d(1.0, 0.0);
        assert!(f.get_field(Component::Ez, &p).abs() > 0.0);
        // TE fields were never excited
        assert_eq!(f.get_field(Component::Hz, &p), 0.0);
    }

    #[test]
    fn test_2d_te_fields_keep_mirror_symmetry() {
        let v = Volume::two_d(7.0, 7.0, 10.0).unwrap().center_origin();
        let s = Structure::new(v.clone(), uniform(1.0), pml(1.0));
        let mut f = Fields::new(&s).unwrap();
        f.add_point_source(Component::Hz, GaussianSrc::new(1.0, 0.5), v.center())
            .unwrap();
        for _ in 0..200 {
            f.step();
        }
        let a = f.get_field(Component::Hz, &vec2d(1.5, 0.5));
        let b = f.get_field(Component::Hz, &vec2d(-1.5, -0.5));
        let c = f.get_field(Component::Hz, &vec2d(0.5, 1.5));
        assert!(a.abs() > 1e-8);
        assert!((a - b).abs() < 1e-9 * a.abs().max(1.0));
        assert!((a - c).abs() < 1e-9 * a.abs().max(1.0));
    }

    #[test]
    fn test_symmetry_rejects_off_center_source() {
        let v = Volume::two_d(7.0, 7.0, 10.0).unwrap().center_origin();
        let s = Structure::new(v, uniform(1.0), pml(1.0)).with_symmetry(mirror(Direction::X));
        let mut f = Fields::new(&s).unwrap();
        assert!(matches!(
            f.add_point_source(Component::Ez, GaussianSrc::new(1.0, 0.5), vec2d(1.0, 0.0)),
            Err(Error::AsymmetricSource { .. })
        ));
    }

    #[test]
    fn test_cylindrical_fields_stay_finite() {
        let v = Volume::cylindrical(6.0, 3.0, 10.0).unwrap().center_origin();
        let s = Structure::new(v, uniform(1.0), pml(1.0));
        let mut f = Fields::new(&s).unwrap();
        f.add_point_source(Component::Ez, GaussianSrc::new(1.0, 0.5), veccyl(0.1, 0.1))
            .unwrap();
        let mut peak = 0.0f64;
        for _ in 0..600 {
            f.step();
            peak = peak.max(f.get_field(Component::Ez, &veccyl(2.0, 0.0)).abs());
        }
        assert!(peak > 0.0);
        assert!(f.field_energy().is_finite());
        assert!(matches!(
            f.add_point_source(Component::Hz, GaussianSrc::new(1.0, 0.5), veccyl(0.1, 0.1)),
            Err(Error::UnsupportedComponent { .. })
        ));
    }
}
