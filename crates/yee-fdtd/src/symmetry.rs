//! Mirror-symmetry descriptors
//!
//! A symmetry is a declaration that the fields are even (phase +1) or odd
//! (phase -1) under reflection through a plane through the cell center. The
//! phase refers to the electric field; E normal to the plane and H parallel
//! to it pick up an extra sign, H being a pseudovector. So an Ez point source
//! needs phase +1 on the x and y mirrors, and an Hz source needs -1.
//!
//! The solver checks that the source lies on every declared plane with a
//! component the mirror does not cancel, then evolves the full cell, which
//! yields the same fields a reduced computation would.

use std::ops::{Add, Mul};

use crate::error::{Error, Result};
use crate::fields::Component;
use crate::grid::{Point, Volume};
use crate::pml::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mirror {
    pub direction: Direction,
    pub phase: f64,
}

impl Mirror {
    /// Sign `component` picks up under this mirror
    pub fn parity(&self, component: Component) -> f64 {
        let normal = matches!(
            (component, self.direction),
            (Component::Ex | Component::Hx, Direction::X)
                | (Component::Ey | Component::Hy, Direction::Y)
                | (Component::Ez | Component::Hz, Direction::Z)
                | (Component::Er, Direction::R)
        );
        let sign = if normal { -self.phase } else { self.phase };
        if component.is_magnetic() { -sign } else { sign }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Symmetry {
    mirrors: Vec<Mirror>,
}

/// Even mirror plane normal to `direction`
pub fn mirror(direction: Direction) -> Symmetry {
    Symmetry {
        mirrors: vec![Mirror {
            direction,
            phase: 1.0,
        }],
    }
}

impl Symmetry {
    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    /// Check that a `component` source at `position` lies on every mirror
    /// plane and is not cancelled by an odd mirror
    pub fn check_source(&self, volume: &Volume, component: Component, position: &Point) -> Result<()> {
        let center = volume.center();
        let tol = 0.5 * volume.delta();
        for m in &self.mirrors {
            if m.phase != 1.0 && m.phase != -1.0 {
                return Err(Error::InvalidPhase {
                    direction: m.direction,
                    phase: m.phase,
                });
            }
            let offset = match m.direction {
                Direction::X | Direction::R => position.x - center.x,
                Direction::Y => position.y - center.y,
                Direction::Z => position.z - center.z,
            };
            if offset.abs() > tol {
                return Err(Error::AsymmetricSource {
                    direction: m.direction,
                    offset,
                });
            }
            if m.parity(component) < 0.0 {
                return Err(Error::CancelledSource {
                    component,
                    direction: m.direction,
                });
            }
        }
        Ok(())
    }
}

impl Add for Symmetry {
    type Output = Symmetry;

    fn add(mut self, rhs: Symmetry) -> Symmetry {
        self.mirrors.extend(rhs.mirrors);
        self
    }
}

impl Mul<f64> for Symmetry {
    type Output = Symmetry;

    fn mul(mut self, phase: f64) -> Symmetry {
        for m in &mut self.mirrors {
            m.phase *= phase;
        }
        self
    }
}
