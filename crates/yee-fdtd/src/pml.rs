//! Perfectly matched layers
//!
//! Layers are described the way they are requested (`pml(1.0)`,
//! `pml_along(2.0, Direction::Z, Side::Low) + pml_along(1.0, Direction::Z, Side::High)`,
//! `pml(1.0) * 1.5`) and turned into per-axis CPML coefficients when a
//! simulation is built.
//!
//! Each layer grades its conductivity quadratically with depth u:
//!   σ(u) = strength · σ_max · (u/d)²,  σ_max = -3·ln(R) / (2d)
//! so that a normally incident wave crossing the layer twice is attenuated
//! by R (1e-15) in the continuum limit.
//!
//! The stretched derivative is applied with recursive convolution (κ = 1, α = 0):
//!   ψ ← b·ψ + (b - 1)·∂,  b = exp(-σ·Δt)
//! and the update uses ∂ + ψ.

use std::fmt;
use std::ops::{Add, Mul};

use crate::error::{Error, Result};

/// Target round-trip reflection of a layer in the continuum limit
pub const DEFAULT_REFLECTION: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    X,
    Y,
    Z,
    R,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::X => "x",
            Direction::Y => "y",
            Direction::Z => "z",
            Direction::R => "r",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Low,
    High,
}

/// One absorbing layer
#[derive(Debug, Clone, PartialEq)]
pub struct PmlLayer {
    pub thickness: f64,
    /// `None` applies the layer along every direction
    pub direction: Option<Direction>,
    /// `None` applies the layer on both sides
    pub side: Option<Side>,
    /// Conductivity multiplier
    pub strength: f64,
}

impl PmlLayer {
    fn covers(&self, direction: Direction, side: Side) -> bool {
        self.direction.map_or(true, |d| d == direction) && self.side.map_or(true, |s| s == side)
    }

    /// Conductivity at depth `u` into the layer
    fn sigma(&self, u: f64) -> f64 {
        if self.thickness <= 0.0 || u <= 0.0 {
            return 0.0;
        }
        let d = self.thickness;
        let sigma_max = -3.0 * DEFAULT_REFLECTION.ln() / (2.0 * d);
        let rho = (u / d).min(1.0);
        self.strength * sigma_max * rho * rho
    }
}

/// Set of absorbing layers surrounding a cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundary {
    layers: Vec<PmlLayer>,
}

/// Layer of the given thickness on every side of the cell
pub fn pml(thickness: f64) -> Boundary {
    Boundary {
        layers: vec![PmlLayer {
            thickness,
            direction: None,
            side: None,
            strength: 1.0,
        }],
    }
}

/// Layer on one side of one direction
pub fn pml_along(thickness: f64, direction: Direction, side: Side) -> Boundary {
    Boundary {
        layers: vec![PmlLayer {
            thickness,
            direction: Some(direction),
            side: Some(side),
            strength: 1.0,
        }],
    }
}

impl Boundary {
    /// No absorbing layers (PEC walls only)
    pub fn none() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[PmlLayer] {
        &self.layers
    }

    pub fn validate(&self) -> Result<()> {
        for layer in &self.layers {
            if !layer.thickness.is_finite() || layer.thickness < 0.0 {
                return Err(Error::InvalidLayer(layer.thickness));
            }
        }
        Ok(())
    }

    /// Total layer thickness on one side of one direction
    pub fn thickness(&self, direction: Direction, side: Side) -> f64 {
        self.layers
            .iter()
            .filter(|l| l.covers(direction, side))
            .map(|l| l.thickness)
            .fold(0.0, f64::max)
    }

    /// Conductivity at `pos` along `direction` for a cell spanning [lo, hi].
    ///
    /// With `open_low` the low side is not a wall (the cylindrical axis) and
    /// carries no layer.
    pub fn sigma(&self, direction: Direction, pos: f64, lo: f64, hi: f64, open_low: bool) -> f64 {
        self.layers
            .iter()
            .map(|layer| {
                let mut sigma = 0.0;
                if !open_low && layer.covers(direction, Side::Low) {
                    sigma += layer.sigma(lo + layer.thickness - pos);
                }
                if layer.covers(direction, Side::High) {
                    sigma += layer.sigma(pos - (hi - layer.thickness));
                }
                sigma
            })
            .sum()
    }
}

impl Add for Boundary {
    type Output = Boundary;

    fn add(mut self, rhs: Boundary) -> Boundary {
        self.layers.extend(rhs.layers);
        self
    }
}

impl Mul<f64> for Boundary {
    type Output = Boundary;

    fn mul(mut self, strength: f64) -> Boundary {
        for layer in &mut self.layers {
            layer.strength *= strength;
        }
        self
    }
}

/// CPML coefficients along one lattice axis for one sub-lattice
#[derive(Debug, Clone)]
pub(crate) struct Stretch {
    /// b = exp(-σΔt)
    pub b: Vec<f64>,
    /// c = b - 1
    pub c: Vec<f64>,
}

impl Stretch {
    /// Coefficients at `n` points `origin + (i + offset)·delta`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        boundary: &Boundary,
        direction: Direction,
        n: usize,
        offset: f64,
        origin: f64,
        delta: f64,
        cells: usize,
        dt: f64,
        open_low: bool,
    ) -> Self {
        let hi = origin + cells as f64 * delta;
        let (b, c) = (0..n)
            .map(|i| {
                let pos = origin + (i as f64 + offset) * delta;
                let sigma = boundary.sigma(direction, pos, origin, hi, open_low);
                let b = (-sigma * dt).exp();
                (b, b - 1.0)
            })
            .unzip();
        Self { b, c }
    }

    /// Advance ψ at point `i` with derivative `d` and return the stretched derivative
    #[inline]
    pub fn apply(&self, i: usize, psi: &mut f64, d: f64) -> f64 {
        *psi = self.b[i] * *psi + self.c[i] * d;
        d + *psi
    }
}
