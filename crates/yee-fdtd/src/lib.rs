//! yee-fdtd: Finite-Difference Time-Domain solver on a Yee lattice
//!
//! This crate provides:
//! - 1D (Ex/Hy), 2D (TM: Ez/Hx/Hy, TE: Hz/Ex/Ey) and cylindrical m=0
//!   (Er/Ez/Hp) staggered grids
//! - Leapfrog time-stepping
//! - Graded CPML absorbing layers, per axis and per side
//! - Gaussian-envelope point sources
//!
//! Everything is in normalized units: c = ε₀ = μ₀ = 1, lengths are in units
//! of some characteristic length `a` and frequencies in units of c/a, the same
//! convention MEEP uses.
//!
//! References:
//! - Yee, "Numerical solution of initial boundary value problems" (1966)
//! - Roden & Gedney, "Convolutional PML (CPML)" (2000)

pub mod error;
pub mod fields;
pub mod grid;
pub mod pml;
pub mod source;
pub mod symmetry;

mod lattice;

pub use error::{Error, Result};
pub use fields::{Component, Fields, Permittivity, Structure, uniform};
pub use grid::{Dimensions, Point, Volume, vec1d, vec2d, veccyl};
pub use pml::{Boundary, Direction, PmlLayer, Side, pml, pml_along};
pub use source::GaussianSrc;
pub use symmetry::{Mirror, Symmetry, mirror};

/// Default Courant number (dt = courant / resolution)
pub const DEFAULT_COURANT: f64 = 0.5;
