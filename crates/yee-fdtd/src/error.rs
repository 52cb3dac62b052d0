//! Solver construction errors

use thiserror::Error;

use crate::fields::Component;
use crate::grid::Dimensions;
use crate::pml::Direction;

#[derive(Debug, Error)]
pub enum Error {
    #[error("volume has no cells along {axis} (size {size}, resolution {resolution})")]
    EmptyVolume {
        axis: &'static str,
        size: f64,
        resolution: f64,
    },

    #[error("component {component} is not supported in {dims} simulations")]
    UnsupportedComponent {
        component: Component,
        dims: Dimensions,
    },

    #[error("source position ({x}, {y}, {z}) lies outside the cell")]
    SourceOutsideCell { x: f64, y: f64, z: f64 },

    #[error("source is off the {direction} mirror plane by {offset}")]
    AsymmetricSource { direction: Direction, offset: f64 },

    #[error("{component} source is cancelled by the {direction} mirror")]
    CancelledSource {
        component: Component,
        direction: Direction,
    },

    #[error("mirror phase along {direction} must be +1 or -1, got {phase}")]
    InvalidPhase { direction: Direction, phase: f64 },

    #[error("PML thickness must be non-negative and finite, got {0}")]
    InvalidLayer(f64),

    #[error("PML layers along {direction} ({total}) fill the whole cell ({size})")]
    LayersOverlap {
        direction: Direction,
        total: f64,
        size: f64,
    },

    #[error("Courant number {courant} is unstable in {dims} (limit {limit:.4})")]
    UnstableCourant {
        courant: f64,
        dims: Dimensions,
        limit: f64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
