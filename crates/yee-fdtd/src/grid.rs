//! Computational cells and the staggered sub-lattices that live on them

use std::fmt;

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::pml::Direction;

/// A point in the cell.
///
/// 1D cells use the z slot, 2D cells use (x, y) and cylindrical cells store
/// r in the x slot and z in the z slot. See [`vec1d`], [`vec2d`], [`veccyl`].
pub type Point = Vector3<f64>;

pub fn vec1d(z: f64) -> Point {
    Vector3::new(0.0, 0.0, z)
}

pub fn vec2d(x: f64, y: f64) -> Point {
    Vector3::new(x, y, 0.0)
}

pub fn veccyl(r: f64, z: f64) -> Point {
    Vector3::new(r, 0.0, z)
}

/// Dimensionality of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensions {
    D1,
    D2,
    Cylindrical,
}

impl Dimensions {
    /// Directions of the (first, second) lattice axes
    pub fn axes(&self) -> [Direction; 2] {
        match self {
            Dimensions::D1 => [Direction::Z, Direction::Z],
            Dimensions::D2 => [Direction::X, Direction::Y],
            Dimensions::Cylindrical => [Direction::R, Direction::Z],
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimensions::D1 => write!(f, "1d"),
            Dimensions::D2 => write!(f, "2d"),
            Dimensions::Cylindrical => write!(f, "cylindrical"),
        }
    }
}

/// Computational cell: shape, resolution and placement.
///
/// Cell counts are `round(size * resolution)`, so the simulated size is
/// `cells / resolution`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub dims: Dimensions,
    /// Pixels per unit length
    pub resolution: f64,
    /// Number of cells along each lattice axis (second is 1 in 1D)
    cells: [usize; 2],
    /// Coordinate of the low corner along each lattice axis
    origin: [f64; 2],
}

impl Volume {
    /// 1D cell along z, spanning [0, sz]
    pub fn one_d(sz: f64, resolution: f64) -> Result<Self> {
        Ok(Self {
            dims: Dimensions::D1,
            resolution,
            cells: [cell_count("z", sz, resolution)?, 1],
            origin: [0.0, 0.0],
        })
    }

    /// 2D cell spanning [0, sx] x [0, sy]
    pub fn two_d(sx: f64, sy: f64, resolution: f64) -> Result<Self> {
        Ok(Self {
            dims: Dimensions::D2,
            resolution,
            cells: [
                cell_count("x", sx, resolution)?,
                cell_count("y", sy, resolution)?,
            ],
            origin: [0.0, 0.0],
        })
    }

    /// Cylindrical (r, z) cell spanning [0, sr] x [0, sz]
    pub fn cylindrical(sr: f64, sz: f64, resolution: f64) -> Result<Self> {
        Ok(Self {
            dims: Dimensions::Cylindrical,
            resolution,
            cells: [
                cell_count("r", sr, resolution)?,
                cell_count("z", sz, resolution)?,
            ],
            origin: [0.0, 0.0],
        })
    }

    /// Shift the cell so that its center sits at the origin.
    ///
    /// Cylindrical cells keep r starting on the axis; only z is centered.
    #[must_use]
    pub fn center_origin(mut self) -> Self {
        let extent = self.extent();
        match self.dims {
            Dimensions::D1 => self.origin[0] = -0.5 * extent[0],
            Dimensions::D2 => {
                self.origin[0] = -0.5 * extent[0];
                self.origin[1] = -0.5 * extent[1];
            }
            Dimensions::Cylindrical => self.origin[1] = -0.5 * extent[1],
        }
        self
    }

    pub fn delta(&self) -> f64 {
        1.0 / self.resolution
    }

    pub fn cells(&self) -> [usize; 2] {
        self.cells
    }

    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    /// Simulated size along each lattice axis
    pub fn extent(&self) -> [f64; 2] {
        [
            self.cells[0] as f64 * self.delta(),
            if self.dims == Dimensions::D1 {
                0.0
            } else {
                self.cells[1] as f64 * self.delta()
            },
        ]
    }

    /// Geometric center of the cell
    pub fn center(&self) -> Point {
        let extent = self.extent();
        let mid = [
            self.origin[0] + 0.5 * extent[0],
            self.origin[1] + 0.5 * extent[1],
        ];
        self.from_axes(mid)
    }

    /// Project a point onto the (first, second) lattice axes
    pub fn to_axes(&self, p: &Point) -> [f64; 2] {
        match self.dims {
            Dimensions::D1 => [p.z, 0.0],
            Dimensions::D2 => [p.x, p.y],
            Dimensions::Cylindrical => [p.x, p.z],
        }
    }

    pub fn from_axes(&self, a: [f64; 2]) -> Point {
        match self.dims {
            Dimensions::D1 => vec1d(a[0]),
            Dimensions::D2 => vec2d(a[0], a[1]),
            Dimensions::Cylindrical => veccyl(a[0], a[1]),
        }
    }

    /// Whether the point lies inside the cell (boundaries included)
    pub fn contains(&self, p: &Point) -> bool {
        let a = self.to_axes(p);
        let extent = self.extent();
        let tol = 1e-9 * self.delta();
        let inside = |k: usize| {
            a[k] >= self.origin[k] - tol && a[k] <= self.origin[k] + extent[k] + tol
        };
        match self.dims {
            Dimensions::D1 => inside(0),
            _ => inside(0) && inside(1),
        }
    }
}

fn cell_count(axis: &'static str, size: f64, resolution: f64) -> Result<usize> {
    let n = (size * resolution).round();
    if !n.is_finite() || n < 1.0 {
        return Err(Error::EmptyVolume {
            axis,
            size,
            resolution,
        });
    }
    Ok(n as usize)
}

/// Interpolation stencil: up to four (index, weight) pairs
pub(crate) type Stencil = [(usize, f64); 4];

/// Values of one field component on its staggered sub-lattice
#[derive(Debug, Clone)]
pub(crate) struct Plane {
    pub data: Vec<f64>,
    pub ni: usize,
    pub nj: usize,
    /// Coordinate of point (0, 0)
    origin: [f64; 2],
    delta: f64,
}

impl Plane {
    pub fn new(ni: usize, nj: usize, origin: [f64; 2], delta: f64) -> Self {
        Self {
            data: vec![0.0; ni * nj],
            ni,
            nj,
            origin,
            delta,
        }
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        j * self.ni + i
    }

    pub fn coord(&self, i: usize, j: usize) -> [f64; 2] {
        [
            self.origin[0] + i as f64 * self.delta,
            self.origin[1] + j as f64 * self.delta,
        ]
    }

    /// Bilinear stencil for a point given in lattice-axis coordinates.
    ///
    /// Points up to one spacing beyond the sub-lattice are clamped onto it,
    /// anything further away has no stencil.
    pub fn stencil(&self, a: [f64; 2]) -> Option<Stencil> {
        let [(i0, wi0), (i1, wi1)] = axis_weights(a[0], self.origin[0], self.delta, self.ni)?;
        let [(j0, wj0), (j1, wj1)] = axis_weights(a[1], self.origin[1], self.delta, self.nj)?;
        Some([
            (self.idx(i0, j0), wi0 * wj0),
            (self.idx(i1, j0), wi1 * wj0),
            (self.idx(i0, j1), wi0 * wj1),
            (self.idx(i1, j1), wi1 * wj1),
        ])
    }

    pub fn sample(&self, stencil: &Stencil) -> f64 {
        stencil.iter().map(|&(idx, w)| w * self.data[idx]).sum()
    }

    pub fn deposit(&mut self, stencil: &Stencil, value: f64) {
        for &(idx, w) in stencil {
            self.data[idx] += w * value;
        }
    }

    pub fn energy(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }
}

fn axis_weights(x: f64, origin: f64, delta: f64, n: usize) -> Option<[(usize, f64); 2]> {
    if n == 1 {
        return Some([(0, 1.0), (0, 0.0)]);
    }
    let s = (x - origin) / delta;
    let last = (n - 1) as f64;
    if !(-1.0..=last + 1.0).contains(&s) {
        return None;
    }
    let s = s.clamp(0.0, last);
    let i0 = (s.floor() as usize).min(n - 2);
    let f = s - i0 as f64;
    Some([(i0, 1.0 - f), (i0 + 1, f)])
}
