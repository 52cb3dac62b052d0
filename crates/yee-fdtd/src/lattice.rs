//! Leapfrog updates for each cell shape
//!
//! Sub-lattice placement (n cells along each axis, spacing Δ):
//! - 1D:   Ex at z_k, Hy at z_{k+½}
//! - TM:   Ez at (x_i, y_j), Hx at (x_i, y_{j+½}), Hy at (x_{i+½}, y_j)
//! - TE:   Hz at (x_{i+½}, y_{j+½}), Ex at (x_{i+½}, y_j), Ey at (x_i, y_{j+½})
//! - cyl:  Ez at (r_i, z_{k+½}), Er at (r_{i+½}, z_k), Hp at (r_{i+½}, z_{k+½})
//!
//! Tangential E on the outer walls is never updated (PEC behind the layers).

use crate::error::{Error, Result};
use crate::fields::{Component, Permittivity, Structure};
use crate::grid::{Dimensions, Plane, Volume};
use crate::pml::Stretch;

pub(crate) enum Lattice {
    OneD(OneD),
    TwoD(TwoD),
    Cylindrical(Cylindrical),
}

impl Lattice {
    pub fn new(structure: &Structure, dt: f64) -> Self {
        match structure.volume.dims {
            Dimensions::D1 => Lattice::OneD(OneD::new(structure, dt)),
            Dimensions::D2 => Lattice::TwoD(TwoD::new(structure, dt)),
            Dimensions::Cylindrical => Lattice::Cylindrical(Cylindrical::new(structure, dt)),
        }
    }

    /// Make sure the sub-lattice of `component` exists
    pub fn ensure(&mut self, component: Component) -> Result<()> {
        let supported = match self {
            Lattice::OneD(_) => matches!(component, Component::Ex | Component::Hy),
            Lattice::TwoD(two) => match component {
                Component::Ez | Component::Hx | Component::Hy => {
                    if two.tm.is_none() {
                        let tm = Tm::new(two);
                        two.tm = Some(tm);
                    }
                    true
                }
                Component::Hz | Component::Ex | Component::Ey => {
                    if two.te.is_none() {
                        let te = Te::new(two);
                        two.te = Some(te);
                    }
                    true
                }
                _ => false,
            },
            Lattice::Cylindrical(_) => {
                matches!(component, Component::Er | Component::Ez | Component::Hp)
            }
        };
        if supported {
            Ok(())
        } else {
            Err(self.unsupported(component))
        }
    }

    fn unsupported(&self, component: Component) -> Error {
        let dims = match self {
            Lattice::OneD(_) => Dimensions::D1,
            Lattice::TwoD(_) => Dimensions::D2,
            Lattice::Cylindrical(_) => Dimensions::Cylindrical,
        };
        Error::UnsupportedComponent { component, dims }
    }

    pub fn plane(&self, component: Component) -> Option<&Plane> {
        match (self, component) {
            (Lattice::OneD(l), Component::Ex) => Some(&l.ex),
            (Lattice::OneD(l), Component::Hy) => Some(&l.hy),
            (Lattice::TwoD(l), Component::Ez) => l.tm.as_ref().map(|f| &f.ez),
            (Lattice::TwoD(l), Component::Hx) => l.tm.as_ref().map(|f| &f.hx),
            (Lattice::TwoD(l), Component::Hy) => l.tm.as_ref().map(|f| &f.hy),
            (Lattice::TwoD(l), Component::Hz) => l.te.as_ref().map(|f| &f.hz),
            (Lattice::TwoD(l), Component::Ex) => l.te.as_ref().map(|f| &f.ex),
            (Lattice::TwoD(l), Component::Ey) => l.te.as_ref().map(|f| &f.ey),
            (Lattice::Cylindrical(l), Component::Er) => Some(&l.er),
            (Lattice::Cylindrical(l), Component::Ez) => Some(&l.ez),
            (Lattice::Cylindrical(l), Component::Hp) => Some(&l.hp),
            _ => None,
        }
    }

    pub fn plane_mut(&mut self, component: Component) -> Option<&mut Plane> {
        match (self, component) {
            (Lattice::OneD(l), Component::Ex) => Some(&mut l.ex),
            (Lattice::OneD(l), Component::Hy) => Some(&mut l.hy),
            (Lattice::TwoD(l), Component::Ez) => l.tm.as_mut().map(|f| &mut f.ez),
            (Lattice::TwoD(l), Component::Hx) => l.tm.as_mut().map(|f| &mut f.hx),
            (Lattice::TwoD(l), Component::Hy) => l.tm.as_mut().map(|f| &mut f.hy),
            (Lattice::TwoD(l), Component::Hz) => l.te.as_mut().map(|f| &mut f.hz),
            (Lattice::TwoD(l), Component::Ex) => l.te.as_mut().map(|f| &mut f.ex),
            (Lattice::TwoD(l), Component::Ey) => l.te.as_mut().map(|f| &mut f.ey),
            (Lattice::Cylindrical(l), Component::Er) => Some(&mut l.er),
            (Lattice::Cylindrical(l), Component::Ez) => Some(&mut l.ez),
            (Lattice::Cylindrical(l), Component::Hp) => Some(&mut l.hp),
            _ => None,
        }
    }

    pub fn step_h(&mut self, dt: f64) {
        match self {
            Lattice::OneD(l) => l.step_h(dt),
            Lattice::TwoD(l) => l.step_h(dt),
            Lattice::Cylindrical(l) => l.step_h(dt),
        }
    }

    pub fn step_e(&mut self, dt: f64) {
        match self {
            Lattice::OneD(l) => l.step_e(dt),
            Lattice::TwoD(l) => l.step_e(dt),
            Lattice::Cylindrical(l) => l.step_e(dt),
        }
    }

    /// Sum of squared field values over every allocated component
    pub fn energy(&self) -> f64 {
        match self {
            Lattice::OneD(l) => l.ex.energy() + l.hy.energy(),
            Lattice::TwoD(l) => {
                let tm = l
                    .tm
                    .as_ref()
                    .map_or(0.0, |f| f.ez.energy() + f.hx.energy() + f.hy.energy());
                let te = l
                    .te
                    .as_ref()
                    .map_or(0.0, |f| f.hz.energy() + f.ex.energy() + f.ey.energy());
                tm + te
            }
            Lattice::Cylindrical(l) => l.er.energy() + l.ez.energy() + l.hp.energy(),
        }
    }
}

/// 1/ε at every point of a sub-lattice
fn inverse_eps(plane: &Plane, volume: &Volume, eps: &Permittivity) -> Vec<f64> {
    let mut out = Vec::with_capacity(plane.ni * plane.nj);
    for j in 0..plane.nj {
        for i in 0..plane.ni {
            out.push(1.0 / eps(&volume.from_axes(plane.coord(i, j))));
        }
    }
    out
}

/// Stretch coefficients along one axis, on integer and half-integer points
fn axis_stretch(structure: &Structure, axis: usize, dt: f64, open_low: bool) -> (Stretch, Stretch) {
    let v = &structure.volume;
    let direction = v.dims.axes()[axis];
    let n = v.cells()[axis];
    let origin = v.origin()[axis];
    let d = v.delta();
    let b = &structure.boundary;
    (
        Stretch::new(b, direction, n + 1, 0.0, origin, d, n, dt, open_low),
        Stretch::new(b, direction, n, 0.5, origin, d, n, dt, open_low),
    )
}

pub(crate) struct OneD {
    n: usize,
    inv_delta: f64,
    ex: Plane,
    hy: Plane,
    inv_eps: Vec<f64>,
    sz_int: Stretch,
    sz_half: Stretch,
    psi_ex: Vec<f64>,
    psi_hy: Vec<f64>,
}

impl OneD {
    fn new(structure: &Structure, dt: f64) -> Self {
        let v = &structure.volume;
        let n = v.cells()[0];
        let d = v.delta();
        let z0 = v.origin()[0];
        let ex = Plane::new(n + 1, 1, [z0, 0.0], d);
        let hy = Plane::new(n, 1, [z0 + 0.5 * d, 0.0], d);
        let inv_eps = inverse_eps(&ex, v, &structure.eps);
        let (sz_int, sz_half) = axis_stretch(structure, 0, dt, false);
        Self {
            n,
            inv_delta: 1.0 / d,
            ex,
            hy,
            inv_eps,
            sz_int,
            sz_half,
            psi_ex: vec![0.0; n + 1],
            psi_hy: vec![0.0; n],
        }
    }

    // dHy/dt = -dEx/dz
    fn step_h(&mut self, dt: f64) {
        let ex = &self.ex.data;
        for k in 0..self.n {
            let d = (ex[k + 1] - ex[k]) * self.inv_delta;
            self.hy.data[k] -= dt * self.sz_half.apply(k, &mut self.psi_hy[k], d);
        }
    }

    // dEx/dt = -dHy/dz / ε
    fn step_e(&mut self, dt: f64) {
        let hy = &self.hy.data;
        for k in 1..self.n {
            let d = (hy[k] - hy[k - 1]) * self.inv_delta;
            self.ex.data[k] -= dt * self.inv_eps[k] * self.sz_int.apply(k, &mut self.psi_ex[k], d);
        }
    }
}

pub(crate) struct TwoD {
    nx: usize,
    ny: usize,
    delta: f64,
    origin: [f64; 2],
    volume: Volume,
    eps: Permittivity,
    sx_int: Stretch,
    sx_half: Stretch,
    sy_int: Stretch,
    sy_half: Stretch,
    tm: Option<Tm>,
    te: Option<Te>,
}

struct Tm {
    ez: Plane,
    hx: Plane,
    hy: Plane,
    inv_eps: Vec<f64>,
    psi_ez_x: Vec<f64>,
    psi_ez_y: Vec<f64>,
    psi_hx_y: Vec<f64>,
    psi_hy_x: Vec<f64>,
}

struct Te {
    hz: Plane,
    ex: Plane,
    ey: Plane,
    inv_eps_ex: Vec<f64>,
    inv_eps_ey: Vec<f64>,
    psi_hz_x: Vec<f64>,
    psi_hz_y: Vec<f64>,
    psi_ex_y: Vec<f64>,
    psi_ey_x: Vec<f64>,
}

impl Tm {
    fn new(l: &TwoD) -> Self {
        let (nx, ny, d, [x0, y0]) = (l.nx, l.ny, l.delta, l.origin);
        let ez = Plane::new(nx + 1, ny + 1, [x0, y0], d);
        let hx = Plane::new(nx + 1, ny, [x0, y0 + 0.5 * d], d);
        let hy = Plane::new(nx, ny + 1, [x0 + 0.5 * d, y0], d);
        let inv_eps = inverse_eps(&ez, &l.volume, &l.eps);
        Self {
            psi_ez_x: vec![0.0; ez.data.len()],
            psi_ez_y: vec![0.0; ez.data.len()],
            psi_hx_y: vec![0.0; hx.data.len()],
            psi_hy_x: vec![0.0; hy.data.len()],
            ez,
            hx,
            hy,
            inv_eps,
        }
    }
}

impl Te {
    fn new(l: &TwoD) -> Self {
        let (nx, ny, d, [x0, y0]) = (l.nx, l.ny, l.delta, l.origin);
        let hz = Plane::new(nx, ny, [x0 + 0.5 * d, y0 + 0.5 * d], d);
        let ex = Plane::new(nx, ny + 1, [x0 + 0.5 * d, y0], d);
        let ey = Plane::new(nx + 1, ny, [x0, y0 + 0.5 * d], d);
        let inv_eps_ex = inverse_eps(&ex, &l.volume, &l.eps);
        let inv_eps_ey = inverse_eps(&ey, &l.volume, &l.eps);
        Self {
            psi_hz_x: vec![0.0; hz.data.len()],
            psi_hz_y: vec![0.0; hz.data.len()],
            psi_ex_y: vec![0.0; ex.data.len()],
            psi_ey_x: vec![0.0; ey.data.len()],
            hz,
            ex,
            ey,
            inv_eps_ex,
            inv_eps_ey,
        }
    }
}

impl TwoD {
    fn new(structure: &Structure, dt: f64) -> Self {
        let v = &structure.volume;
        let [nx, ny] = v.cells();
        let (sx_int, sx_half) = axis_stretch(structure, 0, dt, false);
        let (sy_int, sy_half) = axis_stretch(structure, 1, dt, false);
        Self {
            nx,
            ny,
            delta: v.delta(),
            origin: v.origin(),
            volume: v.clone(),
            eps: structure.eps.clone(),
            sx_int,
            sx_half,
            sy_int,
            sy_half,
            tm: None,
            te: None,
        }
    }

    fn step_h(&mut self, dt: f64) {
        let (nx, ny) = (self.nx, self.ny);
        let inv = 1.0 / self.delta;

        if let Some(tm) = &mut self.tm {
            let ez = &tm.ez.data;
            // dHx/dt = -dEz/dy
            for j in 0..ny {
                for i in 0..=nx {
                    let k = j * (nx + 1) + i;
                    let d = (ez[k + nx + 1] - ez[k]) * inv;
                    tm.hx.data[k] -= dt * self.sy_half.apply(j, &mut tm.psi_hx_y[k], d);
                }
            }
            // dHy/dt = dEz/dx
            for j in 0..=ny {
                for i in 0..nx {
                    let e = j * (nx + 1) + i;
                    let k = j * nx + i;
                    let d = (ez[e + 1] - ez[e]) * inv;
                    tm.hy.data[k] += dt * self.sx_half.apply(i, &mut tm.psi_hy_x[k], d);
                }
            }
        }

        if let Some(te) = &mut self.te {
            let (ex, ey) = (&te.ex.data, &te.ey.data);
            // dHz/dt = -(dEy/dx - dEx/dy)
            for j in 0..ny {
                for i in 0..nx {
                    let k = j * nx + i;
                    let e = j * (nx + 1) + i;
                    let dey_dx = (ey[e + 1] - ey[e]) * inv;
                    let dex_dy = (ex[k + nx] - ex[k]) * inv;
                    let curl = self.sx_half.apply(i, &mut te.psi_hz_x[k], dey_dx)
                        - self.sy_half.apply(j, &mut te.psi_hz_y[k], dex_dy);
                    te.hz.data[k] -= dt * curl;
                }
            }
        }
    }

    fn step_e(&mut self, dt: f64) {
        let (nx, ny) = (self.nx, self.ny);
        let inv = 1.0 / self.delta;

        if let Some(tm) = &mut self.tm {
            let (hx, hy) = (&tm.hx.data, &tm.hy.data);
            // dEz/dt = (dHy/dx - dHx/dy) / ε
            for j in 1..ny {
                for i in 1..nx {
                    let k = j * (nx + 1) + i;
                    let h = j * nx + i;
                    let dhy_dx = (hy[h] - hy[h - 1]) * inv;
                    let dhx_dy = (hx[k] - hx[k - nx - 1]) * inv;
                    let curl = self.sx_int.apply(i, &mut tm.psi_ez_x[k], dhy_dx)
                        - self.sy_int.apply(j, &mut tm.psi_ez_y[k], dhx_dy);
                    tm.ez.data[k] += dt * tm.inv_eps[k] * curl;
                }
            }
        }

        if let Some(te) = &mut self.te {
            let hz = &te.hz.data;
            // dEx/dt = dHz/dy / ε
            for j in 1..ny {
                for i in 0..nx {
                    let k = j * nx + i;
                    let d = (hz[k] - hz[k - nx]) * inv;
                    te.ex.data[k] +=
                        dt * te.inv_eps_ex[k] * self.sy_int.apply(j, &mut te.psi_ex_y[k], d);
                }
            }
            // dEy/dt = -dHz/dx / ε
            for j in 0..ny {
                for i in 1..nx {
                    let k = j * (nx + 1) + i;
                    let h = j * nx + i;
                    let d = (hz[h] - hz[h - 1]) * inv;
                    te.ey.data[k] -=
                        dt * te.inv_eps_ey[k] * self.sx_int.apply(i, &mut te.psi_ey_x[k], d);
                }
            }
        }
    }
}

/// Cylindrical (r, z) lattice for angular order m = 0, Er/Ez/Hp fields.
///
/// The radial layer stretches r as if it were a Cartesian coordinate (a
/// quasi-PML), so its reflection does not vanish with resolution.
pub(crate) struct Cylindrical {
    nr: usize,
    nz: usize,
    inv_delta: f64,
    er: Plane,
    ez: Plane,
    hp: Plane,
    inv_eps_er: Vec<f64>,
    inv_eps_ez: Vec<f64>,
    sr_int: Stretch,
    sr_half: Stretch,
    sz_int: Stretch,
    sz_half: Stretch,
    psi_er_z: Vec<f64>,
    psi_ez_r: Vec<f64>,
    psi_hp_r: Vec<f64>,
    psi_hp_z: Vec<f64>,
}

impl Cylindrical {
    fn new(structure: &Structure, dt: f64) -> Self {
        let v = &structure.volume;
        let [nr, nz] = v.cells();
        let d = v.delta();
        let z0 = v.origin()[1];
        let er = Plane::new(nr, nz + 1, [0.5 * d, z0], d);
        let ez = Plane::new(nr + 1, nz, [0.0, z0 + 0.5 * d], d);
        let hp = Plane::new(nr, nz, [0.5 * d, z0 + 0.5 * d], d);
        let inv_eps_er = inverse_eps(&er, v, &structure.eps);
        let inv_eps_ez = inverse_eps(&ez, v, &structure.eps);
        let (sr_int, sr_half) = axis_stretch(structure, 0, dt, true);
        let (sz_int, sz_half) = axis_stretch(structure, 1, dt, false);
        Self {
            nr,
            nz,
            inv_delta: 1.0 / d,
            psi_er_z: vec![0.0; er.data.len()],
            psi_ez_r: vec![0.0; ez.data.len()],
            psi_hp_r: vec![0.0; hp.data.len()],
            psi_hp_z: vec![0.0; hp.data.len()],
            er,
            ez,
            hp,
            inv_eps_er,
            inv_eps_ez,
            sr_int,
            sr_half,
            sz_int,
            sz_half,
        }
    }

    // dHp/dt = dEz/dr - dEr/dz
    fn step_h(&mut self, dt: f64) {
        let (nr, nz, inv) = (self.nr, self.nz, self.inv_delta);
        let (er, ez) = (&self.er.data, &self.ez.data);
        for k in 0..nz {
            for i in 0..nr {
                let h = k * nr + i;
                let e = k * (nr + 1) + i;
                let dez_dr = (ez[e + 1] - ez[e]) * inv;
                let der_dz = (er[h + nr] - er[h]) * inv;
                let curl = self.sr_half.apply(i, &mut self.psi_hp_r[h], dez_dr)
                    - self.sz_half.apply(k, &mut self.psi_hp_z[h], der_dz);
                self.hp.data[h] += dt * curl;
            }
        }
    }

    fn step_e(&mut self, dt: f64) {
        let (nr, nz, inv) = (self.nr, self.nz, self.inv_delta);
        let hp = &self.hp.data;

        // dEr/dt = -dHp/dz / ε
        for k in 1..nz {
            for i in 0..nr {
                let h = k * nr + i;
                let d = (hp[h] - hp[h - nr]) * inv;
                self.er.data[h] -=
                    dt * self.inv_eps_er[h] * self.sz_int.apply(k, &mut self.psi_er_z[h], d);
            }
        }

        // dEz/dt = (1/r) d(r Hp)/dr / ε, with the on-axis limit 4·Hp(Δ/2)/Δ
        for k in 0..nz {
            for i in 0..nr {
                let e = k * (nr + 1) + i;
                let h = k * nr + i;
                let d = if i == 0 {
                    4.0 * hp[h] * inv
                } else {
                    let r = i as f64;
                    ((r + 0.5) * hp[h] - (r - 0.5) * hp[h - 1]) / r * inv
                };
                self.ez.data[e] +=
                    dt * self.inv_eps_ez[e] * self.sr_int.apply(i, &mut self.psi_ez_r[e], d);
            }
        }
    }
}
