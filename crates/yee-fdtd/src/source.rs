//! Time dependence of point sources

use std::f64::consts::PI;

use num_complex::Complex64;

/// Gaussian-envelope carrier centered at `freq` with spectral width `fwidth`.
///
/// The envelope width is `w = 1/fwidth`; it peaks at `w·cutoff` and is
/// switched off `w·cutoff` after the peak. The injected current is the time
/// derivative of the dipole moment, which keeps the source free of a DC
/// component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSrc {
    pub freq: f64,
    pub fwidth: f64,
    /// Number of widths on either side of the peak
    pub cutoff: f64,
}

impl GaussianSrc {
    pub fn new(freq: f64, fwidth: f64) -> Self {
        Self {
            freq,
            fwidth,
            cutoff: 5.0,
        }
    }

    pub fn width(&self) -> f64 {
        1.0 / self.fwidth
    }

    pub fn peak_time(&self) -> f64 {
        self.width() * self.cutoff
    }

    /// Time after which the source no longer emits
    pub fn last_time(&self) -> f64 {
        self.peak_time() + self.width() * self.cutoff
    }

    /// Complex dipole moment at time `t`
    pub fn dipole(&self, t: f64) -> Complex64 {
        let tt = t - self.peak_time();
        if tt.abs() > self.width() * self.cutoff {
            return Complex64::new(0.0, 0.0);
        }
        let w = self.width();
        let envelope = (-tt * tt / (2.0 * w * w)).exp();
        Complex64::from_polar(envelope, -2.0 * PI * self.freq * t)
    }

    /// Real current centered at `t` for a step of `dt`
    pub fn current(&self, t: f64, dt: f64) -> f64 {
        ((self.dipole(t + 0.5 * dt) - self.dipole(t - 0.5 * dt)) / dt).re
    }
}
