use num_complex::Complex64;

/// Fraction of power spuriously reflected, estimated from a trial and a
/// better-absorbing reference: `|ft - ft2|² / |ft2|²`.
///
/// A zero reference gives `inf` (or NaN when both are zero).
pub fn reflection(ft: Complex64, ft2: Complex64) -> f64 {
    (ft - ft2).norm_sqr() / ft2.norm_sqr()
}
