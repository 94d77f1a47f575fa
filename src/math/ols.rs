//! Least squares solver.
//!
//! The continuum normalizer fits a polynomial whose degree equals the number of
//! fitted bands, so the design matrix has one more column than rows. The system
//! is therefore always underdetermined and we want the minimum-norm solution:
//!
//! ```text
//! minimize ||β||  subject to  minimize ||y - Xβ||
//! ```
//!
//! Implementation choices:
//! - We solve through SVD, which handles wide, tall and square systems alike and
//!   yields the pseudo-inverse (minimum-norm) solution for wide ones.
//! - Singular values below the tolerance are treated as zero.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() == 0 || x.ncols() == 0 || x.nrows() != y.len() {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
