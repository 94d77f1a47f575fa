//! Polynomial least-squares fitting.
//!
//! Columns of the Vandermonde matrix are scaled to unit norm before solving and
//! the coefficients unscaled afterwards. This keeps the conditioning sane when
//! wavelengths are far from zero and, for underdetermined fits, makes the
//! minimum-norm solution independent of the raw column magnitudes.

use nalgebra::{DMatrix, DVector};

use crate::error::PrepError;
use crate::math::solve_least_squares;

/// Polynomial with coefficients in ascending power order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    pub coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Evaluate with Horner's rule.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// Fit `y ≈ p(x)` with `deg(p) = degree`.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial, PrepError> {
    if x.is_empty() || x.len() != y.len() {
        return Err(PrepError::malformed(format!(
            "polyfit needs matching non-empty inputs (x={}, y={})",
            x.len(),
            y.len()
        )));
    }

    let n = x.len();
    let cols = degree + 1;
    let mut design = DMatrix::<f64>::zeros(n, cols);
    for (i, &xi) in x.iter().enumerate() {
        let mut power = 1.0;
        for j in 0..cols {
            design[(i, j)] = power;
            power *= xi;
        }
    }

    let mut scale = vec![1.0; cols];
    for (j, s) in scale.iter_mut().enumerate() {
        let norm = design.column(j).norm();
        if norm > 0.0 && norm.is_finite() {
            *s = norm;
            design.column_mut(j).unscale_mut(norm);
        }
    }

    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs).ok_or_else(|| {
        PrepError::malformed(format!("polynomial fit of degree {degree} is ill-conditioned"))
    })?;

    let coeffs = beta.iter().zip(&scale).map(|(b, s)| b / s).collect();
    Ok(Polynomial { coeffs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_quadratic() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 1.0 - 2.0 * v + 0.5 * v * v).collect();
        let p = polyfit(&x, &y, 2).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((p.eval(*xi) - yi).abs() < 1e-9);
        }
        assert!((p.coeffs[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn underdetermined_fit_interpolates_the_points() {
        // Two points, degree two: infinitely many solutions, all pass through the data.
        let x = [1.2, 1.6];
        let y = [0.9, 1.1];
        let p = polyfit(&x, &y, 2).unwrap();
        assert_eq!(p.degree(), 2);
        assert!((p.eval(1.2) - 0.9).abs() < 1e-9);
        assert!((p.eval(1.6) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(polyfit(&[], &[], 1).is_err());
    }
}
