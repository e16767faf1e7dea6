//! # Regularized pseudo-inverse
//!
//! The control matrix is computed from the singular value decomposition of
//! the [Jacobian](crate::Jacobian). Singular values that are small with
//! respect to the largest one, `s_max`, correspond to actuator combinations
//! that are poorly sensed in the dark zone; they are either discarded
//! ([Regularization::Truncated]) or damped ([Regularization::Tikhonov]).

use crate::Jacobian;
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Regularization of the pseudo-inverse with a cutoff `rcond` relative to the largest singular value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Regularization {
    /// Singular values `s <= rcond * s_max` are set to zero
    Truncated { rcond: f64 },
    /// Singular values are inverted as `s / (s^2 + (rcond * s_max)^2)`
    Tikhonov { rcond: f64 },
}
impl Regularization {
    pub fn rcond(&self) -> f64 {
        match *self {
            Regularization::Truncated { rcond } | Regularization::Tikhonov { rcond } => rcond,
        }
    }
    /// Returns the regularized inverse of the singular value `s`
    pub fn invert(&self, s: f64, s_max: f64) -> f64 {
        if s <= 0f64 {
            return 0f64;
        }
        match *self {
            Regularization::Truncated { rcond } => {
                if s > rcond * s_max {
                    s.recip()
                } else {
                    0f64
                }
            }
            Regularization::Tikhonov { rcond } => s / (s * s + (rcond * s_max).powi(2)),
        }
    }
}

/// Maximum number of iterations of the singular value decomposition
const SVD_MAX_ITERATION: usize = 1_000;

/// Checks that all the entries of `matrix` are finite
pub fn is_finite(matrix: &na::DMatrix<f64>) -> bool {
    matrix.iter().all(|x| x.is_finite())
}

/// Singular values of `matrix`, unordered
///
/// Returns an empty vector if `matrix` is empty, has non-finite entries or if
/// the decomposition does not converge.
pub fn singular_values(matrix: &na::DMatrix<f64>) -> Vec<f64> {
    if matrix.is_empty() || !is_finite(matrix) {
        return vec![];
    }
    matrix
        .clone()
        .try_svd(false, false, f64::EPSILON, SVD_MAX_ITERATION)
        .map_or_else(Vec::new, |svd| svd.singular_values.as_slice().to_vec())
}

/// Regularized pseudo-inverse of `matrix`
///
/// A rank deficient or null matrix is not an error: the degenerate directions
/// are zeroed in the inverse. A matrix with non-finite entries, or whose
/// decomposition does not converge, has a null inverse.
pub fn inverse(matrix: &na::DMatrix<f64>, regularization: Regularization) -> na::DMatrix<f64> {
    let (rows, cols) = matrix.shape();
    if rows == 0 || cols == 0 || !is_finite(matrix) {
        return na::DMatrix::zeros(cols, rows);
    }
    let svd = match matrix
        .clone()
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATION)
    {
        Some(svd) => svd,
        None => {
            log::warn!("SVD of the [{rows}x{cols}] matrix did not converge");
            return na::DMatrix::zeros(cols, rows);
        }
    };
    let s_max = svd.singular_values.iter().cloned().fold(0f64, f64::max);
    match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => {
            let s_inv = na::DVector::from_iterator(
                svd.singular_values.len(),
                svd.singular_values
                    .iter()
                    .map(|&s| regularization.invert(s, s_max)),
            );
            v_t.transpose() * na::DMatrix::from_diagonal(&s_inv) * u.transpose()
        }
        _ => na::DMatrix::zeros(cols, rows),
    }
}

/// Number of singular values of `matrix` larger than `rcond` times the largest one
pub fn effective_rank(matrix: &na::DMatrix<f64>, rcond: f64) -> usize {
    let singular_values = singular_values(matrix);
    let s_max = singular_values.iter().cloned().fold(0f64, f64::max);
    singular_values
        .iter()
        .filter(|&&s| s > 0f64 && s > rcond * s_max)
        .count()
}

/// EFC control matrix
///
/// The control matrix maps the stacked dark zone field to actuator commands.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMatrix {
    matrix: na::DMatrix<f64>,
    regularization: Regularization,
}
impl ControlMatrix {
    /// Computes the control matrix from the `jacobian`
    pub fn new(jacobian: &Jacobian, regularization: Regularization) -> Self {
        let matrix = inverse(jacobian.matrix(), regularization);
        log::info!(
            "control matrix [{}x{}] with {:?}: {} active modes out of {}",
            matrix.nrows(),
            matrix.ncols(),
            regularization,
            effective_rank(jacobian.matrix(), regularization.rcond()),
            jacobian.n_actuator().min(jacobian.n_data())
        );
        Self {
            matrix,
            regularization,
        }
    }
    pub fn matrix(&self) -> &na::DMatrix<f64> {
        &self.matrix
    }
    pub fn regularization(&self) -> Regularization {
        self.regularization
    }
    /// Returns the actuator correction for the stacked dark zone `error`
    pub fn correction(&self, error: &na::DVector<f64>) -> na::DVector<f64> {
        &self.matrix * error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_rank() -> na::DMatrix<f64> {
        na::DMatrix::from_row_slice(
            5,
            3,
            &[
                2., 0., 1., //
                0., 1., 0., //
                1., 0., 3., //
                0., 4., 1., //
                1., 1., 1., //
            ],
        )
    }

    #[test]
    fn least_squares() {
        let a = full_rank();
        let ls = (a.transpose() * &a).try_inverse().unwrap() * a.transpose();
        for regularization in [
            Regularization::Truncated { rcond: 0. },
            Regularization::Tikhonov { rcond: 0. },
            Regularization::Tikhonov { rcond: 1e-12 },
        ] {
            let pinv = inverse(&a, regularization);
            assert_eq!(pinv.shape(), (3, 5));
            assert!((pinv - &ls).norm() < 1e-9 * ls.norm());
        }
    }

    #[test]
    fn rank_deficient() {
        let a = na::DMatrix::from_row_slice(3, 2, &[1., 2., 2., 4., 3., 6.]);
        let pinv = inverse(&a, Regularization::Truncated { rcond: 1e-10 });
        assert!(pinv.iter().all(|x| x.is_finite()));
        // Moore-Penrose identity
        assert!((&a * &pinv * &a - &a).norm() < 1e-9);
        assert_eq!(effective_rank(&a, 1e-10), 1);
    }

    #[test]
    fn null_matrix() {
        let a = na::DMatrix::<f64>::zeros(4, 3);
        let pinv = inverse(&a, Regularization::Tikhonov { rcond: 1e-3 });
        assert_eq!(pinv, na::DMatrix::zeros(3, 4));
        assert_eq!(effective_rank(&a, 0.), 0);
    }

    #[test]
    fn not_a_number() {
        let mut a = full_rank();
        a[(2, 1)] = f64::NAN;
        let pinv = inverse(&a, Regularization::Tikhonov { rcond: 1e-3 });
        assert_eq!(pinv, na::DMatrix::zeros(3, 5));
        assert_eq!(effective_rank(&a, 0.), 0);
        assert!(singular_values(&a).is_empty());
    }

    #[test]
    fn rank_decreases_with_rcond() {
        let a = na::DMatrix::from_diagonal(&na::DVector::from_vec(vec![
            1., 0.5, 1e-1, 1e-2, 1e-3, 1e-4,
        ]));
        let ranks: Vec<usize> = [0., 1e-5, 5e-4, 5e-3, 5e-2, 0.2, 0.7, 2.]
            .iter()
            .map(|&rcond| effective_rank(&a, rcond))
            .collect();
        assert_eq!(ranks, vec![6, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn tikhonov_damping() {
        let regularization = Regularization::Tikhonov { rcond: 0.1 };
        assert!((regularization.invert(1., 1.) - 1. / 1.01).abs() < 1e-12);
        assert!((regularization.invert(0.1, 1.) - 5.).abs() < 1e-12);
        assert_eq!(regularization.invert(0., 1.), 0.);
    }
}
