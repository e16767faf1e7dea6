//! # Dark zone Jacobian
//!
//! The Jacobian is the linear response of the dark zone electric field to each
//! actuator. It is estimated by poking the actuators one at a time with a set
//! of [probe amplitudes](Probes) and fitting the slope of the field with
//! respect to the amplitude.

use crate::{model, pinv, DarkZone, Error, ForwardModel, Result};
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, time::Instant};

/// Actuator probe amplitudes
///
/// The amplitudes are evenly spaced in `[-epsilon,+epsilon]`.
/// `epsilon` must be small enough for the optical system to respond linearly
/// and large enough for the response to be above the numerical noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probes {
    epsilon: f64,
    n_probe: usize,
}
impl Probes {
    /// Creates a pair of `+/-epsilon` probes
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            n_probe: 2,
        }
    }
    /// Sets the number of probe amplitudes
    pub fn n_probe(mut self, n_probe: usize) -> Self {
        self.n_probe = n_probe;
        self
    }
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
    /// Returns the probe amplitudes
    pub fn amplitudes(&self) -> Vec<f64> {
        let n = self.n_probe.max(2);
        (0..n)
            .map(|k| -self.epsilon + 2. * self.epsilon * k as f64 / (n - 1) as f64)
            .collect()
    }
    /// Returns the pairs of probe amplitude and least-squares slope weight
    ///
    /// The slope of the response is `sum(w_k * field(a_k))` with
    /// `w_k = (a_k - mean(a)) / sum((a - mean(a))^2)`; for 2 probes this is the
    /// centered finite difference `(field(+eps) - field(-eps)) / (2 eps)`.
    pub fn weights(&self) -> Result<Vec<(f64, f64)>> {
        if self.n_probe < 2 {
            return Err(Error::ProbeCount(self.n_probe));
        }
        let amplitudes = self.amplitudes();
        let mean = amplitudes.iter().sum::<f64>() / amplitudes.len() as f64;
        let var: f64 = amplitudes.iter().map(|a| (a - mean).powi(2)).sum();
        Ok(amplitudes
            .into_iter()
            .map(|a| (a, (a - mean) / var))
            .collect())
    }
}

/// Dark zone Jacobian
///
/// The matrix has `2 x dark zone size` rows (the real parts followed by the
/// imaginary parts of the field) and one column per actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jacobian {
    matrix: na::DMatrix<f64>,
}
impl Jacobian {
    /// Creates a Jacobian from a `matrix` for the given `dark_zone` and number of actuators
    pub fn new(matrix: na::DMatrix<f64>, dark_zone: &DarkZone, n_actuator: usize) -> Result<Self> {
        let this = Self { matrix };
        this.check(dark_zone, n_actuator)?;
        Ok(this)
    }
    /// Checks that the Jacobian shape matches the `dark_zone` and the number of actuators
    /// and that all the entries are finite
    pub fn check(&self, dark_zone: &DarkZone, n_actuator: usize) -> Result<()> {
        let (rows, cols) = self.matrix.shape();
        if rows != dark_zone.n_data() || cols != n_actuator {
            return Err(Error::JacobianShape {
                rows,
                cols,
                expected_rows: dark_zone.n_data(),
                expected_cols: n_actuator,
            });
        }
        if !pinv::is_finite(&self.matrix) {
            return Err(Error::NonFiniteJacobian);
        }
        Ok(())
    }
    /// Estimates the Jacobian with a pair of `+/-epsilon` probes
    pub fn estimate<M: ForwardModel>(
        model: &mut M,
        dark_zone: &DarkZone,
        epsilon: f64,
    ) -> Result<Self> {
        Self::estimate_with(model, dark_zone, &Probes::new(epsilon))
    }
    /// Estimates the Jacobian with the given `probes`
    ///
    /// The static aberrations are excluded from the forward model evaluations.
    pub fn estimate_with<M: ForwardModel>(
        model: &mut M,
        dark_zone: &DarkZone,
        probes: &Probes,
    ) -> Result<Self> {
        check_sizes(model, dark_zone)?;
        let weights = probes.weights()?;
        let n_actuator = model.n_actuator();
        let now = Instant::now();
        let columns = (0..n_actuator)
            .map(|i| axis_response(model, dark_zone, &weights, i))
            .collect::<Result<Vec<_>>>()?;
        Self::from_columns(columns, dark_zone, n_actuator, now)
    }
    /// Estimates the Jacobian with the given `probes`, evaluating the actuators in parallel
    ///
    /// Each actuator is probed with its own copy of the `model`.
    #[cfg(feature = "parallel")]
    pub fn par_estimate_with<M>(model: &M, dark_zone: &DarkZone, probes: &Probes) -> Result<Self>
    where
        M: ForwardModel + Clone + Send + Sync,
    {
        use rayon::prelude::*;
        check_sizes(model, dark_zone)?;
        let weights = probes.weights()?;
        let n_actuator = model.n_actuator();
        let now = Instant::now();
        let columns = (0..n_actuator)
            .into_par_iter()
            .map(|i| {
                let mut model = model.clone();
                axis_response(&mut model, dark_zone, &weights, i)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_columns(columns, dark_zone, n_actuator, now)
    }
    fn from_columns(
        columns: Vec<na::DVector<f64>>,
        dark_zone: &DarkZone,
        n_actuator: usize,
        now: Instant,
    ) -> Result<Self> {
        let matrix = if columns.is_empty() {
            na::DMatrix::zeros(dark_zone.n_data(), 0)
        } else {
            na::DMatrix::from_columns(&columns)
        };
        let this = Self::new(matrix, dark_zone, n_actuator)?;
        log::info!(
            "Jacobian [{}x{}] estimated in {}ms (condition number: {:e})",
            this.n_data(),
            this.n_actuator(),
            now.elapsed().as_millis(),
            this.condition_number()
        );
        Ok(this)
    }
    pub fn matrix(&self) -> &na::DMatrix<f64> {
        &self.matrix
    }
    /// Number of rows
    pub fn n_data(&self) -> usize {
        self.matrix.nrows()
    }
    /// Number of columns
    pub fn n_actuator(&self) -> usize {
        self.matrix.ncols()
    }
    /// Returns the singular values in decreasing order
    pub fn singular_values(&self) -> Vec<f64> {
        let mut singular_values = pinv::singular_values(&self.matrix);
        singular_values.sort_by(|a, b| b.total_cmp(a));
        singular_values
    }
    /// Ratio of the largest to the smallest singular value
    pub fn condition_number(&self) -> f64 {
        let singular_values = self.singular_values();
        match (singular_values.first(), singular_values.last()) {
            (Some(max_sv), Some(min_sv)) => max_sv / min_sv,
            _ => f64::NAN,
        }
    }
    /// Saves the Jacobian to a [bincode] file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        bincode::serialize_into(File::create(path)?, self)?;
        Ok(())
    }
    /// Loads a Jacobian from a [bincode] file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(bincode::deserialize_from(File::open(path)?)?)
    }
}
impl From<Jacobian> for na::DMatrix<f64> {
    fn from(jacobian: Jacobian) -> Self {
        jacobian.matrix
    }
}

fn check_sizes<M: ForwardModel>(model: &M, dark_zone: &DarkZone) -> Result<()> {
    if dark_zone.n_sample() != model.n_sample() {
        Err(Error::SampleCount {
            expected: model.n_sample(),
            found: dark_zone.n_sample(),
        })
    } else {
        Ok(())
    }
}

/// Least-squares slope of the dark zone field with respect to actuator #`i`
fn axis_response<M: ForwardModel>(
    model: &mut M,
    dark_zone: &DarkZone,
    weights: &[(f64, f64)],
    i: usize,
) -> Result<na::DVector<f64>> {
    let mut cmd = vec![0f64; model.n_actuator()];
    let mut response = na::DVector::<f64>::zeros(dark_zone.n_data());
    for &(amplitude, weight) in weights {
        cmd[i] = amplitude;
        let field = model::evaluate(model, &cmd, false)?;
        response += dark_zone.stack(&field)? * weight;
    }
    log::debug!("actuator #{i} probed");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_probes() {
        let weights = Probes::new(1e-3).weights().unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].0, -1e-3);
        assert_eq!(weights[1].0, 1e-3);
        assert!((weights[0].1 + 500.).abs() < 1e-9);
        assert!((weights[1].1 - 500.).abs() < 1e-9);
    }

    #[test]
    fn weights_fit_slope() {
        let weights = Probes::new(0.5).n_probe(5).weights().unwrap();
        // slope of f(a) = 3a + 2
        let slope: f64 = weights.iter().map(|(a, w)| w * (3. * a + 2.)).sum();
        assert!((slope - 3.).abs() < 1e-12);
    }

    #[test]
    fn single_probe() {
        assert!(matches!(
            Probes::new(1e-3).n_probe(1).weights(),
            Err(Error::ProbeCount(1))
        ));
    }

    #[test]
    fn null_epsilon() {
        let mut model = crate::synthetic::LinearSystem::fourier(4, 16, 0.1);
        let dz = DarkZone::new(5..15, 16).unwrap();
        assert!(matches!(
            Jacobian::estimate(&mut model, &dz, 0.),
            Err(Error::NonFiniteJacobian)
        ));
    }

    #[test]
    fn non_finite() {
        let dz = DarkZone::new(0..2, 4).unwrap();
        let mut matrix = na::DMatrix::from_element(4, 2, 1.);
        matrix[(1, 1)] = f64::NAN;
        assert!(matches!(
            Jacobian::new(matrix.clone(), &dz, 2),
            Err(Error::NonFiniteJacobian)
        ));
        matrix[(1, 1)] = f64::INFINITY;
        assert!(matches!(
            Jacobian::new(matrix, &dz, 2),
            Err(Error::NonFiniteJacobian)
        ));
    }

    #[test]
    fn shape() {
        let dz = DarkZone::new(0..3, 5).unwrap();
        assert!(Jacobian::new(na::DMatrix::zeros(6, 2), &dz, 2).is_ok());
        assert!(matches!(
            Jacobian::new(na::DMatrix::zeros(3, 2), &dz, 2),
            Err(Error::JacobianShape {
                rows: 3,
                cols: 2,
                expected_rows: 6,
                expected_cols: 2
            })
        ));
    }
}
