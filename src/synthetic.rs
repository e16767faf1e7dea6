//! # Synthetic optical systems
//!
//! Analytical [forward models](ForwardModel) for testing and demonstrating
//! the controller without an optical propagation library.

use crate::{Error, Field, ForwardModel, Result};
use nalgebra::{self as na, Complex};
use std::{convert::Infallible, f64::consts::PI};

/// Optical system with an electric field linear in the actuator commands
///
/// `E = R a + E0`, where `R` is the complex response matrix and `E0` the
/// static aberration field.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    response: na::DMatrix<Complex<f64>>,
    aberration: Field,
}
impl LinearSystem {
    /// Creates a linear system from the response matrix `[n_sample x n_actuator]` and the aberration field
    pub fn new(response: na::DMatrix<Complex<f64>>, aberration: Field) -> Result<Self> {
        if aberration.len() != response.nrows() {
            return Err(Error::SampleCount {
                expected: response.nrows(),
                found: aberration.len(),
            });
        }
        Ok(Self {
            response,
            aberration,
        })
    }
    /// Small phase approximation of an optical system with a perfect coronagraph
    ///
    /// The `n_actuator` actuators are evenly spread along a 1D pupil and the
    /// `n_sample` focal plane samples are 1 λ/D apart, centered on the optical axis.
    /// The aberration is a sinusoidal actuator command of amplitude `amplitude`,
    /// so it can be entirely compensated.
    pub fn fourier(n_actuator: usize, n_sample: usize, amplitude: f64) -> Self {
        let response = na::DMatrix::from_fn(n_sample, n_actuator, |j, i| {
            let x = (i as f64 + 0.5) / n_actuator as f64 - 0.5;
            let u = j as f64 - 0.5 * n_sample as f64;
            let phase = -2. * PI * x * u;
            Complex::<f64>::i() * Complex::new(phase.cos(), phase.sin()) / n_actuator as f64
        });
        let a0: Vec<f64> = (0..n_actuator)
            .map(|i| amplitude * (1.7 * i as f64 + 0.3).sin())
            .collect();
        let aberration = propagate(&response, &a0);
        Self {
            response,
            aberration,
        }
    }
    pub fn response(&self) -> &na::DMatrix<Complex<f64>> {
        &self.response
    }
    pub fn aberration(&self) -> &Field {
        &self.aberration
    }
    /// Returns the exact Jacobian over the dark zone samples `indices`
    pub fn jacobian(&self, indices: &[usize]) -> na::DMatrix<f64> {
        let n = indices.len();
        na::DMatrix::from_fn(2 * n, self.response.ncols(), |k, i| {
            if k < n {
                self.response[(indices[k], i)].re
            } else {
                self.response[(indices[k - n], i)].im
            }
        })
    }
}
impl ForwardModel for LinearSystem {
    type Error = Infallible;
    fn n_actuator(&self) -> usize {
        self.response.ncols()
    }
    fn n_sample(&self) -> usize {
        self.response.nrows()
    }
    fn evaluate(
        &mut self,
        actuators: &[f64],
        include_aberration: bool,
    ) -> std::result::Result<Field, Self::Error> {
        let field = propagate(&self.response, actuators);
        Ok(if include_aberration {
            field
                .iter()
                .zip(self.aberration.iter())
                .map(|(e, e0)| *e + *e0)
                .collect()
        } else {
            field
        })
    }
}

fn propagate(response: &na::DMatrix<Complex<f64>>, actuators: &[f64]) -> Field {
    response
        .row_iter()
        .map(|row| {
            row.iter()
                .zip(actuators)
                .map(|(r, a)| *r * *a)
                .sum::<Complex<f64>>()
        })
        .collect()
}

/// Optical system with a second order term in the actuator commands
///
/// `E = R a + c (R a)^2 + E0`, with `c` the curvature.
#[derive(Debug, Clone)]
pub struct QuadraticSystem {
    linear: LinearSystem,
    curvature: f64,
}
impl QuadraticSystem {
    pub fn new(linear: LinearSystem, curvature: f64) -> Self {
        Self { linear, curvature }
    }
    pub fn linear(&self) -> &LinearSystem {
        &self.linear
    }
}
impl ForwardModel for QuadraticSystem {
    type Error = Infallible;
    fn n_actuator(&self) -> usize {
        self.linear.n_actuator()
    }
    fn n_sample(&self) -> usize {
        self.linear.n_sample()
    }
    fn evaluate(
        &mut self,
        actuators: &[f64],
        include_aberration: bool,
    ) -> std::result::Result<Field, Self::Error> {
        let linear = propagate(&self.linear.response, actuators);
        let curvature = self.curvature;
        Ok(linear
            .iter()
            .zip(self.linear.aberration.iter())
            .map(|(&e, &e0)| {
                let e = e + e * e * curvature;
                if include_aberration {
                    e + e0
                } else {
                    e
                }
            })
            .collect())
    }
}
