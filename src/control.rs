use crate::{Error, Result};

/// Integral controller of the actuator commands
///
/// At each step, a fraction `gain` of the correction is removed from the
/// integrated commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrate {
    gain: f64,
    mem: Vec<f64>,
}
impl Integrate {
    /// Creates an integrator of `n_data` commands starting from zero
    pub fn new(gain: f64, n_data: usize) -> Result<Self> {
        Self::with_state(gain, vec![0f64; n_data])
    }
    /// Creates an integrator starting from the commands in `mem`
    pub fn with_state(gain: f64, mem: Vec<f64>) -> Result<Self> {
        if !(gain > 0f64 && gain <= 1f64) {
            return Err(Error::LoopGain(gain));
        }
        Ok(Self { gain, mem })
    }
    pub fn gain(&self) -> f64 {
        self.gain
    }
    /// Returns the integrated commands
    pub fn last(&self) -> &[f64] {
        &self.mem
    }
    /// Updates the commands with the `correction` and returns them
    pub fn step(&mut self, correction: &[f64]) -> &[f64] {
        let gain = self.gain;
        self.mem.iter_mut().zip(correction).for_each(|(a, c)| {
            *a -= *c * gain;
        });
        &self.mem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrate() {
        let mut ctrl = Integrate::new(0.5, 2).unwrap();
        assert_eq!(ctrl.step(&[2., -4.]), &[-1., 2.]);
        assert_eq!(ctrl.step(&[2., -4.]), &[-2., 4.]);
        assert_eq!(ctrl.last(), &[-2., 4.]);
    }

    #[test]
    fn gain_range() {
        assert!(Integrate::new(1., 1).is_ok());
        for gain in [0., -0.1, 1.5, f64::NAN] {
            assert!(matches!(Integrate::new(gain, 1), Err(Error::LoopGain(_))));
        }
    }
}
