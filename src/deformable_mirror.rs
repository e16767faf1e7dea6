//! # Deformable mirrors
//!
//! The commands of several deformable mirrors are concatenated into a single
//! actuator vector; [ActuatorLayout] keeps track of the range of the vector
//! that belongs to each mirror.

use crate::{Error, Result};
use std::ops::Range;

/// Deformable mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub name: String,
    pub n_actuator: usize,
}

/// Layout of the deformable mirrors actuators in the concatenated actuator vector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActuatorLayout {
    mirrors: Vec<Mirror>,
}
impl ActuatorLayout {
    /// Creates an empty layout
    pub fn new() -> Self {
        Default::default()
    }
    /// Appends a mirror with `n_actuator` actuators
    pub fn mirror<S: Into<String>>(mut self, name: S, n_actuator: usize) -> Self {
        self.mirrors.push(Mirror {
            name: name.into(),
            n_actuator,
        });
        self
    }
    /// Total number of actuators
    pub fn n_actuator(&self) -> usize {
        self.mirrors.iter().map(|m| m.n_actuator).sum()
    }
    pub fn n_mirror(&self) -> usize {
        self.mirrors.len()
    }
    pub fn mirrors(&self) -> impl Iterator<Item = &Mirror> {
        self.mirrors.iter()
    }
    /// Range of the actuators of mirror #`index` in the actuator vector
    pub fn range(&self, index: usize) -> Option<Range<usize>> {
        let mirror = self.mirrors.get(index)?;
        let start: usize = self.mirrors[..index].iter().map(|m| m.n_actuator).sum();
        Some(start..start + mirror.n_actuator)
    }
    /// Range of the actuators of the mirror `name` in the actuator vector
    pub fn range_of(&self, name: &str) -> Option<Range<usize>> {
        self.mirrors
            .iter()
            .position(|m| m.name == name)
            .and_then(|index| self.range(index))
    }
    fn check(&self, n: usize) -> Result<()> {
        if n != self.n_actuator() {
            Err(Error::ActuatorCount {
                expected: self.n_actuator(),
                found: n,
            })
        } else {
            Ok(())
        }
    }
    /// Splits the `actuators` vector into the commands of each mirror
    pub fn split<'a>(&self, actuators: &'a [f64]) -> Result<Vec<&'a [f64]>> {
        self.check(actuators.len())?;
        let mut rest = actuators;
        Ok(self
            .mirrors
            .iter()
            .map(|m| {
                let (head, tail) = rest.split_at(m.n_actuator);
                rest = tail;
                head
            })
            .collect())
    }
    /// Concatenates the commands of each mirror into the actuator vector
    pub fn join(&self, commands: &[&[f64]]) -> Result<Vec<f64>> {
        if commands.len() != self.mirrors.len() {
            return Err(Error::Config(format!(
                "{} mirror commands for {} mirrors",
                commands.len(),
                self.mirrors.len()
            )));
        }
        for (m, c) in self.mirrors.iter().zip(commands) {
            if m.n_actuator != c.len() {
                return Err(Error::ActuatorCount {
                    expected: m.n_actuator,
                    found: c.len(),
                });
            }
        }
        Ok(commands.concat())
    }
    /// Root mean square of the commands of each mirror
    pub fn rms(&self, actuators: &[f64]) -> Result<Vec<f64>> {
        Ok(self
            .split(actuators)?
            .into_iter()
            .map(|c| {
                if c.is_empty() {
                    0f64
                } else {
                    (c.iter().map(|x| x * x).sum::<f64>() / c.len() as f64).sqrt()
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_dms() -> ActuatorLayout {
        ActuatorLayout::new().mirror("DM1", 3).mirror("DM2", 2)
    }

    #[test]
    fn ranges() {
        let layout = two_dms();
        assert_eq!(layout.n_actuator(), 5);
        assert_eq!(layout.range(0), Some(0..3));
        assert_eq!(layout.range_of("DM2"), Some(3..5));
        assert_eq!(layout.range(2), None);
        assert_eq!(layout.range_of("DM3"), None);
    }

    #[test]
    fn split_join() {
        let layout = two_dms();
        let a = vec![1., 2., 3., 4., 5.];
        let parts = layout.split(&a).unwrap();
        assert_eq!(parts, vec![&[1., 2., 3.][..], &[4., 5.][..]]);
        assert_eq!(layout.join(&parts).unwrap(), a);
        assert!(matches!(
            layout.split(&a[..4]),
            Err(Error::ActuatorCount {
                expected: 5,
                found: 4
            })
        ));
        assert!(layout.join(&[&[1., 2.][..], &[4., 5.][..]]).is_err());
    }

    #[test]
    fn rms() {
        let layout = two_dms();
        let rms = layout.rms(&[1., -1., 1., 0., 0.]).unwrap();
        assert_eq!(rms, vec![1., 0.]);
    }
}
