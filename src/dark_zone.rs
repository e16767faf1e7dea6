use crate::{Error, Field, Result};
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Observation plane samples where the electric field is suppressed
///
/// The sample indices are sorted and unique and they are all checked against
/// the size of the observation plane when the dark zone is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DarkZone {
    indices: Vec<usize>,
    n_sample: usize,
}
impl DarkZone {
    /// Creates a dark zone from the `indices` of the samples of an observation plane with `n_sample` samples
    pub fn new<I>(indices: I, n_sample: usize) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        if let Some(&index) = indices.iter().find(|&&index| index >= n_sample) {
            return Err(Error::DarkZoneIndex { index, n_sample });
        }
        if indices.is_empty() {
            return Err(Error::EmptyDarkZone);
        }
        Ok(Self { indices, n_sample })
    }
    /// Creates a dark zone from a boolean mask over the observation plane
    pub fn from_mask(mask: &[bool]) -> Result<Self> {
        Self::new(
            mask.iter()
                .enumerate()
                .filter_map(|(i, &selected)| selected.then_some(i)),
            mask.len(),
        )
    }
    /// Number of samples in the dark zone
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
    /// Number of samples in the observation plane
    pub fn n_sample(&self) -> usize {
        self.n_sample
    }
    /// Length of the stacked real and imaginary dark zone field
    pub fn n_data(&self) -> usize {
        2 * self.indices.len()
    }
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
    /// Returns the dark zone as a boolean mask over the observation plane
    pub fn mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.n_sample];
        self.indices.iter().for_each(|&i| mask[i] = true);
        mask
    }
    fn check(&self, field: &Field) -> Result<()> {
        if field.len() != self.n_sample {
            Err(Error::SampleCount {
                expected: self.n_sample,
                found: field.len(),
            })
        } else {
            Ok(())
        }
    }
    /// Restricts the `field` to the dark zone and stacks the real parts followed by the imaginary parts
    pub fn stack(&self, field: &Field) -> Result<na::DVector<f64>> {
        self.check(field)?;
        let n = self.len();
        Ok(na::DVector::from_fn(self.n_data(), |i, _| {
            if i < n {
                field[self.indices[i]].re
            } else {
                field[self.indices[i - n]].im
            }
        }))
    }
    /// Mean intensity of the `field` over the dark zone
    pub fn mean_intensity(&self, field: &Field) -> Result<f64> {
        self.check(field)?;
        Ok(self
            .indices
            .iter()
            .map(|&i| field[i].norm_sqr())
            .sum::<f64>()
            / self.len() as f64)
    }
}
