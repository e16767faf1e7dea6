use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Complex electric field sampled over the observation plane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field(Vec<Complex<f64>>);
impl Field {
    /// Creates a field from its complex samples
    pub fn new(samples: Vec<Complex<f64>>) -> Self {
        Self(samples)
    }
    /// Creates a field of `n_sample` null samples
    pub fn zeros(n_sample: usize) -> Self {
        Self(vec![Complex::new(0f64, 0f64); n_sample])
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn as_slice(&self) -> &[Complex<f64>] {
        self.0.as_slice()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Complex<f64>> {
        self.0.iter()
    }
    /// Returns the intensity `|E|^2` of each sample
    pub fn intensity(&self) -> Vec<f64> {
        self.0.iter().map(|e| e.norm_sqr()).collect()
    }
}
impl From<Vec<Complex<f64>>> for Field {
    fn from(samples: Vec<Complex<f64>>) -> Self {
        Self(samples)
    }
}
impl FromIterator<Complex<f64>> for Field {
    fn from_iter<I: IntoIterator<Item = Complex<f64>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl Index<usize> for Field {
    type Output = Complex<f64>;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity() {
        let field: Field = vec![Complex::new(3f64, 4f64), Complex::new(0f64, -2f64)].into();
        assert_eq!(field.intensity(), vec![25f64, 4f64]);
    }

    #[test]
    fn zeros() {
        let field = Field::zeros(3);
        assert_eq!(field.len(), 3);
        assert!(field.intensity().iter().all(|i| *i == 0f64));
    }
}
