use crate::{Error, Probes, Regularization, Result};
use serde::Deserialize;
use std::{env, path::Path, str::FromStr};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegularizationKind {
    #[default]
    Tikhonov,
    Truncated,
}
impl FromStr for RegularizationKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tikhonov" => Ok(Self::Tikhonov),
            "truncated" => Ok(Self::Truncated),
            _ => Err(Error::Config(format!("regularization: {s}"))),
        }
    }
}

/// EFC run parameters
///
/// The parameters are read either from the environment:
///  - `EFC_EPSILON`: probe amplitude,
///  - `EFC_N_PROBE`: number of probe amplitudes (optional, default: 2),
///  - `EFC_RCOND`: regularization cutoff,
///  - `EFC_REGULARIZATION`: `tikhonov` or `truncated` (optional, default: `tikhonov`),
///  - `EFC_LOOP_GAIN`: loop gain,
///  - `EFC_N_ITERATION`: number of iterations,
///
/// or from one row of a CSV file with the headers `epsilon`, `probes`, `rcond`,
/// `regularization`, `loop gain` and `iterations`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub epsilon: f64,
    #[serde(rename = "probes", default = "two")]
    pub n_probe: usize,
    pub rcond: f64,
    #[serde(default)]
    pub regularization: RegularizationKind,
    #[serde(rename = "loop gain")]
    pub loop_gain: f64,
    #[serde(rename = "iterations")]
    pub n_iteration: usize,
}
fn two() -> usize {
    2
}

fn var<T: FromStr>(key: &str) -> Result<T> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| Error::Config(key.to_string()))
}
fn var_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| Error::Config(key.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads the parameters from the `EFC_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            epsilon: var("EFC_EPSILON")?,
            n_probe: var_or("EFC_N_PROBE", 2)?,
            rcond: var("EFC_RCOND")?,
            regularization: var_or("EFC_REGULARIZATION", RegularizationKind::default())?,
            loop_gain: var("EFC_LOOP_GAIN")?,
            n_iteration: var("EFC_N_ITERATION")?,
        })
    }
    /// Reads the parameters from the row #`index` of a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, index: usize) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)?;
        let config: Config = rdr
            .deserialize()
            .nth(index)
            .ok_or_else(|| Error::Config(format!("CSV row #{index}")))??;
        Ok(config)
    }
    pub fn probes(&self) -> Probes {
        Probes::new(self.epsilon).n_probe(self.n_probe)
    }
    pub fn regularization(&self) -> Regularization {
        match self.regularization {
            RegularizationKind::Tikhonov => Regularization::Tikhonov { rcond: self.rcond },
            RegularizationKind::Truncated => Regularization::Truncated { rcond: self.rcond },
        }
    }
}
