//! # EFC
//!
//! Electric field conjugation for high-contrast wavefront control.
//!
//! The controller probes a [forward model](ForwardModel) of the optical system
//! to build the [Jacobian] of the [dark zone](DarkZone) electric field with
//! respect to the deformable mirror actuators, inverts it with a
//! [regularization](Regularization) and iterates the correction in a closed
//! loop ([Efc]).

mod config;
pub use config::{Config, RegularizationKind};

mod dark_zone;
pub use dark_zone::DarkZone;

pub mod deformable_mirror;
#[doc(no_inline)]
pub use deformable_mirror::ActuatorLayout;

mod field;
pub use field::Field;

mod model;
pub use model::ForwardModel;

pub mod jacobian;
#[doc(no_inline)]
pub use jacobian::{Jacobian, Probes};

pub mod pinv;
#[doc(no_inline)]
pub use pinv::{ControlMatrix, Regularization};

mod control;
pub use control::Integrate;

pub mod efc;
#[doc(no_inline)]
pub use efc::{Efc, History, LoopState, Step};

pub mod synthetic;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dark zone sample #{index} is outside of the {n_sample} samples observation plane")]
    DarkZoneIndex { index: usize, n_sample: usize },
    #[error("the dark zone is empty")]
    EmptyDarkZone,
    #[error("expected {expected} observation plane samples, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("expected {expected} actuators, found {found}")]
    ActuatorCount { expected: usize, found: usize },
    #[error("Jacobian is [{rows}x{cols}], expected [{expected_rows}x{expected_cols}]")]
    JacobianShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("the Jacobian has non-finite entries")]
    NonFiniteJacobian,
    #[error("loop gain must be in ]0,1], found {0}")]
    LoopGain(f64),
    #[error("at least 2 probe amplitudes are required, found {0}")]
    ProbeCount(usize),
    #[error("missing or invalid configuration entry: {0}")]
    Config(String),
    #[error("forward model evaluation failed")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to access file")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize the Jacobian")]
    Bincode(#[from] bincode::Error),
    #[error("failed to write pickle file")]
    Pickle(#[from] serde_pickle::Error),
    #[error("failed to read configuration file")]
    Csv(#[from] csv::Error),
}
impl Error {
    pub(crate) fn model<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Model(Box::new(error))
    }
}
pub type Result<T> = std::result::Result<T, Error>;
