use crate::{Error, Field, Result};

/// Interface to the optical system forward model
///
/// The model propagates the light through the optical train (aperture,
/// aberrations, deformable mirrors, coronagraph) up to the observation plane.
/// It must be deterministic: the same actuator commands always give the same
/// electric field.
pub trait ForwardModel {
    type Error: std::error::Error + Send + Sync + 'static;
    /// Number of actuators of all the deformable mirrors
    fn n_actuator(&self) -> usize;
    /// Number of samples of the observation plane
    fn n_sample(&self) -> usize;
    /// Returns the electric field in the observation plane for the given `actuators` commands
    ///
    /// The static aberrations of the system are included only if `include_aberration` is true.
    fn evaluate(
        &mut self,
        actuators: &[f64],
        include_aberration: bool,
    ) -> std::result::Result<Field, Self::Error>;
}

impl<M: ForwardModel + ?Sized> ForwardModel for &mut M {
    type Error = M::Error;
    fn n_actuator(&self) -> usize {
        (**self).n_actuator()
    }
    fn n_sample(&self) -> usize {
        (**self).n_sample()
    }
    fn evaluate(
        &mut self,
        actuators: &[f64],
        include_aberration: bool,
    ) -> std::result::Result<Field, Self::Error> {
        (**self).evaluate(actuators, include_aberration)
    }
}

/// Evaluates the model and checks the size of the returned field
pub(crate) fn evaluate<M: ForwardModel>(
    model: &mut M,
    actuators: &[f64],
    include_aberration: bool,
) -> Result<Field> {
    let field = model
        .evaluate(actuators, include_aberration)
        .map_err(Error::model)?;
    if field.len() != model.n_sample() {
        return Err(Error::SampleCount {
            expected: model.n_sample(),
            found: field.len(),
        });
    }
    Ok(field)
}
