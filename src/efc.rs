//! # Electric field conjugation loop
//!
//! At each iteration, the controller
//!  1. measures the electric field with the static aberrations included,
//!  2. records the actuator commands, the field and its intensity,
//!  3. stacks the real and imaginary parts of the dark zone field,
//!  4. multiplies the stacked field by the control matrix,
//!  5. removes a fraction `loop gain` of the correction from the commands.
//!
//! ```
//! use efc::{synthetic::LinearSystem, DarkZone, Efc, Probes, Regularization};
//!
//! let model = LinearSystem::fourier(8, 32, 0.1);
//! let dark_zone = DarkZone::new(18..30, 32)?;
//! let mut efc = Efc::builder(model, dark_zone)
//!     .probes(Probes::new(1e-6))
//!     .regularization(Regularization::Tikhonov { rcond: 1e-2 })
//!     .loop_gain(0.5)
//!     .build()?;
//! let history = efc.run(20)?;
//! let intensity = history.mean_intensity(efc.dark_zone())?;
//! assert!(intensity[19] < intensity[0]);
//! # Ok::<(), efc::Error>(())
//! ```

use crate::{
    model, ControlMatrix, DarkZone, Error, Field, ForwardModel, Integrate, Jacobian, Probes,
    Regularization, Result,
};
use serde::{Deserialize, Serialize};
use std::{fs::File, ops::Index, path::Path};

/// Control loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The loop has not been run yet
    Idle,
    Running,
    /// The stop condition has been met
    Converged,
    /// The loop has run all the iterations
    IterationLimitReached,
}

/// One iteration of the control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Actuator commands applied during the iteration
    pub actuators: Vec<f64>,
    /// Observation plane electric field
    pub field: Field,
    /// Observation plane intensity
    pub intensity: Vec<f64>,
}

/// Control loop history, indexed by iteration number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History(Vec<Step>);
impl History {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.0.iter()
    }
    pub fn last(&self) -> Option<&Step> {
        self.0.last()
    }
    /// Mean dark zone intensity of each iteration
    pub fn mean_intensity(&self, dark_zone: &DarkZone) -> Result<Vec<f64>> {
        self.0
            .iter()
            .map(|step| dark_zone.mean_intensity(&step.field))
            .collect()
    }
    /// Mean dark zone intensity of each iteration normalized by the `peak` intensity of the reference point spread function
    pub fn contrast(&self, dark_zone: &DarkZone, peak: f64) -> Result<Vec<f64>> {
        Ok(self
            .mean_intensity(dark_zone)?
            .into_iter()
            .map(|i| i / peak)
            .collect())
    }
    /// Writes the history to a Python pickle file
    pub fn to_pickle<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serde_pickle::to_writer(&mut File::create(path)?, self, Default::default())?;
        Ok(())
    }
}
impl Index<usize> for History {
    type Output = Step;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
impl IntoIterator for History {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
impl From<History> for Vec<Step> {
    fn from(history: History) -> Self {
        history.0
    }
}

/// [Efc] builder
pub struct EfcBuilder<M> {
    model: M,
    dark_zone: DarkZone,
    probes: Option<Probes>,
    jacobian: Option<Jacobian>,
    regularization: Option<Regularization>,
    loop_gain: Option<f64>,
    actuators: Option<Vec<f64>>,
}
impl<M: ForwardModel> EfcBuilder<M> {
    /// Sets the [probes](Probes) used to estimate the Jacobian
    pub fn probes(mut self, probes: Probes) -> Self {
        self.probes = Some(probes);
        self
    }
    /// Sets a previously estimated [Jacobian]
    ///
    /// The Jacobian takes precedence over the [probes](EfcBuilder::probes).
    pub fn jacobian(mut self, jacobian: Jacobian) -> Self {
        self.jacobian = Some(jacobian);
        self
    }
    /// Sets the control matrix [regularization](Regularization)
    pub fn regularization(mut self, regularization: Regularization) -> Self {
        self.regularization = Some(regularization);
        self
    }
    /// Sets the loop gain, in `]0,1]`
    pub fn loop_gain(mut self, loop_gain: f64) -> Self {
        self.loop_gain = Some(loop_gain);
        self
    }
    /// Sets the initial actuator commands, default: 0
    pub fn actuators(mut self, actuators: Vec<f64>) -> Self {
        self.actuators = Some(actuators);
        self
    }
    /// Checks the configuration, estimates the Jacobian if needed and computes the control matrix
    pub fn build(self) -> Result<Efc<M>> {
        let Self {
            mut model,
            dark_zone,
            probes,
            jacobian,
            regularization,
            loop_gain,
            actuators,
        } = self;
        let n_actuator = model.n_actuator();
        if dark_zone.n_sample() != model.n_sample() {
            return Err(Error::SampleCount {
                expected: model.n_sample(),
                found: dark_zone.n_sample(),
            });
        }
        let actuators = actuators.unwrap_or_else(|| vec![0f64; n_actuator]);
        if actuators.len() != n_actuator {
            return Err(Error::ActuatorCount {
                expected: n_actuator,
                found: actuators.len(),
            });
        }
        let loop_gain = loop_gain.ok_or_else(|| Error::Config("loop gain".into()))?;
        let integrator = Integrate::with_state(loop_gain, actuators)?;
        let regularization =
            regularization.ok_or_else(|| Error::Config("regularization".into()))?;
        let jacobian = match (jacobian, probes) {
            (Some(jacobian), _) => {
                jacobian.check(&dark_zone, n_actuator)?;
                jacobian
            }
            (None, Some(probes)) => Jacobian::estimate_with(&mut model, &dark_zone, &probes)?,
            (None, None) => return Err(Error::Config("probes or Jacobian".into())),
        };
        let control_matrix = ControlMatrix::new(&jacobian, regularization);
        Ok(Efc {
            model,
            dark_zone,
            jacobian,
            control_matrix,
            integrator,
            state: LoopState::Idle,
            n_step: 0,
        })
    }
}

/// Electric field conjugation controller
///
/// The controller owns the forward model and the actuator commands; the
/// commands are only modified by the control loop.
pub struct Efc<M> {
    model: M,
    dark_zone: DarkZone,
    jacobian: Jacobian,
    control_matrix: ControlMatrix,
    integrator: Integrate,
    state: LoopState,
    n_step: usize,
}
impl<M: ForwardModel> Efc<M> {
    /// Creates an EFC controller builder for the forward `model` and the `dark_zone`
    pub fn builder(model: M, dark_zone: DarkZone) -> EfcBuilder<M> {
        EfcBuilder {
            model,
            dark_zone,
            probes: None,
            jacobian: None,
            regularization: None,
            loop_gain: None,
            actuators: None,
        }
    }
    /// Current actuator commands
    pub fn actuators(&self) -> &[f64] {
        self.integrator.last()
    }
    pub fn state(&self) -> LoopState {
        self.state
    }
    pub fn dark_zone(&self) -> &DarkZone {
        &self.dark_zone
    }
    pub fn jacobian(&self) -> &Jacobian {
        &self.jacobian
    }
    pub fn control_matrix(&self) -> &ControlMatrix {
        &self.control_matrix
    }
    pub fn model(&self) -> &M {
        &self.model
    }
    pub fn into_model(self) -> M {
        self.model
    }
    /// Estimates again the Jacobian with the given `probes` and updates the control matrix
    pub fn recalibrate(&mut self, probes: &Probes) -> Result<()> {
        self.jacobian = Jacobian::estimate_with(&mut self.model, &self.dark_zone, probes)?;
        self.control_matrix =
            ControlMatrix::new(&self.jacobian, self.control_matrix.regularization());
        Ok(())
    }
    /// Updates the control matrix with a new [regularization](Regularization)
    pub fn set_regularization(&mut self, regularization: Regularization) {
        self.control_matrix = ControlMatrix::new(&self.jacobian, regularization);
    }
    /// Number of field measurements since the controller was built
    pub fn n_step(&self) -> usize {
        self.n_step
    }
    /// Measures the electric field, corrects the actuator commands and returns the measurement
    ///
    /// The loop state is set to [LoopState::Running].
    pub fn step(&mut self) -> Result<Step> {
        self.state = LoopState::Running;
        let step = self.measure()?;
        self.correct(&step)?;
        Ok(step)
    }
    fn measure(&mut self) -> Result<Step> {
        let actuators = self.integrator.last().to_vec();
        let field = model::evaluate(&mut self.model, &actuators, true)?;
        log::info!(
            "EFC iteration #{:3}: dark zone mean intensity {:.3e}",
            self.n_step,
            self.dark_zone.mean_intensity(&field)?
        );
        self.n_step += 1;
        let intensity = field.intensity();
        Ok(Step {
            actuators,
            field,
            intensity,
        })
    }
    fn correct(&mut self, step: &Step) -> Result<()> {
        let error = self.dark_zone.stack(&step.field)?;
        let correction = self.control_matrix.correction(&error);
        self.integrator.step(correction.as_slice());
        Ok(())
    }
    /// Runs the control loop for `n_iteration` iterations
    pub fn run(&mut self, n_iteration: usize) -> Result<History> {
        self.run_until(n_iteration, |_, _| false)
    }
    /// Runs the control loop for at most `n_iteration` iterations
    ///
    /// The loop stops as soon as `stop` returns true for the iteration number
    /// and the iteration [step](Step); the correction of that iteration is not
    /// applied and the loop state is set to [LoopState::Converged].
    pub fn run_until<F>(&mut self, n_iteration: usize, mut stop: F) -> Result<History>
    where
        F: FnMut(usize, &Step) -> bool,
    {
        let mut history = Vec::with_capacity(n_iteration);
        if n_iteration == 0 {
            return Ok(History(history));
        }
        self.state = LoopState::Running;
        for i in 0..n_iteration {
            let step = self.measure()?;
            if stop(i, &step) {
                history.push(step);
                self.state = LoopState::Converged;
                return Ok(History(history));
            }
            self.correct(&step)?;
            history.push(step);
        }
        self.state = LoopState::IterationLimitReached;
        Ok(History(history))
    }
}
