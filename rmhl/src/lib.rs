//! Reservoir network trained online with reward-modulated Hebbian learning
//! (RMHL) to reproduce motor trajectories.

#[macro_use]
extern crate log;

mod error;
mod learner;
mod model;
mod params;
mod random;
mod recorder;
mod reservoir;
mod trace;

pub use error::{Result, RmhlError};
pub use learner::{RmhlLearner, StepOutput};
pub use model::{Model, LEARNING_RATE, TEST_FEEDBACK_LAG};
pub use params::{Experiment, ModelParams, Toggle};
pub use random::RandomStream;
pub use recorder::{NamedArray, ResultBundle, ResultRecorder, RESULTS_FILE};
pub use reservoir::ReservoirNetwork;
pub use trace::{smooth, LowPass};
