//! This crate provides the motor tasks an RMHL reservoir is trained on:
//! the target trajectory and the task specific output mapping, cost,
//! exploration and modulation functions.

#![deny(unused_imports)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod error;
mod kinematics;
mod modulation;
mod task;
mod trajectory;
mod utils;

pub use error::{Result, TaskError};
pub use kinematics::forward_kinematics;
pub use modulation::Modulation;
pub use task::{Algorithm, ArmTask, CoordinateTask, Exploration, MotorTask, Task};
pub use trajectory::Trajectory;
pub use utils::round_up;
