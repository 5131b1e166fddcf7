use std::{fmt, str::FromStr};

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{forward_kinematics, Modulation, Result, TaskError};

/// The learning algorithm a task compensates its updates for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Reward-modulated Hebbian learning
    #[serde(rename = "RMHL")]
    Rmhl,
}

impl FromStr for Algorithm {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RMHL" => Ok(Algorithm::Rmhl),
            other => Err(TaskError::InvalidConfig(format!("unknown algorithm: {}", other))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Rmhl => write!(f, "RMHL"),
        }
    }
}

/// The capabilities the learner needs from a task
pub trait MotorTask {
    /// Dimensionality of the network output
    fn n_out(&self) -> usize;

    /// Map the network output to the observed 2D endpoint
    fn h(&self, z: &DVector<f64>) -> DVector<f64>;

    /// Cost of moving, given the output deviation from its smoothed baseline
    fn cost(&self, z_hat: &DVector<f64>) -> f64;

    /// Amplitude of the exploration noise added to the output
    fn psi(&self, e_bar: f64, trial: usize, timestep: usize) -> f64;

    /// Nonlinearity applied to the error deviation
    fn phi(&self, e_hat: f64) -> f64;

    /// Fixed correction factor of the update for the given algorithm
    fn compensation(&self, algorithm: Algorithm) -> f64;

    /// Norm of the readout matrix as it gets recorded
    #[inline(always)]
    fn norm(&self, w: &DMatrix<f64>) -> f64 {
        w.norm()
    }
}

/// Couples the exploration amplitude to the smoothed error, so that the
/// output explores widely while the error is large
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exploration {
    /// Amplitude at zero error
    pub min: f64,
    /// Scales the square root of the smoothed error
    pub gain: f64,
    /// Upper bound of the amplitude
    pub max: f64,
}

impl Default for Exploration {
    fn default() -> Self {
        Self {
            min: 0.001,
            gain: 0.5,
            max: 0.5,
        }
    }
}

impl Exploration {
    /// The amplitude for the current smoothed error
    #[inline]
    pub fn amplitude(&self, e_bar: f64) -> f64 {
        (self.min + self.gain * e_bar.max(0.0).sqrt()).min(self.max)
    }
}

/// The network output is directly the 2D position
#[derive(Debug, Clone, Default)]
pub struct CoordinateTask {
    /// Exploration schedule
    pub exploration: Exploration,
}

impl MotorTask for CoordinateTask {
    #[inline(always)]
    fn n_out(&self) -> usize {
        2
    }

    #[inline(always)]
    fn h(&self, z: &DVector<f64>) -> DVector<f64> {
        z.clone()
    }

    #[inline(always)]
    fn cost(&self, _z_hat: &DVector<f64>) -> f64 {
        0.0
    }

    #[inline(always)]
    fn psi(&self, e_bar: f64, _trial: usize, _timestep: usize) -> f64 {
        self.exploration.amplitude(e_bar)
    }

    #[inline(always)]
    fn phi(&self, e_hat: f64) -> f64 {
        Modulation::Linear.apply(e_hat)
    }

    #[inline(always)]
    fn compensation(&self, algorithm: Algorithm) -> f64 {
        match algorithm {
            Algorithm::Rmhl => 2.0 / self.n_out() as f64,
        }
    }
}

/// The network output is the set of joint angles of a planar arm
#[derive(Debug, Clone)]
pub struct ArmTask {
    n_segs: usize,
    seg_len: f64,
    seg_cost: f64,
    /// Exploration schedule
    pub exploration: Exploration,
}

impl ArmTask {
    /// Create a new arm with `n_segs` segments of length `seg_len`, each
    /// costing `seg_cost` per squared unit of angular deviation
    pub fn new(n_segs: usize, seg_len: f64, seg_cost: f64) -> Result<Self> {
        if n_segs == 0 {
            return Err(TaskError::InvalidConfig("an arm needs at least one segment".to_string()));
        }
        if !(seg_len > 0.0) {
            return Err(TaskError::InvalidConfig(format!(
                "segment length must be positive, got {}",
                seg_len
            )));
        }
        if !(seg_cost >= 0.0) {
            return Err(TaskError::InvalidConfig(format!(
                "segment cost must be non-negative, got {}",
                seg_cost
            )));
        }

        Ok(Self {
            n_segs,
            seg_len,
            seg_cost,
            exploration: Exploration::default(),
        })
    }
}

impl MotorTask for ArmTask {
    #[inline(always)]
    fn n_out(&self) -> usize {
        self.n_segs
    }

    #[inline(always)]
    fn h(&self, z: &DVector<f64>) -> DVector<f64> {
        forward_kinematics(z, self.seg_len)
    }

    #[inline]
    fn cost(&self, z_hat: &DVector<f64>) -> f64 {
        self.seg_cost * z_hat.norm_squared()
    }

    #[inline(always)]
    fn psi(&self, e_bar: f64, _trial: usize, _timestep: usize) -> f64 {
        self.exploration.amplitude(e_bar)
    }

    #[inline(always)]
    fn phi(&self, e_hat: f64) -> f64 {
        Modulation::Saturating.apply(e_hat)
    }

    #[inline(always)]
    fn compensation(&self, algorithm: Algorithm) -> f64 {
        match algorithm {
            Algorithm::Rmhl => 2.0 / self.n_out() as f64,
        }
    }
}

/// The task a model is built for, selected once from its numeric type tag
#[derive(Debug, Clone)]
pub enum Task {
    /// Task #1: reach with 2D coordinates
    Coordinate(CoordinateTask),
    /// Task #2: reach with the joint angles of an arm
    JointAngle(ArmTask),
    /// Task #3: reach with the joint angles of an arm that pays for moving
    CostedArm(ArmTask),
}

impl Task {
    /// Select the task for `task_type` 1, 2 or 3.
    /// Arm parameters are ignored by task 1 and the cost by task 2.
    pub fn from_type(task_type: u8, n_segs: usize, arm_len: f64, arm_cost: f64) -> Result<Self> {
        let task = match task_type {
            1 => Task::Coordinate(CoordinateTask::default()),
            2 => Task::JointAngle(ArmTask::new(n_segs, arm_len, 0.0)?),
            3 => Task::CostedArm(ArmTask::new(n_segs, arm_len, arm_cost)?),
            other => {
                return Err(TaskError::InvalidConfig(format!("unknown task type: {}", other)))
            }
        };
        debug!("selected task: {:?}", task);

        Ok(task)
    }

    /// The numeric type tag of the task
    #[inline(always)]
    pub fn type_tag(&self) -> u8 {
        match self {
            Task::Coordinate(_) => 1,
            Task::JointAngle(_) => 2,
            Task::CostedArm(_) => 3,
        }
    }

    #[inline(always)]
    fn inner(&self) -> &dyn MotorTask {
        match self {
            Task::Coordinate(t) => t as &dyn MotorTask,
            Task::JointAngle(t) | Task::CostedArm(t) => t as &dyn MotorTask,
        }
    }
}

impl MotorTask for Task {
    #[inline(always)]
    fn n_out(&self) -> usize {
        self.inner().n_out()
    }

    #[inline(always)]
    fn h(&self, z: &DVector<f64>) -> DVector<f64> {
        self.inner().h(z)
    }

    #[inline(always)]
    fn cost(&self, z_hat: &DVector<f64>) -> f64 {
        self.inner().cost(z_hat)
    }

    #[inline(always)]
    fn psi(&self, e_bar: f64, trial: usize, timestep: usize) -> f64 {
        self.inner().psi(e_bar, trial, timestep)
    }

    #[inline(always)]
    fn phi(&self, e_hat: f64) -> f64 {
        self.inner().phi(e_hat)
    }

    #[inline(always)]
    fn compensation(&self, algorithm: Algorithm) -> f64 {
        self.inner().compensation(algorithm)
    }

    #[inline(always)]
    fn norm(&self, w: &DMatrix<f64>) -> f64 {
        self.inner().norm(w)
    }
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn task_selection() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let t = Task::from_type(1, 7, 1.0, 1.0).unwrap();
        assert_eq!(t.type_tag(), 1);
        assert_eq!(t.n_out(), 2);

        let t = Task::from_type(2, 3, 0.5, 1.0).unwrap();
        assert_eq!(t.type_tag(), 2);
        assert_eq!(t.n_out(), 3);

        assert!(Task::from_type(4, 3, 0.5, 1.0).is_err());
        assert!(Task::from_type(2, 0, 0.5, 1.0).is_err());
    }

    #[test]
    fn coordinate_task_is_identity_without_cost() {
        let t = Task::from_type(1, 1, 1.0, 1.0).unwrap();
        let z = DVector::from_vec(vec![0.25, -0.75]);
        assert_eq!(t.h(&z), z);
        assert_eq!(t.cost(&z), 0.0);
        assert_eq!(t.compensation(Algorithm::Rmhl), 1.0);
    }

    #[test]
    fn only_costed_arm_pays_for_moving() {
        let z_hat = DVector::from_vec(vec![0.1, -0.2]);
        let joint = Task::from_type(2, 2, 1.0, 2.0).unwrap();
        let costed = Task::from_type(3, 2, 1.0, 2.0).unwrap();
        assert_eq!(joint.cost(&z_hat), 0.0);
        assert_eq!(round(costed.cost(&z_hat), 9), 0.1);
    }

    #[test]
    fn exploration_grows_with_error_and_saturates() {
        let t = Task::from_type(1, 1, 1.0, 0.0).unwrap();
        let low = t.psi(0.0, 0, 0);
        let mid = t.psi(0.04, 0, 0);
        let high = t.psi(1e6, 0, 0);
        assert_eq!(low, 0.001);
        assert!(mid > low);
        assert_eq!(high, 0.5);
        // negative smoothed errors cannot occur from squared errors, but must not produce NaN
        assert_eq!(t.psi(-1.0, 0, 0), 0.001);
    }

    #[test]
    fn norm_is_frobenius() {
        let t = Task::from_type(1, 1, 1.0, 0.0).unwrap();
        let w = DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 4.0]);
        assert_eq!(t.norm(&w), 5.0);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!("RMHL".parse::<Algorithm>().unwrap(), Algorithm::Rmhl);
        assert!("FORCE".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::Rmhl.to_string(), "RMHL");
    }
}
