use motor_tasks::{Algorithm, MotorTask};
use nalgebra::{DMatrix, DVector};

use crate::LowPass;

/// What the learner produced at one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Instantaneous error, squared distance to target plus cost
    pub e: f64,
    /// Cost of moving
    pub cost: f64,
    /// Observed output
    pub z: DVector<f64>,
    /// Output including the exploration perturbation
    pub z_rmhl: DVector<f64>,
    /// Output mapped into target space by the task
    pub hz: DVector<f64>,
}

/// Trains the readout with reward-modulated Hebbian learning: the
/// perturbation of the output is correlated with the deviation of the error
/// from its smoothed baseline.
#[derive(Debug, Clone)]
pub struct RmhlLearner {
    /// n_out x N
    readout: DMatrix<f64>,
    e_bar: LowPass<f64>,
    z_bar: LowPass<DVector<f64>>,
    z_rmhl_bar: LowPass<DVector<f64>>,
    learning_rate: f64,
    dt: f64,
    tau_z: f64,
    algorithm: Algorithm,
}

impl RmhlLearner {
    /// Create a learner with an all-zero readout and unprimed traces
    pub fn new(
        n_out: usize,
        size: usize,
        learning_rate: f64,
        dt: f64,
        tau_z: f64,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            readout: DMatrix::zeros(n_out, size),
            e_bar: LowPass::new(0.0),
            z_bar: LowPass::new(DVector::zeros(n_out)),
            z_rmhl_bar: LowPass::new(DVector::zeros(n_out)),
            learning_rate,
            dt,
            tau_z,
            algorithm,
        }
    }

    /// One training timestep: explore, measure the error and update the readout
    ///
    /// # Arguments
    /// r: The reservoir activity
    /// task: Supplies the output mapping, cost, exploration and modulation
    /// target: Where the mapped output should be
    /// xi_unit: One uniform draw in [0, 1) per output, scaled into the
    /// exploration perturbation
    /// trial, timestep: Position in the run, passed on to the task
    pub fn step_train<T: MotorTask>(
        &mut self,
        r: &DVector<f64>,
        task: &T,
        target: &DVector<f64>,
        xi_unit: &DVector<f64>,
        trial: usize,
        timestep: usize,
    ) -> StepOutput {
        let psi = task.psi(*self.e_bar.value(), trial, timestep);
        let xi = xi_unit.map(|u| u * psi * 2.0 - psi);
        let z_rmhl = &self.readout * r + xi;
        let z = z_rmhl.clone();
        let hz = task.h(&z);

        let c_z = self.dt / self.tau_z;
        let z_rmhl_hat = &z_rmhl - self.z_rmhl_bar.update(&z_rmhl, c_z);
        let z_hat = &z - self.z_bar.update(&z, c_z);

        let cost = task.cost(&z_hat);
        let e = (&hz - target).norm_squared() + cost;
        // the error baseline is filtered with dT itself, not dT / tau_e
        let e_hat = e - *self.e_bar.update(&e, self.dt);

        let modulation = self.learning_rate * task.phi(e_hat);
        self.readout +=
            (z_rmhl_hat * r.transpose()) * modulation * task.compensation(self.algorithm);

        StepOutput {
            e,
            cost,
            z,
            z_rmhl,
            hz,
        }
    }

    /// One testing timestep: no exploration and no update of the readout
    pub fn step_test<T: MotorTask>(
        &mut self,
        r: &DVector<f64>,
        task: &T,
        target: &DVector<f64>,
    ) -> StepOutput {
        let z_rmhl = &self.readout * r;
        let z = z_rmhl.clone();
        let hz = task.h(&z);

        self.z_rmhl_bar.filter(&z_rmhl, self.dt);
        let z_hat = &z - self.z_bar.filter(&z, self.dt / self.tau_z);

        let cost = task.cost(&z_hat);
        let e = (&hz - target).norm_squared() + cost;

        StepOutput {
            e,
            cost,
            z,
            z_rmhl,
            hz,
        }
    }

    /// The readout weights
    #[inline(always)]
    pub fn readout(&self) -> &DMatrix<f64> {
        &self.readout
    }

    /// The smoothed error
    #[inline(always)]
    pub fn e_bar(&self) -> &LowPass<f64> {
        &self.e_bar
    }

    /// The smoothed output
    #[inline(always)]
    pub fn z_bar(&self) -> &LowPass<DVector<f64>> {
        &self.z_bar
    }

    /// The smoothed perturbed output
    #[inline(always)]
    pub fn z_rmhl_bar(&self) -> &LowPass<DVector<f64>> {
        &self.z_rmhl_bar
    }

    /// Norm of the readout as defined by the task
    #[inline(always)]
    pub fn weight_norm<T: MotorTask>(&self, task: &T) -> f64 {
        task.norm(&self.readout)
    }
}
