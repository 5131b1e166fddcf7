use std::{path::PathBuf, time::Instant};

use motor_tasks::{MotorTask, Task, Trajectory};
use nalgebra::DVector;

use crate::{
    Experiment, ModelParams, RandomStream, ReservoirNetwork, Result, ResultBundle,
    ResultRecorder, RmhlError, RmhlLearner,
};

/// Learning rate of the readout update
pub const LEARNING_RATE: f64 = 0.0005;

/// While testing, the reservoir is fed the output recorded this many trials
/// earlier instead of its live output
pub const TEST_FEEDBACK_LAG: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Built,
    Trained,
    Tested,
}

impl Phase {
    fn describe(&self) -> &'static str {
        match self {
            Phase::Built => "untrained",
            Phase::Trained => "trained",
            Phase::Tested => "already tested",
        }
    }
}

/// Runs the training and testing trials of one RMHL reservoir and owns all
/// of its state
#[derive(Debug)]
pub struct Model {
    params: ModelParams,
    experiment: Experiment,
    task: Task,
    target: Trajectory,
    seed: u64,
    n_timesteps: usize,
    rng: RandomStream,
    reservoir: ReservoirNetwork,
    learner: RmhlLearner,
    recorder: ResultRecorder,
    /// The output fed back into the reservoir at the next timestep
    z: DVector<f64>,
    phase: Phase,
}

impl Model {
    /// Build a model from its configuration, loading the task and its target
    /// trajectory as the experiment describes them
    pub fn from_config(params: ModelParams, experiment: Experiment) -> Result<Self> {
        let task = Task::from_type(
            experiment.task_type,
            experiment.n_segs,
            experiment.arm_len,
            experiment.arm_cost,
        )?;
        let target = Trajectory::load(&experiment.dataset_file)?;

        Self::new(params, experiment, task, target)
    }

    /// Create a new model and wire its reservoir.
    /// The random stream is seeded here, exactly once.
    pub fn new(
        params: ModelParams,
        experiment: Experiment,
        task: Task,
        target: Trajectory,
    ) -> Result<Self> {
        params.validate()?;
        experiment.validate()?;
        if task.type_tag() != experiment.task_type {
            return Err(RmhlError::Config(format!(
                "task of type {} given for an experiment of task_type {}",
                task.type_tag(),
                experiment.task_type
            )));
        }
        let n_out = task.n_out();
        if n_out != experiment.n_out() {
            return Err(RmhlError::DimensionMismatch {
                what: "network output",
                expected: experiment.n_out(),
                found: n_out,
            });
        }

        let n_timesteps = (experiment.timespan / params.dt) as usize;
        if n_timesteps == 0 {
            return Err(RmhlError::Config(format!(
                "timespan {} is shorter than one timestep of {}",
                experiment.timespan, params.dt
            )));
        }
        if target.len() != n_timesteps {
            return Err(RmhlError::DimensionMismatch {
                what: "target trajectory",
                expected: n_timesteps,
                found: target.len(),
            });
        }

        let seed = match experiment.rseed {
            0 => RandomStream::entropy_seed(),
            seed => seed,
        };
        info!("Seed: {}", seed);

        let mut rng = RandomStream::new(seed);
        let reservoir = ReservoirNetwork::build(
            params.reservoir_size,
            params.sparsity,
            params.sigma(),
            n_out,
            &mut rng,
        );
        let learner = RmhlLearner::new(
            n_out,
            params.reservoir_size,
            LEARNING_RATE,
            params.dt,
            params.tau_z,
            experiment.algorithm,
        );
        let recorder = ResultRecorder::new(n_out, params.n_total_trials(), n_timesteps);

        Ok(Self {
            params,
            experiment,
            task,
            target,
            seed,
            n_timesteps,
            rng,
            reservoir,
            learner,
            recorder,
            z: DVector::zeros(n_out),
            phase: Phase::Built,
        })
    }

    /// Train the readout online over all training trials
    pub fn train(&mut self) -> Result<()> {
        if self.phase != Phase::Built {
            return Err(RmhlError::OutOfOrder {
                requested: "train",
                state: self.phase.describe(),
            });
        }

        info!("Training");
        let t0 = Instant::now();
        let leak = self.params.leak();
        let n_out = self.task.n_out();
        let mut warned = false;

        for trial in 0..self.params.n_train_trials {
            for t in 0..self.n_timesteps {
                let noise = self.rng.symmetric_vec(self.params.reservoir_size, self.params.alpha);
                self.reservoir.advance(&self.z, leak, Some(&noise));

                let xi_unit = self.rng.uniform_vec(n_out);
                let target = self.target.target(t);
                let out = self.learner.step_train(
                    self.reservoir.activity(),
                    &self.task,
                    &target,
                    &xi_unit,
                    trial,
                    t,
                );

                let norm = self.learner.weight_norm(&self.task);
                if !norm.is_finite() && !warned {
                    warn!("readout norm became {} in trial {} at timestep {}", norm, trial, t);
                    warned = true;
                }
                self.recorder.record(trial, t, &out);
                self.recorder.record_norm(trial, t, norm);
                self.z = out.z;
            }
            debug!("trial {}: mean error {}", trial, self.recorder.trial_mean_error(trial));
        }

        info!("Training done in {}ms", t0.elapsed().as_millis());
        self.phase = Phase::Trained;

        Ok(())
    }

    /// Run the testing trials with a frozen readout.
    /// The reservoir is driven by the output recorded `TEST_FEEDBACK_LAG`
    /// trials earlier.
    pub fn test(&mut self) -> Result<()> {
        if self.phase != Phase::Trained {
            return Err(RmhlError::OutOfOrder {
                requested: "test",
                state: self.phase.describe(),
            });
        }

        info!("Testing");
        let t0 = Instant::now();
        let leak = self.params.leak();

        for trial in self.params.n_train_trials..self.params.n_total_trials() {
            for t in 0..self.n_timesteps {
                let feedback = self.recorder.z_at(trial - TEST_FEEDBACK_LAG, t);
                self.reservoir.advance(&feedback, leak, None);

                let target = self.target.target(t);
                let out = self.learner.step_test(self.reservoir.activity(), &self.task, &target);
                self.recorder.record(trial, t, &out);
                self.z = out.z;
            }
            debug!("trial {}: mean error {}", trial, self.recorder.trial_mean_error(trial));
        }

        info!("Testing done in {}ms", t0.elapsed().as_millis());
        self.phase = Phase::Tested;

        Ok(())
    }

    /// Train, then test
    pub fn run(&mut self) -> Result<()> {
        self.train()?;
        self.test()
    }

    /// Persist the recorded series into the results directory
    pub fn save(&self) -> Result<PathBuf> {
        info!("Saving results");
        self.export().save(self.results_dir())
    }

    /// Everything recorded so far
    #[inline(always)]
    pub fn export(&self) -> ResultBundle {
        self.recorder.export()
    }

    /// Directory the results of this run belong in
    #[inline(always)]
    pub fn results_dir(&self) -> PathBuf {
        self.experiment.results_dir(self.seed)
    }

    /// The seed actually used
    #[inline(always)]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Timesteps per trial
    #[inline(always)]
    pub fn n_timesteps(&self) -> usize {
        self.n_timesteps
    }

    /// The model parameters
    #[inline(always)]
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// The experiment description
    #[inline(always)]
    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    /// The task being learned
    #[inline(always)]
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// The target trajectory of every trial
    #[inline(always)]
    pub fn target(&self) -> &Trajectory {
        &self.target
    }

    /// The reservoir
    #[inline(always)]
    pub fn reservoir(&self) -> &ReservoirNetwork {
        &self.reservoir
    }

    /// The learner holding the readout
    #[inline(always)]
    pub fn learner(&self) -> &RmhlLearner {
        &self.learner
    }

    /// The recorded series
    #[inline(always)]
    pub fn recorder(&self) -> &ResultRecorder {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use std::env::temp_dir;

    use motor_tasks::Algorithm;

    use super::*;
    use crate::Toggle;

    fn params() -> ModelParams {
        ModelParams {
            reservoir_size: 30,
            lambda: 1.5,
            sparsity: 0.2,
            dt: 0.5,
            n_train_trials: 5,
            n_test_trials: 2,
            alpha: 0.05,
            tau: 10.0,
            tau_w: 100.0,
            tau_e: 20.0,
            tau_z: 5.0,
        }
    }

    fn experiment() -> Experiment {
        Experiment {
            rseed: 17,
            dataset_file: temp_dir().join("rmhl_model_unused_dataset.json"),
            algorithm: Algorithm::Rmhl,
            results_folder: temp_dir().join("rmhl_model_results"),
            timespan: 10.0,
            task_type: 1,
            n_segs: 2,
            arm_len: 1.0,
            arm_cost: 0.0,
            display_plot: Toggle::No,
            plot_format: "png".to_string(),
        }
    }

    fn coordinate() -> Task {
        Task::from_type(1, 2, 1.0, 0.0).unwrap()
    }

    #[test]
    fn target_length_must_match_timesteps() {
        let target = Trajectory::constant(19, 0.0, 0.0);
        match Model::new(params(), experiment(), coordinate(), target) {
            Err(RmhlError::DimensionMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 20);
                assert_eq!(found, 19);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn task_must_match_experiment() {
        let target = Trajectory::constant(20, 0.0, 0.0);
        let arm = Task::from_type(2, 2, 1.0, 0.0).unwrap();
        assert!(Model::new(params(), experiment(), arm, target).is_err());
    }

    #[test]
    fn phases_run_in_order() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let target = Trajectory::constant(20, 0.2, 0.1);
        let mut model = Model::new(params(), experiment(), coordinate(), target).unwrap();
        assert!(model.test().is_err());
        model.train().unwrap();
        assert!(model.train().is_err());
        model.test().unwrap();
        assert!(model.test().is_err());
    }

    #[test]
    fn zero_seed_picks_a_fresh_one() {
        let mut exp = experiment();
        exp.rseed = 0;
        let target = Trajectory::constant(20, 0.0, 0.0);
        let model = Model::new(params(), exp, coordinate(), target).unwrap();
        assert_ne!(model.seed(), 0);
        assert!(model.results_dir().ends_with(format!("{}_nsegs2", model.seed())));
    }

    #[test]
    fn norm_is_only_recorded_while_training() {
        let target = Trajectory::constant(20, 0.2, 0.1);
        let mut model = Model::new(params(), experiment(), coordinate(), target).unwrap();
        model.run().unwrap();

        let bundle = model.export();
        for t in 0..model.n_timesteps() {
            assert_eq!(bundle.w_norm.get(&[5, t]), 0.0);
            assert_eq!(bundle.w_norm.get(&[6, t]), 0.0);
        }
        assert!(bundle.w_norm.get(&[4, 19]) > 0.0);
    }
}
