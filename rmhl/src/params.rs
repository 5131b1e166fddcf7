use std::{
    fs,
    path::{Path, PathBuf},
};

use motor_tasks::Algorithm;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{Result, RmhlError};

/// The parameters of the RMHL reservoir model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Number of neurons in the reservoir
    #[serde(rename = "N")]
    pub reservoir_size: usize,
    /// Scales the recurrent weights, related to the spectral radius
    #[serde(alias = "lmbda")]
    pub lambda: f64,
    /// Fraction of reservoir connections that are drawn
    pub sparsity: f64,
    /// Integration timestep
    #[serde(rename = "dT")]
    pub dt: f64,
    /// Number of trials with learning, at least five
    pub n_train_trials: usize,
    /// Number of trials with a frozen readout
    pub n_test_trials: usize,
    /// Amplitude of the noise on the reservoir activities
    pub alpha: f64,
    /// Time constant of the reservoir leak
    pub tau: f64,
    /// Time constant of weight updates. RMHL does not filter its updates,
    /// the value is accepted so that configurations stay interchangeable.
    pub tau_w: f64,
    /// Time constant for smoothing the recorded error before rendering
    pub tau_e: f64,
    /// Time constant of the output traces
    pub tau_z: f64,
}

impl ModelParams {
    /// Read and validate the parameters from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let params: Self = read_json(path.as_ref())?;
        params.validate()?;

        Ok(params)
    }

    /// Check every value is in its meaningful range
    pub fn validate(&self) -> Result<()> {
        if self.reservoir_size == 0 {
            return Err(RmhlError::Config("N must be positive".to_string()));
        }
        if !(self.sparsity > 0.0 && self.sparsity <= 1.0) {
            return Err(RmhlError::Config(format!(
                "sparsity must be in (0, 1], got {}",
                self.sparsity
            )));
        }
        for (key, v) in [
            ("dT", self.dt),
            ("tau", self.tau),
            ("tau_w", self.tau_w),
            ("tau_e", self.tau_e),
            ("tau_z", self.tau_z),
        ] {
            if !(v > 0.0) {
                return Err(RmhlError::Config(format!("{} must be positive, got {}", key, v)));
            }
        }
        if !(self.alpha >= 0.0) {
            return Err(RmhlError::Config(format!("alpha must be non-negative, got {}", self.alpha)));
        }
        if !self.lambda.is_finite() {
            return Err(RmhlError::Config(format!("lambda must be finite, got {}", self.lambda)));
        }
        if self.n_train_trials < 5 {
            return Err(RmhlError::Config(format!(
                "at least 5 training trials are needed, got {}",
                self.n_train_trials
            )));
        }

        Ok(())
    }

    /// Total number of trials
    #[inline(always)]
    pub fn n_total_trials(&self) -> usize {
        self.n_train_trials + self.n_test_trials
    }

    /// Reservoir leak per timestep
    #[inline(always)]
    pub fn leak(&self) -> f64 {
        self.dt / self.tau
    }

    /// Standard deviation of the recurrent weights
    #[inline(always)]
    pub fn sigma(&self) -> f64 {
        self.lambda / (self.sparsity * self.reservoir_size as f64).sqrt()
    }
}

/// A yes/no switch as spelled in experiment files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    /// On
    Yes,
    /// Off
    No,
}

/// Describes one experiment: what task, which data, where results go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Seed of the random stream, 0 picks a fresh one
    pub rseed: u64,
    /// File holding the target trajectory
    pub dataset_file: PathBuf,
    /// The learning algorithm
    pub algorithm: Algorithm,
    /// Results are stored below this folder
    pub results_folder: PathBuf,
    /// Duration of one trial
    pub timespan: f64,
    /// 1: coordinates, 2: joint angles, 3: joint angles with cost
    pub task_type: u8,
    /// Number of arm segments
    pub n_segs: usize,
    /// Length of each arm segment
    pub arm_len: f64,
    /// Cost of moving each arm segment
    pub arm_cost: f64,
    /// Whether the rendered figure should also be opened
    pub display_plot: Toggle,
    /// File format of rendered figures
    pub plot_format: String,
}

impl Experiment {
    /// Read and validate the experiment from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let exp: Self = read_json(path.as_ref())?;
        exp.validate()?;

        Ok(exp)
    }

    /// Check every value is in its meaningful range
    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.task_type) {
            return Err(RmhlError::Config(format!(
                "task_type must be 1, 2 or 3, got {}",
                self.task_type
            )));
        }
        if !(self.timespan > 0.0) {
            return Err(RmhlError::Config(format!(
                "timespan must be positive, got {}",
                self.timespan
            )));
        }
        if self.task_type != 1 && self.n_segs == 0 {
            return Err(RmhlError::Config("arm tasks need at least one segment".to_string()));
        }
        if self.plot_format.is_empty() {
            return Err(RmhlError::Config("plot_format must not be empty".to_string()));
        }

        Ok(())
    }

    /// Dimensionality of the network output
    #[inline(always)]
    pub fn n_out(&self) -> usize {
        if self.task_type == 1 {
            2
        } else {
            self.n_segs
        }
    }

    /// Directory the results of a run with `seed` are stored in
    pub fn results_dir(&self, seed: u64) -> PathBuf {
        self.results_folder.join(format!("{}_nsegs{}", seed, self.n_segs))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(RmhlError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path)?;

    serde_json::from_str(&raw)
        .map_err(|e| RmhlError::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use std::env::temp_dir;

    use super::*;

    const MODEL_JSON: &str = r#"{
        "N": 1000, "lambda": 1.5, "sparsity": 0.1, "dT": 0.1,
        "n_train_trials": 100, "n_test_trials": 10, "alpha": 0.05,
        "tau": 10.0, "tau_w": 100.0, "tau_e": 20.0, "tau_z": 5.0
    }"#;

    const EXPERIMENT_JSON: &str = r#"{
        "rseed": 7, "dataset_file": "data/target.json", "algorithm": "RMHL",
        "results_folder": "results", "timespan": 100.0, "task_type": 3,
        "n_segs": 3, "arm_len": 0.5, "arm_cost": 0.1,
        "display_plot": "No", "plot_format": "png"
    }"#;

    #[test]
    fn parse_model_params() {
        let params: ModelParams = serde_json::from_str(MODEL_JSON).unwrap();
        params.validate().unwrap();
        assert_eq!(params.reservoir_size, 1000);
        assert_eq!(params.dt, 0.1);
        assert_eq!(params.n_total_trials(), 110);
        assert_eq!(params.leak(), 0.01);
        assert_eq!(params.sigma(), 1.5 / 10.0);
    }

    #[test]
    fn legacy_lambda_spelling() {
        let json = MODEL_JSON.replace("\"lambda\"", "\"lmbda\"");
        let params: ModelParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params.lambda, 1.5);
    }

    #[test]
    fn parse_experiment() {
        let exp: Experiment = serde_json::from_str(EXPERIMENT_JSON).unwrap();
        exp.validate().unwrap();
        assert_eq!(exp.algorithm, Algorithm::Rmhl);
        assert_eq!(exp.display_plot, Toggle::No);
        assert_eq!(exp.n_out(), 3);
        assert_eq!(exp.results_dir(7), PathBuf::from("results/7_nsegs3"));
    }

    #[test]
    fn missing_key_is_fatal() {
        let path = temp_dir().join("rmhl_params_missing_key.json");
        fs::write(&path, MODEL_JSON.replace("\"tau_z\": 5.0", "\"tau_q\": 5.0")).unwrap();
        match ModelParams::load(&path) {
            Err(RmhlError::Config(msg)) => assert!(msg.contains("tau_z")),
            other => panic!("unexpected result: {:?}", other),
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_fatal() {
        match Experiment::load(temp_dir().join("rmhl_no_such_experiment.json")) {
            Err(RmhlError::ConfigNotFound { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut params: ModelParams = serde_json::from_str(MODEL_JSON).unwrap();
        params.n_train_trials = 4;
        assert!(params.validate().is_err());

        let mut params: ModelParams = serde_json::from_str(MODEL_JSON).unwrap();
        params.sparsity = 0.0;
        assert!(params.validate().is_err());

        let mut params: ModelParams = serde_json::from_str(MODEL_JSON).unwrap();
        params.tau_z = -1.0;
        assert!(params.validate().is_err());

        let mut exp: Experiment = serde_json::from_str(EXPERIMENT_JSON).unwrap();
        exp.task_type = 4;
        assert!(exp.validate().is_err());

        let exp = EXPERIMENT_JSON.replace("\"RMHL\"", "\"FORCE\"");
        assert!(serde_json::from_str::<Experiment>(&exp).is_err());
    }
}
