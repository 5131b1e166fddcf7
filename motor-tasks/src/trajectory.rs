use std::{fs, path::Path};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::{Result, TaskError};

/// The target trajectory of one trial, one `(x, y)` point per timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Trajectory {
    /// Create a new trajectory from its coordinate series
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(TaskError::InvalidConfig(format!(
                "trajectory has {} x values but {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(TaskError::InvalidConfig("trajectory is empty".to_string()));
        }

        Ok(Self { x, y })
    }

    /// A trajectory that holds the same point for `len` timesteps
    pub fn constant(len: usize, x: f64, y: f64) -> Self {
        Self {
            x: vec![x; len],
            y: vec![y; len],
        }
    }

    /// Load a trajectory stored as `{"x": [..], "y": [..]}`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TaskError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path)?;
        let parsed: Trajectory =
            serde_json::from_str(&raw).map_err(|e| TaskError::MalformedDataset {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let traj = Self::new(parsed.x, parsed.y).map_err(|e| TaskError::MalformedDataset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("loaded {} target points from {}", traj.len(), path.display());

        Ok(traj)
    }

    /// Store the trajectory so that `load` can read it back
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|e| TaskError::MalformedDataset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json)?;

        Ok(())
    }

    /// Number of timesteps covered
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether there are no points at all
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The x coordinates
    #[inline(always)]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// The y coordinates
    #[inline(always)]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// The target point at `timestep` as a column vector
    #[inline]
    pub fn target(&self, timestep: usize) -> DVector<f64> {
        DVector::from_vec(vec![self.x[timestep], self.y[timestep]])
    }

    /// The trajectory repeated once per trial, for comparison against a whole run
    pub fn tiled(&self, n_trials: usize) -> (Vec<f64>, Vec<f64>) {
        let x = self.x.iter().copied().cycle().take(self.len() * n_trials).collect();
        let y = self.y.iter().copied().cycle().take(self.len() * n_trials).collect();

        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use std::env::temp_dir;

    use super::*;

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(Trajectory::new(vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(Trajectory::new(vec![], vec![]).is_err());
    }

    #[test]
    fn save_and_load() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let path = temp_dir().join("motor_tasks_trajectory_save_and_load.json");
        let traj = Trajectory::new(vec![0.0, 0.5, 1.0], vec![1.0, 0.5, 0.0]).unwrap();
        traj.save(&path).unwrap();
        let loaded = Trajectory::load(&path).unwrap();
        assert_eq!(traj, loaded);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_dataset() {
        let path = temp_dir().join("motor_tasks_does_not_exist.json");
        match Trajectory::load(&path) {
            Err(TaskError::DatasetNotFound { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn malformed_dataset() {
        let path = temp_dir().join("motor_tasks_malformed.json");
        fs::write(&path, "{\"x\": [1.0, 2.0], \"y\": [1.0]}").unwrap();
        match Trajectory::load(&path) {
            Err(TaskError::MalformedDataset { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn tiled_repeats_per_trial() {
        let traj = Trajectory::new(vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
        let (x, y) = traj.tiled(3);
        assert_eq!(x, vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert_eq!(y, vec![3.0, 4.0, 3.0, 4.0, 3.0, 4.0]);
        assert_eq!(traj.target(1), DVector::from_vec(vec![2.0, 4.0]));
    }
}
