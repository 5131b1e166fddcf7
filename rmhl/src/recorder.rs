use std::{
    fs,
    path::{Path, PathBuf},
};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::{Result, RmhlError, StepOutput};

/// File name of the result bundle inside the results directory
pub const RESULTS_FILE: &str = "Data.json";

/// Dense row-major array of fixed shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArray {
    shape: Vec<usize>,
    #[serde(with = "non_finite")]
    data: Vec<f64>,
}

impl NamedArray {
    /// An all-zero array
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
        }
    }

    fn offset(&self, idx: &[usize]) -> usize {
        assert_eq!(idx.len(), self.shape.len(), "index rank does not match array rank");
        idx.iter().zip(self.shape.iter()).fold(0, |acc, (i, dim)| {
            assert!(i < dim, "index {} out of bounds for dimension of size {}", i, dim);
            acc * dim + i
        })
    }

    /// Value at the multi-index `idx`
    #[inline]
    pub fn get(&self, idx: &[usize]) -> f64 {
        self.data[self.offset(idx)]
    }

    /// Overwrite the value at the multi-index `idx`
    #[inline]
    pub fn set(&mut self, idx: &[usize], v: f64) {
        let offset = self.offset(idx);
        self.data[offset] = v;
    }

    /// The dimensions
    #[inline(always)]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// All values in row-major order
    #[inline(always)]
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// JSON has no representation of NaN and infinities. NaN is stored as null,
/// the infinities as the strings "inf" and "-inf".
mod non_finite {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(f64),
        Named(String),
    }

    fn encode(v: f64) -> Option<Entry> {
        if v.is_finite() {
            Some(Entry::Number(v))
        } else if v == f64::INFINITY {
            Some(Entry::Named(INF.to_string()))
        } else if v == f64::NEG_INFINITY {
            Some(Entry::Named(NEG_INF.to_string()))
        } else {
            None
        }
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(data: &Vec<f64>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(data.iter().map(|v| encode(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let vals: Vec<Option<Entry>> = Vec::deserialize(d)?;
        vals.into_iter()
            .map(|v| match v {
                None => Ok(f64::NAN),
                Some(Entry::Number(v)) => Ok(v),
                Some(Entry::Named(name)) if name == INF => Ok(f64::INFINITY),
                Some(Entry::Named(name)) if name == NEG_INF => Ok(f64::NEG_INFINITY),
                Some(Entry::Named(name)) => Err(D::Error::custom(format!("unknown value {:?}", name))),
            })
            .collect()
    }
}

/// Every recorded series of a run, as persisted for the renderer.
/// Saving and loading reproduces every finite value exactly and keeps NaN and
/// the infinities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    /// (trials, timesteps)
    pub error: NamedArray,
    /// (trials, timesteps)
    pub cost: NamedArray,
    /// (n_out, trials, timesteps)
    pub z: NamedArray,
    /// (n_out, trials, timesteps)
    #[serde(rename = "z_RMHL")]
    pub z_rmhl: NamedArray,
    /// (2, trials, timesteps)
    pub hz: NamedArray,
    /// Readout norm, (trials, timesteps), zero where it was not recorded
    #[serde(rename = "W_RMHL")]
    pub w_norm: NamedArray,
}

impl ResultBundle {
    /// Write the bundle into `dir`, returning the path of the file
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(RESULTS_FILE);
        let json = serde_json::to_vec(self)?;
        fs::write(&path, json)?;
        info!("saved results to {}", path.display());

        Ok(path)
    }

    /// Read a bundle written by `save`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RmhlError::ResultsNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path)?;

        Ok(serde_json::from_str(&raw)?)
    }

    /// Number of trials recorded
    #[inline(always)]
    pub fn n_trials(&self) -> usize {
        self.error.shape()[0]
    }

    /// Number of timesteps per trial
    #[inline(always)]
    pub fn n_timesteps(&self) -> usize {
        self.error.shape()[1]
    }

    /// Dimensionality of the network output
    #[inline(always)]
    pub fn n_out(&self) -> usize {
        self.z.shape()[0]
    }
}

/// Collects the per-timestep series of a run into arrays sized up front
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    n_out: usize,
    bundle: ResultBundle,
}

impl ResultRecorder {
    /// Allocate every series for `n_trials` trials of `n_timesteps` steps
    pub fn new(n_out: usize, n_trials: usize, n_timesteps: usize) -> Self {
        let bundle = ResultBundle {
            error: NamedArray::zeros(&[n_trials, n_timesteps]),
            cost: NamedArray::zeros(&[n_trials, n_timesteps]),
            z: NamedArray::zeros(&[n_out, n_trials, n_timesteps]),
            z_rmhl: NamedArray::zeros(&[n_out, n_trials, n_timesteps]),
            hz: NamedArray::zeros(&[2, n_trials, n_timesteps]),
            w_norm: NamedArray::zeros(&[n_trials, n_timesteps]),
        };

        Self { n_out, bundle }
    }

    /// Store the output of one timestep
    pub fn record(&mut self, trial: usize, timestep: usize, out: &StepOutput) {
        self.bundle.error.set(&[trial, timestep], out.e);
        self.bundle.cost.set(&[trial, timestep], out.cost);
        for i in 0..self.n_out {
            self.bundle.z.set(&[i, trial, timestep], out.z[i]);
            self.bundle.z_rmhl.set(&[i, trial, timestep], out.z_rmhl[i]);
        }
        for i in 0..2 {
            self.bundle.hz.set(&[i, trial, timestep], out.hz[i]);
        }
    }

    /// Store the readout norm of one training timestep
    #[inline]
    pub fn record_norm(&mut self, trial: usize, timestep: usize, norm: f64) {
        self.bundle.w_norm.set(&[trial, timestep], norm);
    }

    /// The output recorded at the given position
    pub fn z_at(&self, trial: usize, timestep: usize) -> DVector<f64> {
        DVector::from_iterator(
            self.n_out,
            (0..self.n_out).map(|i| self.bundle.z.get(&[i, trial, timestep])),
        )
    }

    /// The error recorded at the given position
    #[inline]
    pub fn error_at(&self, trial: usize, timestep: usize) -> f64 {
        self.bundle.error.get(&[trial, timestep])
    }

    /// Mean error over one trial
    pub fn trial_mean_error(&self, trial: usize) -> f64 {
        let n_timesteps = self.bundle.n_timesteps();
        (0..n_timesteps).map(|t| self.error_at(trial, t)).sum::<f64>() / n_timesteps as f64
    }

    /// Everything recorded so far
    #[inline(always)]
    pub fn export(&self) -> ResultBundle {
        self.bundle.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::env::temp_dir;

    use super::*;
    use crate::RandomStream;

    fn output(v: f64) -> StepOutput {
        StepOutput {
            e: v,
            cost: v / 10.0,
            z: DVector::from_vec(vec![v, -v, 2.0 * v]),
            z_rmhl: DVector::from_vec(vec![v + 1.0, -v, 2.0 * v]),
            hz: DVector::from_vec(vec![v, v * v]),
        }
    }

    #[test]
    fn preallocated_shapes() {
        let rec = ResultRecorder::new(3, 4, 5);
        let bundle = rec.export();
        assert_eq!(bundle.error.shape(), &[4, 5]);
        assert_eq!(bundle.z.shape(), &[3, 4, 5]);
        assert_eq!(bundle.z_rmhl.shape(), &[3, 4, 5]);
        assert_eq!(bundle.hz.shape(), &[2, 4, 5]);
        assert_eq!(bundle.w_norm.shape(), &[4, 5]);
        assert_eq!(bundle.n_out(), 3);
        assert_eq!(bundle.n_trials(), 4);
        assert_eq!(bundle.n_timesteps(), 5);
    }

    #[test]
    fn records_at_exact_coordinates() {
        let mut rec = ResultRecorder::new(3, 4, 5);
        rec.record(2, 3, &output(0.5));
        rec.record_norm(2, 3, 7.0);

        let bundle = rec.export();
        assert_eq!(bundle.error.get(&[2, 3]), 0.5);
        assert_eq!(bundle.error.get(&[3, 2]), 0.0);
        assert_eq!(bundle.cost.get(&[2, 3]), 0.05);
        assert_eq!(bundle.z_rmhl.get(&[0, 2, 3]), 1.5);
        assert_eq!(bundle.hz.get(&[1, 2, 3]), 0.25);
        assert_eq!(bundle.w_norm.get(&[2, 3]), 7.0);
        assert_eq!(rec.z_at(2, 3), DVector::from_vec(vec![0.5, -0.5, 1.0]));
        assert_eq!(rec.trial_mean_error(2), 0.1);
    }

    #[test]
    #[should_panic]
    fn out_of_range_is_a_bug() {
        let mut rec = ResultRecorder::new(2, 2, 2);
        rec.record_norm(2, 0, 1.0);
    }

    #[test]
    fn save_and_load() {
        let mut rec = ResultRecorder::new(3, 2, 3);
        rec.record(0, 0, &output(0.1));
        rec.record(1, 2, &output(1.0 / 3.0));
        rec.record_norm(1, 2, f64::NAN);

        let dir = temp_dir().join("rmhl_recorder_save_and_load");
        let path = rec.export().save(&dir).unwrap();
        assert!(path.ends_with(RESULTS_FILE));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"z_RMHL\""));
        assert!(raw.contains("\"W_RMHL\""));

        let loaded = ResultBundle::load(&path).unwrap();
        assert_eq!(loaded.error, rec.export().error);
        assert_eq!(loaded.z, rec.export().z);
        assert!(loaded.w_norm.get(&[1, 2]).is_nan());
        assert_eq!(loaded.w_norm.get(&[0, 0]), 0.0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn saved_values_load_exactly() {
        let mut rng = RandomStream::new(7);
        let mut rec = ResultRecorder::new(3, 4, 50);
        for trial in 0..4 {
            for t in 0..50 {
                let v = rng.normal() * 10f64.powi((t % 9) as i32 - 4);
                rec.record(trial, t, &output(v));
                rec.record_norm(trial, t, rng.uniform() / 3.0);
            }
        }
        rec.record_norm(3, 49, f64::INFINITY);
        rec.record_norm(3, 48, f64::NEG_INFINITY);

        let dir = temp_dir().join("rmhl_recorder_exact");
        let path = rec.export().save(&dir).unwrap();
        let loaded = ResultBundle::load(&path).unwrap();
        let bits = |a: &NamedArray| a.data().iter().map(|v| v.to_bits()).collect::<Vec<u64>>();
        let original = rec.export();
        assert_eq!(bits(&loaded.error), bits(&original.error));
        assert_eq!(bits(&loaded.z_rmhl), bits(&original.z_rmhl));
        assert_eq!(bits(&loaded.hz), bits(&original.hz));
        assert_eq!(loaded.w_norm.get(&[3, 49]), f64::INFINITY);
        assert_eq!(loaded.w_norm.get(&[3, 48]), f64::NEG_INFINITY);
        assert_eq!(loaded, original);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_named_value() {
        let raw = r#"{"shape":[2],"data":[1.0,"nan"]}"#;
        assert!(serde_json::from_str::<NamedArray>(raw).is_err());
        let raw = r#"{"shape":[3],"data":[1.5,null,"-inf"]}"#;
        let arr: NamedArray = serde_json::from_str(raw).unwrap();
        assert_eq!(arr.get(&[0]), 1.5);
        assert!(arr.get(&[1]).is_nan());
        assert_eq!(arr.get(&[2]), f64::NEG_INFINITY);
    }

    #[test]
    fn missing_results() {
        match ResultBundle::load(temp_dir().join("rmhl_no_such_results.json")) {
            Err(RmhlError::ResultsNotFound { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
