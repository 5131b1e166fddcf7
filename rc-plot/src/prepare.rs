use rmhl::{smooth, NamedArray, ResultBundle};

use crate::{PlotError, Result};

/// The recorded series of a run, flattened over trials and low-pass filtered
/// for display
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSeries {
    n_train: usize,
    n_trials: usize,
    n_timesteps: usize,
    /// Smoothed output, one series per output dimension
    pub z_bar: Vec<Vec<f64>>,
    /// Smoothed perturbed output, one series per output dimension
    pub z_rmhl_bar: Vec<Vec<f64>>,
    /// Smoothed output in target space, x then y
    pub hz_bar: Vec<Vec<f64>>,
    /// Smoothed error
    pub error_bar: Vec<f64>,
    /// Square root of the smoothed error, the distance from target
    pub mse: Vec<f64>,
    /// Smoothed cost
    pub cost_bar: Vec<f64>,
    /// Readout norm with unrecorded entries carried forward
    pub w_norm: Vec<f64>,
}

impl PreparedSeries {
    /// Number of training trials
    #[inline(always)]
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    /// Number of trials in total
    #[inline(always)]
    pub fn n_trials(&self) -> usize {
        self.n_trials
    }

    /// Timesteps per trial
    #[inline(always)]
    pub fn n_timesteps(&self) -> usize {
        self.n_timesteps
    }

    /// Dimensionality of the network output
    #[inline(always)]
    pub fn n_out(&self) -> usize {
        self.z_bar.len()
    }

    /// Length of every flattened series
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.n_trials * self.n_timesteps
    }

    /// Whether there is nothing to show
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the first testing timestep in the flattened series
    #[inline(always)]
    pub fn boundary(&self) -> usize {
        self.n_train * self.n_timesteps
    }
}

/// Flatten and smooth a result bundle.
///
/// # Arguments
/// bundle: The recorded series
/// n_train: Number of training trials
/// dt: Integration timestep of the run
/// tau_e: Time constant for error and cost
/// tau_z: Time constant for the outputs
pub fn prepare(
    bundle: &ResultBundle,
    n_train: usize,
    dt: f64,
    tau_e: f64,
    tau_z: f64,
) -> Result<PreparedSeries> {
    let n_trials = bundle.n_trials();
    let n_timesteps = bundle.n_timesteps();
    if n_trials == 0 || n_timesteps == 0 {
        return Err(PlotError::EmptySeries("result bundle"));
    }
    if n_train > n_trials {
        return Err(PlotError::InvalidInput(format!(
            "{} training trials but only {} trials recorded",
            n_train, n_trials
        )));
    }
    let len = n_trials * n_timesteps;
    for (name, arr) in [("z", &bundle.z), ("z_RMHL", &bundle.z_rmhl), ("hz", &bundle.hz)] {
        if arr.shape().len() != 3 || arr.shape()[1] != n_trials || arr.shape()[2] != n_timesteps {
            return Err(PlotError::InvalidInput(format!(
                "{} has shape {:?}, expected (_, {}, {})",
                name,
                arr.shape(),
                n_trials,
                n_timesteps
            )));
        }
    }
    if bundle.cost.data().len() != len || bundle.w_norm.data().len() != len {
        return Err(PlotError::InvalidInput(
            "cost and weight norm must cover every timestep".to_string(),
        ));
    }

    let c_z = dt / tau_z;
    let c_e = dt / tau_e;
    let smooth_rows = |arr: &NamedArray| -> Vec<Vec<f64>> {
        arr.data().chunks(len).map(|row| smooth(row, c_z)).collect()
    };

    let error_bar = smooth(bundle.error.data(), c_e);
    let mse = error_bar.iter().map(|e| e.sqrt()).collect();
    debug!("prepared {} trials of {} timesteps", n_trials, n_timesteps);

    Ok(PreparedSeries {
        n_train,
        n_trials,
        n_timesteps,
        z_bar: smooth_rows(&bundle.z),
        z_rmhl_bar: smooth_rows(&bundle.z_rmhl),
        hz_bar: smooth_rows(&bundle.hz),
        error_bar,
        mse,
        cost_bar: smooth(bundle.cost.data(), c_e),
        w_norm: carry_forward(bundle.w_norm.data()),
    })
}

/// Replace every zero or non-finite entry after the first with the entry
/// before it. Unrecorded and degenerate norms thus show the last good value.
pub fn carry_forward(series: &[f64]) -> Vec<f64> {
    let mut out = series.to_vec();
    for i in 1..out.len() {
        if out[i] == 0.0 || !out[i].is_finite() {
            out[i] = out[i - 1];
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use nalgebra::DVector;
    use rmhl::{ResultRecorder, StepOutput};
    use round::round;

    use super::*;

    fn recorded() -> ResultBundle {
        let mut rec = ResultRecorder::new(2, 6, 4);
        for trial in 0..6 {
            for t in 0..4 {
                let v = (trial * 4 + t) as f64;
                let out = StepOutput {
                    e: 4.0,
                    cost: 0.0,
                    z: DVector::from_vec(vec![v, -v]),
                    z_rmhl: DVector::from_vec(vec![v + 0.5, -v]),
                    hz: DVector::from_vec(vec![1.0, v]),
                };
                rec.record(trial, t, &out);
                if trial < 5 {
                    rec.record_norm(trial, t, v + 1.0);
                }
            }
        }

        rec.export()
    }

    #[test]
    fn flatten_and_smooth() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let p = prepare(&recorded(), 5, 1.0, 2.0, 4.0).unwrap();
        assert_eq!(p.len(), 24);
        assert_eq!(p.n_out(), 2);
        assert_eq!(p.boundary(), 20);
        assert_eq!(p.hz_bar.len(), 2);

        assert!(p.error_bar.iter().all(|e| *e == 4.0));
        assert!(p.mse.iter().all(|e| *e == 2.0));
        assert!(p.hz_bar[0].iter().all(|x| *x == 1.0));

        // first entry is taken as is, then c = dT / tau_z = 0.25
        assert_eq!(p.z_bar[0][0], 0.0);
        assert_eq!(p.z_bar[0][1], 0.25);
        assert_eq!(round(p.z_bar[0][2], 4), 0.6875);
        assert_eq!(p.z_rmhl_bar[0][0], 0.5);
        assert_eq!(p.z_bar[1][1], -0.25);
    }

    #[test]
    fn testing_trials_show_the_last_trained_norm() {
        let p = prepare(&recorded(), 5, 1.0, 2.0, 4.0).unwrap();
        assert_eq!(p.w_norm[19], 20.0);
        assert!(p.w_norm[20..].iter().all(|w| *w == 20.0));
    }

    #[test]
    fn carry_forward_degenerate_values() {
        let out = carry_forward(&[0.0, 1.0, 0.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(out, vec![0.0, 1.0, 1.0, 1.0, 3.0, 3.0]);
        assert!(carry_forward(&[]).is_empty());
    }

    #[test]
    fn reject_inconsistent_input() {
        match prepare(&recorded(), 7, 1.0, 2.0, 4.0) {
            Err(PlotError::InvalidInput(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        let empty = ResultRecorder::new(2, 0, 4).export();
        match prepare(&empty, 0, 1.0, 2.0, 4.0) {
            Err(PlotError::EmptySeries(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
