use motor_tasks::round_up;
use nalgebra::{DMatrix, DVector};

use crate::RandomStream;

/// Fixed, sparse, randomly wired recurrent network driven by its own
/// readout through a feedback projection
#[derive(Debug, Clone)]
pub struct ReservoirNetwork {
    /// Recurrent weights, N x N
    weights: DMatrix<f64>,
    /// Feedback projection of the output, N x n_out
    feedback: DMatrix<f64>,
    /// Potentials
    x: DVector<f64>,
    /// Activities
    r: DVector<f64>,
    nonzero: usize,
}

impl ReservoirNetwork {
    /// Wire a new reservoir of `size` neurons.
    ///
    /// `round_up(size * size * sparsity)` cells are drawn with replacement,
    /// so colliding cells are wired only once. Each wired cell gets a
    /// standard normal weight scaled by `sigma`, assigned in row-major
    /// order of the wired cells.
    pub fn build(
        size: usize,
        sparsity: f64,
        sigma: f64,
        n_out: usize,
        rng: &mut RandomStream,
    ) -> Self {
        let n_cells = round_up((size * size) as f64 * sparsity);
        let rows = rng.randint(0, size, n_cells);
        let cols = rng.randint(0, size, n_cells);

        let mut wired = vec![false; size * size];
        for (i, j) in rows.iter().zip(cols.iter()) {
            wired[i * size + j] = true;
        }
        let nonzero = wired.iter().filter(|w| **w).count();

        let mut weights: DMatrix<f64> = DMatrix::zeros(size, size);
        for i in 0..size {
            for j in 0..size {
                if wired[i * size + j] {
                    weights[(i, j)] = rng.normal() * sigma;
                }
            }
        }

        let feedback = rng.uniform_matrix(n_out, size).map(|u| u * 2.0 - 1.0).transpose();
        let x = rng.uniform_vec(size).add_scalar(-0.5);
        let r = x.map(f64::tanh);

        info!(
            "built reservoir with {} neurons, {} of {} drawn connections distinct, sigma: {}",
            size, nonzero, n_cells, sigma
        );
        trace!("reservoir weights: {}\nfeedback weights: {}", weights, feedback);

        Self {
            weights,
            feedback,
            x,
            r,
            nonzero,
        }
    }

    /// Advance the state by one timestep with leaky-integrator dynamics
    ///
    /// # Arguments
    /// z_feedback: The output that gets projected back into the reservoir
    /// leak: dT / tau
    /// noise: Added to the activities, absent while testing
    pub fn advance(&mut self, z_feedback: &DVector<f64>, leak: f64, noise: Option<&DVector<f64>>) {
        debug_assert_eq!(z_feedback.len(), self.feedback.ncols());

        let drive = &self.weights * &self.r + &self.feedback * z_feedback;
        let delta = (drive - &self.x) * leak;
        self.x += delta;
        self.r = self.x.map(f64::tanh);
        if let Some(noise) = noise {
            self.r += noise;
        }
    }

    /// Number of neurons
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.x.len()
    }

    /// Number of distinct wired connections
    #[inline(always)]
    pub fn nonzero_count(&self) -> usize {
        self.nonzero
    }

    /// The recurrent weight matrix
    #[inline(always)]
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// The feedback projection
    #[inline(always)]
    pub fn feedback(&self) -> &DMatrix<f64> {
        &self.feedback
    }

    /// The potentials
    #[inline(always)]
    pub fn potentials(&self) -> &DVector<f64> {
        &self.x
    }

    /// The activities the readout reads from
    #[inline(always)]
    pub fn activity(&self) -> &DVector<f64> {
        &self.r
    }
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn same_seed_same_reservoir() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let a = ReservoirNetwork::build(50, 0.1, 0.5, 2, &mut RandomStream::new(3));
        let b = ReservoirNetwork::build(50, 0.1, 0.5, 2, &mut RandomStream::new(3));
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.feedback(), b.feedback());
        assert_eq!(a.potentials(), b.potentials());
        assert_eq!(a.activity(), b.activity());
    }

    #[test]
    fn wiring_count_and_magnitudes() {
        let size = 100;
        let sparsity = 0.1;
        let sigma = 1.5 / 10.0_f64.sqrt();
        let res = ReservoirNetwork::build(size, sparsity, sigma, 3, &mut RandomStream::new(11));
        let n_cells = round_up((size * size) as f64 * sparsity);

        let counted = res.weights().iter().filter(|w| **w != 0.0).count();
        assert_eq!(counted, res.nonzero_count());
        assert!(counted <= n_cells);
        // with 1000 draws over 10000 cells only a few collide
        assert!(counted > n_cells * 9 / 10);
        assert!(res.weights().iter().all(|w| w.is_finite()));
    }

    #[test]
    fn initial_state_and_feedback_ranges() {
        let res = ReservoirNetwork::build(40, 0.2, 1.0, 4, &mut RandomStream::new(5));
        assert_eq!(res.feedback().nrows(), 40);
        assert_eq!(res.feedback().ncols(), 4);
        assert!(res.feedback().iter().all(|q| *q >= -1.0 && *q < 1.0));
        assert!(res.potentials().iter().all(|x| *x >= -0.5 && *x < 0.5));
        for (x, r) in res.potentials().iter().zip(res.activity().iter()) {
            assert_eq!(x.tanh(), *r);
        }
    }

    #[test]
    fn advance_follows_leaky_integration() {
        let mut res = ReservoirNetwork::build(20, 0.3, 0.8, 2, &mut RandomStream::new(9));
        let z = DVector::from_vec(vec![0.2, -0.1]);
        let leak = 0.1;

        let x0 = res.potentials().clone();
        let r0 = res.activity().clone();
        let expected = &x0 + (res.weights() * &r0 + res.feedback() * &z - &x0) * leak;

        res.advance(&z, leak, None);
        for (a, b) in res.potentials().iter().zip(expected.iter()) {
            assert_eq!(round(*a, 12), round(*b, 12));
        }
        for (x, r) in res.potentials().iter().zip(res.activity().iter()) {
            assert_eq!(x.tanh(), *r);
        }

        let noise = DVector::from_element(20, 0.01);
        res.advance(&z, leak, Some(&noise));
        for (x, r) in res.potentials().iter().zip(res.activity().iter()) {
            assert_eq!(x.tanh() + 0.01, *r);
        }
    }
}
