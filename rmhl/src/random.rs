use nalgebra::{DMatrix, DVector};
use nanorand::{Rng, WyRand};

// Rational approximation of the standard normal quantile function
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

/// The single ordered source of randomness of a model.
/// Every draw of a run comes from here, so the order of calls is part of
/// what makes a run reproducible.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: WyRand,
    seed: u64,
}

impl RandomStream {
    /// Create a new stream, seeded exactly once
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WyRand::new_seed(seed),
            seed,
        }
    }

    /// Pick a fresh non-zero seed from entropy
    pub fn entropy_seed() -> u64 {
        WyRand::new().generate_range(1_u64..10_000_000)
    }

    /// The seed this stream was created with
    #[inline(always)]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// One uniform draw in [0, 1)
    #[inline(always)]
    pub fn uniform(&mut self) -> f64 {
        self.rng.generate::<f64>()
    }

    /// `n` uniform draws in [0, 1)
    pub fn uniform_vec(&mut self, n: usize) -> DVector<f64> {
        DVector::from_iterator(n, (0..n).map(|_| self.uniform()))
    }

    /// A matrix of uniform draws in [0, 1), filled row by row
    pub fn uniform_matrix(&mut self, rows: usize, cols: usize) -> DMatrix<f64> {
        let vals: Vec<f64> = (0..rows * cols).map(|_| self.uniform()).collect();
        DMatrix::from_row_slice(rows, cols, &vals)
    }

    /// `n` uniform draws in [-amplitude, amplitude)
    pub fn symmetric_vec(&mut self, n: usize, amplitude: f64) -> DVector<f64> {
        DVector::from_iterator(
            n,
            (0..n).map(|_| self.uniform() * amplitude * 2.0 - amplitude),
        )
    }

    /// `count` uniform integers in [low, high)
    pub fn randint(&mut self, low: usize, high: usize, count: usize) -> Vec<usize> {
        (0..count).map(|_| self.rng.generate_range(low..high)).collect()
    }

    /// Inverse of the standard normal CDF.
    /// Turns a uniform draw into a normal deviate, so normal samples consume
    /// exactly one uniform draw each.
    pub fn normal_quantile(u: f64) -> f64 {
        let p = u.clamp(f64::EPSILON, 1.0 - f64::EPSILON);

        if p < P_LOW {
            let q = (-2.0 * p.ln()).sqrt();
            (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
                / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
        } else if p > 1.0 - P_LOW {
            let q = (-2.0 * (1.0 - p).ln()).sqrt();
            -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
                / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
        } else {
            let q = p - 0.5;
            let r = q * q;
            (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
                / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
        }
    }

    /// One standard normal draw
    #[inline(always)]
    pub fn normal(&mut self) -> f64 {
        Self::normal_quantile(self.uniform())
    }
}
