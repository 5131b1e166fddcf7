use std::ops::{Add, Mul};

/// Exponential low-pass filter of a running quantity.
///
/// Until the first `update` the trace is unprimed: that update sets the
/// value to the sample itself instead of blending it with the initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct LowPass<T> {
    value: T,
    primed: bool,
}

impl<T> LowPass<T>
where
    T: Clone + Mul<f64, Output = T> + Add<Output = T>,
{
    /// Create an unprimed trace holding `initial`
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            primed: false,
        }
    }

    /// Filter `sample` into the trace with coefficient `c`, or take it as is
    /// if this is the first update
    pub fn update(&mut self, sample: &T, c: f64) -> &T {
        if self.primed {
            self.filter(sample, c)
        } else {
            self.primed = true;
            self.value = sample.clone();
            &self.value
        }
    }

    /// Apply `value = (1 - c) * value + c * sample` regardless of priming
    pub fn filter(&mut self, sample: &T, c: f64) -> &T {
        self.value = self.value.clone() * (1.0 - c) + sample.clone() * c;
        &self.value
    }

    /// The current value
    #[inline(always)]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Whether the first update has happened
    #[inline(always)]
    pub fn is_primed(&self) -> bool {
        self.primed
    }
}

/// Low-pass filter a recorded series offline, starting from its first value
pub fn smooth(series: &[f64], c: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(series.len());
    let mut last = match series.first() {
        Some(v) => *v,
        None => return out,
    };
    out.push(last);
    for v in series.iter().skip(1) {
        last += c * (v - last);
        out.push(last);
    }

    out
}
