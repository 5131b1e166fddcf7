/// The possible nonlinearities applied to the error deviation before it
/// modulates a readout update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    /// Reinforce proportionally to the negative error deviation
    Linear,
    /// Negative hyperbolic tangent of the error deviation
    Saturating,
}

impl Modulation {
    /// Map the error deviation `e_hat` to the factor scaling the update.
    /// A deviation of zero never produces an update.
    pub fn apply(&self, e_hat: f64) -> f64 {
        match self {
            Modulation::Linear => -e_hat,
            Modulation::Saturating => -e_hat.tanh(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulation_rewards_lower_error() {
        for m in [Modulation::Linear, Modulation::Saturating] {
            assert!(m.apply(-0.3) > 0.0);
            assert!(m.apply(0.3) < 0.0);
            assert_eq!(m.apply(0.0), 0.0);
        }
    }

    #[test]
    fn saturating_is_bounded() {
        assert!(Modulation::Saturating.apply(1e6) >= -1.0);
        assert!(Modulation::Saturating.apply(-1e6) <= 1.0);
    }
}
