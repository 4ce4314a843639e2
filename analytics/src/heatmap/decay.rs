use std::time::Duration;

// s * exp(-λ·Δt) with λ = ln 2 / half_life
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayModel {
    lambda_per_ms: f64,
}

impl DecayModel {
    pub fn from_half_life(half_life: Duration) -> Self {
        let ms = (half_life.as_millis() as f64).max(1.0);
        Self {
            lambda_per_ms: std::f64::consts::LN_2 / ms,
        }
    }

    pub fn lambda_per_ms(&self) -> f64 {
        self.lambda_per_ms
    }

    #[inline]
    pub fn factor(&self, elapsed_ms: u64) -> f64 {
        (-self.lambda_per_ms * elapsed_ms as f64).exp()
    }

    #[inline]
    pub fn decay(&self, score: f64, elapsed_ms: u64) -> f64 {
        score * self.factor(elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_every_half_life() {
        let m = DecayModel::from_half_life(Duration::from_secs(3600));
        assert_eq!(m.decay(8.0, 0), 8.0);
        assert!((m.decay(8.0, 3_600_000) - 4.0).abs() < 1e-9);
        assert!((m.decay(8.0, 7_200_000) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_half_life_is_clamped() {
        let m = DecayModel::from_half_life(Duration::ZERO);
        assert!((m.decay(1.0, 1) - 0.5).abs() < 1e-12);
    }
}
