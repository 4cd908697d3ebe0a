use nalgebra::DVector;
use std::collections::HashMap;

/// Adam with per-key moment state, so each embedding row keeps its own
/// first and second moment estimates across steps.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: usize,
    m: HashMap<String, DVector<f32>>,
    v: HashMap<String, DVector<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: HashMap::new(),
            v: HashMap::new(),
        }
    }

    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn step(&mut self) {
        self.t += 1;
    }

    pub fn update_with_key(&mut self, key: &str, params: &mut DVector<f32>, gradients: &DVector<f32>) {
        let t = self.t.max(1);

        let m = self
            .m
            .entry(key.to_string())
            .or_insert_with(|| DVector::zeros(params.len()));
        let v = self
            .v
            .entry(key.to_string())
            .or_insert_with(|| DVector::zeros(params.len()));

        // Biased first and second moment estimates
        *m = m.scale(self.beta1 as f32) + gradients.scale(1.0 - self.beta1 as f32);
        *v = v.scale(self.beta2 as f32)
            + gradients.component_mul(gradients).scale(1.0 - self.beta2 as f32);

        // Bias correction
        let m_hat = m.scale(1.0 / (1.0 - (self.beta1 as f32).powi(t as i32)));
        let v_hat = v.scale(1.0 / (1.0 - (self.beta2 as f32).powi(t as i32)));

        let denominator = v_hat.map(|x| (x + self.epsilon as f32).sqrt());
        let update = m_hat.component_div(&denominator).scale(self.learning_rate as f32);

        *params -= update;
    }

    pub fn reset(&mut self) {
        self.t = 0;
        self.m.clear();
        self.v.clear();
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::with_learning_rate(0.001)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_moves_against_gradient() {
        let mut adam = Adam::default();
        adam.step();

        let mut params = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let gradients = DVector::from_vec(vec![0.1, 0.2, 0.3]);
        adam.update_with_key("row", &mut params, &gradients);

        assert!(params[0] < 1.0);
        assert!(params[1] < 2.0);
        assert!(params[2] < 3.0);
    }

    #[test]
    fn test_keys_hold_separate_state() {
        let mut adam = Adam::default();
        adam.step();

        let mut a = DVector::from_vec(vec![1.0]);
        let mut b = DVector::from_vec(vec![1.0]);
        adam.update_with_key("a", &mut a, &DVector::from_vec(vec![1.0]));
        adam.step();
        adam.update_with_key("b", &mut b, &DVector::from_vec(vec![1.0]));

        // "b" starts with fresh moments, so its first update differs from
        // a second update on "a"
        adam.update_with_key("a", &mut a, &DVector::from_vec(vec![1.0]));
        assert_ne!(a[0], b[0]);
    }

    #[test]
    fn test_reset_matches_fresh_optimizer() {
        let gradients = DVector::from_vec(vec![0.5]);

        let mut used = Adam::default();
        used.step();
        let mut params = DVector::from_vec(vec![1.0]);
        used.update_with_key("row", &mut params, &gradients);
        used.reset();
        used.step();
        let mut after_reset = DVector::from_vec(vec![1.0]);
        used.update_with_key("row", &mut after_reset, &gradients);

        let mut fresh = Adam::default();
        fresh.step();
        let mut first_update = DVector::from_vec(vec![1.0]);
        fresh.update_with_key("row", &mut first_update, &gradients);

        assert_eq!(after_reset[0], first_update[0]);
    }
}
