pub mod metrics;

const BCE_EPSILON: f32 = 1e-7;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary cross-entropy for a single prediction, clamped away from 0 and 1
/// so a saturated sigmoid cannot produce an infinite loss.
pub fn binary_cross_entropy(prediction: f32, label: f32) -> f32 {
    let p = prediction.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
    -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_binary_cross_entropy() {
        assert!(binary_cross_entropy(0.99, 1.0) < 0.05);
        assert!(binary_cross_entropy(0.01, 0.0) < 0.05);
        assert!(binary_cross_entropy(0.01, 1.0) > 1.0);
        // exact hits stay finite through the clamp
        assert!(binary_cross_entropy(1.0, 1.0).is_finite());
        assert!(binary_cross_entropy(0.0, 1.0).is_finite());
    }
}
