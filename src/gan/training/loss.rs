//! Adversarial Loss and Metrics
//!
//! Binary cross-entropy on probabilities, noisy target labels, and the
//! running-mean metric reported per epoch.

use burn::prelude::*;
use burn::tensor::Distribution;

/// Probabilities are clamped to `[EPSILON, 1 - EPSILON]` before taking logs
pub const EPSILON: f64 = 1e-7;

/// Mean binary cross-entropy between predicted probabilities and (soft) targets
pub fn binary_cross_entropy<B: Backend, const D: usize>(
    pred: Tensor<B, D>,
    target: Tensor<B, D>,
) -> Tensor<B, 1> {
    let pred = pred.clamp(EPSILON, 1.0 - EPSILON);
    let positive = target.clone() * pred.clone().log();
    let negative = target.neg().add_scalar(1.0) * pred.neg().add_scalar(1.0).log();
    (positive + negative).neg().mean()
}

/// Targets for real images: `1 + noise * U(-1, 1)`
pub fn real_labels<B: Backend>(batch: usize, noise: f64, device: &B::Device) -> Tensor<B, 2> {
    Tensor::random([batch, 1], Distribution::Uniform(-1.0, 1.0), device)
        .mul_scalar(noise)
        .add_scalar(1.0)
}

/// Targets for generated images: `noise * U(0, 1)`
pub fn fake_labels<B: Backend>(batch: usize, noise: f64, device: &B::Device) -> Tensor<B, 2> {
    Tensor::random([batch, 1], Distribution::Uniform(0.0, 1.0), device).mul_scalar(noise)
}

/// Running mean of a scalar loss
#[derive(Debug, Clone, Default)]
pub struct LossMean {
    total: f64,
    count: usize,
}

impl LossMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f32) {
        self.total += value as f64;
        self.count += 1;
    }

    /// Mean of all values since the last reset (0 when empty)
    pub fn result(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        (self.total / self.count as f64) as f32
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::ElementConversion;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    #[test]
    fn test_bce_matches_hand_computation() {
        let device = Default::default();
        let pred = Tensor::<TestBackend, 2>::from_floats([[0.8], [0.3]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[1.0], [0.0]], &device);

        let expected = -((0.8f32).ln() + (0.7f32).ln()) / 2.0;
        let loss = scalar(binary_cross_entropy(pred, target));
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn test_bce_soft_targets() {
        let device = Default::default();
        let pred = Tensor::<TestBackend, 2>::from_floats([[0.6]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[0.9]], &device);

        let expected = -(0.9 * (0.6f32).ln() + 0.1 * (0.4f32).ln());
        let loss = scalar(binary_cross_entropy(pred, target));
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn test_bce_perfect_and_saturated_predictions_stay_finite() {
        let device = Default::default();
        let perfect = binary_cross_entropy(
            Tensor::<TestBackend, 2>::from_floats([[1.0], [0.0]], &device),
            Tensor::<TestBackend, 2>::from_floats([[1.0], [0.0]], &device),
        );
        assert!(scalar(perfect) < 1e-5);

        let wrong = binary_cross_entropy(
            Tensor::<TestBackend, 2>::from_floats([[0.0]], &device),
            Tensor::<TestBackend, 2>::from_floats([[1.0]], &device),
        );
        let wrong = scalar(wrong);
        assert!(wrong.is_finite());
        assert!(wrong > 10.0);
    }

    #[test]
    fn test_label_noise_ranges() {
        let device = Default::default();
        let real = real_labels::<TestBackend>(256, 0.25, &device)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(real.iter().all(|v| (0.75..=1.25).contains(v)));

        let fake = fake_labels::<TestBackend>(256, 0.25, &device)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(fake.iter().all(|v| (0.0..=0.25).contains(v)));
    }

    #[test]
    fn test_noise_free_labels_are_exact() {
        let device = Default::default();
        let real = real_labels::<TestBackend>(4, 0.0, &device)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(real, vec![1.0; 4]);
    }

    #[test]
    fn test_loss_mean() {
        let mut mean = LossMean::new();
        assert_eq!(mean.result(), 0.0);

        mean.update(1.0);
        mean.update(2.0);
        mean.update(6.0);
        assert_eq!(mean.count(), 3);
        assert!((mean.result() - 3.0).abs() < 1e-6);

        mean.reset();
        assert_eq!(mean.count(), 0);
        assert_eq!(mean.result(), 0.0);
    }
}
