//! Seeded synthetic binary-classification data

use super::Dataset;
use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Two Gaussian clusters, one per class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub n_samples: usize,
    pub n_features: usize,
    /// Features that carry signal; the rest are pure noise
    pub n_informative: usize,
    /// Distance between the class means along each informative feature
    pub class_sep: f64,
    /// Fraction of labels flipped after generation
    pub flip_y: f64,
    pub random_state: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_samples: 200,
            n_features: 6,
            n_informative: 3,
            class_sep: 2.0,
            flip_y: 0.0,
            random_state: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn new(n_samples: usize, n_features: usize) -> Self {
        Self {
            n_samples,
            n_features,
            n_informative: n_features.div_ceil(2),
            ..Default::default()
        }
    }

    pub fn with_class_sep(mut self, sep: f64) -> Self {
        self.class_sep = sep;
        self
    }

    pub fn with_flip_y(mut self, flip_y: f64) -> Self {
        self.flip_y = flip_y;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// Generate a balanced dataset: half the rows are class 0, half class 1
/// (one extra class-0 row when `n_samples` is odd), in shuffled order.
pub fn make_classification(config: &SyntheticConfig) -> Result<Dataset> {
    if config.n_samples < 2 {
        return Err(FoldwiseError::invalid("n_samples must be at least 2"));
    }
    if config.n_features == 0 {
        return Err(FoldwiseError::invalid("n_features must be at least 1"));
    }
    if config.n_informative == 0 || config.n_informative > config.n_features {
        return Err(FoldwiseError::invalid(format!(
            "n_informative must be in 1..={}, got {}",
            config.n_features, config.n_informative
        )));
    }
    if !(0.0..=1.0).contains(&config.flip_y) {
        return Err(FoldwiseError::invalid(format!(
            "flip_y must be in [0, 1], got {}",
            config.flip_y
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.random_state);

    let mut labels: Vec<f64> = (0..config.n_samples).map(|i| (i % 2) as f64).collect();
    labels.shuffle(&mut rng);

    let half_sep = config.class_sep / 2.0;
    let mut features = Array2::zeros((config.n_samples, config.n_features));
    for (i, &label) in labels.iter().enumerate() {
        let sign = if label == 1.0 { 1.0 } else { -1.0 };
        for j in 0..config.n_features {
            let center = if j < config.n_informative { sign * half_sep } else { 0.0 };
            features[[i, j]] = center + standard_normal(&mut rng);
        }
    }

    for label in labels.iter_mut() {
        if rng.gen_bool(config.flip_y) {
            *label = 1.0 - *label;
        }
    }

    Dataset::new(features, Array1::from_vec(labels))
}

/// Box-Muller transform
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_balance() {
        let ds = make_classification(&SyntheticConfig::new(101, 4)).unwrap();
        assert_eq!(ds.n_samples(), 101);
        assert_eq!(ds.n_features(), 4);
        assert_eq!(ds.class_counts(), [51, 50]);
    }

    #[test]
    fn test_seed_reproducible() {
        let cfg = SyntheticConfig::new(50, 3).with_random_state(7);
        let a = make_classification(&cfg).unwrap();
        let b = make_classification(&cfg).unwrap();
        assert_eq!(a, b);

        let c = make_classification(&cfg.clone().with_random_state(8)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_informative_feature_separates_classes() {
        let ds = make_classification(&SyntheticConfig::new(400, 2).with_class_sep(4.0)).unwrap();
        let (mut sum0, mut sum1) = (0.0, 0.0);
        for (row, &label) in ds.features().rows().into_iter().zip(ds.labels().iter()) {
            if label == 1.0 {
                sum1 += row[0];
            } else {
                sum0 += row[0];
            }
        }
        assert!(sum1 / 200.0 - sum0 / 200.0 > 3.0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(make_classification(&SyntheticConfig::new(1, 2)).is_err());
        assert!(make_classification(&SyntheticConfig::new(10, 0)).is_err());
        assert!(make_classification(&SyntheticConfig::new(10, 2).with_flip_y(1.5)).is_err());
    }
}
