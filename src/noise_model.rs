//! Gaussian noise model of the decision statistic
//!
//! One (mean, variance) pair per transmitted bit, fitted from labelled
//! calibration shots. The model is immutable once built and is shared
//! read-only by every decode in a run.

use crate::error::{DegenerateNoiseModelSnafu, Result};
use snafu::ensure;
use tracing::debug;

/// Mean and variance of the decision statistic for one hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    pub mean: f64,
    pub variance: f64,
}

impl Hypothesis {
    fn validated(bit: u8, mean: f64, variance: f64) -> Result<Self> {
        ensure!(
            mean.is_finite(),
            DegenerateNoiseModelSnafu { bit, reason: "mean is not finite" }
        );
        ensure!(
            variance.is_finite() && variance > 0.0,
            DegenerateNoiseModelSnafu {
                bit,
                reason: format!("variance must be positive, got {}", variance),
            }
        );
        Ok(Self { mean, variance })
    }

    /// Sample mean and unbiased sample variance
    fn fit(bit: u8, samples: &[f64]) -> Result<Self> {
        ensure!(
            samples.len() >= 2,
            DegenerateNoiseModelSnafu {
                bit,
                reason: format!("need at least 2 calibration shots, got {}", samples.len()),
            }
        );
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|&s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Self::validated(bit, mean, variance)
    }
}

/// Per-bit Gaussian model of the decision statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
    zero: Hypothesis,
    one: Hypothesis,
}

impl NoiseModel {
    /// Build from explicit parameters
    pub fn new(mean0: f64, var0: f64, mean1: f64, var1: f64) -> Result<Self> {
        Ok(Self {
            zero: Hypothesis::validated(0, mean0, var0)?,
            one: Hypothesis::validated(1, mean1, var1)?,
        })
    }

    /// Fit from decision statistics of shots known to carry bit 0 and bit 1
    pub fn from_calibration(stats0: &[f64], stats1: &[f64]) -> Result<Self> {
        let model = Self {
            zero: Hypothesis::fit(0, stats0)?,
            one: Hypothesis::fit(1, stats1)?,
        };
        debug!(
            mean0 = model.zero.mean,
            var0 = model.zero.variance,
            mean1 = model.one.mean,
            var1 = model.one.variance,
            separation = model.separation(),
            "fitted noise model"
        );
        Ok(model)
    }

    /// Fit from `(statistic, true_bit)` pairs
    pub fn from_labelled(shots: &[(f64, bool)]) -> Result<Self> {
        let (ones, zeros): (Vec<_>, Vec<_>) = shots.iter().partition(|(_, bit)| *bit);
        let stats0: Vec<f64> = zeros.into_iter().map(|&(s, _)| s).collect();
        let stats1: Vec<f64> = ones.into_iter().map(|&(s, _)| s).collect();
        Self::from_calibration(&stats0, &stats1)
    }

    pub fn hypothesis(&self, bit: bool) -> Hypothesis {
        if bit {
            self.one
        } else {
            self.zero
        }
    }

    /// Cluster distance in units of the pooled standard deviation
    pub fn separation(&self) -> f64 {
        let pooled = ((self.zero.variance + self.one.variance) / 2.0).sqrt();
        (self.zero.mean - self.one.mean).abs() / pooled
    }
}
