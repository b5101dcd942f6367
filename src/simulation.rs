//! Synthetic readout source
//!
//! Stands in for the dispersive-readout physics: every shot is a constant
//! complex amplitude per qubit state plus independent Gaussian noise on I and
//! Q for each sample. Randomness comes from a caller-supplied RNG so runs are
//! reproducible.

use crate::error::{InvalidConfigSnafu, Result};
use crate::iq::{IqTrace, ReadoutRecord};
use num::Complex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use snafu::ensure;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadoutSimulator {
    /// Noiseless integrated response for state 0
    pub amplitude0: Complex<f64>,
    /// Noiseless integrated response for state 1
    pub amplitude1: Complex<f64>,
    /// Samples per trace
    pub samples: usize,
    /// Per-sample, per-quadrature noise standard deviation
    pub noise_sigma: f64,
}

impl Default for ReadoutSimulator {
    fn default() -> Self {
        Self {
            amplitude0: Complex::new(0.12, 0.31),
            amplitude1: Complex::new(-0.27, 0.05),
            samples: 500,
            noise_sigma: 0.05,
        }
    }
}

impl ReadoutSimulator {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.samples > 0,
            InvalidConfigSnafu {
                reason: "simulator needs at least one sample per trace",
            }
        );
        ensure!(
            self.noise_sigma.is_finite() && self.noise_sigma >= 0.0,
            InvalidConfigSnafu {
                reason: format!("noise sigma must be non-negative, got {}", self.noise_sigma),
            }
        );
        Ok(())
    }

    pub fn amplitude(&self, bit: bool) -> Complex<f64> {
        if bit {
            self.amplitude1
        } else {
            self.amplitude0
        }
    }

    /// One noisy trace for the given state
    pub fn trace<R: Rng + ?Sized>(&self, bit: bool, rng: &mut R) -> Result<IqTrace> {
        self.validate()?;
        let amplitude = self.amplitude(bit);
        if self.noise_sigma == 0.0 {
            return Ok(IqTrace::new(vec![amplitude; self.samples]));
        }
        let normal = Normal::new(0.0, self.noise_sigma).map_err(|e| {
            InvalidConfigSnafu {
                reason: e.to_string(),
            }
            .build()
        })?;
        let samples = (0..self.samples)
            .map(|_| amplitude + Complex::new(normal.sample(rng), normal.sample(rng)))
            .collect();
        Ok(IqTrace::new(samples))
    }

    pub fn record<R: Rng + ?Sized>(&self, bit: bool, rng: &mut R) -> Result<ReadoutRecord> {
        Ok(ReadoutRecord {
            trace: self.trace(bit, rng)?,
            true_bit: bit,
        })
    }

    /// Records for a sequence of transmitted bits
    pub fn records<R, I>(&self, bits: I, rng: &mut R) -> Result<Vec<ReadoutRecord>>
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = bool>,
    {
        bits.into_iter().map(|b| self.record(b, rng)).collect()
    }

    /// Calibration traces: `shots` of each state
    pub fn calibration<R: Rng + ?Sized>(
        &self,
        shots: usize,
        rng: &mut R,
    ) -> Result<(Vec<IqTrace>, Vec<IqTrace>)> {
        let zeros = (0..shots).map(|_| self.trace(false, rng)).collect::<Result<Vec<_>>>()?;
        let ones = (0..shots).map(|_| self.trace(true, rng)).collect::<Result<Vec<_>>>()?;
        Ok((zeros, ones))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_noiseless_trace_is_constant() {
        let sim = ReadoutSimulator {
            noise_sigma: 0.0,
            samples: 8,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let trace = sim.trace(true, &mut rng).unwrap();
        assert_eq!(trace.len(), 8);
        assert!(trace.samples().iter().all(|&s| s == sim.amplitude1));
    }

    #[test]
    fn test_seeded_traces_repeat() {
        let sim = ReadoutSimulator::default();
        let a = sim.trace(false, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = sim.trace(false, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_has_expected_spread() {
        let sim = ReadoutSimulator {
            samples: 20_000,
            noise_sigma: 0.2,
            ..Default::default()
        };
        let trace = sim.trace(false, &mut StdRng::seed_from_u64(3)).unwrap();
        let n = trace.len() as f64;
        let mean: Complex<f64> = trace.samples().iter().sum::<Complex<f64>>() / n;
        let var_i = trace.samples().iter().map(|s| (s.re - mean.re).powi(2)).sum::<f64>() / n;
        assert!((mean - sim.amplitude0).norm() < 0.01);
        assert!((var_i.sqrt() - 0.2).abs() < 0.01);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let empty = ReadoutSimulator { samples: 0, ..Default::default() };
        assert!(empty.trace(false, &mut rng).is_err());
        let negative = ReadoutSimulator { noise_sigma: -1.0, ..Default::default() };
        assert!(negative.trace(false, &mut rng).is_err());
    }
}
