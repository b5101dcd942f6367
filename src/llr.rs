//! Log-likelihood ratios and their fixed-point quantization
//!
//! Sign convention: a positive LLR means bit 0 is more likely.
//!
//! ```text
//! LLR(s) = ln p(s | 0) - ln p(s | 1)
//!        = ((s - m1)^2 / v1 - (s - m0)^2 / v0) / 2 + ln(v1 / v0) / 2
//! ```
//!
//! Quantization scales by a configured gain, rounds, then saturates to the
//! configured width. Every clamp is reported so a misconfigured gain shows up
//! as a high saturation rate instead of silently distorting the priors.

use crate::error::{InvalidConfigSnafu, Result};
use crate::fixed::FixedFormat;
use crate::noise_model::NoiseModel;
use snafu::ensure;
use tracing::debug;

/// Products this close to an integer are treated as that integer, which keeps
/// dequantize-then-requantize exact under truncation.
const SNAP_TOLERANCE: f64 = 1e-9;

/// Rounding applied after scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Round half away from zero
    #[default]
    Nearest,
    /// Round toward zero
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizerConfig {
    pub bit_width: u32,
    pub gain: f64,
    pub rounding: Rounding,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            bit_width: 8,
            gain: 16.0,
            rounding: Rounding::Nearest,
        }
    }
}

impl QuantizerConfig {
    /// Gain that maps `max_abs_llr` onto the positive full scale
    pub fn gain_for_range(max_abs_llr: f64, bit_width: u32) -> Result<f64> {
        let format = FixedFormat::new(bit_width)?;
        ensure!(
            max_abs_llr.is_finite() && max_abs_llr > 0.0,
            InvalidConfigSnafu {
                reason: format!("LLR range must be positive, got {}", max_abs_llr),
            }
        );
        Ok(format.max() as f64 / max_abs_llr)
    }
}

/// One quantized value and whether it hit a bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantized {
    pub value: i32,
    pub saturated: bool,
}

/// Quantized block with its saturation count
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuantizedBlock {
    pub values: Vec<i32>,
    pub saturations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    format: FixedFormat,
    gain: f64,
    rounding: Rounding,
}

impl Quantizer {
    pub fn new(config: QuantizerConfig) -> Result<Self> {
        let format = FixedFormat::new(config.bit_width)?;
        ensure!(
            config.gain.is_finite() && config.gain > 0.0,
            InvalidConfigSnafu {
                reason: format!("quantization gain must be positive, got {}", config.gain),
            }
        );
        Ok(Self {
            format,
            gain: config.gain,
            rounding: config.rounding,
        })
    }

    pub fn format(&self) -> FixedFormat {
        self.format
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn quantize(&self, llr: f64) -> Quantized {
        if llr.is_nan() {
            return Quantized {
                value: 0,
                saturated: true,
            };
        }

        let scaled = llr * self.gain;
        let nearest = scaled.round();
        let snapped = if (scaled - nearest).abs() < SNAP_TOLERANCE {
            nearest
        } else {
            scaled
        };
        let rounded = match self.rounding {
            Rounding::Nearest => snapped.round(),
            Rounding::Truncate => snapped.trunc(),
        };

        // Float-to-int casts saturate, so infinities land on i64 bounds first
        let s = self.format.saturate(rounded as i64);
        Quantized {
            value: s.value,
            saturated: s.clamped,
        }
    }

    pub fn dequantize(&self, value: i32) -> f64 {
        value as f64 / self.gain
    }

    pub fn quantize_block(&self, llrs: &[f64]) -> QuantizedBlock {
        let mut block = QuantizedBlock {
            values: Vec::with_capacity(llrs.len()),
            saturations: 0,
        };
        for &llr in llrs {
            let q = self.quantize(llr);
            if q.saturated {
                block.saturations += 1;
            }
            block.values.push(q.value);
        }
        if block.saturations > 0 {
            debug!(
                saturations = block.saturations,
                total = llrs.len(),
                "LLR quantization clamped values"
            );
        }
        block
    }
}

/// Exact Gaussian LLR of a decision statistic
pub fn gaussian_llr(model: &NoiseModel, s: f64) -> f64 {
    let h0 = model.hypothesis(false);
    let h1 = model.hypothesis(true);
    let d0 = (s - h0.mean).powi(2) / h0.variance;
    let d1 = (s - h1.mean).powi(2) / h1.variance;
    0.5 * (d1 - d0) + 0.5 * (h1.variance / h0.variance).ln()
}

/// Decision statistic to (quantized) LLR
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LlrGenerator {
    model: NoiseModel,
    quantizer: Quantizer,
}

impl LlrGenerator {
    pub fn new(model: NoiseModel, quantizer: Quantizer) -> Self {
        Self { model, quantizer }
    }

    pub fn model(&self) -> &NoiseModel {
        &self.model
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn llr(&self, statistic: f64) -> f64 {
        gaussian_llr(&self.model, statistic)
    }

    pub fn quantized(&self, statistic: f64) -> Quantized {
        self.quantizer.quantize(self.llr(statistic))
    }

    pub fn generate_block(&self, statistics: &[f64]) -> QuantizedBlock {
        let real: Vec<f64> = statistics.iter().map(|&s| self.llr(s)).collect();
        self.quantizer.quantize_block(&real)
    }
}
