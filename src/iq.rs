//! Raw readout samples

use num::Complex;

/// Ordered IQ samples of one measurement shot over the integration window
#[derive(Debug, Clone, PartialEq)]
pub struct IqTrace {
    samples: Vec<Complex<f64>>,
}

impl IqTrace {
    pub fn new(samples: Vec<Complex<f64>>) -> Self {
        Self { samples }
    }

    /// Build from `(I, Q)` pairs as delivered by the upstream generator
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            samples: pairs.iter().map(|&(i, q)| Complex::new(i, q)).collect(),
        }
    }

    pub fn samples(&self) -> &[Complex<f64>] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One shot from the upstream source; `true_bit` is for validation only
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutRecord {
    pub trace: IqTrace,
    pub true_bit: bool,
}
