//! Saturating two's-complement fixed-point format
//!
//! The same clamp rule is used by LLR quantization and by every message and
//! belief inside the decoder. Values never wrap: anything outside
//! `[-2^(w-1), 2^(w-1)-1]` is pinned to the nearest bound and reported.

use crate::error::{InvalidConfigSnafu, Result};
use snafu::ensure;

/// Signed fixed-point width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedFormat {
    bit_width: u32,
}

/// Result of clamping one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saturated {
    pub value: i32,
    pub clamped: bool,
}

impl FixedFormat {
    pub const MIN_WIDTH: u32 = 2;
    pub const MAX_WIDTH: u32 = 16;

    pub fn new(bit_width: u32) -> Result<Self> {
        ensure!(
            (Self::MIN_WIDTH..=Self::MAX_WIDTH).contains(&bit_width),
            InvalidConfigSnafu {
                reason: format!(
                    "bit width must be in {}..={}, got {}",
                    Self::MIN_WIDTH,
                    Self::MAX_WIDTH,
                    bit_width
                ),
            }
        );
        Ok(Self { bit_width })
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    pub fn min(&self) -> i32 {
        -(1i32 << (self.bit_width - 1))
    }

    pub fn max(&self) -> i32 {
        (1i32 << (self.bit_width - 1)) - 1
    }

    pub fn saturate(&self, value: i64) -> Saturated {
        if value > self.max() as i64 {
            Saturated {
                value: self.max(),
                clamped: true,
            }
        } else if value < self.min() as i64 {
            Saturated {
                value: self.min(),
                clamped: true,
            }
        } else {
            Saturated {
                value: value as i32,
                clamped: false,
            }
        }
    }

    /// Clamp and bump `events` when the bound was hit
    #[inline]
    pub fn saturate_counted(&self, value: i64, events: &mut usize) -> i32 {
        let s = self.saturate(value);
        if s.clamped {
            *events += 1;
        }
        s.value
    }
}

impl Default for FixedFormat {
    fn default() -> Self {
        Self { bit_width: 8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_for_8_bits() {
        let f = FixedFormat::new(8).unwrap();
        assert_eq!(f.min(), -128);
        assert_eq!(f.max(), 127);
    }

    #[test]
    fn test_saturation_never_wraps() {
        let f = FixedFormat::new(4).unwrap();
        for v in 8..1000i64 {
            assert_eq!(f.saturate(v), Saturated { value: 7, clamped: true });
            assert_eq!(f.saturate(-v - 1), Saturated { value: -8, clamped: true });
        }
        assert_eq!(f.saturate(-8), Saturated { value: -8, clamped: false });
    }

    #[test]
    fn test_counted_clamps() {
        let f = FixedFormat::default();
        let mut events = 0;
        assert_eq!(f.saturate_counted(300, &mut events), 127);
        assert_eq!(f.saturate_counted(-5, &mut events), -5);
        assert_eq!(f.saturate_counted(i64::MIN, &mut events), -128);
        assert_eq!(events, 2);
    }

    #[test]
    fn test_width_validation() {
        assert!(FixedFormat::new(1).is_err());
        assert!(FixedFormat::new(17).is_err());
        assert!(FixedFormat::new(16).is_ok());
    }
}
