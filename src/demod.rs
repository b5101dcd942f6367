//! Demodulation and projection of IQ traces
//!
//! Reduces a raw trace to one real decision statistic:
//! 1. Coherent integration against the local oscillator
//! 2. Rotation so both symbol clusters lie on the real axis
//! 3. Projection onto the real component (imaginary part is discarded)
//!
//! The rotation and polarity come from calibration shots and are fixed for
//! the run. State 0 always projects above state 1 on the real axis.

use crate::error::{DegenerateCalibrationSnafu, EmptyTraceSnafu, Result};
use crate::iq::IqTrace;
use num::Complex;
use rayon::prelude::*;
use snafu::ensure;
use std::f64::consts::PI;
use tracing::{debug, instrument};

/// Local oscillator used for coherent integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalOscillator {
    /// Frequency in cycles per sample (0.0 for a trace already at baseband)
    pub frequency: f64,
    /// Phase offset in radians
    pub phase: f64,
}

impl Default for LocalOscillator {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            phase: 0.0,
        }
    }
}

/// Reference axis derived from calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceAxis {
    pub lo: LocalOscillator,
    /// Rotation applied to the integral, radians
    pub rotation: f64,
    /// +1.0 or -1.0, chosen so state 0 lands on the positive side
    pub polarity: f64,
}

/// Stateless trace-to-statistic projector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemodulatorProjector {
    axis: ReferenceAxis,
}

/// Mean of the trace mixed down by the local oscillator
pub fn integrate(trace: &IqTrace, lo: &LocalOscillator) -> Result<Complex<f64>> {
    ensure!(!trace.is_empty(), EmptyTraceSnafu);

    let mut acc = Complex::new(0.0, 0.0);
    for (n, &x) in trace.samples().iter().enumerate() {
        let angle = 2.0 * PI * lo.frequency * n as f64 + lo.phase;
        acc += x * Complex::from_polar(1.0, -angle);
    }
    Ok(acc / trace.len() as f64)
}

impl DemodulatorProjector {
    pub fn new(axis: ReferenceAxis) -> Self {
        Self { axis }
    }

    /// Derive the reference axis from traces of known state 0 and state 1
    #[instrument(skip(traces0, traces1), fields(n0 = traces0.len(), n1 = traces1.len()))]
    pub fn calibrate(
        lo: LocalOscillator,
        traces0: &[IqTrace],
        traces1: &[IqTrace],
    ) -> Result<Self> {
        ensure!(
            !traces0.is_empty() && !traces1.is_empty(),
            DegenerateCalibrationSnafu {
                reason: "calibration needs traces for both states",
            }
        );

        let centroid = |traces: &[IqTrace]| -> Result<Complex<f64>> {
            let mut sum = Complex::new(0.0, 0.0);
            for trace in traces {
                sum += integrate(trace, &lo)?;
            }
            Ok(sum / traces.len() as f64)
        };
        let mu0 = centroid(traces0)?;
        let mu1 = centroid(traces1)?;

        let delta = mu1 - mu0;
        ensure!(
            delta.norm() > f64::EPSILON * (mu0.norm() + mu1.norm()).max(1.0),
            DegenerateCalibrationSnafu {
                reason: "state centroids coincide",
            }
        );

        let rotation = -delta.arg();
        let phasor = Complex::from_polar(1.0, rotation);
        let polarity = if (mu0 * phasor).re >= (mu1 * phasor).re { 1.0 } else { -1.0 };

        debug!(?mu0, ?mu1, rotation, polarity, "calibrated reference axis");
        Ok(Self::new(ReferenceAxis {
            lo,
            rotation,
            polarity,
        }))
    }

    pub fn axis(&self) -> &ReferenceAxis {
        &self.axis
    }

    /// Decision statistic of one trace
    pub fn project(&self, trace: &IqTrace) -> Result<f64> {
        let z = integrate(trace, &self.axis.lo)?;
        let rotated = z * Complex::from_polar(1.0, self.axis.rotation);
        Ok(self.axis.polarity * rotated.re)
    }

    /// Decision statistics of many traces, in input order
    pub fn project_batch(&self, traces: &[IqTrace]) -> Result<Vec<f64>> {
        traces.par_iter().map(|t| self.project(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn constant_trace(value: Complex<f64>, len: usize) -> IqTrace {
        IqTrace::new(vec![value; len])
    }

    #[test]
    fn test_empty_trace_rejected() {
        let projector = DemodulatorProjector::new(ReferenceAxis {
            lo: LocalOscillator::default(),
            rotation: 0.0,
            polarity: 1.0,
        });
        let err = projector.project(&IqTrace::new(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::EmptyTrace));
    }

    #[test]
    fn test_integration_removes_lo_tone() {
        let lo = LocalOscillator {
            frequency: 0.05,
            phase: 0.3,
        };
        let amplitude = Complex::new(0.4, -0.2);
        let samples = (0..200)
            .map(|n| {
                amplitude * Complex::from_polar(1.0, 2.0 * PI * lo.frequency * n as f64 + lo.phase)
            })
            .collect();
        let z = integrate(&IqTrace::new(samples), &lo).unwrap();
        assert!((z - amplitude).norm() < 1e-12);
    }

    #[test]
    fn test_calibration_puts_state0_positive() {
        // Clusters on an arbitrary diagonal
        let s0 = Complex::new(0.3, 0.8);
        let s1 = Complex::new(-0.5, 0.1);
        let t0 = vec![constant_trace(s0, 50)];
        let t1 = vec![constant_trace(s1, 50)];
        let projector =
            DemodulatorProjector::calibrate(LocalOscillator::default(), &t0, &t1).unwrap();

        let p0 = projector.project(&t0[0]).unwrap();
        let p1 = projector.project(&t1[0]).unwrap();
        assert!(p0 > p1);
        // Rotation puts the separation fully on the real axis
        assert!(((p0 - p1) - (s0 - s1).norm()).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_rejects_coincident_clusters() {
        let t = vec![constant_trace(Complex::new(1.0, 1.0), 10)];
        let err = DemodulatorProjector::calibrate(LocalOscillator::default(), &t, &t).unwrap_err();
        assert!(matches!(err, Error::DegenerateCalibration { .. }));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let projector = DemodulatorProjector::new(ReferenceAxis {
            lo: LocalOscillator::default(),
            rotation: 0.7,
            polarity: -1.0,
        });
        let trace = IqTrace::from_pairs(&[(0.1, 0.2), (0.3, -0.4), (0.0, 0.9)]);
        let batch = projector.project_batch(&[trace.clone(), trace.clone()]).unwrap();
        assert_eq!(batch[0], batch[1]);
        assert_eq!(batch[0], projector.project(&trace).unwrap());
    }
}
