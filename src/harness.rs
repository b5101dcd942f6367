//! Trial harness: all-zero and error-injection tests, BER/FER campaigns
//!
//! A campaign runs independent trials on the rayon pool. Each trial gets its
//! own `StdRng` seeded from the campaign seed and the trial index, so the
//! aggregate is reproducible no matter how rayon schedules the work.

use crate::error::{InvalidConfigSnafu, LengthMismatchSnafu, Result};
use crate::ldpc::{Codeword, DecodeResult, Encoder, LdpcDecoder};
use crate::receiver::Receiver;
use crate::simulation::ReadoutSimulator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use snafu::ensure;
use std::fmt;
use tracing::{info, instrument, warn};

/// Positions flipped by the reference error-injection block
pub const REFERENCE_ERROR_POSITIONS: [usize; 10] =
    [10, 50, 100, 150, 200, 250, 300, 350, 400, 450];

/// Decode a noiseless all-zero block where every LLR is `magnitude`
pub fn all_zero_trial(decoder: &LdpcDecoder, magnitude: i32) -> Result<DecodeResult> {
    let llrs = vec![magnitude.saturating_abs(); decoder.graph().num_vars()];
    decoder.decode(&llrs)
}

/// Overwrite `positions` with a confident "1" of the given magnitude
pub fn inject_errors(llrs: &mut [i32], positions: &[usize], magnitude: i32) -> Result<()> {
    for &p in positions {
        ensure!(
            p < llrs.len(),
            InvalidConfigSnafu {
                reason: format!("error position {} outside block of {}", p, llrs.len()),
            }
        );
        llrs[p] = -magnitude.saturating_abs();
    }
    Ok(())
}

/// Channel input and ground truth for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub llrs: Vec<i32>,
    pub true_bits: Codeword,
    /// Clamps applied while quantizing `llrs`
    pub saturations: usize,
}

/// Draw a random codeword, send it through the simulator and the receiver front end
pub fn readout_trial<R: Rng + ?Sized>(
    receiver: &Receiver,
    simulator: &ReadoutSimulator,
    encoder: &Encoder,
    rng: &mut R,
) -> Result<Trial> {
    let message: Codeword = (0..encoder.dimension()).map(|_| rng.random::<bool>()).collect();
    let true_bits = encoder.encode(&message)?;
    let traces = true_bits
        .iter()
        .by_vals()
        .map(|bit| simulator.trace(bit, rng))
        .collect::<Result<Vec<_>>>()?;
    let block = receiver.block_llrs(&traces)?;
    Ok(Trial {
        llrs: block.values,
        true_bits,
        saturations: block.saturations,
    })
}

/// Aggregate counts over a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CampaignStats {
    pub frames: usize,
    /// Frames whose decoded bits differ from the truth
    pub frame_errors: usize,
    pub bit_errors: usize,
    pub bits: usize,
    pub converged: usize,
    /// Quantizer clamps plus decoder clamps
    pub saturation_events: usize,
    /// Iterations summed over all frames
    pub iterations: usize,
    /// Trials that returned an error and were left out of the rates
    pub failed_trials: usize,
}

impl CampaignStats {
    pub fn record(&mut self, trial: &Trial, result: &DecodeResult) {
        let true_bits = &trial.true_bits;
        let errors = true_bits
            .iter()
            .by_vals()
            .zip(result.codeword.iter().by_vals())
            .filter(|(t, d)| t != d)
            .count();
        self.frames += 1;
        self.bits += true_bits.len();
        self.bit_errors += errors;
        if errors > 0 {
            self.frame_errors += 1;
        }
        if result.converged {
            self.converged += 1;
        }
        self.saturation_events += trial.saturations + result.saturation_events;
        self.iterations += result.iterations;
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            frames: self.frames + other.frames,
            frame_errors: self.frame_errors + other.frame_errors,
            bit_errors: self.bit_errors + other.bit_errors,
            bits: self.bits + other.bits,
            converged: self.converged + other.converged,
            saturation_events: self.saturation_events + other.saturation_events,
            iterations: self.iterations + other.iterations,
            failed_trials: self.failed_trials + other.failed_trials,
        }
    }

    pub fn ber(&self) -> f64 {
        ratio(self.bit_errors, self.bits)
    }

    pub fn fer(&self) -> f64 {
        ratio(self.frame_errors, self.frames)
    }

    pub fn mean_iterations(&self) -> f64 {
        ratio(self.iterations, self.frames)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for CampaignStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} frame_errors={} FER={:.3e} bit_errors={}/{} BER={:.3e} \
             converged={} mean_iters={:.2} saturations={}",
            self.frames,
            self.frame_errors,
            self.fer(),
            self.bit_errors,
            self.bits,
            self.ber(),
            self.converged,
            self.mean_iterations(),
            self.saturation_events,
        )?;
        if self.failed_trials > 0 {
            write!(f, " failed={}", self.failed_trials)?;
        }
        Ok(())
    }
}

/// Campaign parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignConfig {
    pub trials: usize,
    pub seed: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self { trials: 100, seed: 0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Campaign {
    config: CampaignConfig,
}

impl Campaign {
    pub fn new(config: CampaignConfig) -> Result<Self> {
        ensure!(
            config.trials > 0,
            InvalidConfigSnafu {
                reason: "campaign needs at least one trial",
            }
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Run every trial in parallel and aggregate the outcomes
    ///
    /// `trial` receives the trial index and that trial's RNG. A trial that
    /// fails to build or decode is counted in `failed_trials` and the rest of
    /// the campaign continues.
    #[instrument(
        skip(self, decoder, trial),
        fields(trials = self.config.trials, seed = self.config.seed)
    )]
    pub fn run<F>(&self, decoder: &LdpcDecoder, trial: F) -> CampaignStats
    where
        F: Fn(usize, &mut StdRng) -> Result<Trial> + Sync,
    {
        let seed = self.config.seed;
        let stats = (0..self.config.trials)
            .into_par_iter()
            .map(|index| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
                let mut stats = CampaignStats::default();
                match run_one(decoder, &trial, index, &mut rng) {
                    Ok((t, result)) => stats.record(&t, &result),
                    Err(e) => {
                        warn!(index, error = %e, "trial failed");
                        stats.failed_trials = 1;
                    }
                }
                stats
            })
            .reduce(CampaignStats::default, CampaignStats::merge);

        info!(%stats, "campaign complete");
        stats
    }
}

fn run_one<F>(
    decoder: &LdpcDecoder,
    trial: &F,
    index: usize,
    rng: &mut StdRng,
) -> Result<(Trial, DecodeResult)>
where
    F: Fn(usize, &mut StdRng) -> Result<Trial>,
{
    let t = trial(index, rng)?;
    ensure!(
        t.true_bits.len() == t.llrs.len(),
        LengthMismatchSnafu {
            what: "trial truth",
            expected: t.llrs.len(),
            actual: t.true_bits.len(),
        }
    );
    let result = decoder.decode(&t.llrs)?;
    Ok((t, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demod::LocalOscillator;
    use crate::error::Error;
    use bitvec::prelude::*;
    use crate::ldpc::{DecoderConfig, ParityCheckGraph, ParityCheckMatrix};
    use crate::simulation::ReadoutSimulator;
    use std::sync::Arc;

    fn decoder(h: &ParityCheckMatrix) -> LdpcDecoder {
        LdpcDecoder::new(Arc::new(ParityCheckGraph::new(h)), DecoderConfig::default()).unwrap()
    }

    fn all_zero(n: usize, magnitude: i32) -> Trial {
        Trial {
            llrs: vec![magnitude; n],
            true_bits: bitvec![u8, Msb0; 0; n],
            saturations: 0,
        }
    }

    #[test]
    fn test_all_zero_trial_converges_immediately() {
        let h = ParityCheckMatrix::gallager(96, 3, 6, 1).unwrap();
        let result = all_zero_trial(&decoder(&h), 127).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.codeword.not_any());
    }

    #[test]
    fn test_inject_errors_sets_strong_ones() {
        let mut llrs = vec![127; 8];
        inject_errors(&mut llrs, &[1, 6], 127).unwrap();
        assert_eq!(llrs, vec![127, -127, 127, 127, 127, 127, -127, 127]);
        assert!(inject_errors(&mut llrs, &[8], 127).is_err());
    }

    #[test]
    fn test_campaign_on_clean_frames() {
        let h = ParityCheckMatrix::gallager(96, 3, 6, 4).unwrap();
        let dec = decoder(&h);
        let campaign = Campaign::new(CampaignConfig { trials: 16, seed: 3 }).unwrap();
        let stats = campaign.run(&dec, |_, _| Ok(all_zero(96, 100)));
        assert_eq!(stats.frames, 16);
        assert_eq!(stats.bits, 16 * 96);
        assert_eq!(stats.converged, 16);
        assert_eq!(stats.fer(), 0.0);
        assert_eq!(stats.ber(), 0.0);
        assert_eq!(stats.mean_iterations(), 1.0);
    }

    #[test]
    fn test_campaign_counts_failures_without_aborting() {
        let h = ParityCheckMatrix::gallager(48, 3, 6, 2).unwrap();
        let dec = decoder(&h);
        let campaign = Campaign::new(CampaignConfig { trials: 10, seed: 0 }).unwrap();
        let stats = campaign.run(&dec, |index, _| {
            if index % 2 == 0 {
                Ok(all_zero(48, 127))
            } else {
                Ok(all_zero(47, 127))
            }
        });
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.failed_trials, 5);
        assert!(stats.to_string().contains("failed=5"));
    }

    #[test]
    fn test_undecodable_frames_counted_as_errors() {
        // Degree-1 checks pin both bits to 0 against saturated priors
        let h = ParityCheckMatrix::from_rows(2, vec![vec![0, 1], vec![0], vec![1]]).unwrap();
        let dec = LdpcDecoder::new(
            Arc::new(ParityCheckGraph::new(&h)),
            DecoderConfig {
                max_iterations: 4,
                ..Default::default()
            },
        )
        .unwrap();
        let campaign = Campaign::new(CampaignConfig { trials: 3, seed: 0 }).unwrap();
        let stats = campaign.run(&dec, |_, _| {
            Ok(Trial {
                llrs: vec![-128, -128],
                true_bits: bitvec![u8, Msb0; 0; 2],
                saturations: 0,
            })
        });
        assert_eq!(stats.frame_errors, 3);
        assert_eq!(stats.bit_errors, 6);
        assert_eq!(stats.converged, 0);
        assert_eq!(stats.mean_iterations(), 4.0);
        assert_eq!(stats.fer(), 1.0);
    }

    #[test]
    fn test_campaign_is_reproducible() {
        let h = ParityCheckMatrix::gallager(96, 3, 6, 8).unwrap();
        let dec = decoder(&h);
        let campaign = Campaign::new(CampaignConfig { trials: 32, seed: 77 }).unwrap();
        let noisy = |_: usize, rng: &mut StdRng| {
            let llrs = (0..96).map(|_| rng.random_range(-20..=60)).collect();
            Ok::<_, Error>(Trial {
                llrs,
                true_bits: bitvec![u8, Msb0; 0; 96],
                saturations: 0,
            })
        };
        assert_eq!(campaign.run(&dec, noisy), campaign.run(&dec, noisy));
    }

    #[test]
    fn test_most_negative_magnitude_does_not_overflow() {
        let h = ParityCheckMatrix::gallager(48, 3, 6, 2).unwrap();
        let result = all_zero_trial(&decoder(&h), i32::MIN).unwrap();
        assert!(result.converged);
        assert!(result.codeword.not_any());

        let mut llrs = vec![0; 4];
        inject_errors(&mut llrs, &[2], i32::MIN).unwrap();
        assert_eq!(llrs, vec![0, 0, -i32::MAX, 0]);
    }

    #[test]
    fn test_quantizer_clamps_reach_campaign_stats() {
        // Sharp clusters at gain 16 push every LLR past the 8-bit range
        let h = ParityCheckMatrix::gallager(96, 3, 6, 6).unwrap();
        let encoder = Encoder::new(&h);
        let sim = ReadoutSimulator {
            samples: 100,
            noise_sigma: 0.3,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let (zeros, ones) = sim.calibration(300, &mut rng).unwrap();
        let rx =
            Receiver::calibrate(LocalOscillator::default(), &zeros, &ones, decoder(&h)).unwrap();

        let trial = readout_trial(&rx, &sim, &encoder, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(trial.saturations > 0);
        let result = rx.decoder().decode(&trial.llrs).unwrap();

        let campaign = Campaign::new(CampaignConfig { trials: 1, seed: 1 }).unwrap();
        let stats = campaign.run(rx.decoder(), |_, rng| readout_trial(&rx, &sim, &encoder, rng));
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.saturation_events, trial.saturations + result.saturation_events);
        assert!(stats.saturation_events > result.saturation_events);
    }

    #[test]
    fn test_record_counts_input_saturations() {
        let h = ParityCheckMatrix::gallager(48, 3, 6, 2).unwrap();
        let trial = Trial {
            saturations: 5,
            ..all_zero(48, 127)
        };
        let result = decoder(&h).decode(&trial.llrs).unwrap();
        let mut stats = CampaignStats::default();
        stats.record(&trial, &result);
        assert_eq!(stats.saturation_events, 5 + result.saturation_events);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let err = Campaign::new(CampaignConfig { trials: 0, seed: 0 }).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_display_summary() {
        let stats = CampaignStats {
            frames: 4,
            frame_errors: 1,
            bit_errors: 2,
            bits: 400,
            converged: 3,
            saturation_events: 0,
            iterations: 10,
            failed_trials: 0,
        };
        let line = stats.to_string();
        assert!(line.contains("FER=2.500e-1"));
        assert!(line.contains("BER=5.000e-3"));
        assert!(line.contains("mean_iters=2.50"));
        assert!(!line.contains("failed"));
    }
}
