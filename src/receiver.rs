//! End-to-end readout receiver
//!
//! Traces for one codeword go through projection, LLR generation and
//! quantization, then the LDPC decoder. The projector, noise model and decoder
//! are fixed after calibration and shared read-only, so one `Receiver` can
//! serve any number of threads.

use crate::demod::{DemodulatorProjector, LocalOscillator};
use crate::error::{LengthMismatchSnafu, Result};
use crate::iq::{IqTrace, ReadoutRecord};
use crate::ldpc::{DecodeResult, LdpcDecoder};
use crate::llr::{LlrGenerator, QuantizedBlock};
use crate::noise_model::NoiseModel;
use snafu::ensure;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct Receiver {
    projector: DemodulatorProjector,
    generator: LlrGenerator,
    decoder: LdpcDecoder,
}

/// Everything produced for one block of shots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub llrs: QuantizedBlock,
    pub result: DecodeResult,
    /// Errors of the hard decision on the channel LLRs alone
    pub raw_bit_errors: usize,
    /// Errors left after decoding
    pub bit_errors: usize,
}

impl Receiver {
    pub fn new(
        projector: DemodulatorProjector,
        generator: LlrGenerator,
        decoder: LdpcDecoder,
    ) -> Self {
        Self {
            projector,
            generator,
            decoder,
        }
    }

    /// Calibrate projector and noise model from labelled traces
    ///
    /// The quantizer follows the decoder's width, gain and rounding so the
    /// receiver never hands the decoder values in a different format.
    #[instrument(skip(traces0, traces1, decoder), fields(n0 = traces0.len(), n1 = traces1.len()))]
    pub fn calibrate(
        lo: LocalOscillator,
        traces0: &[IqTrace],
        traces1: &[IqTrace],
        decoder: LdpcDecoder,
    ) -> Result<Self> {
        let projector = DemodulatorProjector::calibrate(lo, traces0, traces1)?;
        let stats0 = projector.project_batch(traces0)?;
        let stats1 = projector.project_batch(traces1)?;
        let model = NoiseModel::from_calibration(&stats0, &stats1)?;
        info!(
            mean0 = model.hypothesis(false).mean,
            mean1 = model.hypothesis(true).mean,
            separation = model.separation(),
            "fitted noise model"
        );
        let generator = LlrGenerator::new(model, decoder.config().quantizer()?);
        Ok(Self::new(projector, generator, decoder))
    }

    pub fn projector(&self) -> &DemodulatorProjector {
        &self.projector
    }

    pub fn generator(&self) -> &LlrGenerator {
        &self.generator
    }

    pub fn decoder(&self) -> &LdpcDecoder {
        &self.decoder
    }

    /// Quantized channel LLRs for a block of traces, in trace order
    pub fn block_llrs(&self, traces: &[IqTrace]) -> Result<QuantizedBlock> {
        let stats = self.projector.project_batch(traces)?;
        Ok(self.generator.generate_block(&stats))
    }

    pub fn decode_block(&self, records: &[ReadoutRecord]) -> Result<BlockOutcome> {
        let n = self.decoder.graph().num_vars();
        ensure!(
            records.len() == n,
            LengthMismatchSnafu {
                what: "readout block",
                expected: n,
                actual: records.len(),
            }
        );

        let traces: Vec<IqTrace> = records.iter().map(|r| r.trace.clone()).collect();
        let llrs = self.block_llrs(&traces)?;
        let result = self.decoder.decode(&llrs.values)?;

        let raw_bit_errors = records
            .iter()
            .zip(&llrs.values)
            .filter(|&(r, &q)| (q < 0) != r.true_bit)
            .count();
        let bit_errors = records
            .iter()
            .zip(result.codeword.iter().by_vals())
            .filter(|&(r, bit)| bit != r.true_bit)
            .count();
        debug!(
            raw_bit_errors,
            bit_errors,
            saturations = llrs.saturations,
            iterations = result.iterations,
            "decoded readout block"
        );

        Ok(BlockOutcome {
            llrs,
            result,
            raw_bit_errors,
            bit_errors,
        })
    }
}
