//! Qubit readout receiver with a fixed-point LDPC decoder
//!
//! IQ trace -> [`demod`] statistic -> [`llr`] quantized LLR -> [`ldpc`]
//! decoder -> corrected bits. [`harness`] drives BER/FER campaigns over it.

pub mod demod;
pub mod error;
pub mod fixed;
pub mod harness;
pub mod iq;
pub mod ldpc;
pub mod llr;
pub mod mem;
pub mod noise_model;
pub mod receiver;
pub mod simulation;
pub mod tracing_init;

pub use demod::{DemodulatorProjector, LocalOscillator, ReferenceAxis};
pub use error::{Error, Result};
pub use harness::{Campaign, CampaignConfig, CampaignStats, Trial};
pub use iq::{IqTrace, ReadoutRecord};
pub use ldpc::{
    Algorithm, DecodeResult, DecoderConfig, DecoderStatus, LdpcDecoder, ParityCheckGraph,
    ParityCheckMatrix,
};
pub use llr::{LlrGenerator, Quantizer, QuantizerConfig, Rounding};
pub use noise_model::NoiseModel;
pub use receiver::{BlockOutcome, Receiver};
pub use simulation::ReadoutSimulator;
