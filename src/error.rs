//! Error types for the readout receiver
//!
//! Everything here is a configuration error: it is raised while building the
//! receiver or at the start of a decode, never from inside the iteration loop.
//! Decoder non-convergence is not an error, see [`crate::ldpc::DecodeResult`].

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Parity-check matrix is structurally invalid
    #[snafu(display("malformed parity-check matrix: {reason}"))]
    MalformedMatrix { reason: String },

    /// Alist text could not be parsed
    #[snafu(display("alist parse error at line {line}: {reason}"))]
    AlistParse { line: usize, reason: String },

    /// Calibration statistics are unusable for a Gaussian model
    #[snafu(display("degenerate noise model for bit {bit}: {reason}"))]
    DegenerateNoiseModel { bit: u8, reason: String },

    /// Projector calibration could not separate the two clusters
    #[snafu(display("degenerate projector calibration: {reason}"))]
    DegenerateCalibration { reason: String },

    /// Input vector length does not match the code
    #[snafu(display("{what} length mismatch: expected {expected}, got {actual}"))]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// IQ trace with no samples
    #[snafu(display("IQ trace is empty"))]
    EmptyTrace,

    /// Out-of-range configuration value
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },

    /// LLR memory file or bit file could not be parsed
    #[snafu(display("memory file parse error at line {line}: {reason}"))]
    MemParse { line: usize, reason: String },

    /// Underlying I/O failure
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O failure on a reader or writer with no path attached
    #[snafu(display("stream I/O error: {source}"))]
    Stream { source: std::io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
