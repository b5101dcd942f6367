//! LDPC (Low-Density Parity Check) error correction
//!
//! **Code definition**: a sparse parity-check matrix, loaded from alist text
//! or built from dense rows, quasi-cyclic base matrices, or a seeded Gallager
//! construction. The matrix becomes an immutable arena graph that any number
//! of decoders can share.
//!
//! **Decoding**: fixed-point belief propagation (min-sum or sum-product) on
//! quantized LLRs, with early exit on a zero syndrome.
//!
//! **Encoding**: systematic encoder from GF(2) elimination of H, used to draw
//! random test codewords.

mod decode;
mod encode;
mod graph;
mod matrix;

use bitvec::prelude::*;

/// Hard-decision bits, index 0 first
pub type Codeword = BitVec<u8, Msb0>;

pub use decode::{
    Algorithm, DecodeResult, DecoderConfig, DecoderState, DecoderStatus, IterationReport,
    LdpcDecoder,
};
pub use encode::Encoder;
pub use graph::{Edge, ParityCheckGraph};
pub use matrix::ParityCheckMatrix;
