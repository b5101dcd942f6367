//! Fixed-point belief-propagation decoder (min-sum or sum-product)
//!
//! Flooding schedule over a shared [`ParityCheckGraph`]:
//!
//! 1. variable->check messages start at the channel LLR, check->variable at 0
//! 2. every check sends each neighbour a message built from all *other*
//!    incoming messages
//! 3. every variable sends each check its channel LLR plus all *other*
//!    incoming check messages
//! 4. hard decision on the total belief, syndrome check, early exit
//!
//! LLR sign convention: positive favours bit 0, a negative belief decides 1,
//! zero decides 0. All stored messages and beliefs saturate to the configured
//! width and each clamp is counted in [`DecodeResult::saturation_events`].

use super::graph::ParityCheckGraph;
use super::Codeword;
use crate::error::{InvalidConfigSnafu, LengthMismatchSnafu, Result};
use crate::fixed::FixedFormat;
use crate::llr::{Quantizer, QuantizerConfig, Rounding};
use bitvec::prelude::*;
use snafu::ensure;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Smallest magnitude fed to phi; phi(PHI_FLOOR) is about 28.3
const PHI_FLOOR: f64 = 1e-12;

/// Check-node combining rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Sign parity times the smallest other magnitude
    #[default]
    MinSum,
    /// Exact tanh rule via phi(x) = -ln tanh(x/2)
    SumProduct,
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "min-sum" | "minsum" => Ok(Algorithm::MinSum),
            "sum-product" | "sumproduct" | "spa" => Ok(Algorithm::SumProduct),
            other => Err(format!("unknown decoder algorithm '{}'", other)),
        }
    }
}

/// Configuration for the LDPC decoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
    /// Two's-complement width of LLRs and messages
    pub bit_width: u32,
    /// LLR units per real LLR unit, used by sum-product to leave the integer domain
    pub quant_gain: f64,
    pub rounding_mode: Rounding,
    pub algorithm: Algorithm,
    pub max_iterations: usize,
    /// Stop as soon as the hard decisions satisfy every check
    pub early_exit_on_valid_syndrome: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            bit_width: 8,
            quant_gain: 16.0,
            rounding_mode: Rounding::Nearest,
            algorithm: Algorithm::MinSum,
            max_iterations: 50,
            early_exit_on_valid_syndrome: true,
        }
    }
}

impl DecoderConfig {
    /// Quantizer matching this decoder's fixed-point format
    pub fn quantizer(&self) -> Result<Quantizer> {
        Quantizer::new(QuantizerConfig {
            bit_width: self.bit_width,
            gain: self.quant_gain,
            rounding: self.rounding_mode,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.quantizer()?;
        ensure!(
            self.max_iterations > 0,
            InvalidConfigSnafu {
                reason: "max_iterations must be at least 1",
            }
        );
        Ok(())
    }
}

/// Decoder state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderStatus {
    Initialized,
    Iterating,
    Converged,
    MaxItersReached,
}

/// Outcome of one decode call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    /// Last hard decisions (a valid codeword iff `converged`)
    pub codeword: Codeword,
    pub converged: bool,
    pub iterations: usize,
    pub syndrome_weight: usize,
    /// Clamps applied to inputs, messages and beliefs
    pub saturation_events: usize,
    /// `Iterating` only when an observer abandoned the decode
    pub status: DecoderStatus,
}

/// Per-iteration progress passed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub iteration: usize,
    pub syndrome_weight: usize,
    pub saturation_events: usize,
}

/// Message buffers owned by one decode invocation
///
/// Reusing a state across calls avoids reallocating; it is fully
/// reinitialised at the start of every decode.
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    channel: Vec<i32>,
    var_to_check: Vec<i32>,
    check_to_var: Vec<i32>,
    beliefs: Vec<i32>,
    /// Per-edge phi values, sum-product only
    phi: Vec<f64>,
}

impl DecoderState {
    pub fn new(graph: &ParityCheckGraph) -> Self {
        let mut state = Self::default();
        state.resize(graph);
        state
    }

    fn resize(&mut self, graph: &ParityCheckGraph) {
        self.channel.resize(graph.num_vars(), 0);
        self.beliefs.resize(graph.num_vars(), 0);
        self.var_to_check.resize(graph.num_edges(), 0);
        self.check_to_var.resize(graph.num_edges(), 0);
        self.phi.resize(graph.num_edges(), 0.0);
    }

    /// Total beliefs after the last iteration
    pub fn beliefs(&self) -> &[i32] {
        &self.beliefs
    }
}

/// LDPC decoder over a shared, immutable graph
#[derive(Debug, Clone)]
pub struct LdpcDecoder {
    graph: Arc<ParityCheckGraph>,
    config: DecoderConfig,
    format: FixedFormat,
    quantizer: Quantizer,
}

#[inline]
fn phi(x: f64) -> f64 {
    -(x.max(PHI_FLOOR) * 0.5).tanh().ln()
}

impl LdpcDecoder {
    pub fn new(graph: Arc<ParityCheckGraph>, config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let quantizer = config.quantizer()?;
        Ok(Self {
            graph,
            config,
            format: quantizer.format(),
            quantizer,
        })
    }

    pub fn graph(&self) -> &Arc<ParityCheckGraph> {
        &self.graph
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one block of quantized channel LLRs with fresh buffers
    pub fn decode(&self, llrs: &[i32]) -> Result<DecodeResult> {
        let mut state = DecoderState::new(&self.graph);
        self.decode_with_state(llrs, &mut state)
    }

    /// Decode reusing caller-owned buffers
    pub fn decode_with_state(
        &self,
        llrs: &[i32],
        state: &mut DecoderState,
    ) -> Result<DecodeResult> {
        self.decode_with_observer(llrs, state, |_| ControlFlow::Continue(()))
    }

    /// Decode, calling `observer` after every iteration
    ///
    /// The converging iteration is reported too. Returning
    /// `ControlFlow::Break` abandons the decode at that iteration boundary;
    /// the result then reports `status == Iterating` unless that iteration
    /// already converged.
    #[instrument(
        level = "debug",
        skip(self, llrs, state, observer),
        fields(n = llrs.len(), algorithm = ?self.config.algorithm)
    )]
    pub fn decode_with_observer<F>(
        &self,
        llrs: &[i32],
        state: &mut DecoderState,
        mut observer: F,
    ) -> Result<DecodeResult>
    where
        F: FnMut(&IterationReport) -> ControlFlow<()>,
    {
        let n = self.graph.num_vars();
        ensure!(
            llrs.len() == n,
            LengthMismatchSnafu {
                what: "LLR vector",
                expected: n,
                actual: llrs.len(),
            }
        );

        let mut events = 0usize;
        state.resize(&self.graph);
        self.initialize(llrs, state, &mut events);
        let mut status = DecoderStatus::Initialized;
        let mut codeword = bitvec![u8, Msb0; 0; n];
        let mut syndrome_weight = 0;
        let mut iterations = 0;

        for iteration in 1..=self.config.max_iterations {
            status = DecoderStatus::Iterating;
            iterations = iteration;

            match self.config.algorithm {
                Algorithm::MinSum => self.check_update_min_sum(state, &mut events),
                Algorithm::SumProduct => self.check_update_sum_product(state, &mut events),
            }
            self.variable_update(state, &mut events);

            for (v, &belief) in state.beliefs.iter().enumerate() {
                codeword.set(v, belief < 0);
            }
            syndrome_weight = self.graph.syndrome_weight(&codeword);
            trace!(iteration, syndrome_weight, events, "iteration complete");

            let report = IterationReport {
                iteration,
                syndrome_weight,
                saturation_events: events,
            };
            let abandon = observer(&report).is_break();

            if syndrome_weight == 0 && self.config.early_exit_on_valid_syndrome {
                status = DecoderStatus::Converged;
                break;
            }
            if abandon {
                debug!(iteration, syndrome_weight, "decode abandoned by caller");
                break;
            }
        }

        if status == DecoderStatus::Iterating && iterations == self.config.max_iterations {
            status = if syndrome_weight == 0 {
                DecoderStatus::Converged
            } else {
                DecoderStatus::MaxItersReached
            };
        }

        let converged = status == DecoderStatus::Converged;
        if !converged {
            debug!(iterations, syndrome_weight, events, ?status, "decode did not converge");
        }
        Ok(DecodeResult {
            codeword,
            converged,
            iterations,
            syndrome_weight,
            saturation_events: events,
            status,
        })
    }

    fn initialize(&self, llrs: &[i32], state: &mut DecoderState, events: &mut usize) {
        for (ch, &llr) in state.channel.iter_mut().zip(llrs) {
            *ch = self.format.saturate_counted(llr as i64, events);
        }
        for (e, edge) in self.graph.edges().iter().enumerate() {
            state.var_to_check[e] = state.channel[edge.var];
        }
        state.check_to_var.fill(0);
        state.beliefs.copy_from_slice(&state.channel);
    }

    /// Min-sum with first/second minimum so each edge excludes itself in O(1)
    fn check_update_min_sum(&self, state: &mut DecoderState, events: &mut usize) {
        let max = self.format.max() as i64;
        for c in 0..self.graph.num_checks() {
            let edges = self.graph.check_edges(c);
            if edges.len() == 1 {
                // No other neighbour: the check alone forces this bit to 0
                state.check_to_var[edges.start] = max as i32;
                continue;
            }

            let mut negative = false;
            let mut min1 = i64::MAX;
            let mut min2 = i64::MAX;
            let mut argmin = edges.start;
            for e in edges.clone() {
                let m = state.var_to_check[e] as i64;
                negative ^= m < 0;
                let mag = m.abs();
                if mag < min1 {
                    min2 = min1;
                    min1 = mag;
                    argmin = e;
                } else if mag < min2 {
                    min2 = mag;
                }
            }

            for e in edges {
                let own = state.var_to_check[e];
                let mag = if e == argmin { min2 } else { min1 };
                let out = if negative ^ (own < 0) { -mag } else { mag };
                state.check_to_var[e] = self.format.saturate_counted(out, events);
            }
        }
    }

    /// Sum-product in the phi domain with a subtract-self running sum
    fn check_update_sum_product(&self, state: &mut DecoderState, events: &mut usize) {
        let max = self.format.max();
        for c in 0..self.graph.num_checks() {
            let edges = self.graph.check_edges(c);
            if edges.len() == 1 {
                state.check_to_var[edges.start] = max;
                continue;
            }

            let mut negative = false;
            let mut total = 0.0f64;
            for e in edges.clone() {
                let m = state.var_to_check[e];
                negative ^= m < 0;
                let p = phi(self.quantizer.dequantize(m).abs());
                state.phi[e] = p;
                total += p;
            }

            for e in edges {
                let own = state.var_to_check[e];
                let others = (total - state.phi[e]).max(0.0);
                let mag = phi(others);
                let out = if negative ^ (own < 0) { -mag } else { mag };
                let q = self.quantizer.quantize(out);
                if q.saturated {
                    *events += 1;
                }
                state.check_to_var[e] = q.value;
            }
        }
    }

    /// Channel plus incoming check messages, exact in i64 then saturated
    fn variable_update(&self, state: &mut DecoderState, events: &mut usize) {
        for v in 0..self.graph.num_vars() {
            let edges = self.graph.var_edges(v);
            let total = state.channel[v] as i64
                + edges.iter().map(|&e| state.check_to_var[e] as i64).sum::<i64>();
            state.beliefs[v] = self.format.saturate_counted(total, events);
            for &e in edges {
                let extrinsic = total - state.check_to_var[e] as i64;
                state.var_to_check[e] = self.format.saturate_counted(extrinsic, events);
            }
        }
    }
}
