//! Benchmark of LDPC decode throughput
//!
//! Times serial and rayon-parallel decoding of noisy 576-bit frames for both
//! check-node rules and a few channel qualities.

use qreadout::ldpc::{
    Algorithm, DecoderConfig, DecoderState, LdpcDecoder, ParityCheckGraph, ParityCheckMatrix,
};
use qreadout::llr::{Quantizer, QuantizerConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

const CODE_LEN: usize = 576;
const FRAMES: usize = 400;

/// All-zero frames over BPSK/AWGN with real LLR 2y/sigma^2
fn noisy_frames(sigma: f64, quantizer: &Quantizer, seed: u64) -> Vec<Vec<i32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sigma).unwrap();
    (0..FRAMES)
        .map(|_| {
            (0..CODE_LEN)
                .map(|_| {
                    let y = 1.0 + noise.sample(&mut rng);
                    quantizer.quantize(2.0 * y / (sigma * sigma)).value
                })
                .collect()
        })
        .collect()
}

fn main() {
    println!("\n=== LDPC Decode Benchmark ===\n");

    let matrix = ParityCheckMatrix::gallager(CODE_LEN, 3, 6, 1).unwrap();
    let graph = Arc::new(ParityCheckGraph::new(&matrix));
    let quantizer = Quantizer::new(QuantizerConfig::default()).unwrap();
    println!(
        "Code: n={} m={} edges={}, {} frames per run\n",
        graph.num_vars(),
        graph.num_checks(),
        graph.num_edges(),
        FRAMES
    );

    let test_configs = vec![("clean", 0.5), ("moderate", 0.7), ("noisy", 0.8)];

    for algorithm in [Algorithm::MinSum, Algorithm::SumProduct] {
        let decoder = LdpcDecoder::new(
            graph.clone(),
            DecoderConfig {
                algorithm,
                ..Default::default()
            },
        )
        .unwrap();

        for (name, sigma) in &test_configs {
            let frames = noisy_frames(*sigma, &quantizer, 7);

            let start = Instant::now();
            let mut state = DecoderState::new(&graph);
            let mut serial_iters = 0;
            let mut serial_converged = 0;
            for frame in &frames {
                let result = decoder.decode_with_state(frame, &mut state).unwrap();
                serial_iters += result.iterations;
                serial_converged += result.converged as usize;
            }
            let serial = start.elapsed();

            let start = Instant::now();
            let parallel_converged: usize = frames
                .par_iter()
                .map(|frame| decoder.decode(frame).unwrap().converged as usize)
                .sum();
            let parallel = start.elapsed();

            assert_eq!(serial_converged, parallel_converged);
            println!(
                "{:?} / {} (sigma={}): serial {:.2?} ({:.1} us/frame, {:.2} iters), \
                 parallel {:.2?} ({:.2}x), converged {}/{}",
                algorithm,
                name,
                sigma,
                serial,
                serial.as_secs_f64() * 1e6 / FRAMES as f64,
                serial_iters as f64 / FRAMES as f64,
                parallel,
                serial.as_secs_f64() / parallel.as_secs_f64(),
                serial_converged,
                FRAMES
            );
        }
        println!();
    }
}
