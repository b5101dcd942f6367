//! Simulated end-to-end readout campaign
//!
//! Calibrates the receiver on synthetic traces, then decodes random codewords
//! and reports BER/FER before and after LDPC decoding.
//!
//! Usage:
//!   readout_campaign [OPTIONS]
//!
//! Options:
//!   -c, --code <N>          Gallager (3,6) code length (default: 576)
//!       --alist <path>      Use an alist code instead of a Gallager code
//!   -k, --shots <K>         Codewords to decode (default: 200)
//!   -s, --sigma <S>         Per-sample noise sigma (default: 2.0)
//!       --samples <N>       Samples per trace (default: 500)
//!   -x, --seed <X>          RNG seed (default: 1)
//!   -a, --algorithm <name>  min-sum or sum-product (default: min-sum)
//!   -i, --iters <N>         Maximum decoder iterations (default: 50)
//!   -m, --mem-out <path>    Write the first block's LLRs and truth bits
//!   -h, --help              Show this help message

use qreadout::demod::LocalOscillator;
use qreadout::harness::{readout_trial, Campaign, CampaignConfig};
use qreadout::ldpc::{
    Algorithm, DecoderConfig, Encoder, LdpcDecoder, ParityCheckGraph, ParityCheckMatrix,
};
use qreadout::mem;
use qreadout::receiver::Receiver;
use qreadout::simulation::ReadoutSimulator;
use qreadout::tracing_init::init_tracing;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

const CALIBRATION_SHOTS: usize = 500;

struct CampaignArgs {
    code_len: usize,
    alist_path: Option<String>,
    shots: usize,
    sigma: f64,
    samples: usize,
    seed: u64,
    algorithm: Algorithm,
    max_iterations: usize,
    mem_out: Option<String>,
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a String, String> {
    args.get(i).ok_or_else(|| format!("Missing value for {}", flag))
}

impl CampaignArgs {
    fn parse_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();

        let mut parsed = CampaignArgs {
            code_len: 576,
            alist_path: None,
            shots: 200,
            sigma: 2.0,
            samples: 500,
            seed: 1,
            algorithm: Algorithm::MinSum,
            max_iterations: DecoderConfig::default().max_iterations,
            mem_out: None,
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "-c" | "--code" => {
                    i += 1;
                    let v = value(&args, i, flag)?;
                    parsed.code_len = v.parse().map_err(|_| format!("Invalid code length: {}", v))?;
                }
                "--alist" => {
                    i += 1;
                    parsed.alist_path = Some(value(&args, i, flag)?.clone());
                }
                "-k" | "--shots" => {
                    i += 1;
                    let v = value(&args, i, flag)?;
                    parsed.shots = v.parse().map_err(|_| format!("Invalid shot count: {}", v))?;
                }
                "-s" | "--sigma" => {
                    i += 1;
                    let v = value(&args, i, flag)?;
                    parsed.sigma = v.parse().map_err(|_| format!("Invalid sigma: {}", v))?;
                }
                "--samples" => {
                    i += 1;
                    let v = value(&args, i, flag)?;
                    parsed.samples = v.parse().map_err(|_| format!("Invalid sample count: {}", v))?;
                }
                "-x" | "--seed" => {
                    i += 1;
                    let v = value(&args, i, flag)?;
                    parsed.seed = v.parse().map_err(|_| format!("Invalid seed: {}", v))?;
                }
                "-a" | "--algorithm" => {
                    i += 1;
                    parsed.algorithm = value(&args, i, flag)?.parse()?;
                }
                "-i" | "--iters" => {
                    i += 1;
                    let v = value(&args, i, flag)?;
                    parsed.max_iterations = v
                        .parse()
                        .map_err(|_| format!("Invalid iteration count: {}", v))?;
                }
                "-m" | "--mem-out" => {
                    i += 1;
                    parsed.mem_out = Some(value(&args, i, flag)?.clone());
                }
                "-h" | "--help" => {
                    print_help(&args[0]);
                    std::process::exit(0);
                }
                arg => return Err(format!("Unknown option: {}", arg)),
            }
            i += 1;
        }

        Ok(parsed)
    }
}

fn print_help(program: &str) {
    eprintln!("Simulated qubit readout campaign");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --code <N>          Gallager (3,6) code length (default: 576)");
    eprintln!("      --alist <path>      Use an alist code instead of a Gallager code");
    eprintln!("  -k, --shots <K>         Codewords to decode (default: 200)");
    eprintln!("  -s, --sigma <S>         Per-sample noise sigma (default: 2.0)");
    eprintln!("      --samples <N>       Samples per trace (default: 500)");
    eprintln!("  -x, --seed <X>          RNG seed (default: 1)");
    eprintln!("  -a, --algorithm <name>  min-sum or sum-product (default: min-sum)");
    eprintln!("  -i, --iters <N>         Maximum decoder iterations (default: 50)");
    eprintln!("  -m, --mem-out <path>    Write the first block's LLRs and truth bits");
    eprintln!("  -h, --help              Show this help message");
}

fn main() -> Result<(), String> {
    init_tracing();
    let args = CampaignArgs::parse_args()?;

    let matrix = match &args.alist_path {
        Some(path) => ParityCheckMatrix::load_alist(path),
        None => ParityCheckMatrix::gallager(args.code_len, 3, 6, args.seed),
    }
    .map_err(|e| e.to_string())?;
    let encoder = Encoder::new(&matrix);
    let graph = Arc::new(ParityCheckGraph::new(&matrix));

    println!("Qubit Readout Campaign");
    println!("======================");
    println!(
        "Code:       n={} m={} k={}",
        graph.num_vars(),
        graph.num_checks(),
        encoder.dimension()
    );
    println!("Noise:      sigma={} over {} samples", args.sigma, args.samples);
    println!("Decoder:    {:?}, max {} iterations", args.algorithm, args.max_iterations);
    println!("Shots:      {}", args.shots);
    println!();

    let config = DecoderConfig {
        algorithm: args.algorithm,
        max_iterations: args.max_iterations,
        ..Default::default()
    };
    let decoder = LdpcDecoder::new(graph, config).map_err(|e| e.to_string())?;

    let simulator = ReadoutSimulator {
        samples: args.samples,
        noise_sigma: args.sigma,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(args.seed);
    let (zeros, ones) = simulator
        .calibration(CALIBRATION_SHOTS, &mut rng)
        .map_err(|e| e.to_string())?;
    let receiver = Receiver::calibrate(LocalOscillator::default(), &zeros, &ones, decoder)
        .map_err(|e| e.to_string())?;
    let model = receiver.generator().model();
    println!(
        "Calibrated: mean0={:.4} mean1={:.4} separation={:.2}",
        model.hypothesis(false).mean,
        model.hypothesis(true).mean,
        model.separation()
    );

    if let Some(path) = &args.mem_out {
        let block = readout_trial(&receiver, &simulator, &encoder, &mut rng)
            .map_err(|e| e.to_string())?;
        let format = receiver.generator().quantizer().format();
        mem::save_llr_mem(path, &block.llrs, format).map_err(|e| e.to_string())?;
        let truth_path = format!("{}.truth", path);
        mem::save_bits(&truth_path, block.true_bits.iter().by_vals()).map_err(|e| e.to_string())?;
        println!("Wrote {} and {}", path, truth_path);
    }

    let campaign = Campaign::new(CampaignConfig {
        trials: args.shots,
        seed: args.seed.wrapping_add(1),
    })
    .map_err(|e| e.to_string())?;

    let raw_errors = AtomicUsize::new(0);
    let start = Instant::now();
    let stats = campaign.run(receiver.decoder(), |_, rng| {
        let trial = readout_trial(&receiver, &simulator, &encoder, rng)?;
        let errors = trial
            .llrs
            .iter()
            .zip(trial.true_bits.iter().by_vals())
            .filter(|&(&q, bit)| (q < 0) != bit)
            .count();
        raw_errors.fetch_add(errors, Ordering::Relaxed);
        Ok(trial)
    });
    let elapsed = start.elapsed();

    let raw_ber = if stats.bits == 0 {
        0.0
    } else {
        raw_errors.load(Ordering::Relaxed) as f64 / stats.bits as f64
    };
    println!();
    println!("Channel:    BER={:.3e}", raw_ber);
    println!("Decoded:    {}", stats);
    println!(
        "Elapsed:    {:.2?} ({:.3} ms/frame)",
        elapsed,
        elapsed.as_secs_f64() * 1e3 / args.shots as f64
    );
    Ok(())
}
