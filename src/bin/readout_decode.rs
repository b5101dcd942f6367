//! Decode one LLR memory file against an alist parity-check matrix
//!
//! Usage:
//!   readout_decode [OPTIONS] <code.alist> <llr.mem>
//!
//! Options:
//!   -a, --algorithm <name>  min-sum or sum-product (default: min-sum)
//!   -i, --iters <N>         Maximum decoder iterations (default: 50)
//!   -w, --width <bits>      LLR bit width of the memory file (default: 8)
//!   -t, --truth <path>      Ground-truth bit file to score against
//!   -h, --help              Show this help message

use qreadout::fixed::FixedFormat;
use qreadout::ldpc::{Algorithm, DecoderConfig, LdpcDecoder, ParityCheckGraph, ParityCheckMatrix};
use qreadout::mem;
use qreadout::tracing_init::init_tracing;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

struct DecodeArgs {
    alist_path: String,
    mem_path: String,
    truth_path: Option<String>,
    algorithm: Algorithm,
    max_iterations: usize,
    bit_width: u32,
}

impl DecodeArgs {
    fn parse_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let defaults = DecoderConfig::default();

        let mut algorithm = defaults.algorithm;
        let mut max_iterations = defaults.max_iterations;
        let mut bit_width = defaults.bit_width;
        let mut truth_path = None;
        let mut positional = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-a" | "--algorithm" => {
                    i += 1;
                    let value = args.get(i).ok_or("Missing value for --algorithm")?;
                    algorithm = value.parse()?;
                }
                "-i" | "--iters" => {
                    i += 1;
                    let value = args.get(i).ok_or("Missing value for --iters")?;
                    max_iterations = value
                        .parse()
                        .map_err(|_| format!("Invalid iteration count: {}", value))?;
                }
                "-w" | "--width" => {
                    i += 1;
                    let value = args.get(i).ok_or("Missing value for --width")?;
                    bit_width = value.parse().map_err(|_| format!("Invalid bit width: {}", value))?;
                }
                "-t" | "--truth" => {
                    i += 1;
                    truth_path = Some(args.get(i).ok_or("Missing value for --truth")?.clone());
                }
                "-h" | "--help" => {
                    print_help(&args[0]);
                    std::process::exit(0);
                }
                arg if !arg.starts_with('-') => positional.push(arg.to_string()),
                arg => return Err(format!("Unknown option: {}", arg)),
            }
            i += 1;
        }

        let [alist_path, mem_path]: [String; 2] = positional
            .try_into()
            .map_err(|_| "Expected exactly two arguments: <code.alist> <llr.mem>".to_string())?;

        Ok(DecodeArgs {
            alist_path,
            mem_path,
            truth_path,
            algorithm,
            max_iterations,
            bit_width,
        })
    }
}

fn print_help(program: &str) {
    eprintln!("LDPC decode of a readout LLR memory file");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] <code.alist> <llr.mem>", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -a, --algorithm <name>  min-sum or sum-product (default: min-sum)");
    eprintln!("  -i, --iters <N>         Maximum decoder iterations (default: 50)");
    eprintln!("  -w, --width <bits>      LLR bit width (default: 8)");
    eprintln!("  -t, --truth <path>      Ground-truth bit file to score against");
    eprintln!("  -h, --help              Show this help message");
}

fn main() -> Result<(), String> {
    init_tracing();
    let args = DecodeArgs::parse_args()?;

    let matrix = ParityCheckMatrix::load_alist(&args.alist_path).map_err(|e| e.to_string())?;
    let format = FixedFormat::new(args.bit_width).map_err(|e| e.to_string())?;
    let llrs = mem::load_llr_mem(&args.mem_path, format).map_err(|e| e.to_string())?;

    let config = DecoderConfig {
        bit_width: args.bit_width,
        algorithm: args.algorithm,
        max_iterations: args.max_iterations,
        ..Default::default()
    };
    let graph = Arc::new(ParityCheckGraph::new(&matrix));
    println!(
        "Code:       n={} m={} edges={}",
        graph.num_vars(),
        graph.num_checks(),
        graph.num_edges()
    );
    let decoder = LdpcDecoder::new(graph, config).map_err(|e| e.to_string())?;
    let result = decoder.decode(&llrs).map_err(|e| e.to_string())?;

    let input_ones = llrs.iter().filter(|&&q| q < 0).count();
    println!("Input:      {} LLRs, {} hard ones", llrs.len(), input_ones);
    println!("Status:     {:?}", result.status);
    println!("Iterations: {}", result.iterations);
    println!("Syndrome:   {}", result.syndrome_weight);
    println!("Saturation: {}", result.saturation_events);
    println!("Output:     {} ones", result.codeword.count_ones());

    if let Some(path) = &args.truth_path {
        let file = File::open(path).map_err(|e| format!("{}: {}", path, e))?;
        let truth = mem::read_bits(BufReader::new(file)).map_err(|e| e.to_string())?;
        if truth.len() != result.codeword.len() {
            return Err(format!(
                "Truth file has {} bits, codeword has {}",
                truth.len(),
                result.codeword.len()
            ));
        }
        let errors = truth
            .iter()
            .zip(result.codeword.iter().by_vals())
            .filter(|&(&t, d)| t != d)
            .count();
        println!("Bit errors: {}", errors);
    }

    Ok(())
}
