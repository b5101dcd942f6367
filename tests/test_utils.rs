//! Shared utilities for integration tests

#![allow(dead_code)]

use qreadout::ldpc::{DecoderConfig, LdpcDecoder, ParityCheckGraph, ParityCheckMatrix};
use std::path::PathBuf;
use std::sync::Arc;

pub fn decoder_for(matrix: &ParityCheckMatrix, config: DecoderConfig) -> LdpcDecoder {
    LdpcDecoder::new(Arc::new(ParityCheckGraph::new(matrix)), config).unwrap()
}

/// Greedily pick up to `wanted` variables whose closed two-hop neighbourhoods
/// are pairwise disjoint and free of 4-cycles through the variable
///
/// A strong error on such a set is corrected in one flooding iteration: every
/// neighbour of an error still sees at least one agreeing check.
pub fn isolated_positions(graph: &ParityCheckGraph, wanted: usize) -> Vec<usize> {
    let mut used = vec![false; graph.num_vars()];
    let mut chosen = Vec::new();

    for v in 0..graph.num_vars() {
        if chosen.len() == wanted {
            break;
        }
        if graph.var_degree(v) < 2 {
            continue;
        }

        let mut ball = vec![v];
        let mut simple = true;
        for &c in graph.checks_of(v) {
            for &u in graph.vars_of(c) {
                if u == v {
                    continue;
                }
                if ball.contains(&u) {
                    simple = false;
                }
                ball.push(u);
            }
        }
        if !simple || ball.iter().any(|&u| used[u]) {
            continue;
        }

        for &u in &ball {
            used[u] = true;
        }
        chosen.push(v);
    }
    chosen
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qreadout-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
