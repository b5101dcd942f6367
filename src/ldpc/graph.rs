//! Tanner graph of a parity-check matrix in flat arena form
//!
//! Edges are stored once, grouped by check node. Each check owns a contiguous
//! range of edge indices; each variable keeps a list of the edge indices it
//! touches. Message buffers in the decoder are indexed by these edge indices,
//! so the topology itself never changes and can be shared between threads.

use super::matrix::ParityCheckMatrix;
use bitvec::prelude::*;
use std::ops::Range;

/// One nonzero entry of H
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub check: usize,
    pub var: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityCheckGraph {
    num_vars: usize,
    edges: Vec<Edge>,
    /// `check_offsets[c]..check_offsets[c + 1]` are the edges of check `c`
    check_offsets: Vec<usize>,
    /// CSR over variables: edge indices, and the matching check indices
    var_offsets: Vec<usize>,
    var_edge_ids: Vec<usize>,
    var_checks: Vec<usize>,
    check_vars: Vec<usize>,
}

impl ParityCheckGraph {
    pub fn new(matrix: &ParityCheckMatrix) -> Self {
        let num_vars = matrix.num_vars();
        let mut edges = Vec::new();
        let mut check_offsets = Vec::with_capacity(matrix.num_checks() + 1);
        let mut degrees = vec![0usize; num_vars];

        check_offsets.push(0);
        for (check, row) in matrix.rows().iter().enumerate() {
            for &var in row {
                edges.push(Edge { check, var });
                degrees[var] += 1;
            }
            check_offsets.push(edges.len());
        }

        let mut var_offsets = Vec::with_capacity(num_vars + 1);
        var_offsets.push(0);
        for d in &degrees {
            var_offsets.push(var_offsets[var_offsets.len() - 1] + d);
        }

        // Walking edges in check order keeps each variable's list sorted by check
        let mut fill = var_offsets[..num_vars].to_vec();
        let mut var_edge_ids = vec![0usize; edges.len()];
        let mut var_checks = vec![0usize; edges.len()];
        for (e, edge) in edges.iter().enumerate() {
            let slot = fill[edge.var];
            var_edge_ids[slot] = e;
            var_checks[slot] = edge.check;
            fill[edge.var] += 1;
        }
        let check_vars = edges.iter().map(|e| e.var).collect();

        Self {
            num_vars,
            edges,
            check_offsets,
            var_offsets,
            var_edge_ids,
            var_checks,
            check_vars,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_checks(&self) -> usize {
        self.check_offsets.len() - 1
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edge index range owned by check `c`
    #[inline]
    pub fn check_edges(&self, c: usize) -> Range<usize> {
        self.check_offsets[c]..self.check_offsets[c + 1]
    }

    /// Edge indices touching variable `v`, ordered by check
    #[inline]
    pub fn var_edges(&self, v: usize) -> &[usize] {
        &self.var_edge_ids[self.var_offsets[v]..self.var_offsets[v + 1]]
    }

    /// Checks incident to variable `v`, ascending
    pub fn checks_of(&self, v: usize) -> &[usize] {
        &self.var_checks[self.var_offsets[v]..self.var_offsets[v + 1]]
    }

    /// Variables incident to check `c`, ascending
    pub fn vars_of(&self, c: usize) -> &[usize] {
        &self.check_vars[self.check_edges(c)]
    }

    pub fn check_degree(&self, c: usize) -> usize {
        self.check_offsets[c + 1] - self.check_offsets[c]
    }

    pub fn var_degree(&self, v: usize) -> usize {
        self.var_offsets[v + 1] - self.var_offsets[v]
    }

    /// Number of unsatisfied checks; `bits.len()` must equal `num_vars`
    pub fn syndrome_weight(&self, bits: &BitSlice<u8, Msb0>) -> usize {
        (0..self.num_checks())
            .filter(|&c| self.vars_of(c).iter().filter(|&&v| bits[v]).count() % 2 == 1)
            .count()
    }
}
