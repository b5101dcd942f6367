//! Systematic encoder derived from the parity-check matrix
//!
//! H is reduced to row echelon form over GF(2). Non-pivot columns carry the
//! message bits; each pivot bit is the parity of the message bits its reduced
//! row touches. Redundant (dependent) rows of H are dropped, so the code
//! dimension is `n - rank(H)`.

use super::matrix::ParityCheckMatrix;
use super::Codeword;
use crate::error::{LengthMismatchSnafu, Result};
use bitvec::prelude::*;
use snafu::ensure;

#[derive(Debug, Clone)]
pub struct Encoder {
    num_vars: usize,
    /// Reduced rows with their pivot column
    rows: Vec<(usize, BitVec<u64, Lsb0>)>,
    /// Codeword positions that carry message bits, ascending
    message_positions: Vec<usize>,
}

impl Encoder {
    pub fn new(matrix: &ParityCheckMatrix) -> Self {
        let n = matrix.num_vars();
        let mut rows: Vec<BitVec<u64, Lsb0>> = matrix
            .rows()
            .iter()
            .map(|row| {
                let mut bits = bitvec![u64, Lsb0; 0; n];
                for &c in row {
                    bits.set(c, true);
                }
                bits
            })
            .collect();

        let mut pivots = Vec::new();
        let mut rank = 0;
        for col in 0..n {
            if rank == rows.len() {
                break;
            }
            let Some(found) = (rank..rows.len()).find(|&r| rows[r][col]) else {
                continue;
            };
            rows.swap(rank, found);
            let pivot_words = rows[rank].as_raw_slice().to_vec();
            for (r, row) in rows.iter_mut().enumerate() {
                if r != rank && row[col] {
                    for (w, p) in row.as_raw_mut_slice().iter_mut().zip(&pivot_words) {
                        *w ^= p;
                    }
                }
            }
            pivots.push(col);
            rank += 1;
        }
        rows.truncate(rank);

        let mut is_pivot = vec![false; n];
        for &p in &pivots {
            is_pivot[p] = true;
        }
        let message_positions = (0..n).filter(|&c| !is_pivot[c]).collect();

        Self {
            num_vars: n,
            rows: pivots.into_iter().zip(rows).collect(),
            message_positions,
        }
    }

    /// Number of message bits per codeword
    pub fn dimension(&self) -> usize {
        self.message_positions.len()
    }

    pub fn message_positions(&self) -> &[usize] {
        &self.message_positions
    }

    pub fn encode(&self, message: &BitSlice<u8, Msb0>) -> Result<Codeword> {
        ensure!(
            message.len() == self.dimension(),
            LengthMismatchSnafu {
                what: "message",
                expected: self.dimension(),
                actual: message.len(),
            }
        );

        let mut codeword = bitvec![u8, Msb0; 0; self.num_vars];
        for (&pos, bit) in self.message_positions.iter().zip(message.iter().by_vals()) {
            codeword.set(pos, bit);
        }
        for (pivot, row) in &self.rows {
            let parity = row
                .iter_ones()
                .filter(|&c| c != *pivot)
                .fold(false, |acc, c| acc ^ codeword[c]);
            codeword.set(*pivot, parity);
        }
        Ok(codeword)
    }

    /// Message bits of a codeword
    pub fn extract(&self, codeword: &BitSlice<u8, Msb0>) -> Codeword {
        self.message_positions.iter().map(|&p| codeword[p]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_dimension_and_validity() {
        let h = ParityCheckMatrix::from_dense(&[
            vec![1, 1, 1, 0, 1, 0, 0],
            vec![1, 1, 0, 1, 0, 1, 0],
            vec![1, 0, 1, 1, 0, 0, 1],
        ])
        .unwrap();
        let enc = Encoder::new(&h);
        assert_eq!(enc.dimension(), 4);
        // Elimination pivots on the leftmost columns
        assert_eq!(enc.message_positions(), &[3, 4, 5, 6]);
        for m in 0u8..16 {
            let msg: Codeword = (0..4).map(|i| (m >> i) & 1 == 1).collect();
            let cw = enc.encode(&msg).unwrap();
            assert_eq!(h.syndrome_weight(&cw).unwrap(), 0);
            assert_eq!(enc.extract(&cw), msg);
        }
    }

    #[test]
    fn test_dependent_rows_raise_dimension() {
        // Third row is the sum of the first two
        let rows = vec![vec![0, 1], vec![1, 2, 3], vec![0, 2, 3]];
        let h = ParityCheckMatrix::from_rows(4, rows).unwrap();
        let enc = Encoder::new(&h);
        assert_eq!(enc.dimension(), 2);
    }

    #[test]
    fn test_gallager_codewords_satisfy_checks() {
        let h = ParityCheckMatrix::gallager(60, 3, 6, 3).unwrap();
        let enc = Encoder::new(&h);
        assert!(enc.dimension() >= 30);
        let msg: Codeword = (0..enc.dimension()).map(|i| i % 3 == 0).collect();
        let cw = enc.encode(&msg).unwrap();
        assert_eq!(h.syndrome_weight(&cw).unwrap(), 0);
        for (&pos, bit) in enc.message_positions().iter().zip(msg.iter().by_vals()) {
            assert_eq!(cw[pos], bit);
        }
        assert!(enc.encode(&msg[1..]).is_err());
    }
}
