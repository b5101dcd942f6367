//! Sparse parity-check matrix
//!
//! Rows are parity checks, columns are codeword bits. Each row stores its
//! sorted, unique column indices. Every constructor enforces that no row and
//! no column is empty.

use super::Codeword;
use crate::error::{AlistParseSnafu, IoSnafu, LengthMismatchSnafu, MalformedMatrixSnafu, Result};
use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use snafu::{ensure, ResultExt};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityCheckMatrix {
    num_vars: usize,
    rows: Vec<Vec<usize>>,
}

impl ParityCheckMatrix {
    /// Build from the column indices of each row
    pub fn from_rows(num_vars: usize, rows: Vec<Vec<usize>>) -> Result<Self> {
        ensure!(
            num_vars > 0 && !rows.is_empty(),
            MalformedMatrixSnafu {
                reason: "matrix has no rows or no columns",
            }
        );

        let mut covered = vec![false; num_vars];
        let mut rows = rows;
        for (r, row) in rows.iter_mut().enumerate() {
            row.sort_unstable();
            row.dedup();
            ensure!(
                !row.is_empty(),
                MalformedMatrixSnafu {
                    reason: format!("row {} is all zero", r),
                }
            );
            for &c in row.iter() {
                ensure!(
                    c < num_vars,
                    MalformedMatrixSnafu {
                        reason: format!("row {} references column {} of {}", r, c, num_vars),
                    }
                );
                covered[c] = true;
            }
        }
        if let Some(c) = covered.iter().position(|&seen| !seen) {
            return MalformedMatrixSnafu {
                reason: format!("column {} is all zero", c),
            }
            .fail();
        }

        Ok(Self { num_vars, rows })
    }

    /// Build from dense 0/1 rows
    pub fn from_dense(dense: &[Vec<u8>]) -> Result<Self> {
        let num_vars = dense.first().map(|r| r.len()).unwrap_or(0);
        let mut rows = Vec::with_capacity(dense.len());
        for (r, row) in dense.iter().enumerate() {
            ensure!(
                row.len() == num_vars,
                MalformedMatrixSnafu {
                    reason: format!("row {} has {} columns, expected {}", r, row.len(), num_vars),
                }
            );
            let mut cols = Vec::new();
            for (c, &entry) in row.iter().enumerate() {
                match entry {
                    0 => {}
                    1 => cols.push(c),
                    other => {
                        return MalformedMatrixSnafu {
                            reason: format!("entry ({}, {}) is {}, not binary", r, c, other),
                        }
                        .fail()
                    }
                }
            }
            rows.push(cols);
        }
        Self::from_rows(num_vars, rows)
    }

    /// Expand a quasi-cyclic base matrix
    ///
    /// Each base entry is `-1` for an all-zero `z x z` block, or a shift `s`
    /// for the identity cyclically shifted right by `s mod z`.
    pub fn from_quasi_cyclic(base: &[Vec<i32>], z: usize) -> Result<Self> {
        ensure!(
            z > 0,
            MalformedMatrixSnafu {
                reason: "expansion factor must be positive",
            }
        );
        let base_cols = base.first().map(|r| r.len()).unwrap_or(0);
        let mut rows = vec![Vec::new(); base.len() * z];
        for (br, base_row) in base.iter().enumerate() {
            ensure!(
                base_row.len() == base_cols,
                MalformedMatrixSnafu {
                    reason: format!(
                        "base row {} has {} entries, expected {}",
                        br,
                        base_row.len(),
                        base_cols
                    ),
                }
            );
            for (bc, &shift) in base_row.iter().enumerate() {
                ensure!(
                    shift >= -1,
                    MalformedMatrixSnafu {
                        reason: format!("base entry ({}, {}) has invalid shift {}", br, bc, shift),
                    }
                );
                if shift < 0 {
                    continue;
                }
                let shift = shift as usize % z;
                for i in 0..z {
                    rows[br * z + i].push(bc * z + (i + shift) % z);
                }
            }
        }
        Self::from_rows(base_cols * z, rows)
    }

    /// Seeded regular Gallager construction
    ///
    /// The first band of `n / row_weight` checks covers consecutive columns;
    /// each further band is a random column permutation of the first. Every
    /// column ends up with weight exactly `col_weight`.
    pub fn gallager(n: usize, col_weight: usize, row_weight: usize, seed: u64) -> Result<Self> {
        ensure!(
            col_weight > 0 && row_weight > 1 && n > 0 && n % row_weight == 0,
            MalformedMatrixSnafu {
                reason: format!(
                    "cannot build ({}, {}) regular code of length {}",
                    col_weight, row_weight, n
                ),
            }
        );

        let band = n / row_weight;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut perm: Vec<usize> = (0..n).collect();
        let mut rows = Vec::with_capacity(band * col_weight);
        for b in 0..col_weight {
            if b > 0 {
                perm.shuffle(&mut rng);
            }
            for r in 0..band {
                rows.push(perm[r * row_weight..(r + 1) * row_weight].to_vec());
            }
        }
        Self::from_rows(n, rows)
    }

    /// Parse MacKay alist text
    ///
    /// ```text
    /// n m
    /// max_col_weight max_row_weight
    /// col weights (n values)
    /// row weights (m values)
    /// n lines of 1-based check indices, one line per column
    /// m lines of 1-based variable indices, one line per row
    /// ```
    /// Zero entries are padding. The row and column lists must agree.
    pub fn from_alist(text: &str) -> Result<Self> {
        let lines: Vec<(usize, Vec<&str>)> = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.split_whitespace().collect::<Vec<_>>()))
            .filter(|(_, toks)| !toks.is_empty())
            .collect();

        let numbers = |idx: usize, expected: Option<usize>| -> Result<Vec<usize>> {
            let last_line = lines.last().map(|(n, _)| *n).unwrap_or(0);
            let (line, toks) = match lines.get(idx) {
                Some(entry) => entry,
                None => {
                    return AlistParseSnafu {
                        line: last_line + 1,
                        reason: "unexpected end of file",
                    }
                    .fail()
                }
            };
            let mut values = Vec::with_capacity(toks.len());
            for tok in toks {
                match tok.parse::<usize>() {
                    Ok(v) => values.push(v),
                    Err(_) => {
                        return AlistParseSnafu {
                            line: *line,
                            reason: format!("'{}' is not a non-negative integer", tok),
                        }
                        .fail()
                    }
                }
            }
            if let Some(n) = expected {
                ensure!(
                    values.len() == n,
                    AlistParseSnafu {
                        line: *line,
                        reason: format!("expected {} values, found {}", n, values.len()),
                    }
                );
            }
            Ok(values)
        };

        let dims = numbers(0, Some(2))?;
        let (n, m) = (dims[0], dims[1]);
        let _max_weights = numbers(1, Some(2))?;
        let col_weights = numbers(2, Some(n))?;
        let row_weights = numbers(3, Some(m))?;

        let mut col_lists = Vec::with_capacity(n);
        for c in 0..n {
            let values = numbers(4 + c, None)?;
            col_lists.push(Self::alist_entries(&values, col_weights[c], m, lines[4 + c].0)?);
        }
        let mut rows = Vec::with_capacity(m);
        for r in 0..m {
            let idx = 4 + n + r;
            rows.push(Self::alist_entries(&numbers(idx, None)?, row_weights[r], n, lines[idx].0)?);
        }

        let matrix = Self::from_rows(n, rows)?;
        let derived = matrix.column_lists();
        for (c, mut declared) in col_lists.into_iter().enumerate() {
            declared.sort_unstable();
            ensure!(
                declared == derived[c],
                AlistParseSnafu {
                    line: lines[4 + c].0,
                    reason: format!("column {} list disagrees with row lists", c + 1),
                }
            );
        }
        Ok(matrix)
    }

    /// Strip zero padding, check weight and range, convert to 0-based
    fn alist_entries(
        values: &[usize],
        weight: usize,
        bound: usize,
        line: usize,
    ) -> Result<Vec<usize>> {
        let entries: Vec<usize> = values.iter().copied().filter(|&v| v != 0).collect();
        ensure!(
            entries.len() == weight,
            AlistParseSnafu {
                line,
                reason: format!("declared weight {} but found {} entries", weight, entries.len()),
            }
        );
        for &v in &entries {
            ensure!(
                v <= bound,
                AlistParseSnafu {
                    line,
                    reason: format!("index {} exceeds dimension {}", v, bound),
                }
            );
        }
        Ok(entries.into_iter().map(|v| v - 1).collect())
    }

    /// Read and parse an alist file
    pub fn load_alist(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(IoSnafu { path })?;
        Self::from_alist(&text)
    }

    /// Serialise as alist with zero padding
    pub fn to_alist(&self) -> String {
        let cols = self.column_lists();
        let max_col = cols.iter().map(|c| c.len()).max().unwrap_or(0);
        let max_row = self.rows.iter().map(|r| r.len()).max().unwrap_or(0);

        let join = |list: &[usize], width: usize| -> String {
            let mut fields: Vec<String> = list.iter().map(|v| (v + 1).to_string()).collect();
            fields.resize(width, "0".to_string());
            fields.join(" ")
        };

        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.num_vars, self.rows.len());
        let _ = writeln!(out, "{} {}", max_col, max_row);
        let col_w: Vec<String> = cols.iter().map(|c| c.len().to_string()).collect();
        let _ = writeln!(out, "{}", col_w.join(" "));
        let row_w: Vec<String> = self.rows.iter().map(|r| r.len().to_string()).collect();
        let _ = writeln!(out, "{}", row_w.join(" "));
        for col in &cols {
            let _ = writeln!(out, "{}", join(col, max_col));
        }
        for row in &self.rows {
            let _ = writeln!(out, "{}", join(row, max_row));
        }
        out
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_checks(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, check: usize) -> &[usize] {
        &self.rows[check]
    }

    pub fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    /// Sorted check indices of every column
    pub fn column_lists(&self) -> Vec<Vec<usize>> {
        let mut cols = vec![Vec::new(); self.num_vars];
        for (r, row) in self.rows.iter().enumerate() {
            for &c in row {
                cols[c].push(r);
            }
        }
        cols
    }

    /// H * bits (mod 2)
    pub fn syndrome(&self, bits: &BitSlice<u8, Msb0>) -> Result<Codeword> {
        ensure!(
            bits.len() == self.num_vars,
            LengthMismatchSnafu {
                what: "codeword",
                expected: self.num_vars,
                actual: bits.len(),
            }
        );
        Ok(self
            .rows
            .iter()
            .map(|row| row.iter().filter(|&&c| bits[c]).count() % 2 == 1)
            .collect())
    }

    pub fn syndrome_weight(&self, bits: &BitSlice<u8, Msb0>) -> Result<usize> {
        Ok(self.syndrome(bits)?.count_ones())
    }
}
