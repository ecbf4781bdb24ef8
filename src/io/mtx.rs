use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::io::open_maybe_gz;

#[derive(Debug, Clone, Copy)]
pub struct MtxSummary {
    pub nrows: usize,
    pub ncols: usize,
    pub nnz: usize,
    pub pattern: bool,
}

/// Streams the entries of a MatrixMarket coordinate file as 0-based
/// `(row, col, value)`. Pattern matrices yield `1.0` for every entry.
pub fn for_each_entry<F>(path: &Path, mut f: F) -> Result<MtxSummary>
where
    F: FnMut(usize, usize, f32) -> Result<()>,
{
    let reader = open_maybe_gz(path)?;
    let mut reader = BufReader::new(reader);

    let mut line = String::new();
    let mut pattern = false;
    while reader.read_line(&mut line)? > 0 {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            line.clear();
            continue;
        }
        if trimmed.starts_with("%%MatrixMarket") {
            let banner = trimmed.to_ascii_lowercase();
            if !banner.contains("coordinate") {
                bail!("only coordinate MatrixMarket files are supported");
            }
            pattern = banner.contains("pattern");
            line.clear();
            continue;
        }
        if trimmed.starts_with('%') {
            line.clear();
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() != 3 {
            bail!("MTX header must have 3 fields: nrows ncols nnz");
        }
        let nrows: usize = parts[0].parse().context("invalid MTX nrows")?;
        let ncols: usize = parts[1].parse().context("invalid MTX ncols")?;
        let expected_nnz: usize = parts[2].parse().context("invalid MTX nnz")?;
        let min_fields = if pattern { 2 } else { 3 };

        let mut nnz = 0usize;
        line.clear();
        while reader.read_line(&mut line)? > 0 {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                line.clear();
                continue;
            }
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() < min_fields {
                bail!(
                    "MTX entry must have at least {} fields, found '{}'",
                    min_fields,
                    trimmed
                );
            }
            let row: usize = parts[0].parse().context("invalid MTX row index")?;
            let col: usize = parts[1].parse().context("invalid MTX col index")?;
            if row == 0 || col == 0 {
                bail!("MTX indices are 1-based; found 0");
            }
            if row > nrows || col > ncols {
                bail!("MTX index out of bounds: ({}, {})", row, col);
            }
            let value: f32 = if pattern {
                1.0
            } else {
                parts[2].parse().context("invalid MTX value")?
            };
            f(row - 1, col - 1, value)?;
            nnz += 1;
            line.clear();
        }

        if nnz != expected_nnz {
            bail!(
                "MTX nnz mismatch: header {} vs observed {}",
                expected_nnz,
                nnz
            );
        }

        return Ok(MtxSummary {
            nrows,
            ncols,
            nnz,
            pattern,
        });
    }

    bail!("MTX file missing header")
}
