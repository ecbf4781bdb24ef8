use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Result, bail};

use crate::io::open_maybe_gz;

/// Cell identifiers, one per line; duplicates are rejected since every row
/// of the matrix must be addressable by its barcode.
pub fn read_barcodes(path: &Path) -> Result<Vec<String>> {
    let reader = open_maybe_gz(path)?;
    let mut reader = BufReader::new(reader);

    let mut barcodes = Vec::new();
    let mut seen = HashSet::new();
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        let barcode = line.trim_end().split('\t').next().unwrap_or("");
        if barcode.is_empty() {
            line.clear();
            continue;
        }
        if !seen.insert(barcode.to_string()) {
            bail!(
                "duplicate barcode '{}' in {} (entry {})",
                barcode,
                path.display(),
                barcodes.len() + 1
            );
        }
        barcodes.push(barcode.to_string());
        line.clear();
    }

    if barcodes.is_empty() {
        bail!("barcodes file {} is empty", path.display());
    }

    Ok(barcodes)
}
