use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::Trajectory;

/// One comma-separated row per cell, no header, no index column.
pub fn write_embedding(path: &Path, trajectory: &Trajectory) -> Result<()> {
    trajectory.check_shape()?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for row in &trajectory.embedding {
        let line: Vec<String> = row.iter().map(|&v| format_sci(v as f64)).collect();
        writeln!(w, "{}", line.join(","))?;
    }
    w.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// `1.500000000000000000e+00`: 18 fractional digits, signed two-digit exponent.
pub fn format_sci(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{:.18e}", value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}
