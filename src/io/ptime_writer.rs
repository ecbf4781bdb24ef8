use std::path::Path;

use anyhow::{Context, Result};

use crate::model::Trajectory;

/// Cell-indexed pseudotime table: header `,ptime`, then `cell,value` rows.
pub fn write_ptime(path: &Path, trajectory: &Trajectory) -> Result<()> {
    trajectory.check_shape()?;
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    w.write_record(["", "ptime"])?;
    for (cell, t) in trajectory.cells.iter().zip(&trajectory.ptime) {
        w.write_record([cell.as_str(), t.to_string().as_str()])?;
    }
    w.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
