use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::schema::v1::GroupSummary;

pub fn write_groups(path: &Path, groups: &[GroupSummary]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "group\tn_cells\tmean_ptime\tmedian_ptime")?;
    for g in groups {
        writeln!(
            w,
            "{}\t{}\t{:.6}\t{:.6}",
            g.group, g.n_cells, g.mean_ptime, g.median_ptime
        )?;
    }
    w.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
