use anyhow::{Result, bail};

use crate::ctx::Ctx;

pub fn format_summary(ctx: &Ctx) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");
    let report = &ctx.report;
    let genes = report.input_meta.genes.unwrap_or(0);
    let cells = report.input_meta.cells.unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("kira-pseudotime v{}\n", version));
    out.push_str(&format!("Mode: {}\n", ctx.mode.as_str()));
    out.push_str(&format!(
        "Input: {} genes, {} cells, format={}\n",
        genes, cells, report.input_meta.format
    ));
    if let Some(meta) = &report.metadata {
        out.push_str(&format!(
            "Metadata: {} of {} cells matched\n",
            meta.intersected, meta.matrix_cells
        ));
    }
    if let Some(ex) = &report.exclusion {
        out.push_str(&format!(
            "Exclusion: {} genes removed ({} listed, {} absent)\n",
            ex.removed, ex.listed, ex.absent
        ));
    }
    if let Some(qc) = &report.qc {
        out.push_str(&format!(
            "QC: {}/{} genes in >= {} cells\n",
            qc.genes_passing, qc.genes_tested, qc.min_cells
        ));
    }
    if let Some(hvg) = &report.hvg {
        out.push_str(&format!(
            "HVG: {} of {} genes ({})\n",
            hvg.selected, hvg.candidates, hvg.flavor
        ));
    }
    if let Some(al) = &report.alignment {
        out.push_str(&format!(
            "Alignment: {}/{} model genes present, policy={}\n",
            al.present, al.model_genes, al.policy
        ));
    }
    if let Some(genes) = &ctx.model_genes {
        out.push_str(&format!("Features: {} genes\n", genes.len()));
    }
    if let Some(traj) = &ctx.trajectory {
        let (lo, hi, mean) = ptime_range(&traj.ptime)?;
        out.push_str(&format!(
            "Pseudotime: {} cells, min={:.4} max={:.4} mean={:.4}\n",
            traj.n_cells(),
            lo,
            hi,
            mean
        ));
    }

    Ok(out)
}

fn ptime_range(values: &[f32]) -> Result<(f32, f32, f32)> {
    if values.is_empty() {
        return Ok((0.0, 0.0, 0.0));
    }
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    for &v in values {
        if v.is_nan() {
            bail!("NaN encountered in pseudotime");
        }
        lo = lo.min(v);
        hi = hi.max(v);
        sum += v as f64;
    }
    Ok((lo, hi, (sum / values.len() as f64) as f32))
}
