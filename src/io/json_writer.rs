use std::path::Path;

use anyhow::{Context, Result};

use crate::ctx::Ctx;
use crate::schema::v1::PrepReportV1;

/// Final report: whatever the stages recorded plus output paths and warnings.
pub fn build_report(ctx: &Ctx) -> PrepReportV1 {
    let mut report = ctx.report.clone();
    let path_str = |p: &Option<std::path::PathBuf>| p.as_ref().map(|p| p.display().to_string());
    report.outputs.ptime = path_str(&ctx.output.ptime);
    report.outputs.embedding = path_str(&ctx.output.embedding);
    report.outputs.groups = path_str(&ctx.output.groups);
    report.warnings = ctx.warnings.clone();
    if let Some(genes) = &ctx.model_genes {
        report.features = genes.ids().to_vec();
    }
    report
}

pub fn write_json(path: &Path, report: &PrepReportV1) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
