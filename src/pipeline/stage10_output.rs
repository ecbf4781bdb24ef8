use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::io::{embedding_writer, groups_writer, json_writer, ptime_writer};
use crate::model::TrainedModelArtifact;
use crate::pipeline::Stage;

/// The only stage that touches the filesystem for writing. A failed write
/// removes every file this stage already produced.
pub struct Stage10Output;

impl Stage10Output {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage10Output {
    fn name(&self) -> &'static str {
        "stage10_output"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let mut written = Vec::new();
        if let Err(err) = write_outputs(ctx, &mut written) {
            for path in written.iter().filter(|p| p.is_file()) {
                let _ = fs::remove_file(path);
            }
            warn!(removed = written.len(), "partial_outputs_removed");
            return Err(err);
        }
        info!(files = written.len(), "stage10_output_ready");
        Ok(())
    }
}

fn write_outputs(ctx: &mut Ctx, written: &mut Vec<PathBuf>) -> Result<()> {
    let trajectory = ctx.trajectory.as_ref().context("trajectory missing")?;

    if let Some(path) = &ctx.output.ptime {
        ensure_parent(path)?;
        written.push(path.clone());
        ptime_writer::write_ptime(path, trajectory)?;
        info!(path = %path.display(), cells = trajectory.n_cells(), "ptime_written");
    }
    if let Some(path) = &ctx.output.embedding {
        ensure_parent(path)?;
        written.push(path.clone());
        embedding_writer::write_embedding(path, trajectory)?;
        info!(
            path = %path.display(),
            n_latent = trajectory.n_latent(),
            "embedding_written"
        );
    }
    if let Some(path) = &ctx.output.groups {
        ensure_parent(path)?;
        written.push(path.clone());
        groups_writer::write_groups(path, &ctx.report.groups)?;
        info!(path = %path.display(), "groups_written");
    }
    if let (Some(artifact), Some(dir)) = (&ctx.artifact, &ctx.output.model_dir) {
        written.push(TrainedModelArtifact::path_in(dir, &artifact.model_name));
        let path = artifact.save(dir)?;
        info!(path = %path.display(), "model_saved");
        ctx.report.outputs.model = Some(path.display().to_string());
    }

    if let Some(path) = ctx.output.report.clone() {
        ensure_parent(&path)?;
        let report = json_writer::build_report(ctx);
        written.push(path.clone());
        json_writer::write_json(&path, &report)?;
        info!(path = %path.display(), "report_written");
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}
