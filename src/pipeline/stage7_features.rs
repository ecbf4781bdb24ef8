use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::geneset::{align_to_model, preview_ids};
use crate::pipeline::Stage;
use crate::schema::v1::Mode;

/// Fixes the model gene set. Training and explore runs take the variable
/// genes; prediction re-aligns the QC-filtered matrix to the artifact.
pub struct Stage7Features;

impl Stage7Features {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage7Features {
    fn name(&self) -> &'static str {
        "stage7_features"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        match ctx.mode {
            Mode::Predict => align_for_prediction(ctx),
            _ => subset_to_variable(ctx),
        }
    }
}

fn subset_to_variable(ctx: &mut Ctx) -> Result<()> {
    let hvg = ctx.hvg.as_ref().context("variable genes not selected")?;
    let matrix = ctx.matrix()?;
    let aligned = matrix.select_genes(&hvg.selected)?;
    info!(genes = aligned.n_genes(), "features_selected");
    ctx.model_genes = Some(aligned.genes().clone());
    ctx.aligned = Some(aligned);
    Ok(())
}

fn align_for_prediction(ctx: &mut Ctx) -> Result<()> {
    let artifact = ctx.artifact.as_ref().context("model artifact not loaded")?;
    let hvg = ctx.hvg.as_ref().context("variable genes not selected")?;
    let matrix = ctx.matrix()?;
    let model_genes = artifact.genes.clone();

    // Genes below min_cells are gone here and count as missing.
    let filtered = matrix.select_genes(&ctx.qc_passed)?;

    let not_variable: Vec<String> = model_genes
        .iter()
        .filter(|gene| {
            matrix.genes().position(gene).is_some_and(|col| {
                ctx.qc_passed.binary_search(&col).is_ok() && !hvg.is_selected(col)
            })
        })
        .cloned()
        .collect();
    let excluded: Vec<String> = match &ctx.exclusion {
        Some(list) => model_genes
            .iter()
            .filter(|g| list.contains(g))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let (aligned, summary) = align_to_model(&filtered, &model_genes, ctx.config.missing_genes)?;

    let mut warnings = Vec::new();
    if !not_variable.is_empty() {
        warnings.push(format!(
            "{} model genes are not highly variable in this dataset: {}",
            not_variable.len(),
            preview_ids(&not_variable)
        ));
    }
    if !excluded.is_empty() {
        warnings.push(format!(
            "{} model genes are on the exclusion list: {}",
            excluded.len(),
            preview_ids(&excluded)
        ));
    }
    if !summary.zero_filled.is_empty() {
        warnings.push(format!(
            "{} model genes absent after QC filtering (min_cells={}) were zero-filled: {}",
            summary.zero_filled.len(),
            ctx.config.min_cells,
            preview_ids(&summary.zero_filled)
        ));
    }
    for w in &warnings {
        warn!(warning = %w, "alignment_warning");
    }
    info!(
        model_genes = summary.model_genes,
        present = summary.present,
        policy = %summary.policy,
        "features_aligned"
    );

    ctx.warnings.extend(warnings);
    ctx.report.alignment = Some(summary);
    ctx.model_genes = Some(model_genes);
    ctx.aligned = Some(aligned);
    Ok(())
}
