use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::hvg::seurat_v3;
use crate::pipeline::Stage;
use crate::schema::v1::HvgSummary;

pub struct Stage6Hvg;

impl Stage6Hvg {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage6Hvg {
    fn name(&self) -> &'static str {
        "stage6_hvg"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let matrix = ctx.matrix()?;
        let hvg = seurat_v3(
            matrix,
            &ctx.qc_passed,
            ctx.config.n_top_genes,
            ctx.config.hvg_span,
            ctx.threads,
        )?;
        let summary = HvgSummary {
            flavor: "seurat_v3".to_string(),
            n_top_genes: ctx.config.n_top_genes as u64,
            span: ctx.config.hvg_span,
            candidates: hvg.candidates.len() as u64,
            selected: hvg.selected.len() as u64,
            constant_genes: hvg.constant_genes() as u64,
        };
        info!(
            candidates = summary.candidates,
            selected = summary.selected,
            constant = summary.constant_genes,
            "variable_genes_selected"
        );

        ctx.report.hvg = Some(summary);
        ctx.hvg = Some(hvg);
        Ok(())
    }
}
