use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::math::stats::median;
use crate::pipeline::Stage;
use crate::qc::{calculate_qc_metrics, genes_passing};
use crate::schema::v1::QcSummary;

pub struct Stage5Qc;

impl Stage5Qc {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage5Qc {
    fn name(&self) -> &'static str {
        "stage5_qc"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let matrix = ctx.matrix()?;
        let metrics = calculate_qc_metrics(matrix);
        let passing = genes_passing(&metrics, ctx.config.min_cells)?;

        let mut counts: Vec<f32> = metrics.cells.total_counts.iter().map(|&v| v as f32).collect();
        let mut genes: Vec<f32> = metrics
            .cells
            .n_genes_by_counts
            .iter()
            .map(|&v| v as f32)
            .collect();
        let summary = QcSummary {
            min_cells: ctx.config.min_cells as u64,
            genes_tested: matrix.n_genes() as u64,
            genes_passing: passing.len() as u64,
            median_counts_per_cell: median(&mut counts) as f64,
            median_genes_per_cell: median(&mut genes) as f64,
        };
        info!(
            min_cells = summary.min_cells,
            tested = summary.genes_tested,
            passing = summary.genes_passing,
            "genes_filtered"
        );

        ctx.report.qc = Some(summary);
        ctx.qc = Some(metrics);
        ctx.qc_passed = passing;
        Ok(())
    }
}
