use anyhow::Result;
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::io::loader::load_expression_matrix;
use crate::pipeline::Stage;

pub struct Stage1Input;

impl Stage1Input {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Input {
    fn name(&self) -> &'static str {
        "stage1_input"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let loaded = load_expression_matrix(&ctx.input, ctx.input_format, &ctx.config)?;
        let matrix = loaded.matrix;

        for w in &loaded.warnings {
            warn!(warning = %w, "input_warning");
        }
        ctx.warnings.extend(loaded.warnings);
        if loaded.dropped_features > 0 {
            info!(
                dropped = loaded.dropped_features,
                "non gene-expression features dropped"
            );
        }

        ctx.report.input_meta.genes = Some(matrix.n_genes() as u64);
        ctx.report.input_meta.cells = Some(matrix.n_cells() as u64);
        ctx.report.input_meta.nnz = Some(matrix.nnz() as u64);
        ctx.report.input_meta.dropped_features = loaded.dropped_features as u64;

        info!(
            format = ctx.input_format.as_str(),
            genes = matrix.n_genes(),
            cells = matrix.n_cells(),
            nnz = matrix.nnz(),
            "matrix_loaded"
        );
        ctx.matrix = Some(matrix);
        Ok(())
    }
}
