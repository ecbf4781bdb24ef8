use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::pipeline::Stage;

pub struct Stage3Counts;

impl Stage3Counts {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3Counts {
    fn name(&self) -> &'static str {
        "stage3_counts"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let matrix = ctx
            .matrix
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("expression matrix not loaded"))?;
        matrix.round_counts();
        info!(nnz = matrix.nnz(), "counts_rounded");
        Ok(())
    }
}
