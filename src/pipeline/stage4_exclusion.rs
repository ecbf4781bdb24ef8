use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::error::PrepError;
use crate::pipeline::Stage;
use crate::schema::v1::ExclusionSummary;

pub struct Stage4Exclusion;

impl Stage4Exclusion {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Exclusion {
    fn name(&self) -> &'static str {
        "stage4_exclusion"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let Some(list) = &ctx.exclusion else {
            return Ok(());
        };
        let matrix = ctx.matrix()?;
        let outcome = list.apply(matrix.genes());
        if outcome.kept.is_empty() {
            return Err(PrepError::EmptyGeneSet {
                stage: "exclusion",
            }
            .into());
        }
        let summary = ExclusionSummary {
            listed: list.len() as u64,
            removed: outcome.removed as u64,
            absent: outcome.absent as u64,
        };
        info!(
            listed = summary.listed,
            removed = summary.removed,
            absent = summary.absent,
            "genes_excluded"
        );

        if outcome.removed > 0 {
            let filtered = matrix.select_genes(&outcome.kept)?;
            ctx.matrix = Some(filtered);
        }
        ctx.report.exclusion = Some(summary);
        Ok(())
    }
}
