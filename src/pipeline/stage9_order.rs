use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::io::metadata::CellMetadata;
use crate::math::stats::{mean, median};
use crate::model::Trajectory;
use crate::pipeline::Stage;
use crate::schema::v1::GroupSummary;

const MISSING_GROUP: &str = "NA";

/// Optional post-processing of the trajectory: ordering by pseudotime, time
/// reversal and per-group summaries. Ordering happens before reversal.
pub struct Stage9Order;

impl Stage9Order {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage9Order {
    fn name(&self) -> &'static str {
        "stage9_order"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let trajectory = ctx.trajectory.as_mut().context("trajectory missing")?;
        if ctx.explore.sort_by_ptime {
            trajectory.sort_by_ptime();
            info!("cells_sorted_by_ptime");
        }
        if ctx.explore.reverse_time {
            trajectory.reverse_time();
            info!("ptime_reversed");
        }

        if let Some(column) = &ctx.explore.group_by {
            let metadata = ctx
                .metadata
                .as_ref()
                .context("grouping requires a metadata table")?;
            let groups = group_ptime(trajectory, metadata, column);
            info!(column = %column, groups = groups.len(), "ptime_grouped");
            ctx.report.groups = groups;
        }
        Ok(())
    }
}

/// Pseudotime per metadata group, ordered by group label. Cells without a
/// value land in the `NA` group.
pub fn group_ptime(
    trajectory: &Trajectory,
    metadata: &CellMetadata,
    column: &str,
) -> Vec<GroupSummary> {
    let mut by_group: BTreeMap<String, Vec<f32>> = BTreeMap::new();
    for (cell, &t) in trajectory.cells.iter().zip(&trajectory.ptime) {
        let label = match metadata.value(cell, column) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => MISSING_GROUP.to_string(),
        };
        by_group.entry(label).or_default().push(t);
    }
    by_group
        .into_iter()
        .map(|(group, mut values)| GroupSummary {
            group,
            n_cells: values.len() as u64,
            mean_ptime: mean(&values) as f64,
            median_ptime: median(&mut values) as f64,
        })
        .collect()
}
