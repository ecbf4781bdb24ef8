use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::error::PrepError;
use crate::io::metadata::CellMetadata;
use crate::pipeline::Stage;
use crate::schema::v1::MetadataSummary;

/// Restricts cells to those present in the metadata table. Runs only when a
/// metadata path is set.
pub struct Stage2Metadata;

impl Stage2Metadata {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Metadata {
    fn name(&self) -> &'static str {
        "stage2_metadata"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let Some(path) = ctx.explore.metadata_path.clone() else {
            return Ok(());
        };
        let mut metadata = CellMetadata::from_csv(&path)?;
        if let Some(columns) = &ctx.explore.metadata_columns {
            metadata = metadata.select_columns(columns)?;
        }
        if let Some(column) = &ctx.explore.group_by {
            if !metadata.columns().iter().any(|c| c == column) {
                return Err(PrepError::MissingMetadataColumn(column.clone()).into());
            }
        }

        let matrix = ctx.take_matrix()?;
        let keep = metadata.intersect(matrix.cells());
        if keep.is_empty() {
            return Err(PrepError::EmptyCellIntersection {
                matrix_cells: matrix.n_cells(),
                metadata_cells: metadata.len(),
            }
            .into());
        }

        let matrix_cells = matrix.n_cells();
        let subset = if keep.len() == matrix_cells {
            matrix
        } else {
            matrix.select_cells(&keep)?
        };
        info!(
            matrix_cells,
            metadata_rows = metadata.len(),
            intersected = subset.n_cells(),
            "cells_intersected"
        );

        ctx.report.metadata = Some(MetadataSummary {
            rows: metadata.len() as u64,
            matrix_cells: matrix_cells as u64,
            intersected: subset.n_cells() as u64,
            columns: metadata.columns().to_vec(),
        });
        ctx.matrix = Some(subset);
        ctx.metadata = Some(metadata);
        Ok(())
    }
}
