//! Domain failures raised by the preparation pipeline.
//!
//! These travel inside `anyhow::Error`; callers that need to react to a
//! specific kind (the CLI exit path does) recover it with `downcast_ref`.

use thiserror::Error;

use crate::geneset::preview_ids;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error(
        "No cells in intersection of the expression matrix ({matrix_cells} cells) and the supplied metadata ({metadata_cells} rows). Please ensure these inputs are correct."
    )]
    EmptyCellIntersection {
        matrix_cells: usize,
        metadata_cells: usize,
    },

    #[error("{} of {total} model genes are absent from the dataset: {}", .missing.len(), preview_ids(.missing))]
    MissingModelGenes { missing: Vec<String>, total: usize },

    #[error("no genes left after {stage}")]
    EmptyGeneSet { stage: &'static str },

    #[error("dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate gene identifier '{0}' in gene set")]
    DuplicateGene(String),

    #[error("metadata column '{0}' not found")]
    MissingMetadataColumn(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),
}
