use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::MissingGenePolicy;
use crate::error::PrepError;
use crate::geneset::GeneSet;
use crate::matrix::ExpressionMatrix;

/// Where each model gene lives in a dataset's columns.
#[derive(Debug, Clone)]
pub struct GeneResolution {
    /// One entry per model gene, in model order.
    pub columns: Vec<Option<usize>>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub model_genes: u64,
    pub present: u64,
    pub zero_filled: Vec<String>,
    pub policy: String,
}

pub fn resolve_model_genes(model: &GeneSet, dataset: &GeneSet) -> GeneResolution {
    let mut columns = Vec::with_capacity(model.len());
    let mut missing = Vec::new();
    for gene in model.iter() {
        let col = dataset.position(gene);
        if col.is_none() {
            missing.push(gene.clone());
        }
        columns.push(col);
    }
    GeneResolution { columns, missing }
}

/// Reorders and subsets `matrix` so its columns are exactly `model`.
pub fn align_to_model(
    matrix: &ExpressionMatrix,
    model: &GeneSet,
    policy: MissingGenePolicy,
) -> Result<(ExpressionMatrix, AlignmentSummary)> {
    let resolution = resolve_model_genes(model, matrix.genes());
    if !resolution.missing.is_empty() && policy == MissingGenePolicy::FailFast {
        return Err(PrepError::MissingModelGenes {
            missing: resolution.missing,
            total: model.len(),
        }
        .into());
    }

    let aligned = matrix.project_genes(&resolution.columns, model.clone())?;
    let summary = AlignmentSummary {
        model_genes: model.len() as u64,
        present: (model.len() - resolution.missing.len()) as u64,
        zero_filled: resolution.missing,
        policy: policy.as_str().to_string(),
    };
    Ok((aligned, summary))
}
