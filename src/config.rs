//! Run configuration.
//!
//! Every threshold the pipeline uses lives here with its default, so a run is
//! fully described by one value owned by the run context. A JSON file may
//! override any subset of fields; CLI flags are applied on top of that.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PrepError;

pub const DEFAULT_MIN_CELLS: usize = 20;
pub const DEFAULT_N_TOP_GENES: usize = 2000;
pub const DEFAULT_HVG_SPAN: f64 = 0.3;

/// Which feature column becomes the gene identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarNames {
    Symbol,
    Id,
}

/// What to do when a model gene is absent from the dataset at inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingGenePolicy {
    FailFast,
    ZeroFill,
}

impl MissingGenePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::ZeroFill => "zero-fill",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub n_latent: usize,
    pub n_iter: usize,
    pub seed: u64,
    pub target_sum: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_latent: 5,
            n_iter: 30,
            seed: 0,
            target_sum: 1e4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepConfig {
    /// Genes expressed in fewer cells than this fail QC.
    pub min_cells: usize,
    /// Number of highly variable genes kept.
    pub n_top_genes: usize,
    /// Loess span of the seurat_v3 mean-variance trend.
    pub hvg_span: f64,
    pub var_names: VarNames,
    /// Keep only "Gene Expression" features when loading.
    pub gex_only: bool,
    pub missing_genes: MissingGenePolicy,
    pub model: ModelConfig,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            min_cells: DEFAULT_MIN_CELLS,
            n_top_genes: DEFAULT_N_TOP_GENES,
            hvg_span: DEFAULT_HVG_SPAN,
            var_names: VarNames::Symbol,
            gex_only: true,
            missing_genes: MissingGenePolicy::FailFast,
            model: ModelConfig::default(),
        }
    }
}

impl PrepConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: PrepConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PrepError> {
        if self.n_top_genes == 0 {
            return Err(PrepError::InvalidConfig("n_top_genes must be > 0".into()));
        }
        if !(self.hvg_span > 0.0 && self.hvg_span <= 1.0) {
            return Err(PrepError::InvalidConfig(format!(
                "hvg_span must be in (0, 1], got {}",
                self.hvg_span
            )));
        }
        if self.model.n_latent == 0 {
            return Err(PrepError::InvalidConfig("model.n_latent must be > 0".into()));
        }
        if self.model.n_iter == 0 {
            return Err(PrepError::InvalidConfig("model.n_iter must be > 0".into()));
        }
        if !(self.model.target_sum > 0.0) {
            return Err(PrepError::InvalidConfig(
                "model.target_sum must be positive".into(),
            ));
        }
        Ok(())
    }
}
