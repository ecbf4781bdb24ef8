use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{PrepConfig, VarNames};
use crate::error::PrepError;
use crate::geneset::GeneSet;
use crate::model::ModelParams;

pub const TOOL_NAME: &str = "kira-pseudotime";
pub const ARTIFACT_SCHEMA: &str = "v1";

/// Preprocessing that produced the model gene set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSnapshot {
    pub min_cells: u64,
    pub n_top_genes: u64,
    pub hvg_flavor: String,
    pub hvg_span: f64,
    pub var_names: VarNames,
    pub gex_only: bool,
    pub rounded_counts: bool,
    pub exclusion_applied: bool,
}

impl PreprocessingSnapshot {
    pub fn from_config(config: &PrepConfig, exclusion_applied: bool) -> Self {
        Self {
            min_cells: config.min_cells as u64,
            n_top_genes: config.n_top_genes as u64,
            hvg_flavor: "seurat_v3".to_string(),
            hvg_span: config.hvg_span,
            var_names: config.var_names,
            gex_only: config.gex_only,
            rounded_counts: true,
            exclusion_applied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelArtifact {
    pub tool: String,
    pub version: String,
    pub schema_version: String,
    pub model_name: String,
    /// Ordered training gene set; inference aligns to exactly this order.
    pub genes: GeneSet,
    pub preprocessing: PreprocessingSnapshot,
    pub params: ModelParams,
}

impl TrainedModelArtifact {
    pub fn new(
        model_name: &str,
        genes: GeneSet,
        preprocessing: PreprocessingSnapshot,
        params: ModelParams,
    ) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: ARTIFACT_SCHEMA.to_string(),
            model_name: model_name.to_string(),
            genes,
            preprocessing,
            params,
        }
    }

    pub fn path_in(model_dir: &Path, model_name: &str) -> PathBuf {
        model_dir.join(format!("{}.json", model_name))
    }

    pub fn validate(&self) -> Result<(), PrepError> {
        if self.schema_version != ARTIFACT_SCHEMA {
            return Err(PrepError::InvalidArtifact(format!(
                "unsupported schema_version '{}'",
                self.schema_version
            )));
        }
        if self.genes.is_empty() {
            return Err(PrepError::InvalidArtifact("empty gene set".into()));
        }
        if self.params.n_genes() != self.genes.len() {
            return Err(PrepError::InvalidArtifact(format!(
                "parameters cover {} genes but the gene set has {}",
                self.params.n_genes(),
                self.genes.len()
            )));
        }
        let ModelParams::PrincipalAxis(p) = &self.params;
        if p.axes.is_empty() {
            return Err(PrepError::InvalidArtifact("no latent axes".into()));
        }
        if let Some(axis) = p.axes.iter().find(|a| a.len() != self.genes.len()) {
            return Err(PrepError::InvalidArtifact(format!(
                "axis has {} loadings, expected {}",
                axis.len(),
                self.genes.len()
            )));
        }
        Ok(())
    }

    /// Writes `<model_dir>/<model_name>.json`, creating `model_dir` if needed.
    pub fn save(&self, model_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(model_dir)
            .with_context(|| format!("failed to create {}", model_dir.display()))?;
        let path = Self::path_in(model_dir, &self.model_name);
        let file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, self)
            .with_context(|| format!("failed to write {}", path.display()))?;
        w.flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model {}", path.display()))?;
        let artifact: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse model {}", path.display()))?;
        artifact.validate()?;
        Ok(artifact)
    }
}
