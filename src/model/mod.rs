//! Trajectory backends.
//!
//! The preparation pipeline hands an aligned count matrix to a
//! [`TrajectoryBackend`] and gets back per-cell pseudotime plus a latent
//! embedding. Fitted parameters are persisted through [`artifact`] so that
//! inference can rebuild the backend without retraining.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::PrepError;
use crate::matrix::ExpressionMatrix;

pub mod artifact;
pub mod principal_axis;

pub use artifact::TrainedModelArtifact;
pub use principal_axis::{PrincipalAxisBackend, PrincipalAxisParams};

/// Per-cell pseudotime and latent embedding, rows in `cells` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub cells: Vec<String>,
    pub ptime: Vec<f32>,
    pub embedding: Vec<Vec<f32>>,
}

impl Trajectory {
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn n_latent(&self) -> usize {
        self.embedding.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn check_shape(&self) -> Result<(), PrepError> {
        let n = self.cells.len();
        if self.ptime.len() != n {
            return Err(PrepError::DimensionMismatch {
                what: "pseudotime rows".into(),
                expected: n,
                actual: self.ptime.len(),
            });
        }
        if self.embedding.len() != n {
            return Err(PrepError::DimensionMismatch {
                what: "embedding rows".into(),
                expected: n,
                actual: self.embedding.len(),
            });
        }
        let k = self.n_latent();
        if let Some(bad) = self.embedding.iter().find(|r| r.len() != k) {
            return Err(PrepError::DimensionMismatch {
                what: "embedding columns".into(),
                expected: k,
                actual: bad.len(),
            });
        }
        Ok(())
    }

    /// `t -> 1 - t` for every cell.
    pub fn reverse_time(&mut self) {
        for t in self.ptime.iter_mut() {
            *t = 1.0 - *t;
        }
    }

    /// Stable ascending sort by pseudotime; embedding rows follow their cells.
    pub fn sort_by_ptime(&mut self) {
        let mut order: Vec<usize> = (0..self.cells.len()).collect();
        order.sort_by(|&a, &b| self.ptime[a].total_cmp(&self.ptime[b]));
        self.cells = order.iter().map(|&i| self.cells[i].clone()).collect();
        self.ptime = order.iter().map(|&i| self.ptime[i]).collect();
        self.embedding = order.iter().map(|&i| self.embedding[i].clone()).collect();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum ModelParams {
    PrincipalAxis(PrincipalAxisParams),
}

impl ModelParams {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::PrincipalAxis(_) => principal_axis::BACKEND_NAME,
        }
    }

    /// Number of genes the parameters were fitted on.
    pub fn n_genes(&self) -> usize {
        match self {
            Self::PrincipalAxis(p) => p.gene_means.len(),
        }
    }

    pub fn n_latent(&self) -> usize {
        match self {
            Self::PrincipalAxis(p) => p.axes.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub params: ModelParams,
    pub trajectory: Trajectory,
}

pub trait TrajectoryBackend {
    fn name(&self) -> &'static str;
    fn train(&self, matrix: &ExpressionMatrix, config: &ModelConfig) -> Result<TrainedModel>;
    fn predict(&self, params: &ModelParams, matrix: &ExpressionMatrix) -> Result<Trajectory>;
}

pub fn backend_for(params: &ModelParams) -> Box<dyn TrajectoryBackend> {
    match params {
        ModelParams::PrincipalAxis(_) => Box::new(PrincipalAxisBackend),
    }
}
