use std::path::{Path, PathBuf};

use crate::config::PrepConfig;
use crate::geneset::{ExclusionList, GeneSet};
use crate::hvg::HvgResult;
use crate::io::metadata::CellMetadata;
use crate::matrix::ExpressionMatrix;
use crate::model::{Trajectory, TrainedModelArtifact};
use crate::qc::QcMetrics;
use crate::schema::v1::{Mode, PrepReportV1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    TenxH5,
    Mtx10x,
}

impl InputFormat {
    pub fn detect(path: &Path) -> Self {
        if path.extension().and_then(|s| s.to_str()) == Some("h5") {
            Self::TenxH5
        } else {
            Self::Mtx10x
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenxH5 => "10x_h5",
            Self::Mtx10x => "10x_mtx",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputPaths {
    pub ptime: Option<PathBuf>,
    pub embedding: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub model_name: Option<String>,
    pub report: Option<PathBuf>,
    pub groups: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ExploreOptions {
    pub metadata_path: Option<PathBuf>,
    /// `None` keeps every metadata column.
    pub metadata_columns: Option<Vec<String>>,
    pub reverse_time: bool,
    pub sort_by_ptime: bool,
    pub group_by: Option<String>,
}

#[derive(Debug)]
pub struct Ctx {
    pub input: PathBuf,
    pub input_format: InputFormat,
    pub mode: Mode,
    pub config: PrepConfig,
    pub threads: usize,
    pub exclude_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub explore: ExploreOptions,
    pub output: OutputPaths,
    /// Working matrix; each stage replaces it with its own output.
    pub matrix: Option<ExpressionMatrix>,
    pub exclusion: Option<ExclusionList>,
    pub metadata: Option<CellMetadata>,
    pub qc: Option<QcMetrics>,
    pub qc_passed: Vec<usize>,
    pub hvg: Option<HvgResult>,
    /// Matrix handed to the backend, columns equal to `model_genes`.
    pub aligned: Option<ExpressionMatrix>,
    pub model_genes: Option<GeneSet>,
    pub artifact: Option<TrainedModelArtifact>,
    pub trajectory: Option<Trajectory>,
    pub warnings: Vec<String>,
    pub report: PrepReportV1,
}

impl Ctx {
    pub fn new(input: PathBuf, mode: Mode, config: PrepConfig, tool_version: &str) -> Self {
        let input_format = InputFormat::detect(&input);
        let report = PrepReportV1::empty(
            tool_version,
            mode,
            &input.display().to_string(),
            input_format.as_str(),
        );
        Self {
            input,
            input_format,
            mode,
            config,
            threads: 0,
            exclude_path: None,
            model_path: None,
            explore: ExploreOptions::default(),
            output: OutputPaths::default(),
            matrix: None,
            exclusion: None,
            metadata: None,
            qc: None,
            qc_passed: Vec::new(),
            hvg: None,
            aligned: None,
            model_genes: None,
            artifact: None,
            trajectory: None,
            warnings: Vec::new(),
            report,
        }
    }

    pub fn matrix(&self) -> anyhow::Result<&ExpressionMatrix> {
        self.matrix
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("expression matrix not loaded"))
    }

    pub fn take_matrix(&mut self) -> anyhow::Result<ExpressionMatrix> {
        self.matrix
            .take()
            .ok_or_else(|| anyhow::anyhow!("expression matrix not loaded"))
    }
}
