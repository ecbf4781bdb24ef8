use serde::{Deserialize, Serialize};

use crate::geneset::AlignmentSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Predict,
    Explore,
    Validate,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Predict => "predict",
            Self::Explore => "explore",
            Self::Validate => "validate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMeta {
    pub path: String,
    pub format: String,
    pub genes: Option<u64>,
    pub cells: Option<u64>,
    pub nnz: Option<u64>,
    pub dropped_features: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionSummary {
    pub listed: u64,
    pub removed: u64,
    pub absent: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcSummary {
    pub min_cells: u64,
    pub genes_tested: u64,
    pub genes_passing: u64,
    pub median_counts_per_cell: f64,
    pub median_genes_per_cell: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HvgSummary {
    pub flavor: String,
    pub n_top_genes: u64,
    pub span: f64,
    pub candidates: u64,
    pub selected: u64,
    pub constant_genes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataSummary {
    pub rows: u64,
    pub matrix_cells: u64,
    pub intersected: u64,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub backend: String,
    pub genes: u64,
    pub n_latent: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    pub n_cells: u64,
    pub mean_ptime: f64,
    pub median_ptime: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outputs {
    pub ptime: Option<String>,
    pub embedding: Option<String>,
    pub model: Option<String>,
    pub groups: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepReportV1 {
    pub tool: String,
    pub version: String,
    pub schema_version: String,
    pub mode: Mode,
    pub input_meta: InputMeta,
    pub exclusion: Option<ExclusionSummary>,
    pub qc: Option<QcSummary>,
    pub hvg: Option<HvgSummary>,
    pub features: Vec<String>,
    pub alignment: Option<AlignmentSummary>,
    pub metadata: Option<MetadataSummary>,
    pub model: Option<ModelSummary>,
    pub groups: Vec<GroupSummary>,
    pub outputs: Outputs,
    pub warnings: Vec<String>,
}

impl PrepReportV1 {
    pub fn empty(tool_version: &str, mode: Mode, input: &str, format: &str) -> Self {
        Self {
            tool: "kira-pseudotime".to_string(),
            version: tool_version.to_string(),
            schema_version: "v1".to_string(),
            mode,
            input_meta: InputMeta {
                path: input.to_string(),
                format: format.to_string(),
                genes: None,
                cells: None,
                nnz: None,
                dropped_features: 0,
            },
            exclusion: None,
            qc: None,
            hvg: None,
            features: Vec::new(),
            alignment: None,
            metadata: None,
            model: None,
            groups: Vec::new(),
            outputs: Outputs::default(),
            warnings: Vec::new(),
        }
    }
}
