use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{MissingGenePolicy, PrepConfig};

#[derive(Debug, Parser)]
#[command(
    name = "kira-pseudotime",
    version,
    about = "Prepare single-cell count matrices and export pseudotime"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Train a model on the prepared matrix and export pseudotime.
    Train(TrainArgs),
    /// Apply a trained model to a new dataset.
    Predict(PredictArgs),
    /// Metadata-restricted training run with ordering and group summaries.
    Explore(ExploreArgs),
    /// Run loading through variable-gene selection and print a summary.
    Validate(ValidateArgs),
    Model(ModelArgs),
}

/// Thresholds shared by every pipeline command.
#[derive(Debug, Clone, Args)]
pub struct PrepArgs {
    #[arg(long, help = "10x HDF5 file (.h5) or 10x MTX directory")]
    pub input: PathBuf,

    #[arg(long, help = "JSON array of gene identifiers to drop before filtering")]
    pub exclude: Option<PathBuf>,

    #[arg(long, help = "JSON config; flags override its values")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Minimum cells expressing a gene (default 20)")]
    pub min_cells: Option<usize>,

    #[arg(long, help = "Number of highly variable genes (default 2000)")]
    pub n_top_genes: Option<usize>,

    #[arg(long, default_value_t = 0, help = "Number of threads (0 = auto)")]
    pub threads: usize,

    #[arg(long, help = "Write a JSON run report")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ModelConfigArgs {
    #[arg(long, help = "Latent dimensions (default 5)")]
    pub n_latent: Option<usize>,

    #[arg(long, help = "Random seed (default 0)")]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    #[command(flatten)]
    pub model: ModelConfigArgs,

    #[arg(long)]
    pub model_dir: PathBuf,

    #[arg(long)]
    pub model_name: String,

    #[arg(long)]
    pub ptime_out: PathBuf,

    #[arg(long)]
    pub embedding_out: PathBuf,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    #[arg(long, help = "Model artifact written by `train`")]
    pub model: PathBuf,

    #[arg(long)]
    pub ptime_out: PathBuf,

    #[arg(long)]
    pub embedding_out: PathBuf,

    #[arg(long, value_enum, help = "Policy for model genes absent from the input")]
    pub missing_genes: Option<MissingGenesArg>,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub prep: PrepArgs,

    #[command(flatten)]
    pub model: ModelConfigArgs,

    #[arg(long, help = "CSV indexed by cell identifier")]
    pub metadata: PathBuf,

    #[arg(long)]
    pub ptime_out: PathBuf,

    #[arg(long)]
    pub embedding_out: Option<PathBuf>,

    #[arg(long, value_delimiter = ',', help = "Metadata columns to keep (default: all)")]
    pub metadata_columns: Option<Vec<String>>,

    #[arg(long, default_value_t = false)]
    pub reverse_time: bool,

    #[arg(long, default_value_t = false)]
    pub sort_by_ptime: bool,

    #[arg(long, help = "Metadata column for per-group pseudotime summaries")]
    pub group_by: Option<String>,

    #[arg(long, requires = "group_by")]
    pub group_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, help = "10x HDF5 file (.h5) or 10x MTX directory")]
    pub input: PathBuf,

    #[arg(long)]
    pub exclude: Option<PathBuf>,

    #[arg(long)]
    pub min_cells: Option<usize>,

    #[arg(long)]
    pub n_top_genes: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub command: ModelCommand,
}

#[derive(Debug, Subcommand)]
pub enum ModelCommand {
    /// Print artifact metadata.
    Show(ModelShowArgs),
}

#[derive(Debug, Args)]
pub struct ModelShowArgs {
    #[arg(long)]
    pub model: PathBuf,

    #[arg(long, default_value_t = false, help = "Also list the ordered gene set")]
    pub genes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingGenesArg {
    FailFast,
    ZeroFill,
}

impl From<MissingGenesArg> for MissingGenePolicy {
    fn from(arg: MissingGenesArg) -> Self {
        match arg {
            MissingGenesArg::FailFast => MissingGenePolicy::FailFast,
            MissingGenesArg::ZeroFill => MissingGenePolicy::ZeroFill,
        }
    }
}

impl PrepArgs {
    /// Loads the config file, if any, and applies flag overrides.
    pub fn resolve_config(&self) -> anyhow::Result<PrepConfig> {
        let mut config = match &self.config {
            Some(path) => PrepConfig::from_json_file(path)?,
            None => PrepConfig::default(),
        };
        if let Some(v) = self.min_cells {
            config.min_cells = v;
        }
        if let Some(v) = self.n_top_genes {
            config.n_top_genes = v;
        }
        Ok(config)
    }
}

impl ModelConfigArgs {
    pub fn apply(&self, config: &mut PrepConfig) {
        if let Some(v) = self.n_latent {
            config.model.n_latent = v;
        }
        if let Some(v) = self.seed {
            config.model.seed = v;
        }
    }
}
