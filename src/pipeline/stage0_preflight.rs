use anyhow::{Context, Result, bail};
use tracing::info;

use crate::ctx::Ctx;
use crate::geneset::load_exclusion_json;
use crate::model::TrainedModelArtifact;
use crate::pipeline::Stage;
use crate::schema::v1::{Mode, ModelSummary};

/// Validates the run configuration and reads the small side inputs
/// (exclusion list, model artifact) before any matrix work starts.
pub struct Stage0Preflight;

impl Stage0Preflight {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage0Preflight {
    fn name(&self) -> &'static str {
        "stage0_preflight"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        ctx.config.validate()?;

        match ctx.mode {
            Mode::Train => {
                if ctx.output.model_dir.is_none() || ctx.output.model_name.is_none() {
                    bail!("training requires a model directory and a model name");
                }
            }
            Mode::Predict => {
                let path = ctx
                    .model_path
                    .as_ref()
                    .context("prediction requires a model path")?;
                let artifact = TrainedModelArtifact::load(path)?;
                info!(
                    model = %artifact.model_name,
                    backend = artifact.params.backend_name(),
                    genes = artifact.genes.len(),
                    "model_loaded"
                );
                if artifact.preprocessing.var_names != ctx.config.var_names {
                    ctx.warnings.push(format!(
                        "model was trained with var_names={:?}, this run uses {:?}",
                        artifact.preprocessing.var_names, ctx.config.var_names
                    ));
                }
                ctx.report.model = Some(ModelSummary {
                    name: artifact.model_name.clone(),
                    backend: artifact.params.backend_name().to_string(),
                    genes: artifact.genes.len() as u64,
                    n_latent: artifact.params.n_latent() as u64,
                });
                ctx.artifact = Some(artifact);
            }
            Mode::Explore => {
                if ctx.explore.metadata_path.is_none() {
                    bail!("explore requires a metadata table");
                }
            }
            Mode::Validate => {}
        }

        if let Some(path) = &ctx.exclude_path {
            let list = load_exclusion_json(path)?;
            info!(path = %path.display(), genes = list.len(), "exclusion_list_loaded");
            ctx.exclusion = Some(list);
        }

        info!(
            mode = ctx.mode.as_str(),
            min_cells = ctx.config.min_cells,
            n_top_genes = ctx.config.n_top_genes,
            missing_genes = ctx.config.missing_genes.as_str(),
            "run_configured"
        );
        Ok(())
    }
}
