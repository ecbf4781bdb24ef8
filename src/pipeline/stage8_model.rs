use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::model::artifact::PreprocessingSnapshot;
use crate::model::{PrincipalAxisBackend, TrainedModelArtifact, TrajectoryBackend, backend_for};
use crate::pipeline::Stage;
use crate::schema::v1::{Mode, ModelSummary};

pub struct Stage8Model;

impl Stage8Model {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage8Model {
    fn name(&self) -> &'static str {
        "stage8_model"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let aligned = ctx.aligned.as_ref().context("aligned matrix missing")?;

        if ctx.mode == Mode::Predict {
            let artifact = ctx.artifact.as_ref().context("model artifact not loaded")?;
            let backend = backend_for(&artifact.params);
            let trajectory = backend.predict(&artifact.params, aligned)?;
            trajectory.check_shape()?;
            info!(
                backend = backend.name(),
                cells = trajectory.n_cells(),
                n_latent = trajectory.n_latent(),
                "trajectory_predicted"
            );
            ctx.trajectory = Some(trajectory);
            return Ok(());
        }

        let backend = PrincipalAxisBackend;
        let trained = backend.train(aligned, &ctx.config.model)?;
        trained.trajectory.check_shape()?;
        info!(
            backend = backend.name(),
            cells = trained.trajectory.n_cells(),
            n_latent = trained.trajectory.n_latent(),
            "trajectory_trained"
        );

        let genes = ctx
            .model_genes
            .clone()
            .context("model gene set not fixed")?;
        let name = ctx
            .output
            .model_name
            .clone()
            .unwrap_or_else(|| "explore".to_string());
        ctx.report.model = Some(ModelSummary {
            name: name.clone(),
            backend: trained.params.backend_name().to_string(),
            genes: genes.len() as u64,
            n_latent: trained.params.n_latent() as u64,
        });
        if ctx.mode == Mode::Train {
            let preprocessing =
                PreprocessingSnapshot::from_config(&ctx.config, ctx.exclusion.is_some());
            ctx.artifact = Some(TrainedModelArtifact::new(
                &name,
                genes,
                preprocessing,
                trained.params,
            ));
        }
        ctx.trajectory = Some(trained.trajectory);
        Ok(())
    }
}
