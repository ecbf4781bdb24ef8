use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::schema::v1::Mode;

pub mod stage0_preflight;
pub mod stage10_output;
pub mod stage1_input;
pub mod stage2_metadata;
pub mod stage3_counts;
pub mod stage4_exclusion;
pub mod stage5_qc;
pub mod stage6_hvg;
pub mod stage7_features;
pub mod stage8_model;
pub mod stage9_order;

use stage0_preflight::Stage0Preflight;
use stage1_input::Stage1Input;
use stage2_metadata::Stage2Metadata;
use stage3_counts::Stage3Counts;
use stage4_exclusion::Stage4Exclusion;
use stage5_qc::Stage5Qc;
use stage6_hvg::Stage6Hvg;
use stage7_features::Stage7Features;
use stage8_model::Stage8Model;
use stage9_order::Stage9Order;
use stage10_output::Stage10Output;

pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut Ctx) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Stages for `mode`. Validation stops after variable-gene selection and
    /// writes nothing.
    pub fn for_mode(mode: Mode) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Stage0Preflight::new()),
            Box::new(Stage1Input::new()),
            Box::new(Stage2Metadata::new()),
            Box::new(Stage3Counts::new()),
            Box::new(Stage4Exclusion::new()),
            Box::new(Stage5Qc::new()),
            Box::new(Stage6Hvg::new()),
        ];
        if mode != Mode::Validate {
            stages.push(Box::new(Stage7Features::new()));
            stages.push(Box::new(Stage8Model::new()));
            stages.push(Box::new(Stage9Order::new()));
            stages.push(Box::new(Stage10Output::new()));
        }
        Self::new(stages)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, ctx: &mut Ctx) -> Result<()> {
        info!(
            mode = ctx.mode.as_str(),
            parallel = cfg!(feature = "mt"),
            "pipeline started"
        );
        for stage in &self.stages {
            let start = Instant::now();
            info!(stage = stage.name(), "stage started");
            if let Err(err) = stage.run(ctx) {
                let elapsed_ms = start.elapsed().as_millis();
                warn!(
                    stage = stage.name(),
                    elapsed_ms = elapsed_ms as u64,
                    "stage failed"
                );
                return Err(err);
            }
            let elapsed_ms = start.elapsed().as_millis();
            info!(
                stage = stage.name(),
                elapsed_ms = elapsed_ms as u64,
                "stage finished"
            );
        }
        Ok(())
    }
}
