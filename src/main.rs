use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use kira_pseudotime::cli::{
    Cli, Commands, ExploreArgs, ModelCommand, ModelShowArgs, PredictArgs, TrainArgs, ValidateArgs,
};
use kira_pseudotime::config::PrepConfig;
use kira_pseudotime::ctx::Ctx;
use kira_pseudotime::error::PrepError;
use kira_pseudotime::io;
use kira_pseudotime::model::TrainedModelArtifact;
use kira_pseudotime::pipeline::Pipeline;
use kira_pseudotime::schema::v1::Mode;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        if let Some(PrepError::EmptyCellIntersection { .. }) = err.downcast_ref::<PrepError>() {
            println!("{}", err);
        } else {
            eprintln!("Error: {:?}", err);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Predict(args) => run_predict(args),
        Commands::Explore(args) => run_explore(args),
        Commands::Validate(args) => run_validate(args),
        Commands::Model(args) => match args.command {
            ModelCommand::Show(show) => handle_model_show(show),
        },
    }
}

fn new_ctx(input: &Path, mode: Mode, config: PrepConfig) -> Ctx {
    Ctx::new(input.to_path_buf(), mode, config, env!("CARGO_PKG_VERSION"))
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut config = args.prep.resolve_config()?;
    args.model.apply(&mut config);

    let mut ctx = new_ctx(&args.prep.input, Mode::Train, config);
    ctx.threads = args.prep.threads;
    ctx.exclude_path = args.prep.exclude.clone();
    ctx.output.ptime = Some(args.ptime_out);
    ctx.output.embedding = Some(args.embedding_out);
    ctx.output.model_dir = Some(args.model_dir);
    ctx.output.model_name = Some(args.model_name);
    ctx.output.report = args.prep.report.clone();

    Pipeline::for_mode(Mode::Train).run(&mut ctx)?;
    print_summary(&ctx)
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let mut config = args.prep.resolve_config()?;
    if let Some(policy) = args.missing_genes {
        config.missing_genes = policy.into();
    }

    let mut ctx = new_ctx(&args.prep.input, Mode::Predict, config);
    ctx.threads = args.prep.threads;
    ctx.exclude_path = args.prep.exclude.clone();
    ctx.model_path = Some(args.model);
    ctx.output.ptime = Some(args.ptime_out);
    ctx.output.embedding = Some(args.embedding_out);
    ctx.output.report = args.prep.report.clone();

    Pipeline::for_mode(Mode::Predict).run(&mut ctx)?;
    print_summary(&ctx)
}

fn run_explore(args: ExploreArgs) -> Result<()> {
    let mut config = args.prep.resolve_config()?;
    args.model.apply(&mut config);

    let mut ctx = new_ctx(&args.prep.input, Mode::Explore, config);
    ctx.threads = args.prep.threads;
    ctx.exclude_path = args.prep.exclude.clone();
    ctx.explore.metadata_path = Some(args.metadata);
    ctx.explore.metadata_columns = args.metadata_columns;
    ctx.explore.reverse_time = args.reverse_time;
    ctx.explore.sort_by_ptime = args.sort_by_ptime;
    ctx.explore.group_by = args.group_by;
    ctx.output.ptime = Some(args.ptime_out);
    ctx.output.embedding = args.embedding_out;
    ctx.output.groups = args.group_out;
    ctx.output.report = args.prep.report.clone();

    Pipeline::for_mode(Mode::Explore).run(&mut ctx)?;
    print_summary(&ctx)
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let mut config = PrepConfig::default();
    if let Some(v) = args.min_cells {
        config.min_cells = v;
    }
    if let Some(v) = args.n_top_genes {
        config.n_top_genes = v;
    }

    let mut ctx = new_ctx(&args.input, Mode::Validate, config);
    ctx.exclude_path = args.exclude;

    Pipeline::for_mode(Mode::Validate).run(&mut ctx)?;
    print_validate_summary(&ctx);
    Ok(())
}

fn print_summary(ctx: &Ctx) -> Result<()> {
    let summary = io::summary::format_summary(ctx)?;
    print!("{}", summary);
    print_warnings(ctx);
    Ok(())
}

fn print_validate_summary(ctx: &Ctx) {
    let meta = &ctx.report.input_meta;
    println!("kira-pseudotime validate ok");
    println!("genes: {}", meta.genes.unwrap_or(0));
    println!("cells: {}", meta.cells.unwrap_or(0));
    println!("nnz: {}", meta.nnz.unwrap_or(0));
    if let Some(qc) = &ctx.report.qc {
        println!("qc_passing: {}", qc.genes_passing);
    }
    if let Some(hvg) = &ctx.report.hvg {
        println!("hvg_selected: {}", hvg.selected);
    }
    print_warnings(ctx);
}

fn print_warnings(ctx: &Ctx) {
    if !ctx.warnings.is_empty() {
        println!("warnings:");
        for warning in &ctx.warnings {
            println!("- {}", warning);
        }
    }
}

fn handle_model_show(args: ModelShowArgs) -> Result<()> {
    let artifact = TrainedModelArtifact::load(&args.model)?;
    println!("model: {}", artifact.model_name);
    println!("tool: {} v{}", artifact.tool, artifact.version);
    println!("schema: {}", artifact.schema_version);
    println!("backend: {}", artifact.params.backend_name());
    println!("genes: {}", artifact.genes.len());
    println!("n_latent: {}", artifact.params.n_latent());
    println!(
        "preprocessing: min_cells={} n_top_genes={} flavor={} span={}",
        artifact.preprocessing.min_cells,
        artifact.preprocessing.n_top_genes,
        artifact.preprocessing.hvg_flavor,
        artifact.preprocessing.hvg_span
    );
    if args.genes {
        for gene in artifact.genes.iter() {
            println!("{}", gene);
        }
    }
    Ok(())
}
