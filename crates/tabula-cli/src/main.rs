#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod demo;
mod output;
mod telemetry;

use std::process;

use anyhow::Context;
use tabula_runtime::data::{Schema, SchemaDerivation};

use crate::config::{Cli, Command, DeriveArgs, RunArgs};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "tabula_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "tabula_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "tabula_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %format!("{error:#}"),
            "Command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    telemetry::init_tracing()?;
    Cli::log_build_info();

    match cli.command {
        Command::Run(args) => run_demo(args).await,
        Command::Derive(args) => derive(&args),
    }
}

/// Executes a bundled workflow and prints its results.
async fn run_demo(args: RunArgs) -> anyhow::Result<()> {
    args.engine.log();
    let engine = args.engine.create_engine()?;

    let workflow = args
        .demo
        .build()
        .with_context(|| format!("failed to build the '{}' workflow", args.demo))?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        demo = %args.demo,
        engine = engine.name(),
        nodes = workflow.graph.node_count(),
        edges = workflow.graph.edge_count(),
        "Running workflow"
    );

    let result = engine
        .execute(&workflow.graph)
        .await
        .with_context(|| format!("workflow '{}' failed", args.demo))?;

    print!("{}", output::render(&result, &workflow.outputs, args.format)?);
    Ok(())
}

/// Prints the schema derived from `args.schema`.
fn derive(args: &DeriveArgs) -> anyhow::Result<()> {
    let schema: Schema = args
        .schema
        .parse()
        .with_context(|| format!("invalid schema '{}'", args.schema))?;
    let derivation: SchemaDerivation = args
        .derivation
        .parse()
        .with_context(|| format!("invalid derivation '{}'", args.derivation))?;

    let derived = derivation
        .apply(&schema)
        .with_context(|| format!("cannot apply '{derivation}' to '{schema}'"))?;
    println!("{derived}");
    Ok(())
}
