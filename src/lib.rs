// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod server;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::cli::{CliArgs, PipelineName};
use crate::config::load_or_default;
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::orchestrator::Orchestrator;

pub use crate::orchestrator::{BUILD_PIPELINE, CLEAN_TASK};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (explicit path, `Sitepipe.toml`, or defaults)
/// - the task registry and pipelines
/// - `--dry-run` plan printing
/// - the chosen pipeline
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    let orchestrator = Orchestrator::from_config(cfg, Arc::new(RealFileSystem))?;

    if args.dry_run {
        println!("sitepipe dry-run ({:?})", args.pipeline);
        print!("{}", orchestrator.describe(args.pipeline));
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    match args.pipeline {
        PipelineName::Build => orchestrator.run_build().await,
        PipelineName::Default => orchestrator.run_default(!args.no_open).await,
    }
}
