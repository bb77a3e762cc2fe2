// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build, serve and watch a static front-end project.",
    long_about = None
)]
pub struct CliArgs {
    /// Pipeline to run.
    ///
    /// `build` cleans the output root and runs every transform once.
    /// `default` does the same, then serves the output and watches sources.
    #[arg(value_enum, default_value = "default")]
    pub pipeline: PipelineName,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Sitepipe.toml` in the current directory is used when it
    /// exists; otherwise the built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and print the pipeline plan without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not open a browser when the dev server is ready.
    #[arg(long)]
    pub no_open: bool,
}

/// Named pipelines exposed on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PipelineName {
    Build,
    #[value(alias = "dev")]
    Default,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_defaults_to_default() {
        let args = CliArgs::try_parse_from(["sitepipe"]).unwrap();
        assert_eq!(args.pipeline, PipelineName::Default);
        assert!(args.config.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn parses_build_and_dev_alias() {
        let args = CliArgs::try_parse_from(["sitepipe", "build", "--dry-run"]).unwrap();
        assert_eq!(args.pipeline, PipelineName::Build);
        assert!(args.dry_run);

        let args = CliArgs::try_parse_from(["sitepipe", "dev", "--no-open"]).unwrap();
        assert_eq!(args.pipeline, PipelineName::Default);
        assert!(args.no_open);
    }
}
