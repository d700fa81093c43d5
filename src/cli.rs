// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build front-end assets, watch for changes and serve them with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Defaults to `Assetpipe.toml` in the current working directory;
    /// builtin paths are used when that file is absent.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Build everything once and exit; no watching, no server.
    #[arg(long)]
    pub once: bool,

    /// Remove the build output directory before building.
    #[arg(long)]
    pub clean: bool,

    /// Print the resolved path table and build mode, but don't build.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
