//! CLI argument parsing for the book build.
//!
//! The CLI stays thin: it maps flags onto [`Overrides`] and leaves every
//! policy decision to the config layer.
use crate::config::{Overrides, DEFAULT_SOURCE_DIR};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "exbook",
    version,
    about = "Build a book whose examples are executed and verified",
    after_help = "Exit codes:\n  0  build succeeded and every example passed\n  1  one or more examples failed validation\n  2  chapter sources or configuration are invalid\n  3  writing reports, pages, or archives failed\n\nExamples:\n  exbook build --source-dir book-source --output-dir build\n  exbook validate --engine ./target/release/computo --jobs 4\n  exbook build --no-validate --no-package\n  exbook check --source-dir book-source",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate examples, then expand chapters and package bundles
    Build(BuildArgs),
    /// Validate examples and write reports only
    Validate(ValidateArgs),
    /// Load and schema-check chapter sources without running anything
    Check(CheckArgs),
}

/// Options shared by every command that reads chapter sources.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory holding chapter TOML files
    #[arg(long, value_name = "DIR", default_value = DEFAULT_SOURCE_DIR)]
    pub source_dir: PathBuf,

    /// Build config file (defaults to exbook.toml in the source directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Options that control example execution.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Root of all generated output
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Engine executable (path or name on PATH)
    #[arg(long, value_name = "PATH")]
    pub engine: Option<String>,

    /// Worker threads for validation (default: available cores)
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-example timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Run examples before publishing (default)
    #[arg(long, overrides_with = "no_validate")]
    pub validate: bool,

    /// Skip validation; every example is published as unverified
    #[arg(long, overrides_with = "validate")]
    pub no_validate: bool,

    /// Convert expanded pages to HTML
    #[arg(long, overrides_with = "no_html")]
    pub html: bool,

    /// Do not convert expanded pages to HTML
    #[arg(long, overrides_with = "html")]
    pub no_html: bool,

    /// Skip markdown expansion
    #[arg(long)]
    pub no_expand: bool,

    /// Skip bundle and archive generation
    #[arg(long)]
    pub no_package: bool,

    /// Publish failing examples with an unverified marker instead of omitting them
    #[arg(long)]
    pub advisory: bool,
}

impl BuildArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            output_dir: self.run.output_dir.clone(),
            engine: self.run.engine.clone(),
            validate: flag_pair(self.validate, self.no_validate),
            advisory: self.advisory,
            html: flag_pair(self.html, self.no_html),
            expand: self.no_expand.then_some(false),
            package: self.no_package.then_some(false),
            jobs: self.run.jobs,
            timeout_seconds: self.run.timeout,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl ValidateArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            output_dir: self.run.output_dir.clone(),
            engine: self.run.engine.clone(),
            validate: Some(true),
            html: Some(false),
            expand: Some(false),
            package: Some(false),
            jobs: self.run.jobs,
            timeout_seconds: self.run.timeout,
            ..Overrides::default()
        }
    }
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
