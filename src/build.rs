//! Build orchestration: load, validate, expand, package.
//!
//! Every run starts from scratch and regenerates each enabled artifact, so two
//! builds of unchanged sources produce identical output. Reports are written
//! before anything is published, which keeps failing builds diagnosable.
use crate::config::{BuildConfig, ValidationMode};
use crate::error::{BuildError, BuildExit, PackagingError};
use crate::expand::{write_expanded, ExpandOptions};
use crate::fsutil::{remove_dir_if_exists, write_text};
use crate::html::convert_pages;
use crate::package::{package, PackageOptions, PackageSummary};
use crate::paths::OutputPaths;
use crate::publish::PublishGate;
use crate::runner::EngineInvocation;
use crate::source::{load_book, Book};
use crate::util::display_path;
use crate::validation::{validate, write_reports, BuildReport, ValidateOptions};
use anyhow::Context;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Loaded,
    Validated,
    Expanded,
    Packaged,
    Done,
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Loaded => "loaded",
            BuildState::Validated => "validated",
            BuildState::Expanded => "expanded",
            BuildState::Packaged => "packaged",
            BuildState::Done => "done",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct BuildOutcome {
    pub exit: BuildExit,
    pub states: Vec<BuildState>,
    pub report: Option<BuildReport>,
    pub report_files: Vec<PathBuf>,
    pub pages: Vec<PathBuf>,
    pub html_pages: Vec<PathBuf>,
    pub package: Option<PackageSummary>,
    pub summary_path: Option<PathBuf>,
}

/// Load sources and check their structure without running anything.
pub fn check(config: &BuildConfig) -> Result<Book, BuildError> {
    Ok(load_book(&config.source_dir)?)
}

/// Run every phase `config` enables.
pub fn run_build(config: &BuildConfig) -> Result<BuildOutcome, BuildError> {
    let mut build = Build::new(config);
    match build.run() {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            build.transition(BuildState::Failed);
            tracing::error!(
                states = %join_states(&build.states),
                error = %err,
                "build failed"
            );
            Err(err)
        }
    }
}

struct Build<'a> {
    config: &'a BuildConfig,
    paths: OutputPaths,
    states: Vec<BuildState>,
}

impl<'a> Build<'a> {
    fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            paths: OutputPaths::new(config.output_dir.clone()),
            states: Vec::new(),
        }
    }

    fn transition(&mut self, next: BuildState) {
        tracing::debug!(
            from = ?self.states.last(),
            to = %next,
            "build state"
        );
        self.states.push(next);
    }

    /// Outputs of phases this run skips would describe an earlier build.
    fn clear_disabled_outputs(&self) -> anyhow::Result<()> {
        let config = self.config;
        let mut stale = Vec::new();
        if !config.validate {
            stale.push(self.paths.reports_dir());
        }
        if !config.expand {
            stale.push(self.paths.docs_dir());
        }
        if !config.expand || !config.html {
            stale.push(self.paths.html_dir());
        }
        if !config.package {
            stale.push(self.paths.code_dir());
        }
        for dir in &stale {
            remove_dir_if_exists(dir)?;
        }
        let summary = self.paths.summary_path();
        if !(config.expand || config.package) && summary.is_file() {
            fs::remove_file(&summary)
                .with_context(|| format!("remove {}", summary.display()))?;
        }
        if !stale.is_empty() {
            tracing::debug!(dirs = stale.len(), "removed outputs of skipped phases");
        }
        Ok(())
    }

    fn run(&mut self) -> Result<BuildOutcome, BuildError> {
        let start = Instant::now();
        let config = self.config;
        let book = load_book(&config.source_dir)?;
        self.transition(BuildState::Loaded);
        self.clear_disabled_outputs()
            .map_err(|err| PackagingError::new("remove stale outputs", err))?;

        let mut report = None;
        let mut report_files = Vec::new();
        if config.validate {
            let options = ValidateOptions {
                engine: EngineInvocation::new(config.engine.clone(), config.timeout),
                jobs: config.jobs,
                failure_match: config.failure_match,
            };
            let validated = validate(&book, &options);
            report_files = write_reports(&validated, &self.paths)
                .map_err(|err| PackagingError::new("write reports", err))?;
            report = Some(validated);
            self.transition(BuildState::Validated);
        } else {
            tracing::warn!("validation skipped; publishing every example as unverified");
        }

        let gate = PublishGate::new(config.effective_mode(), report.as_ref());
        let mut pages = Vec::new();
        let mut html_pages = Vec::new();
        if config.expand {
            let options = ExpandOptions {
                engine: config.engine.clone(),
                include_descriptions: config.include_descriptions,
                downloads: config.package,
            };
            pages = write_expanded(&book, &gate, &options, &self.paths)
                .map_err(|err| PackagingError::new("expand chapters", err))?;
            if config.html {
                html_pages = convert_pages(&config.converter, &pages, &self.paths.html_dir())
                    .map_err(|err| PackagingError::new("convert to HTML", err))?;
            }
            self.transition(BuildState::Expanded);
        }

        let mut package_summary = None;
        if config.package {
            let options = PackageOptions {
                engine: config.engine.clone(),
                timeout: config.timeout,
            };
            let summary = package(&book, &gate, &self.paths, &options)
                .map_err(|err| PackagingError::new("package examples", err))?;
            package_summary = Some(summary);
            self.transition(BuildState::Packaged);
        }

        let exit = report
            .as_ref()
            .map(BuildReport::exit_code)
            .unwrap_or(BuildExit::Clean);
        let mut outcome = BuildOutcome {
            exit,
            states: Vec::new(),
            report,
            report_files,
            pages,
            html_pages,
            package: package_summary,
            summary_path: None,
        };

        if config.expand || config.package {
            self.transition(BuildState::Done);
            let path = self.paths.summary_path();
            let summary = render_summary(config, &self.paths, &self.states, &outcome);
            write_text(&path, &summary)
                .map_err(|err| PackagingError::new("write build summary", err))?;
            outcome.summary_path = Some(path);
        } else {
            self.transition(BuildState::Done);
        }
        outcome.states = self.states.clone();

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            exit_code = exit.code(),
            states = %join_states(&outcome.states),
            "build finished"
        );
        Ok(outcome)
    }
}

fn join_states(states: &[BuildState]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `build_summary.md`: phases, counts, and archive digests. No timestamps.
fn render_summary(
    config: &BuildConfig,
    paths: &OutputPaths,
    states: &[BuildState],
    outcome: &BuildOutcome,
) -> String {
    let root = Some(paths.root());
    let mut out = String::new();
    out.push_str("# Build Summary\n\n");
    out.push_str(&format!("- Sources: `{}`\n", config.source_dir.display()));
    out.push_str(&format!("- Engine: `{}`\n", config.engine));
    let validation = match (config.validate, config.effective_mode()) {
        (false, _) => "skipped",
        (true, ValidationMode::Required) => "required",
        (true, ValidationMode::Advisory) => "advisory",
    };
    out.push_str(&format!("- Validation: {validation}\n"));
    out.push_str(&format!("- Phases: {}\n", join_states(states)));
    out.push_str(&format!("- Exit code: {}\n", outcome.exit.code()));

    if let Some(report) = &outcome.report {
        out.push_str("\n## Validation\n\n");
        out.push_str(&format!("- Total: {}\n", report.counts.total));
        out.push_str(&format!("- Passed: {}\n", report.counts.passed));
        out.push_str(&format!("- Failed: {}\n", report.counts.failed()));
        for record in report.failures() {
            out.push_str(&format!(
                "  - `{}` ({}) at `{}`\n",
                record.example,
                record.verdict,
                record.source()
            ));
        }
    }

    out.push_str("\n## Outputs\n\n");
    out.push_str(&format!("- Pages: {}\n", outcome.pages.len()));
    if config.html {
        out.push_str(&format!("- HTML pages: {}\n", outcome.html_pages.len()));
    }
    if let Some(summary) = &outcome.package {
        out.push_str(&format!("- Packaged examples: {}\n", summary.examples));
        out.push_str("\n## Archives\n\n");
        out.push_str("| Archive | Members | SHA-256 |\n");
        out.push_str("| --- | --- | --- |\n");
        for digest in summary
            .chapter_archives
            .iter()
            .chain(std::iter::once(&summary.book_archive))
        {
            out.push_str(&format!(
                "| `{}` | {} | `{}` |\n",
                display_path(&digest.path, root),
                digest.members,
                digest.sha256
            ));
        }
    }
    out
}
