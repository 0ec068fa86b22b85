use clap::Parser;
use exbook::cli::{Command, RootArgs, SourceArgs};
use exbook::config::{load_config_file, resolve_config, BuildConfig, Overrides};
use exbook::paths::OutputPaths;
use exbook::util::display_path;
use exbook::{check, run_build, BuildError, BuildExit, BuildOutcome};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    let exit = match run(args.command) {
        Ok(exit) => exit,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    };
    ExitCode::from(exit.code())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

fn run(command: Command) -> Result<BuildExit, BuildError> {
    match command {
        Command::Build(args) => {
            let config = resolve(&args.source, &args.overrides())?;
            let outcome = run_build(&config)?;
            print_outcome(&config, &outcome);
            Ok(outcome.exit)
        }
        Command::Validate(args) => {
            let config = resolve(&args.source, &args.overrides())?;
            let outcome = run_build(&config)?;
            print_outcome(&config, &outcome);
            Ok(outcome.exit)
        }
        Command::Check(args) => {
            let config = resolve(&args.source, &Overrides::default())?;
            let book = check(&config)?;
            println!(
                "ok: {} chapters, {} examples in {}",
                book.chapters.len(),
                book.example_count(),
                config.source_dir.display()
            );
            Ok(BuildExit::Clean)
        }
    }
}

fn resolve(source: &SourceArgs, overrides: &Overrides) -> Result<BuildConfig, BuildError> {
    let file = load_config_file(&source.source_dir, source.config.as_deref())?;
    Ok(resolve_config(source.source_dir.clone(), file, overrides)?)
}

fn print_outcome(config: &BuildConfig, outcome: &BuildOutcome) {
    let paths = OutputPaths::new(config.output_dir.clone());
    if let Some(report) = &outcome.report {
        for record in report.failures() {
            eprintln!(
                "FAIL {}/{} ({}) at {}: {}",
                record.chapter,
                record.example,
                record.verdict,
                record.source(),
                record.detail.as_deref().unwrap_or("no detail")
            );
        }
        println!(
            "validation: {} passed, {} failed of {} (see {})",
            report.counts.passed,
            report.counts.failed(),
            report.counts.total,
            paths.book_report("md").display()
        );
    }
    if !outcome.pages.is_empty() {
        println!(
            "wrote {} ({} pages)",
            paths.docs_dir().display(),
            outcome.pages.len()
        );
    }
    if !outcome.html_pages.is_empty() {
        println!(
            "wrote {} ({} pages)",
            paths.html_dir().display(),
            outcome.html_pages.len()
        );
    }
    if let Some(summary) = &outcome.package {
        println!(
            "wrote {} ({} examples, sha256 {})",
            display_path(&summary.book_archive.path, None),
            summary.examples,
            summary.book_archive.sha256
        );
    }
    if let Some(path) = &outcome.summary_path {
        println!("wrote {}", path.display());
    }
}
