//! Runnable per-example bundles and their download archives.
//!
//! The `code/` tree is regenerated wholesale on every run, so examples that
//! were removed from the sources (or stopped passing) leave nothing behind.
mod archive;
mod launcher;

pub use archive::{write_archive, ArchiveDigest};
pub use launcher::{
    launcher_engine, render_batch, render_run_all, render_shell, render_test, ENGINE_ENV_VAR,
    RUN_ALL_SCRIPT, TEST_SCRIPT,
};

use crate::fsutil::{
    collect_files_recursive, remove_dir_if_exists, write_executable, write_json, write_text,
};
use crate::paths::{example_rel_dir, OutputPaths};
use crate::publish::{Publication, PublishGate};
use crate::runner::{materialize_payloads, write_document};
use crate::source::{
    Book, ChapterSource, Example, EXPECTED_ERROR_FILE, EXPECTED_FILE, SCRIPT_FILE,
};
use crate::util::{format_command_line, title_case};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const METADATA_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Default engine written into launchers and READMEs.
    pub engine: String,
    /// Per-example bound used by `run_all.sh`.
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
    pub examples: usize,
    pub chapter_archives: Vec<ArchiveDigest>,
    pub book_archive: ArchiveDigest,
}

#[derive(Debug, Serialize)]
struct ExampleMetadata<'a> {
    schema_version: u32,
    chapter: &'a str,
    chapter_heading: String,
    name: &'a str,
    category: &'a str,
    description: &'a str,
    source: String,
    flags: Vec<String>,
    inputs: Vec<String>,
    command_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expect_error: Option<ExpectErrorMetadata<'a>>,
    verified: bool,
}

#[derive(Debug, Serialize)]
struct ExpectErrorMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    contains: Option<&'a str>,
}

/// Rebuild `code/` for every publishable example.
pub fn package(
    book: &Book,
    gate: &PublishGate<'_>,
    paths: &OutputPaths,
    options: &PackageOptions,
) -> Result<PackageSummary> {
    let start = Instant::now();
    let code_dir = paths.code_dir();
    remove_dir_if_exists(&code_dir)?;
    let engine = launcher_engine(&options.engine);

    let mut packaged = 0;
    let mut bundle_files: Vec<PathBuf> = Vec::new();
    let mut bundle_dirs: Vec<String> = Vec::new();
    let mut chapter_archives = Vec::with_capacity(book.chapters.len());
    for chapter in &book.chapters {
        let mut published: Vec<(&Example, Publication)> = Vec::new();
        for example in &chapter.examples {
            let publication = gate.decide(&chapter.id, &example.name);
            if !publication.is_published() {
                tracing::debug!(
                    chapter = %chapter.id,
                    example = %example.name,
                    "withheld from bundle"
                );
                continue;
            }
            let dir = paths.example_dir(chapter, example);
            write_bundle(&dir, book, chapter, example, publication, &engine)
                .with_context(|| format!("package {}/{}", chapter.id, example.name))?;
            bundle_dirs.push(example_rel_dir(chapter, example));
            published.push((example, publication));
        }
        packaged += published.len();

        let chapter_dir = paths.chapter_code_dir(&chapter.id);
        write_text(
            &chapter_dir.join("README.md"),
            &render_chapter_readme(chapter, &published),
        )?;
        let files = collect_files_recursive(&chapter_dir)?;
        let digest = write_archive(&paths.chapter_archive(&chapter.id), &code_dir, &files)?;
        tracing::debug!(chapter = %chapter.id, sha256 = %digest.sha256, "wrote chapter archive");
        bundle_files.extend(files);
        chapter_archives.push(digest);
    }

    let run_all = code_dir.join(RUN_ALL_SCRIPT);
    let timeout_secs =
        (options.timeout.as_secs() + u64::from(options.timeout.subsec_nanos() > 0)).max(1);
    write_executable(&run_all, &render_run_all(&bundle_dirs, timeout_secs))?;
    bundle_files.push(run_all);
    let book_archive = write_archive(&paths.book_archive(), &code_dir, &bundle_files)?;
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        examples = packaged,
        archives = chapter_archives.len() + 1,
        "packaged examples"
    );
    Ok(PackageSummary {
        examples: packaged,
        chapter_archives,
        book_archive,
    })
}

fn write_bundle(
    dir: &Path,
    book: &Book,
    chapter: &ChapterSource,
    example: &Example,
    publication: Publication,
    engine: &str,
) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    materialize_payloads(dir, example)?;
    match (&example.expect_error, &example.expected) {
        (Some(declared), _) => {
            let mut text = "The engine is expected to exit with a nonzero status.\n".to_string();
            if let Some(contains) = &declared.contains {
                text.push_str(&format!("stderr should contain: {contains}\n"));
            }
            write_text(&dir.join(EXPECTED_ERROR_FILE), &text)?;
        }
        (None, Some(expected)) => write_document(&dir.join(EXPECTED_FILE), expected)?,
        (None, None) => {}
    }

    let location = chapter.location(example).relative_to(&book.source_dir);
    let metadata = ExampleMetadata {
        schema_version: METADATA_SCHEMA_VERSION,
        chapter: &chapter.id,
        chapter_heading: chapter.heading(),
        name: &example.name,
        category: &example.category,
        description: &example.description,
        source: location.to_string(),
        flags: example.flags.iter().map(ToString::to_string).collect(),
        inputs: example.input_file_names(),
        command_line: format_command_line(engine, &example.engine_args()),
        expect_error: example.expect_error.as_ref().map(|declared| ExpectErrorMetadata {
            contains: declared.contains.as_deref(),
        }),
        verified: publication == Publication::Verified,
    };
    write_json(&dir.join("metadata.json"), &metadata)?;
    write_text(
        &dir.join("README.md"),
        &render_example_readme(chapter, example, publication, engine),
    )?;
    write_executable(&dir.join("run.sh"), &render_shell(chapter, example, engine))?;
    write_executable(&dir.join(TEST_SCRIPT), &render_test(chapter, example, engine))?;
    write_text(&dir.join("run.bat"), &render_batch(chapter, example, engine))?;
    Ok(())
}

fn render_example_readme(
    chapter: &ChapterSource,
    example: &Example,
    publication: Publication,
    engine: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title_case(&example.name)));
    out.push_str(&format!("From {}.\n\n", chapter.heading()));
    if let Publication::Unverified(_) = publication {
        out.push_str(
            "> **Unverified:** this example did not pass validation in the build that \
             produced this bundle.\n\n",
        );
    }
    if !example.description.is_empty() {
        out.push_str(&format!("{}\n\n", example.description.trim()));
    }
    if let Some(tutorial) = &example.tutorial {
        out.push_str(&format!("{}\n\n", tutorial.trim()));
    }

    out.push_str("## Files\n\n");
    out.push_str(&format!("- `{SCRIPT_FILE}`: the script\n"));
    for name in example.input_file_names() {
        out.push_str(&format!("- `{name}`: input document\n"));
    }
    if example.expect_error.is_some() {
        out.push_str(&format!("- `{EXPECTED_ERROR_FILE}`: the expected failure\n"));
    } else {
        out.push_str(&format!("- `{EXPECTED_FILE}`: the expected output\n"));
    }
    out.push_str("- `metadata.json`: example metadata\n");
    out.push_str("- `run.sh` / `run.bat`: launchers\n");
    out.push_str(&format!(
        "- `{TEST_SCRIPT}`: checks the output against the expectation\n\n"
    ));

    out.push_str("## Running\n\n```bash\n");
    out.push_str(&format_command_line(engine, &example.engine_args()));
    out.push_str("\n```\n\n");
    out.push_str(&format!(
        "Or run `./run.sh` (Unix) or `run.bat` (Windows); `./{TEST_SCRIPT}` prints PASS or \
         FAIL. Set `{ENGINE_ENV_VAR}` to use a different engine binary.\n"
    ));
    if !example.flags.is_empty() {
        out.push_str("\n## Flags\n\n");
        for flag in &example.flags {
            out.push_str(&format!("- `{flag}`: {}\n", flag.explain()));
        }
    }
    if let Some(notes) = &example.notes {
        out.push_str(&format!("\n## Notes\n\n{}\n", notes.trim()));
    }
    out
}

fn render_chapter_readme(
    chapter: &ChapterSource,
    published: &[(&Example, Publication)],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {} Examples\n\n", chapter.heading()));
    if published.is_empty() {
        out.push_str("No examples from this chapter are available.\n");
        return out;
    }
    out.push_str("| Example | Category | Directory | Status |\n");
    out.push_str("| --- | --- | --- | --- |\n");
    for (example, publication) in published {
        let rel = example_rel_dir(chapter, example);
        let dir = rel
            .strip_prefix(&format!("{}/", chapter.id))
            .unwrap_or(&rel);
        out.push_str(&format!(
            "| {} | {} | [`{dir}/`]({dir}/) | {} |\n",
            title_case(&example.name),
            example.category,
            if *publication == Publication::Verified {
                "verified"
            } else {
                "unverified"
            }
        ));
    }
    out
}
