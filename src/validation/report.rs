//! Markdown and JSON validation reports.
//!
//! Markdown reports carry no timestamps or durations so identical runs
//! produce byte-identical files. Timing lives only in the JSON.
use super::{BuildReport, ChapterReport, Counts, ValidationRecord};
use crate::compare::display_pointer;
use crate::fsutil::{remove_dir_if_exists, write_json, write_text};
use crate::paths::OutputPaths;
use anyhow::Result;
use std::path::PathBuf;

/// Replace `reports/` with per-chapter and book reports; returns the written
/// paths.
pub fn write_reports(report: &BuildReport, paths: &OutputPaths) -> Result<Vec<PathBuf>> {
    remove_dir_if_exists(&paths.reports_dir())?;
    let mut written = Vec::new();
    for chapter in &report.chapters {
        let md_path = paths.chapter_report(&chapter.chapter, "md");
        write_text(&md_path, &render_chapter_markdown(chapter))?;
        written.push(md_path);
        let json_path = paths.chapter_report(&chapter.chapter, "json");
        write_json(&json_path, chapter)?;
        written.push(json_path);
    }
    let md_path = paths.book_report("md");
    write_text(&md_path, &render_book_markdown(report))?;
    written.push(md_path);
    let json_path = paths.book_report("json");
    write_json(&json_path, report)?;
    written.push(json_path);
    Ok(written)
}

pub fn render_chapter_markdown(report: &ChapterReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Validation Report: {}\n\n", report.heading));
    out.push_str(&format!("- Chapter: `{}`\n", report.chapter));
    push_counts(&mut out, &report.counts);
    out.push('\n');

    if report.records.is_empty() {
        out.push_str("This chapter has no examples.\n");
        return out;
    }

    out.push_str("## Results\n\n");
    out.push_str("| Example | Verdict | Source |\n");
    out.push_str("| --- | --- | --- |\n");
    for record in &report.records {
        out.push_str(&format!(
            "| `{}` | {} | `{}` |\n",
            record.example,
            record.verdict,
            record.source()
        ));
    }

    let failures: Vec<&ValidationRecord> = report.failures().collect();
    if !failures.is_empty() {
        out.push_str("\n## Failures\n");
        for record in failures {
            out.push('\n');
            push_failure(&mut out, record);
        }
    }
    out
}

pub fn render_book_markdown(report: &BuildReport) -> String {
    let mut out = String::new();
    out.push_str("# Validation Report\n\n");
    out.push_str(&format!("- Engine: `{}`\n", report.engine));
    out.push_str(&format!(
        "- Verdict: {}\n",
        if report.passed() { "PASS" } else { "FAIL" }
    ));
    push_counts(&mut out, &report.counts);

    out.push_str("\n## Chapters\n\n");
    out.push_str("| Chapter | Total | Passed | Failed |\n");
    out.push_str("| --- | --- | --- | --- |\n");
    for chapter in &report.chapters {
        out.push_str(&format!(
            "| [{}]({}.md) | {} | {} | {} |\n",
            chapter.heading,
            chapter.chapter,
            chapter.counts.total,
            chapter.counts.passed,
            chapter.counts.failed()
        ));
    }

    let failures: Vec<&ValidationRecord> = report.failures().collect();
    if !failures.is_empty() {
        out.push_str("\n## Failures\n");
        for record in failures {
            out.push('\n');
            push_failure(&mut out, record);
        }
    }
    out
}

fn push_counts(out: &mut String, counts: &Counts) {
    out.push_str(&format!("- Total: {}\n", counts.total));
    out.push_str(&format!("- Passed: {}\n", counts.passed));
    out.push_str(&format!("- Mismatched: {}\n", counts.mismatched));
    out.push_str(&format!("- Errored: {}\n", counts.errored));
    out.push_str(&format!("- Timed out: {}\n", counts.timed_out));
}

fn push_failure(out: &mut String, record: &ValidationRecord) {
    out.push_str(&format!(
        "### `{}` ({})\n\n",
        record.example, record.verdict
    ));
    out.push_str(&format!("- Chapter: `{}`\n", record.chapter));
    out.push_str(&format!("- Source: `{}`\n", record.source()));
    out.push_str(&format!("- Command: `{}`\n", record.command_line));
    match record.exit_code {
        Some(code) => out.push_str(&format!("- Exit code: {code}\n")),
        None => out.push_str("- Exit code: none\n"),
    }
    if let Some(detail) = &record.detail {
        out.push_str(&format!("- Detail: {detail}\n"));
    }
    if let Some(first) = record.divergences.first() {
        out.push_str(&format!(
            "- First divergence: `{}` expected `{}`, got `{}`\n",
            display_pointer(&first.path),
            first.expected,
            first.actual
        ));
    }
    if record.divergences.len() > 1 {
        out.push_str("\nAll divergences:\n\n");
        for divergence in &record.divergences {
            out.push_str(&format!(
                "- `{}`: expected `{}`, got `{}`\n",
                display_pointer(&divergence.path),
                divergence.expected,
                divergence.actual
            ));
        }
    }
    if let Some(stderr) = &record.stderr_excerpt {
        out.push_str("\nstderr:\n\n```text\n");
        out.push_str(stderr);
        if !stderr.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
    }
}
