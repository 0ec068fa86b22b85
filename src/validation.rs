//! Run every example, judge it, and aggregate the verdicts.
//!
//! Execution fans out over a fixed pool of worker threads. Workers only share
//! the job cursor and an append-only collector; the collected records are
//! sorted back into declaration order before reports are built, so output never
//! depends on scheduling.
mod report;

pub use report::{render_book_markdown, render_chapter_markdown, write_reports};

use crate::compare::compare;
use crate::config::FailureMatch;
use crate::error::BuildExit;
use crate::runner::{self, EngineInvocation};
use crate::source::Book;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Pass,
    FailMismatch,
    FailError,
    FailTimeout,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::FailMismatch => "fail-mismatch",
            Verdict::FailError => "fail-error",
            Verdict::FailTimeout => "fail-timeout",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point where actual output disagrees with the expectation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// JSON pointer into the document; empty for the root.
    pub path: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ValidationRecord {
    pub chapter: String,
    pub example: String,
    pub file: String,
    pub line: usize,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub divergences: Vec<Divergence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_excerpt: Option<String>,
    pub command_line: String,
    pub duration_ms: u64,
}

impl ValidationRecord {
    /// `file:line` for editors and CI annotations.
    pub fn source(&self) -> String {
        if self.line == 0 {
            self.file.clone()
        } else {
            format!("{}:{}", self.file, self.line)
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub passed: usize,
    pub mismatched: usize,
    pub errored: usize,
    pub timed_out: usize,
}

impl Counts {
    pub fn record(&mut self, verdict: Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::FailMismatch => self.mismatched += 1,
            Verdict::FailError => self.errored += 1,
            Verdict::FailTimeout => self.timed_out += 1,
        }
    }

    pub fn add(&mut self, other: &Counts) {
        self.total += other.total;
        self.passed += other.passed;
        self.mismatched += other.mismatched;
        self.errored += other.errored;
        self.timed_out += other.timed_out;
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChapterReport {
    pub schema_version: u32,
    pub chapter: String,
    pub heading: String,
    pub counts: Counts,
    pub records: Vec<ValidationRecord>,
}

impl ChapterReport {
    pub fn failures(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.iter().filter(|record| !record.verdict.is_pass())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildReport {
    pub schema_version: u32,
    pub engine: String,
    pub counts: Counts,
    pub chapters: Vec<ChapterReport>,
}

impl BuildReport {
    pub fn passed(&self) -> bool {
        self.counts.failed() == 0
    }

    pub fn exit_code(&self) -> BuildExit {
        if self.passed() {
            BuildExit::Clean
        } else {
            BuildExit::ValidationFailures
        }
    }

    pub fn record(&self, chapter: &str, example: &str) -> Option<&ValidationRecord> {
        self.chapters
            .iter()
            .find(|report| report.chapter == chapter)?
            .records
            .iter()
            .find(|record| record.example == example)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.chapters.iter().flat_map(ChapterReport::failures)
    }
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub engine: EngineInvocation,
    pub jobs: usize,
    pub failure_match: FailureMatch,
}

/// Execute and judge every example of `book`. Individual failures never abort.
pub fn validate(book: &Book, options: &ValidateOptions) -> BuildReport {
    let jobs: Vec<(usize, usize)> = book
        .chapters
        .iter()
        .enumerate()
        .flat_map(|(chapter_idx, chapter)| {
            (0..chapter.examples.len()).map(move |example_idx| (chapter_idx, example_idx))
        })
        .collect();
    let workers = options.jobs.clamp(1, jobs.len().max(1));
    tracing::info!(
        examples = jobs.len(),
        workers,
        engine = %options.engine.program,
        "validating examples"
    );

    let start = Instant::now();
    let cursor = AtomicUsize::new(0);
    let collector: Mutex<Vec<(usize, usize, ValidationRecord)>> =
        Mutex::new(Vec::with_capacity(jobs.len()));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let next = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(&(chapter_idx, example_idx)) = jobs.get(next) else {
                    break;
                };
                let chapter = &book.chapters[chapter_idx];
                let example = &chapter.examples[example_idx];
                let result = runner::run(example, &options.engine);
                let record = compare(chapter, example, &result, options.failure_match);
                if record.verdict.is_pass() {
                    tracing::debug!(chapter = %chapter.id, example = %example.name, "pass");
                } else {
                    tracing::warn!(
                        chapter = %chapter.id,
                        example = %example.name,
                        verdict = %record.verdict,
                        source = %record.source(),
                        "example failed"
                    );
                }
                collector
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((chapter_idx, example_idx, record));
            });
        }
    });

    let mut collected = collector.into_inner().unwrap_or_else(PoisonError::into_inner);
    collected.sort_by_key(|(chapter_idx, example_idx, _)| (*chapter_idx, *example_idx));

    let mut chapters: Vec<ChapterReport> = book
        .chapters
        .iter()
        .map(|chapter| ChapterReport {
            schema_version: REPORT_SCHEMA_VERSION,
            chapter: chapter.id.clone(),
            heading: chapter.heading(),
            counts: Counts::default(),
            records: Vec::with_capacity(chapter.examples.len()),
        })
        .collect();
    for (chapter_idx, _, record) in collected {
        let report = &mut chapters[chapter_idx];
        report.counts.record(record.verdict);
        report.records.push(record);
    }
    let mut counts = Counts::default();
    for report in &chapters {
        counts.add(&report.counts);
    }

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        total = counts.total,
        passed = counts.passed,
        failed = counts.failed(),
        "validation finished"
    );
    BuildReport {
        schema_version: REPORT_SCHEMA_VERSION,
        engine: options.engine.program.clone(),
        counts,
        chapters,
    }
}
