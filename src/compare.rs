//! Decide pass/fail for one executed example.
use crate::config::FailureMatch;
use crate::runner::ExecutionResult;
use crate::source::{ChapterSource, Example};
use crate::util::{bounded_snippet, truncate_string};
use crate::validation::{Divergence, ValidationRecord, Verdict};
use serde_json::Value;

/// Mismatch listings stop after this many entries.
pub const MAX_DIVERGENCES: usize = 16;
const RELATIVE_EPSILON: f64 = 1e-9;
const SUMMARY_MAX_BYTES: usize = 120;
const STDERR_EXCERPT_LINES: usize = 20;
const STDERR_EXCERPT_BYTES: usize = 2048;

pub fn compare(
    chapter: &ChapterSource,
    example: &Example,
    result: &ExecutionResult,
    failure_match: FailureMatch,
) -> ValidationRecord {
    let (verdict, divergences, detail) = assess(example, result, failure_match);
    let stderr_excerpt = if verdict.is_pass() || result.stderr.trim().is_empty() {
        None
    } else {
        Some(bounded_snippet(
            result.stderr.trim_end(),
            STDERR_EXCERPT_LINES,
            STDERR_EXCERPT_BYTES,
        ))
    };
    ValidationRecord {
        chapter: chapter.id.clone(),
        example: example.name.clone(),
        file: chapter.path.display().to_string(),
        line: example.line,
        verdict,
        divergences,
        detail,
        exit_code: result.exit_code,
        stderr_excerpt,
        command_line: result.command_line.clone(),
        duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
    }
}

fn assess(
    example: &Example,
    result: &ExecutionResult,
    failure_match: FailureMatch,
) -> (Verdict, Vec<Divergence>, Option<String>) {
    if result.timed_out {
        return (
            Verdict::FailTimeout,
            Vec::new(),
            Some("engine did not finish within the timeout".to_string()),
        );
    }
    if let Some(err) = &result.spawn_error {
        return (
            Verdict::FailError,
            Vec::new(),
            Some(format!("failed to start engine: {err}")),
        );
    }
    let succeeded = result.exit_code == Some(0);

    if let Some(declared) = &example.expect_error {
        if succeeded {
            return (
                Verdict::FailError,
                Vec::new(),
                Some("expected the engine to fail, but it exited 0".to_string()),
            );
        }
        if failure_match == FailureMatch::Message {
            if let Some(contains) = &declared.contains {
                if !result.stderr.contains(contains.as_str()) {
                    return (
                        Verdict::FailError,
                        Vec::new(),
                        Some(format!("stderr does not contain {contains:?}")),
                    );
                }
            }
        }
        return (Verdict::Pass, Vec::new(), None);
    }

    if !succeeded {
        let detail = match result.exit_code {
            Some(code) => format!("engine exited with code {code}"),
            None => "engine was terminated by a signal".to_string(),
        };
        return (Verdict::FailError, Vec::new(), Some(detail));
    }

    let Some(expected) = &example.expected else {
        return (
            Verdict::FailError,
            Vec::new(),
            Some("no expected value declared".to_string()),
        );
    };
    let actual: Value = match serde_json::from_str(result.stdout.trim()) {
        Ok(value) => value,
        Err(err) => {
            return (
                Verdict::FailError,
                Vec::new(),
                Some(format!("stdout is not valid JSON: {err}")),
            )
        }
    };

    let divergences = diff(expected, &actual);
    if divergences.is_empty() {
        (Verdict::Pass, divergences, None)
    } else {
        let detail = format!(
            "{} divergence(s); first at {}",
            divergences.len(),
            display_pointer(&divergences[0].path)
        );
        (Verdict::FailMismatch, divergences, Some(detail))
    }
}

/// Structural differences between `expected` and `actual`, in traversal order.
pub fn diff(expected: &Value, actual: &Value) -> Vec<Divergence> {
    let mut out = Vec::new();
    diff_at("", expected, actual, &mut out);
    out
}

/// RFC 6901 renders the document root as the empty pointer.
pub fn display_pointer(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}

fn diff_at(path: &str, expected: &Value, actual: &Value, out: &mut Vec<Divergence>) {
    if out.len() >= MAX_DIVERGENCES {
        return;
    }
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => {
            for key in want.keys().filter(|key| !got.contains_key(*key)) {
                push(
                    out,
                    child_path(path, key),
                    summarize(Some(&want[key])),
                    "(missing)".to_string(),
                );
            }
            for key in got.keys().filter(|key| !want.contains_key(*key)) {
                push(
                    out,
                    child_path(path, key),
                    "(missing)".to_string(),
                    summarize(Some(&got[key])),
                );
            }
            for (key, want_value) in want {
                if let Some(got_value) = got.get(key) {
                    diff_at(&child_path(path, key), want_value, got_value, out);
                }
            }
        }
        (Value::Array(want), Value::Array(got)) => {
            if want.len() != got.len() {
                push(
                    out,
                    path.to_string(),
                    format!("array of length {}", want.len()),
                    format!("array of length {}", got.len()),
                );
            }
            for (idx, (want_item, got_item)) in want.iter().zip(got).enumerate() {
                diff_at(&child_path(path, &idx.to_string()), want_item, got_item, out);
            }
        }
        (Value::Number(want), Value::Number(got)) => {
            if !numbers_equal(want, got) {
                push(out, path.to_string(), want.to_string(), got.to_string());
            }
        }
        (want, got) if want == got => {}
        (want, got) => push(out, path.to_string(), summarize(Some(want)), summarize(Some(got))),
    }
}

fn numbers_equal(want: &serde_json::Number, got: &serde_json::Number) -> bool {
    let both_integers = !want.is_f64() && !got.is_f64();
    if both_integers {
        return want == got;
    }
    match (want.as_f64(), got.as_f64()) {
        (Some(a), Some(b)) => {
            let scale = 1.0_f64.max(a.abs()).max(b.abs());
            (a - b).abs() <= RELATIVE_EPSILON * scale
        }
        _ => false,
    }
}

fn push(out: &mut Vec<Divergence>, path: String, expected: String, actual: String) {
    if out.len() < MAX_DIVERGENCES {
        out.push(Divergence {
            path,
            expected,
            actual,
        });
    }
}

fn child_path(parent: &str, token: &str) -> String {
    let escaped = token.replace('~', "~0").replace('/', "~1");
    format!("{parent}/{escaped}")
}

fn summarize(value: Option<&Value>) -> String {
    match value {
        None => "(missing)".to_string(),
        Some(value) => {
            let text = value.to_string();
            if text.len() > SUMMARY_MAX_BYTES {
                format!("{}...", truncate_string(&text, SUMMARY_MAX_BYTES))
            } else {
                text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChapterKind, ExpectedFailure};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn chapter() -> ChapterSource {
        ChapterSource {
            id: "ch01".to_string(),
            kind: ChapterKind::Chapter { number: 1 },
            title: "T".to_string(),
            objectives: None,
            summary: None,
            blocks: Vec::new(),
            examples: Vec::new(),
            path: PathBuf::from("book/ch01.toml"),
        }
    }

    fn example(expected: Option<Value>, expect_error: Option<ExpectedFailure>) -> Example {
        Example {
            name: "ex".to_string(),
            category: "general".to_string(),
            description: String::new(),
            tutorial: None,
            notes: None,
            script: json!(null),
            inputs: Vec::new(),
            expected,
            flags: Vec::new(),
            expect_error,
            line: 7,
        }
    }

    fn finished(code: i32, stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(5),
            command_line: "computo script.json".to_string(),
            ..ExecutionResult::default()
        }
    }

    fn verdict_of(example: &Example, result: &ExecutionResult, mode: FailureMatch) -> Verdict {
        compare(&chapter(), example, result, mode).verdict
    }

    #[test]
    fn key_order_and_number_formatting_do_not_matter() {
        let ex = example(Some(json!({"a": 1, "b": 20})), None);
        let result = finished(0, "{\"b\": 20.000000, \"a\": 1}\n", "");
        let record = compare(&chapter(), &ex, &result, FailureMatch::Any);
        assert_eq!(record.verdict, Verdict::Pass);
        assert!(record.divergences.is_empty());
        assert_eq!(record.file, "book/ch01.toml");
        assert_eq!(record.line, 7);
    }

    #[test]
    fn close_but_different_numbers_mismatch() {
        let ex = example(Some(json!({"total": 20})), None);
        let result = finished(0, "{\"total\": 20.1}", "");
        let record = compare(&chapter(), &ex, &result, FailureMatch::Any);
        assert_eq!(record.verdict, Verdict::FailMismatch);
        assert_eq!(record.divergences[0].path, "/total");
        assert_eq!(record.divergences[0].expected, "20");
        assert_eq!(record.divergences[0].actual, "20.1");
    }

    #[test]
    fn array_order_matters_and_lengths_are_reported() {
        let ex = example(Some(json!([1, 2, 3])), None);
        let record = compare(&chapter(), &ex, &finished(0, "[1, 3, 2]", ""), FailureMatch::Any);
        assert_eq!(record.verdict, Verdict::FailMismatch);
        assert_eq!(record.divergences[0].path, "/1");

        let divergences = diff(&json!([1, 2]), &json!([1]));
        assert_eq!(divergences[0].path, "");
        assert_eq!(divergences[0].actual, "array of length 1");
    }

    #[test]
    fn pointer_paths_escape_and_listing_is_capped() {
        let divergences = diff(&json!({"a/b": {"c~d": 1}}), &json!({"a/b": {"c~d": 2}}));
        assert_eq!(divergences[0].path, "/a~1b/c~0d");

        let want: Vec<i32> = (0..40).collect();
        let got: Vec<i32> = (100..140).collect();
        assert_eq!(diff(&json!(want), &json!(got)).len(), MAX_DIVERGENCES);
    }

    #[test]
    fn missing_and_extra_keys_are_divergences() {
        let divergences = diff(&json!({"a": 1}), &json!({"b": 1}));
        assert_eq!(divergences.len(), 2);
        assert_eq!(divergences[0].path, "/a");
        assert_eq!(divergences[0].actual, "(missing)");
        assert_eq!(divergences[1].path, "/b");
        assert_eq!(divergences[1].expected, "(missing)");
    }

    #[test]
    fn execution_failures_are_errors() {
        let ex = example(Some(json!(1)), None);
        let result = finished(1, "", "unknown operator\n");
        let record = compare(&chapter(), &ex, &result, FailureMatch::Any);
        assert_eq!(record.verdict, Verdict::FailError);
        assert_eq!(record.exit_code, Some(1));
        assert_eq!(record.stderr_excerpt.as_deref(), Some("unknown operator"));

        let garbage = finished(0, "not json", "");
        assert_eq!(verdict_of(&ex, &garbage, FailureMatch::Any), Verdict::FailError);

        let timed_out = ExecutionResult {
            timed_out: true,
            ..ExecutionResult::default()
        };
        assert_eq!(verdict_of(&ex, &timed_out, FailureMatch::Any), Verdict::FailTimeout);

        let not_started = ExecutionResult {
            spawn_error: Some("No such file".to_string()),
            ..ExecutionResult::default()
        };
        assert_eq!(verdict_of(&ex, &not_started, FailureMatch::Any), Verdict::FailError);
    }

    #[test]
    fn declared_failures_follow_strictness() {
        let declared = example(
            None,
            Some(ExpectedFailure {
                contains: Some("not found".to_string()),
            }),
        );
        let wrong_message = finished(1, "", "type error\n");
        let right_message = finished(1, "", "variable not found\n");
        let success = finished(0, "1", "");

        assert_eq!(verdict_of(&declared, &wrong_message, FailureMatch::Any), Verdict::Pass);
        assert_eq!(
            verdict_of(&declared, &wrong_message, FailureMatch::Message),
            Verdict::FailError
        );
        assert_eq!(verdict_of(&declared, &right_message, FailureMatch::Message), Verdict::Pass);
        assert_eq!(verdict_of(&declared, &success, FailureMatch::Any), Verdict::FailError);
    }
}
