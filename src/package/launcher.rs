//! Scripts shipped with the bundles.
//!
//! `run.sh` / `run.bat` run the same command line validation used, with the
//! engine taken from `EXBOOK_ENGINE` when set, then print the expected output
//! for comparison. `test.sh` checks one bundle and exits nonzero on a
//! mismatch; `run_all.sh` at the `code/` root tallies every bundle's check.
use crate::source::{ChapterSource, Example, EXPECTED_ERROR_FILE, EXPECTED_FILE};
use crate::util::shell_quote;
use std::path::Path;

pub const ENGINE_ENV_VAR: &str = "EXBOOK_ENGINE";
pub const TEST_SCRIPT: &str = "test.sh";
pub const RUN_ALL_SCRIPT: &str = "run_all.sh";

fn expected_file(example: &Example) -> &'static str {
    if example.expect_error.is_some() {
        EXPECTED_ERROR_FILE
    } else {
        EXPECTED_FILE
    }
}

/// Engine default baked into launchers. Launchers run from the bundle
/// directory, so a relative path is reduced to its file name and looked up on
/// `PATH`.
pub fn launcher_engine(engine: &str) -> String {
    let path = Path::new(engine);
    if path.is_absolute() || path.components().count() <= 1 {
        return engine.to_string();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| engine.to_string())
}

fn shell_args(example: &Example) -> String {
    example
        .engine_args()
        .iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_shell_prelude(out: &mut String, chapter: &ChapterSource, example: &Example, engine: &str) {
    out.push_str("#!/bin/sh\n");
    out.push_str(&format!(
        "# {}: example \"{}\"\n",
        chapter.heading(),
        example.name
    ));
    out.push_str("set -u\n");
    out.push_str("cd \"$(dirname \"$0\")\" || exit 1\n\n");
    out.push_str(&format!(
        "ENGINE=\"${{{ENGINE_ENV_VAR}:-{}}}\"\n",
        engine.replace('"', "\\\"")
    ));
}

pub fn render_shell(chapter: &ChapterSource, example: &Example, engine: &str) -> String {
    let args = shell_args(example);
    let mut out = String::new();
    push_shell_prelude(&mut out, chapter, example, engine);
    out.push_str(&format!("echo \"Running: $ENGINE {}\"\n", args.replace('"', "\\\"")));
    out.push_str("echo \"--- actual output ---\"\n");
    out.push_str(&format!("\"$ENGINE\" {args}\n"));
    out.push_str("status=$?\n");
    out.push_str("echo \"--- expected output ---\"\n");
    out.push_str(&format!("cat {}\n", expected_file(example)));
    out.push_str("exit $status\n");
    out
}

/// Self-check for one bundle: prints `PASS` and exits 0, or explains the
/// failure and exits 1. Output is compared with `jq -S -c` when `jq` is
/// installed, otherwise with whitespace removed.
pub fn render_test(chapter: &ChapterSource, example: &Example, engine: &str) -> String {
    let args = shell_args(example);
    let mut out = String::new();
    push_shell_prelude(&mut out, chapter, example, engine);
    out.push_str("errfile=$(mktemp) || exit 1\n");
    out.push_str("trap 'rm -f \"$errfile\"' EXIT\n\n");
    out.push_str(&format!("actual=$(\"$ENGINE\" {args} 2>\"$errfile\")\n"));
    out.push_str("status=$?\n\n");

    match &example.expect_error {
        Some(declared) => {
            out.push_str("if [ \"$status\" -eq 0 ]; then\n");
            out.push_str("  echo \"FAIL: the engine succeeded but a failure was expected\"\n");
            out.push_str("  exit 1\n");
            out.push_str("fi\n");
            if let Some(contains) = &declared.contains {
                let quoted = shell_quote(contains);
                out.push_str(&format!("if ! grep -qF -- {quoted} \"$errfile\"; then\n"));
                out.push_str(&format!(
                    "  echo \"note: stderr does not mention {}\"\n",
                    contains.replace(['"', '$', '`', '\\'], "")
                ));
                out.push_str("fi\n");
            }
            out.push_str("echo \"PASS (exit status $status)\"\n");
        }
        None => {
            out.push_str("if [ \"$status\" -ne 0 ]; then\n");
            out.push_str("  echo \"FAIL: the engine exited with status $status\"\n");
            out.push_str("  cat \"$errfile\"\n");
            out.push_str("  exit 1\n");
            out.push_str("fi\n");
            out.push_str("if command -v jq >/dev/null 2>&1; then\n");
            out.push_str("  got=$(printf '%s\\n' \"$actual\" | jq -S -c . 2>/dev/null)\n");
            out.push_str(&format!("  want=$(jq -S -c . {EXPECTED_FILE})\n"));
            out.push_str("else\n");
            out.push_str("  got=$(printf '%s' \"$actual\" | tr -d ' \\t\\r\\n')\n");
            out.push_str(&format!("  want=$(tr -d ' \\t\\r\\n' < {EXPECTED_FILE})\n"));
            out.push_str("fi\n");
            out.push_str("if [ \"$got\" != \"$want\" ]; then\n");
            out.push_str(&format!("  echo \"FAIL: output differs from {EXPECTED_FILE}\"\n"));
            out.push_str("  echo \"expected: $want\"\n");
            out.push_str("  echo \"actual:   $got\"\n");
            out.push_str("  exit 1\n");
            out.push_str("fi\n");
            out.push_str("echo PASS\n");
        }
    }
    out.push_str("exit 0\n");
    out
}

/// Book-level runner over `bundle_dirs` (relative to `code/`). Each check is
/// bounded by `timeout_secs` when the `timeout` utility exists.
pub fn render_run_all(bundle_dirs: &[String], timeout_secs: u64) -> String {
    let mut out = String::new();
    out.push_str("#!/bin/sh\n");
    out.push_str(&format!(
        "# Re-check every example bundle. Set {ENGINE_ENV_VAR} to choose the engine.\n"
    ));
    out.push_str("set -u\n");
    out.push_str("cd \"$(dirname \"$0\")\" || exit 1\n\n");
    out.push_str(&format!("TIMEOUT_SECS={timeout_secs}\n"));
    out.push_str("total=0\npassed=0\nfailed=0\n\n");
    out.push_str("check() {\n");
    out.push_str("  total=$((total + 1))\n");
    out.push_str("  if command -v timeout >/dev/null 2>&1; then\n");
    out.push_str(&format!(
        "    output=$(timeout \"$TIMEOUT_SECS\" sh \"$1/{TEST_SCRIPT}\" 2>&1)\n"
    ));
    out.push_str("  else\n");
    out.push_str(&format!("    output=$(sh \"$1/{TEST_SCRIPT}\" 2>&1)\n"));
    out.push_str("  fi\n");
    out.push_str("  if [ $? -eq 0 ]; then\n");
    out.push_str("    passed=$((passed + 1))\n");
    out.push_str("    echo \"PASS $1\"\n");
    out.push_str("  else\n");
    out.push_str("    failed=$((failed + 1))\n");
    out.push_str("    echo \"FAIL $1\"\n");
    out.push_str("    printf '%s\\n' \"$output\" | head -n 5 | sed 's/^/    /'\n");
    out.push_str("  fi\n");
    out.push_str("}\n\n");
    for dir in bundle_dirs {
        out.push_str(&format!("check {}\n", shell_quote(dir)));
    }
    out.push_str("\necho \"$passed passed, $failed failed of $total\"\n");
    out.push_str("[ \"$failed\" -eq 0 ]\n");
    out
}

/// Windows launcher; lines end in CRLF.
pub fn render_batch(chapter: &ChapterSource, example: &Example, engine: &str) -> String {
    let args = example
        .engine_args()
        .iter()
        .map(|arg| {
            if arg.contains(' ') {
                format!("\"{arg}\"")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let lines = [
        "@echo off".to_string(),
        format!("rem {}: example \"{}\"", chapter.heading(), example.name),
        "setlocal".to_string(),
        "cd /d \"%~dp0\"".to_string(),
        format!(
            "if \"%{ENGINE_ENV_VAR}%\"==\"\" (set \"ENGINE={engine}\") \
             else (set \"ENGINE=%{ENGINE_ENV_VAR}%\")"
        ),
        format!("echo Running: %ENGINE% {args}"),
        "echo --- actual output ---".to_string(),
        format!("\"%ENGINE%\" {args}"),
        "set STATUS=%ERRORLEVEL%".to_string(),
        "echo --- expected output ---".to_string(),
        format!("type {}", expected_file(example)),
        "exit /b %STATUS%".to_string(),
    ];
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{load_chapter_str, CliFlag};
    use std::path::Path;

    fn chapter() -> ChapterSource {
        load_chapter_str(
            Path::new("ch02.toml"),
            "[chapter]\nnumber = 2\ntitle = \"Arrays\"\n\n[[examples]]\nname = \"pick\"\nscript = [1]\ninputs = [1, 2]\nexpected = 1\nflags = [\"--pretty=2\"]\n\n[[examples]]\nname = \"boom\"\nscript = [2]\nexpect_error = { contains = \"it's bad\" }\n",
        )
        .unwrap()
    }

    #[test]
    fn shell_launcher_uses_validated_command_line() {
        let chapter = chapter();
        let example = &chapter.examples[0];
        assert_eq!(example.flags, vec![CliFlag::Pretty(2)]);
        let script = render_shell(&chapter, example, "computo");
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("ENGINE=\"${EXBOOK_ENGINE:-computo}\""));
        assert!(script.contains("\"$ENGINE\" --pretty=2 script.json input_1.json input_2.json\n"));
        assert!(script.contains("cat expected.json"));
    }

    #[test]
    fn batch_launcher_uses_crlf() {
        let chapter = chapter();
        let script = render_batch(&chapter, &chapter.examples[0], "computo");
        assert!(
            script.contains("\"%ENGINE%\" --pretty=2 script.json input_1.json input_2.json\r\n")
        );
        assert!(script.contains("(set \"ENGINE=computo\") else"));
        assert!(script.ends_with("exit /b %STATUS%\r\n"));
        assert!(!script.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn relative_engine_paths_become_file_names() {
        assert_eq!(launcher_engine("computo"), "computo");
        assert_eq!(launcher_engine("./computo"), "computo");
        assert_eq!(launcher_engine("build/bin/computo"), "computo");
        assert_eq!(launcher_engine("/opt/computo/bin/computo"), "/opt/computo/bin/computo");
    }

    #[test]
    fn test_script_compares_output_or_failure() {
        let chapter = chapter();
        let pick = render_test(&chapter, &chapter.examples[0], "computo");
        assert!(pick.contains(
            "actual=$(\"$ENGINE\" --pretty=2 script.json input_1.json input_2.json 2>\"$errfile\")"
        ));
        assert!(pick.contains("want=$(jq -S -c . expected.json)"));
        assert!(pick.ends_with("echo PASS\nexit 0\n"));

        let boom = render_test(&chapter, &chapter.examples[1], "computo");
        assert!(boom.contains("if [ \"$status\" -eq 0 ]; then"));
        assert!(boom.contains("grep -qF -- 'it'\"'\"'s bad' \"$errfile\""));
        assert!(!boom.contains("expected.json"));
    }

    #[test]
    fn run_all_checks_each_bundle_and_tallies() {
        let dirs = vec!["ch01/general/sum".to_string(), "ch02/data/echo".to_string()];
        let script = render_run_all(&dirs, 30);
        assert!(script.contains("TIMEOUT_SECS=30\n"));
        assert!(script.contains("check ch01/general/sum\ncheck ch02/data/echo\n"));
        assert!(script.ends_with("[ \"$failed\" -eq 0 ]\n"));
    }
}
