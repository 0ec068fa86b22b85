//! Shared test infrastructure for integration tests.
//!
//! A [`BookFixture`] owns a temp directory with a chapter source directory, an
//! output directory, and a fake engine. The fake engine is a shell script that
//! picks its behavior from the script file it is handed:
//!
//! - `"+"`        prints `42`
//! - `"$input"`   prints the first input document
//! - `"/missing"` reports an unknown variable on stderr and exits 1
//! - `"sleep"`    sleeps for 30 seconds
//! - anything else exits 2 with "unknown operator"
#![allow(dead_code)]

use exbook::config::BuildConfig;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;
use tempfile::TempDir;

const FAKE_ENGINE: &str = r#"#!/bin/sh
script=""
input=""
for arg in "$@"; do
  case "$arg" in
    --trace) echo "trace: evaluating" >&2 ;;
    --*) ;;
    *)
      if [ -z "$script" ]; then
        script="$arg"
      elif [ -z "$input" ]; then
        input="$arg"
      fi
      ;;
  esac
done
if grep -q '"sleep"' "$script"; then
  sleep 30
  exit 0
fi
if grep -q '"/missing"' "$script"; then
  echo "error: variable '/missing' not found" >&2
  exit 1
fi
if grep -q '"\$input"' "$script"; then
  cat "$input"
  exit 0
fi
if grep -q '"+"' "$script"; then
  echo 42
  exit 0
fi
echo "error: unknown operator" >&2
exit 2
"#;

pub struct BookFixture {
    pub root: TempDir,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub engine: PathBuf,
}

impl BookFixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let source_dir = root.path().join("book-source");
        let output_dir = root.path().join("build");
        fs::create_dir_all(&source_dir).expect("create source dir");
        let engine = root.path().join("fake-engine");
        fs::write(&engine, FAKE_ENGINE).expect("write fake engine");
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755))
            .expect("chmod fake engine");
        Self {
            root,
            source_dir,
            output_dir,
            engine,
        }
    }

    pub fn write_chapter(&self, file_name: &str, text: &str) -> PathBuf {
        let path = self.source_dir.join(file_name);
        fs::write(&path, text).expect("write chapter");
        path
    }

    /// Build config pointing at this fixture with small, test-friendly limits.
    pub fn config(&self) -> BuildConfig {
        let mut config = BuildConfig::defaults(self.source_dir.clone());
        config.output_dir = self.output_dir.clone();
        config.engine = self.engine.display().to_string();
        config.jobs = 4;
        config.timeout = Duration::from_secs(10);
        config
    }

    pub fn output(&self, rel: &str) -> PathBuf {
        self.output_dir.join(rel)
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.output(rel))
            .unwrap_or_else(|err| panic!("read {rel}: {err}"))
    }

    /// Run the `exbook` binary from the fixture root.
    pub fn run_cli(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_exbook"))
            .args(args)
            .current_dir(self.root.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("run exbook")
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

/// A chapter with one passing example per kind the fake engine supports.
pub const BASICS_CHAPTER: &str = r#"
[chapter]
number = 1
title = "Basics"
objectives = "Run a first script."
summary = "You ran a script."

[[sections]]
title = "Arithmetic"
content = """
Adding two numbers:

{{example:add_numbers}}
"""

[[examples]]
name = "add_numbers"
category = "arithmetic"
description = "Adds two numbers"
script = '["+", 15, 27]'
expected = 42

[[examples]]
name = "echo_input"
category = "data"
script = '["$input"]'
input = { user = { name = "Ada", age = 36 } }
expected = '{"user": {"age": 36, "name": "Ada"}}'
flags = ["--pretty=2"]

[[examples]]
name = "missing_variable"
category = "errors"
script = '["$", "/missing"]'
expect_error = { contains = "not found" }
"#;

/// One example per given `(name, script, expected)` triple.
pub fn chapter_with(number: u32, title: &str, examples: &[(&str, &str, &str)]) -> String {
    let mut text = format!("[chapter]\nnumber = {number}\ntitle = \"{title}\"\n");
    for (name, script, expected) in examples {
        text.push_str(&format!(
            "\n[[examples]]\nname = \"{name}\"\nscript = '{script}'\nexpected = '{expected}'\n"
        ));
    }
    text
}
