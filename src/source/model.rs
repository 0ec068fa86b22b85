use super::flags::CliFlag;
use crate::util::sanitize_name;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

pub const SCRIPT_FILE: &str = "script.json";
pub const EXPECTED_FILE: &str = "expected.json";
pub const EXPECTED_ERROR_FILE: &str = "expected_error.txt";
pub const DEFAULT_CATEGORY: &str = "general";

/// Every chapter of the book, in build order. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Book {
    pub source_dir: PathBuf,
    pub chapters: Vec<ChapterSource>,
}

impl Book {
    pub fn chapter(&self, id: &str) -> Option<&ChapterSource> {
        self.chapters.iter().find(|chapter| chapter.id == id)
    }

    pub fn example_count(&self) -> usize {
        self.chapters
            .iter()
            .map(|chapter| chapter.examples.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterKind {
    Chapter { number: u32 },
    Appendix { letter: String },
}

impl ChapterKind {
    /// `Chapter 3` or `Appendix B`.
    pub fn label(&self) -> String {
        match self {
            ChapterKind::Chapter { number } => format!("Chapter {number}"),
            ChapterKind::Appendix { letter } => format!("Appendix {letter}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChapterSource {
    /// Stable slug used for anchors, file names, and bundle directories.
    pub id: String,
    pub kind: ChapterKind,
    pub title: String,
    pub objectives: Option<String>,
    pub summary: Option<String>,
    pub blocks: Vec<NarrativeBlock>,
    pub examples: Vec<Example>,
    pub path: PathBuf,
}

impl ChapterSource {
    /// `Chapter 3: Working With Arrays`.
    pub fn heading(&self) -> String {
        format!("{}: {}", self.kind.label(), self.title)
    }

    pub fn example(&self, name: &str) -> Option<&Example> {
        self.examples.iter().find(|example| example.name == name)
    }

    /// Names of examples embedded by a narrative marker.
    pub fn referenced_examples(&self) -> BTreeSet<&str> {
        self.blocks
            .iter()
            .flat_map(|block| block.segments.iter())
            .filter_map(|segment| match segment {
                Segment::Example(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn location(&self, example: &Example) -> SourceLocation {
        SourceLocation {
            file: self.path.clone(),
            line: example.line,
        }
    }
}

/// One titled prose section with embedded markers already resolved to segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeBlock {
    pub title: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// `{{example:NAME}}`
    Example(String),
    /// `{{ref:CHAPTER_ID}}`
    ChapterRef(String),
}

/// A declared failure instead of an expected value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpectedFailure {
    pub contains: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Example {
    pub name: String,
    pub category: String,
    pub description: String,
    pub tutorial: Option<String>,
    pub notes: Option<String>,
    pub script: Value,
    pub inputs: Vec<Value>,
    /// Always present unless `expect_error` is set.
    pub expected: Option<Value>,
    pub flags: Vec<CliFlag>,
    pub expect_error: Option<ExpectedFailure>,
    /// 1-based line of the `[[examples]]` header; 0 when unknown.
    pub line: usize,
}

impl Example {
    pub fn dir_name(&self) -> String {
        sanitize_name(&self.name)
    }

    pub fn category_dir(&self) -> String {
        sanitize_name(&self.category)
    }

    pub fn input_file_names(&self) -> Vec<String> {
        input_file_names(self.inputs.len())
    }

    /// Engine arguments relative to the example directory: flags, script, inputs.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.flags.iter().map(CliFlag::to_string).collect();
        args.push(SCRIPT_FILE.to_string());
        args.extend(self.input_file_names());
        args
    }

    /// `--trace` / `--profile` write diagnostics to stderr.
    pub fn has_diagnostic_flags(&self) -> bool {
        self.flags.iter().any(CliFlag::writes_stderr)
    }
}

/// `input.json` for a single document, `input_1.json..input_N.json` otherwise.
pub fn input_file_names(count: usize) -> Vec<String> {
    match count {
        0 => Vec::new(),
        1 => vec!["input.json".to_string()],
        n => (1..=n).map(|idx| format!("input_{idx}.json")).collect(),
    }
}

/// Where an example was declared, for jump-to-source diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn relative_to(&self, base: &Path) -> SourceLocation {
        SourceLocation {
            file: self
                .file
                .strip_prefix(base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| self.file.clone()),
            line: self.line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example(flags: Vec<CliFlag>, inputs: Vec<Value>) -> Example {
        Example {
            name: "Sum Two".to_string(),
            category: "Arithmetic Basics".to_string(),
            description: String::new(),
            tutorial: None,
            notes: None,
            script: json!(["+", 1, 2]),
            inputs,
            expected: Some(json!(3)),
            flags,
            expect_error: None,
            line: 4,
        }
    }

    #[test]
    fn engine_args_put_flags_before_script_and_inputs() {
        let ex = example(
            vec![CliFlag::Pretty(2), CliFlag::Trace],
            vec![json!({}), json!([])],
        );
        assert_eq!(
            ex.engine_args(),
            vec![
                "--pretty=2",
                "--trace",
                "script.json",
                "input_1.json",
                "input_2.json"
            ]
        );
        assert!(ex.has_diagnostic_flags());
    }

    #[test]
    fn single_input_is_not_numbered() {
        let ex = example(Vec::new(), vec![json!({"a": 1})]);
        assert_eq!(ex.engine_args(), vec!["script.json", "input.json"]);
        assert_eq!(ex.dir_name(), "sum_two");
        assert_eq!(ex.category_dir(), "arithmetic_basics");
    }

    #[test]
    fn location_display_omits_unknown_line() {
        let loc = SourceLocation {
            file: PathBuf::from("book/ch01.toml"),
            line: 0,
        };
        assert_eq!(loc.to_string(), "book/ch01.toml");
        let loc = SourceLocation { line: 12, ..loc };
        assert_eq!(loc.relative_to(Path::new("book")).to_string(), "ch01.toml:12");
    }
}
