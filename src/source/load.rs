//! TOML chapter loader.
//!
//! Sources are schema-as-data: every field is checked explicitly so errors
//! name the file, the example, and the offending field. Nothing is executed.
use super::flags::CliFlag;
use super::json::json_field;
use super::model::{
    Book, ChapterKind, ChapterSource, Example, ExpectedFailure, NarrativeBlock, Segment,
    DEFAULT_CATEGORY,
};
use crate::config::CONFIG_FILE_NAME;
use crate::error::LoadError;
use crate::util::sanitize_name;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Ids that would collide with `index.md` or the book report.
const RESERVED_IDS: &[&str] = &["index", "book"];

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*(example|ref)\s*:\s*([^}\s]+)\s*\}\}").expect("valid marker regex")
    })
}

fn example_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*\[\[[ \t]*examples[ \t]*\]\]").expect("valid header regex")
    })
}

/// Chapter source files in `source_dir`, sorted by file name.
pub fn discover_sources(source_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(source_dir).map_err(|source| LoadError::Io {
        path: source_dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: source_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_toml = path.extension().and_then(|ext| ext.to_str()) == Some("toml");
        let is_config = path.file_name().and_then(|name| name.to_str()) == Some(CONFIG_FILE_NAME);
        if path.is_file() && is_toml && !is_config {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Discover and load every chapter under `source_dir`.
pub fn load_book(source_dir: &Path) -> Result<Book, LoadError> {
    let files = discover_sources(source_dir)?;
    if files.is_empty() {
        return Err(LoadError::NoSources(source_dir.to_path_buf()));
    }
    load_book_files(source_dir, &files)
}

/// Load the given files as one book and check cross-chapter invariants.
pub fn load_book_files(source_dir: &Path, files: &[PathBuf]) -> Result<Book, LoadError> {
    let mut chapters = Vec::with_capacity(files.len());
    for path in files {
        chapters.push(load_chapter_file(path)?);
    }

    let mut ids: BTreeMap<&str, &Path> = BTreeMap::new();
    for chapter in &chapters {
        if let Some(other) = ids.insert(chapter.id.as_str(), chapter.path.as_path()) {
            return Err(LoadError::DuplicateChapter {
                path: chapter.path.clone(),
                id: chapter.id.clone(),
                other: other.to_path_buf(),
            });
        }
    }
    for chapter in &chapters {
        for block in &chapter.blocks {
            for segment in &block.segments {
                if let Segment::ChapterRef(id) = segment {
                    if !ids.contains_key(id.as_str()) {
                        return Err(LoadError::UnknownChapter {
                            path: chapter.path.clone(),
                            section: block.title.clone(),
                            id: id.clone(),
                        });
                    }
                }
            }
        }
    }

    tracing::info!(
        chapters = chapters.len(),
        examples = chapters.iter().map(|c| c.examples.len()).sum::<usize>(),
        "loaded chapter sources"
    );
    Ok(Book {
        source_dir: source_dir.to_path_buf(),
        chapters,
    })
}

pub fn load_chapter_file(path: &Path) -> Result<ChapterSource, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_chapter_str(path, &text)
}

/// Parse one chapter from TOML text; `path` is used for ids and diagnostics.
pub fn load_chapter_str(path: &Path, text: &str) -> Result<ChapterSource, LoadError> {
    let root: toml::Table = toml::from_str(text).map_err(|err| LoadError::Syntax {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let mut doc = Fields::new(path, "file", root);
    let chapter = doc.optional_table("chapter")?;
    let appendix = doc.optional_table("appendix")?;
    let sections = doc.tables("sections")?;
    let raw_examples = doc.tables("examples")?;
    doc.finish()?;

    let (kind, mut header) = match (chapter, appendix) {
        (Some(table), None) => {
            let mut header = Fields::new(path, "[chapter]", table);
            let number = header.required_u32("number")?;
            (ChapterKind::Chapter { number }, header)
        }
        (None, Some(table)) => {
            let mut header = Fields::new(path, "[appendix]", table);
            let letter = header.required_str("letter")?;
            if letter.chars().count() != 1 || !letter.chars().all(|ch| ch.is_ascii_alphabetic()) {
                return Err(header.invalid("letter", "must be a single ASCII letter"));
            }
            let letter = letter.to_ascii_uppercase();
            (ChapterKind::Appendix { letter }, header)
        }
        (Some(_), Some(_)) => {
            return Err(Fields::new(path, "file", toml::Table::new())
                .invalid("appendix", "cannot be combined with [chapter]"));
        }
        (None, None) => {
            return Err(Fields::new(path, "file", toml::Table::new()).missing("chapter"));
        }
    };
    let title = header.required_str("title")?;
    let objectives = header.optional_str("objectives")?;
    let summary = header.optional_str("summary")?;
    let id = match header.optional_str("id")? {
        Some(id) => {
            if !is_valid_id(&id) {
                return Err(header.invalid(
                    "id",
                    "must be lowercase letters, digits, and underscores",
                ));
            }
            id
        }
        None => {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            let id = sanitize_name(stem);
            if !is_valid_id(&id) {
                return Err(header.missing("id"));
            }
            id
        }
    };
    if RESERVED_IDS.contains(&id.as_str()) {
        return Err(header.invalid("id", format!("{id:?} is reserved for book-level output")));
    }
    header.finish()?;

    let lines = example_header_lines(text);
    let lines_known = lines.len() == raw_examples.len();
    let mut examples = Vec::with_capacity(raw_examples.len());
    let mut seen_names: BTreeMap<String, usize> = BTreeMap::new();
    let mut seen_dirs: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for (idx, table) in raw_examples.into_iter().enumerate() {
        let line = if lines_known { lines[idx] } else { 0 };
        let example = parse_example(path, idx, line, table)?;
        if let Some(first_line) = seen_names.insert(example.name.clone(), line) {
            return Err(LoadError::DuplicateExample {
                path: path.to_path_buf(),
                name: example.name,
                first_line,
                second_line: line,
            });
        }
        let dir = format!("{}/{}", example.category_dir(), example.dir_name());
        if let Some((first, first_line)) =
            seen_dirs.insert(dir.clone(), (example.name.clone(), line))
        {
            return Err(LoadError::BundleDirCollision {
                path: path.to_path_buf(),
                first,
                second: example.name,
                dir,
                first_line,
                second_line: line,
            });
        }
        examples.push(example);
    }

    let mut blocks = Vec::with_capacity(sections.len());
    for (idx, table) in sections.into_iter().enumerate() {
        let mut fields = Fields::new(path, format!("sections[{idx}]"), table);
        let title = fields.required_str("title")?;
        let content = fields.required_str("content")?;
        fields.finish()?;
        let segments = parse_segments(&content);
        for segment in &segments {
            if let Segment::Example(name) = segment {
                if !seen_names.contains_key(name) {
                    return Err(LoadError::UnknownExample {
                        path: path.to_path_buf(),
                        section: title.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        blocks.push(NarrativeBlock { title, segments });
    }

    Ok(ChapterSource {
        id,
        kind,
        title,
        objectives,
        summary,
        blocks,
        examples,
        path: path.to_path_buf(),
    })
}

fn parse_example(
    path: &Path,
    idx: usize,
    line: usize,
    table: toml::Table,
) -> Result<Example, LoadError> {
    let mut fields = Fields::new(path, format!("examples[{idx}]"), table);
    let name = fields.required_str("name")?;
    fields.context = format!("example {name:?}");
    if sanitize_name(&name).is_empty() {
        return Err(fields.invalid("name", "must contain letters or digits"));
    }

    let category = fields
        .aliased_str("category", "section")?
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    if sanitize_name(&category).is_empty() {
        return Err(fields.invalid("category", "must contain letters or digits"));
    }
    let description = fields.optional_str("description")?.unwrap_or_default();
    let tutorial = fields.optional_str("tutorial_text")?;
    let notes = fields.optional_str("notes")?;

    let script = fields
        .optional_json("script")?
        .ok_or_else(|| fields.missing("script"))?;

    let single_input = fields.optional_json("input")?;
    let many_inputs = fields.json_list("inputs")?;
    let inputs = match (single_input, many_inputs) {
        (Some(_), Some(_)) => {
            return Err(fields.invalid("inputs", "cannot be combined with `input`"));
        }
        (Some(input), None) => vec![input],
        (None, Some(inputs)) => inputs,
        (None, None) => Vec::new(),
    };

    let expect_error = fields.expected_failure("expect_error")?;
    let expected = fields.optional_json("expected")?;
    match (&expected, &expect_error) {
        (None, None) => return Err(fields.missing("expected")),
        (Some(_), Some(_)) => {
            return Err(fields.invalid("expected", "cannot be combined with `expect_error`"));
        }
        _ => {}
    }

    let raw_flags = fields.aliased_list("flags", "cli_flags")?;
    let mut flags = Vec::with_capacity(raw_flags.len());
    for raw in &raw_flags {
        let flag = CliFlag::parse(raw).map_err(|message| fields.invalid("flags", message))?;
        flags.push(flag);
    }
    if flags.contains(&CliFlag::Diff) && inputs.len() > 1 {
        return Err(fields.invalid("flags", "--diff cannot be combined with multiple inputs"));
    }
    fields.finish()?;

    Ok(Example {
        name,
        category,
        description,
        tutorial,
        notes,
        script,
        inputs,
        expected,
        flags,
        expect_error,
        line,
    })
}

/// Split prose into text and marker segments.
pub(super) fn parse_segments(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for caps in marker_regex().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            segments.push(Segment::Text(content[cursor..whole.start()].to_string()));
        }
        let target = caps[2].to_string();
        match &caps[1] {
            "example" => segments.push(Segment::Example(target)),
            _ => segments.push(Segment::ChapterRef(target)),
        }
        cursor = whole.end();
    }
    if cursor < content.len() {
        segments.push(Segment::Text(content[cursor..].to_string()));
    }
    segments
}

/// 1-based line numbers of `[[examples]]` headers, in file order.
fn example_header_lines(text: &str) -> Vec<usize> {
    example_header_regex()
        .find_iter(text)
        .map(|found| text[..found.start()].matches('\n').count() + 1)
        .collect()
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}

fn type_name(value: &toml::Value) -> &'static str {
    match value {
        toml::Value::String(_) => "string",
        toml::Value::Integer(_) => "integer",
        toml::Value::Float(_) => "float",
        toml::Value::Boolean(_) => "boolean",
        toml::Value::Datetime(_) => "datetime",
        toml::Value::Array(_) => "array",
        toml::Value::Table(_) => "table",
    }
}

/// Field extraction over one TOML table; leftovers are reported by `finish`.
struct Fields<'a> {
    path: &'a Path,
    context: String,
    table: toml::Table,
}

impl<'a> Fields<'a> {
    fn new(path: &'a Path, context: impl Into<String>, table: toml::Table) -> Self {
        Self {
            path,
            context: context.into(),
            table,
        }
    }

    fn missing(&self, field: &str) -> LoadError {
        LoadError::MissingField {
            path: self.path.to_path_buf(),
            context: self.context.clone(),
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, message: impl Into<String>) -> LoadError {
        LoadError::InvalidField {
            path: self.path.to_path_buf(),
            context: self.context.clone(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn required_str(&mut self, key: &str) -> Result<String, LoadError> {
        self.optional_str(key)?.ok_or_else(|| self.missing(key))
    }

    fn optional_str(&mut self, key: &str) -> Result<Option<String>, LoadError> {
        match self.table.remove(key) {
            None => Ok(None),
            Some(toml::Value::String(text)) if text.trim().is_empty() => {
                Err(self.invalid(key, "must be non-empty"))
            }
            Some(toml::Value::String(text)) => Ok(Some(text)),
            Some(other) => Err(self.invalid(
                key,
                format!("must be a string (got {})", type_name(&other)),
            )),
        }
    }

    fn aliased_str(&mut self, key: &str, alias: &str) -> Result<Option<String>, LoadError> {
        let primary = self.optional_str(key)?;
        let secondary = self.optional_str(alias)?;
        match (primary, secondary) {
            (Some(_), Some(_)) => Err(self.invalid(alias, format!("duplicates `{key}`"))),
            (primary, secondary) => Ok(primary.or(secondary)),
        }
    }

    fn required_u32(&mut self, key: &str) -> Result<u32, LoadError> {
        match self.table.remove(key) {
            None => Err(self.missing(key)),
            Some(toml::Value::Integer(number)) => u32::try_from(number).map_err(|_| {
                self.invalid(key, format!("must be a non-negative integer (got {number})"))
            }),
            Some(other) => Err(self.invalid(
                key,
                format!("must be an integer (got {})", type_name(&other)),
            )),
        }
    }

    fn optional_table(&mut self, key: &str) -> Result<Option<toml::Table>, LoadError> {
        match self.table.remove(key) {
            None => Ok(None),
            Some(toml::Value::Table(table)) => Ok(Some(table)),
            Some(other) => Err(self.invalid(
                key,
                format!("must be a table (got {})", type_name(&other)),
            )),
        }
    }

    fn tables(&mut self, key: &str) -> Result<Vec<toml::Table>, LoadError> {
        let Some(value) = self.table.remove(key) else {
            return Ok(Vec::new());
        };
        let toml::Value::Array(items) = value else {
            return Err(self.invalid(key, "must be an array of tables"));
        };
        let mut tables = Vec::with_capacity(items.len());
        for item in items {
            match item {
                toml::Value::Table(table) => tables.push(table),
                other => {
                    return Err(self.invalid(
                        key,
                        format!("entries must be tables (got {})", type_name(&other)),
                    ))
                }
            }
        }
        Ok(tables)
    }

    fn optional_json(&mut self, key: &str) -> Result<Option<Value>, LoadError> {
        match self.table.remove(key) {
            None => Ok(None),
            Some(value) => json_field(&value)
                .map(Some)
                .map_err(|message| self.invalid(key, message)),
        }
    }

    fn json_list(&mut self, key: &str) -> Result<Option<Vec<Value>>, LoadError> {
        let Some(value) = self.table.remove(key) else {
            return Ok(None);
        };
        let items = match value {
            toml::Value::Array(items) => items,
            other => {
                return Err(self.invalid(
                    key,
                    format!("must be an array of documents (got {})", type_name(&other)),
                ))
            }
        };
        let mut documents = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let document = json_field(item)
                .map_err(|message| self.invalid(&format!("{key}[{idx}]"), message))?;
            documents.push(document);
        }
        Ok(Some(documents))
    }

    fn string_list(&mut self, key: &str) -> Result<Option<Vec<String>>, LoadError> {
        let Some(value) = self.table.remove(key) else {
            return Ok(None);
        };
        let toml::Value::Array(items) = value else {
            return Err(self.invalid(key, "must be an array of strings"));
        };
        let mut strings = Vec::with_capacity(items.len());
        for item in items {
            match item {
                toml::Value::String(text) => strings.push(text),
                other => {
                    return Err(self.invalid(
                        key,
                        format!("entries must be strings (got {})", type_name(&other)),
                    ))
                }
            }
        }
        Ok(Some(strings))
    }

    fn aliased_list(&mut self, key: &str, alias: &str) -> Result<Vec<String>, LoadError> {
        let primary = self.string_list(key)?;
        let secondary = self.string_list(alias)?;
        match (primary, secondary) {
            (Some(_), Some(_)) => Err(self.invalid(alias, format!("duplicates `{key}`"))),
            (primary, secondary) => Ok(primary.or(secondary).unwrap_or_default()),
        }
    }

    fn expected_failure(&mut self, key: &str) -> Result<Option<ExpectedFailure>, LoadError> {
        match self.table.remove(key) {
            None | Some(toml::Value::Boolean(false)) => Ok(None),
            Some(toml::Value::Boolean(true)) => Ok(Some(ExpectedFailure::default())),
            Some(toml::Value::String(text)) if !text.trim().is_empty() => Ok(Some(ExpectedFailure {
                contains: Some(text),
            })),
            Some(toml::Value::Table(table)) => {
                let mut nested = Fields::new(self.path, format!("{}.{key}", self.context), table);
                let contains = nested.optional_str("contains")?;
                nested.finish()?;
                Ok(Some(ExpectedFailure { contains }))
            }
            Some(other) => Err(self.invalid(
                key,
                format!(
                    "must be true, a message string, or a table (got {})",
                    type_name(&other)
                ),
            )),
        }
    }

    fn finish(self) -> Result<(), LoadError> {
        match self.table.keys().next() {
            Some(key) => Err(self.invalid(key, "is not a recognized field")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHAPTER: &str = r#"
[chapter]
number = 1
title = "First Steps"
objectives = "Learn to add numbers."

[[sections]]
title = "Adding"
content = """
Numbers add up:

{{example:add_numbers}}

See {{ref:ch01_first}} for more.
"""

[[examples]]
name = "add_numbers"
category = "arithmetic"
description = "Adds two numbers"
script = '["+", 15, 27]'
expected = 42

[[examples]]
name = "echo_input"
script = ["$input"]
inputs = ['{"a": 1}', { b = 2 }]
expected = { a = 1 }
flags = ["--pretty=2"]
"#;

    fn load(text: &str) -> Result<ChapterSource, LoadError> {
        load_chapter_str(Path::new("book/ch01_first.toml"), text)
    }

    #[test]
    fn loads_chapter_model_with_lines_and_segments() {
        let chapter = load(CHAPTER).unwrap();
        assert_eq!(chapter.id, "ch01_first");
        assert_eq!(chapter.kind, ChapterKind::Chapter { number: 1 });
        assert_eq!(chapter.heading(), "Chapter 1: First Steps");
        assert_eq!(chapter.examples.len(), 2);

        let add = &chapter.examples[0];
        assert_eq!(add.script, json!(["+", 15, 27]));
        assert_eq!(add.expected, Some(json!(42)));
        assert!(add.inputs.is_empty());
        assert_eq!(add.line, 17);

        let echo = &chapter.examples[1];
        assert_eq!(echo.category, DEFAULT_CATEGORY);
        assert_eq!(echo.inputs, vec![json!({"a": 1}), json!({"b": 2})]);
        assert_eq!(echo.flags, vec![CliFlag::Pretty(2)]);
        assert_eq!(echo.line, 24);

        let segments = &chapter.blocks[0].segments;
        assert!(segments.contains(&Segment::Example("add_numbers".to_string())));
        assert!(segments.contains(&Segment::ChapterRef("ch01_first".to_string())));
    }

    #[test]
    fn missing_expected_names_example_and_field() {
        let text = r#"
[chapter]
number = 2
title = "T"

[[examples]]
name = "no_expected"
script = [1]
"#;
        let err = load(text).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, LoadError::MissingField { .. }));
        assert!(message.contains("ch01_first.toml"));
        assert!(message.contains("no_expected"));
        assert!(message.contains("`expected`"));
    }

    #[test]
    fn declared_failure_does_not_need_expected() {
        let text = r#"
[chapter]
number = 2
title = "T"

[[examples]]
name = "missing_var"
script = '["$", "/missing"]'
expect_error = { contains = "not found" }
"#;
        let chapter = load(text).unwrap();
        let example = &chapter.examples[0];
        assert!(example.expected.is_none());
        assert_eq!(
            example.expect_error,
            Some(ExpectedFailure {
                contains: Some("not found".to_string())
            })
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let text = r#"
[chapter]
number = 2
title = "T"

[[examples]]
name = "twice"
script = [1]
expected = 1

[[examples]]
name = "twice"
script = [2]
expected = 2
"#;
        let err = load(text).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DuplicateExample {
                first_line: 6,
                second_line: 11,
                ..
            }
        ));
    }

    #[test]
    fn rejects_names_sharing_a_bundle_directory() {
        let text = r#"
[chapter]
number = 1
title = "T"

[[examples]]
name = "a-b"
script = [1]
expected = 1

[[examples]]
name = "a_b"
script = [2]
expected = 2
"#;
        let err = load(text).unwrap_err();
        assert!(matches!(
            &err,
            LoadError::BundleDirCollision {
                first_line: 6,
                second_line: 11,
                ..
            }
        ));
        let message = err.to_string();
        assert!(message.contains("\"a-b\" (line 6) and \"a_b\" (line 11)"));
        assert!(message.contains("general/a_b/"));
    }

    #[test]
    fn rejects_malformed_json_and_unknown_flags() {
        let bad_json = r#"
[chapter]
number = 2
title = "T"

[[examples]]
name = "broken"
script = '["+", 1,'
expected = 1
"#;
        let err = load(bad_json).unwrap_err().to_string();
        assert!(err.contains("`script`"));
        assert!(err.contains("not valid JSON"));

        let bad_flag = bad_json
            .replace(r#"script = '["+", 1,'"#, "script = [1]\nflags = [\"--debug\"]");
        let err = load(&bad_flag).unwrap_err().to_string();
        assert!(err.contains("`flags`"));
        assert!(err.contains("--debug"));
    }

    #[test]
    fn rejects_diff_with_multiple_inputs() {
        let text = r#"
[chapter]
number = 2
title = "T"

[[examples]]
name = "patch"
script = [1]
inputs = [1, 2]
expected = []
flags = ["--diff"]
"#;
        let err = load(text).unwrap_err().to_string();
        assert!(err.contains("--diff"));
    }

    #[test]
    fn rejects_unknown_example_marker_and_unknown_fields() {
        let text = r#"
[chapter]
number = 2
title = "T"

[[sections]]
title = "Intro"
content = "{{example:ghost}}"
"#;
        assert!(matches!(
            load(text).unwrap_err(),
            LoadError::UnknownExample { .. }
        ));

        let text = "[chapter]\nnumber = 2\ntitle = \"T\"\ncolour = \"red\"\n";
        let err = load(text).unwrap_err().to_string();
        assert!(err.contains("`colour`"));
    }

    #[test]
    fn appendix_header_normalizes_letter() {
        let text = "[appendix]\nletter = \"b\"\ntitle = \"Reference\"\nid = \"appendix_b\"\n";
        let chapter = load(text).unwrap();
        assert_eq!(chapter.id, "appendix_b");
        assert_eq!(chapter.heading(), "Appendix B: Reference");
    }

    #[test]
    fn book_rejects_unknown_chapter_refs() {
        let dir = tempfile::tempdir().unwrap();
        let text = "[chapter]\nnumber = 1\ntitle = \"T\"\n\n[[sections]]\ntitle = \"S\"\ncontent = \"see {{ref:ch09}}\"\n";
        fs::write(dir.path().join("ch01.toml"), text).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "jobs = 1\n").unwrap();
        let err = load_book(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownChapter { ref id, .. } if id == "ch09"));
    }

    #[test]
    fn empty_source_dir_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_book(dir.path()).unwrap_err(),
            LoadError::NoSources(_)
        ));
    }
}
