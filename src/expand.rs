//! Deterministic markdown pages from the chapter model and validation gate.
use crate::fsutil::{remove_dir_if_exists, write_text};
use crate::paths::{chapter_archive_name, example_rel_dir, OutputPaths, BOOK_ARCHIVE};
use crate::publish::{Publication, PublishGate};
use crate::source::{Book, ChapterSource, Example, Segment, EXPECTED_ERROR_FILE, SCRIPT_FILE};
use crate::util::{format_command_line, title_case};
use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;

/// Rendering switches that do not come from the chapter itself.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// Program name shown in how-to-run snippets.
    pub engine: String,
    pub include_descriptions: bool,
    /// Link to bundle directories and archives (only when packaging runs).
    pub downloads: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedDocument {
    pub chapter_id: String,
    pub markdown: String,
}

/// Render one chapter page.
pub fn expand(
    book: &Book,
    chapter: &ChapterSource,
    gate: &PublishGate<'_>,
    options: &ExpandOptions,
) -> ExpandedDocument {
    let mut out = String::new();
    out.push_str(&format!("<a id=\"{}\"></a>\n\n", chapter.id));
    out.push_str(&format!("# {}\n", chapter.heading()));

    if let Some(objectives) = &chapter.objectives {
        out.push_str("\n## Learning Objectives\n\n");
        push_paragraph(&mut out, objectives);
    }

    for block in &chapter.blocks {
        out.push_str(&format!("\n## {}\n\n", block.title));
        for segment in &block.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Example(name) => {
                    if let Some(example) = chapter.example(name) {
                        ensure_blank_line(&mut out);
                        push_example(&mut out, chapter, example, gate, options);
                    }
                }
                Segment::ChapterRef(id) => {
                    let title = book
                        .chapter(id)
                        .map(ChapterSource::heading)
                        .unwrap_or_else(|| id.clone());
                    out.push_str(&format!("[{title}]({id}.md#{id})"));
                }
            }
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    let referenced = chapter.referenced_examples();
    let remaining: Vec<&Example> = chapter
        .examples
        .iter()
        .filter(|example| !referenced.contains(example.name.as_str()))
        .collect();
    if !remaining.is_empty() {
        out.push_str("\n## Hands-On Examples\n");
        for example in remaining {
            out.push('\n');
            push_example(&mut out, chapter, example, gate, options);
        }
    }

    if let Some(summary) = &chapter.summary {
        out.push_str("\n## Summary\n\n");
        push_paragraph(&mut out, summary);
    }

    ExpandedDocument {
        chapter_id: chapter.id.clone(),
        markdown: out,
    }
}

/// Book contents page linking every chapter.
pub fn expand_index(book: &Book, gate: &PublishGate<'_>) -> String {
    let mut out = String::new();
    out.push_str("# Contents\n\n");
    for chapter in &book.chapters {
        let published = chapter
            .examples
            .iter()
            .filter(|example| gate.decide(&chapter.id, &example.name).is_published())
            .count();
        out.push_str(&format!(
            "- [{}]({}.md#{}) ({} example{})\n",
            chapter.heading(),
            chapter.id,
            chapter.id,
            published,
            if published == 1 { "" } else { "s" }
        ));
    }
    out
}

/// Rewrite the `out/` directory: one page per chapter plus the index.
pub fn write_expanded(
    book: &Book,
    gate: &PublishGate<'_>,
    options: &ExpandOptions,
    paths: &OutputPaths,
) -> Result<Vec<PathBuf>> {
    remove_dir_if_exists(&paths.docs_dir())?;
    let mut written = Vec::with_capacity(book.chapters.len() + 1);
    for chapter in &book.chapters {
        let document = expand(book, chapter, gate, options);
        let path = paths.chapter_doc(&document.chapter_id);
        write_text(&path, &document.markdown)?;
        written.push(path);
    }
    let index = paths.index_doc();
    write_text(&index, &expand_index(book, gate))?;
    written.push(index);
    tracing::info!(pages = written.len(), "expanded chapters");
    Ok(written)
}

fn push_example(
    out: &mut String,
    chapter: &ChapterSource,
    example: &Example,
    gate: &PublishGate<'_>,
    options: &ExpandOptions,
) {
    let publication = gate.decide(&chapter.id, &example.name);
    if let Publication::Withheld(verdict) = publication {
        let reason = verdict.map_or("not validated", |verdict| verdict.as_str());
        out.push_str(&format!(
            "<!-- example \"{}\" withheld: {} -->\n",
            example.name, reason
        ));
        return;
    }

    out.push_str(&format!("### Example: {}\n\n", title_case(&example.name)));
    if let Publication::Unverified(verdict) = publication {
        let reason = match verdict {
            Some(verdict) => format!("this example did not pass validation ({verdict})"),
            None => "this example was not validated in this build".to_string(),
        };
        out.push_str(&format!("> **Unverified:** {reason}.\n\n"));
    }
    if options.include_descriptions && !example.description.is_empty() {
        push_paragraph(out, &example.description);
    }
    if let Some(tutorial) = &example.tutorial {
        push_paragraph(out, tutorial);
    }

    out.push_str(&format!("**Script** (`{SCRIPT_FILE}`):\n\n"));
    push_json_fence(out, &example.script);
    let input_names = example.input_file_names();
    for (idx, (name, input)) in input_names.iter().zip(&example.inputs).enumerate() {
        if input_names.len() == 1 {
            out.push_str(&format!("**Input** (`{name}`):\n\n"));
        } else {
            out.push_str(&format!("**Input {}** (`{name}`):\n\n", idx + 1));
        }
        push_json_fence(out, input);
    }

    out.push_str("**How to run:**\n\n```bash\n");
    out.push_str(&format_command_line(&options.engine, &example.engine_args()));
    out.push_str("\n```\n\n");
    if options.downloads {
        out.push_str(&format!(
            "The example directory `code/{}/` also contains `run.sh` (Unix) and `run.bat` \
             (Windows) launchers, and `test.sh` to check the output.\n\n",
            example_rel_dir(chapter, example)
        ));
    }

    match (&example.expect_error, &example.expected) {
        (Some(declared), _) => {
            out.push_str("**Expected result:** the engine exits with a nonzero status");
            match &declared.contains {
                Some(text) => out.push_str(&format!(" and stderr mentions `{text}`.\n\n")),
                None => out.push_str(".\n\n"),
            }
        }
        (None, Some(expected)) => {
            out.push_str("**Expected output:**\n\n");
            push_json_fence(out, expected);
        }
        (None, None) => {}
    }

    if example.has_diagnostic_flags() {
        out.push_str(
            "> **Note:** diagnostic flags write to stderr; the JSON result on stdout is unchanged.\n\n",
        );
    }
    if let Some(notes) = &example.notes {
        out.push_str(&format!("**Notes:** {}\n\n", notes.trim()));
    }
    if !example.flags.is_empty() {
        out.push_str("**Flags used:**\n\n");
        for flag in &example.flags {
            out.push_str(&format!("- `{flag}`: {}\n", flag.explain()));
        }
        out.push('\n');
    }
    if options.downloads {
        let rel_dir = example_rel_dir(chapter, example);
        let bundle_files = if example.expect_error.is_some() {
            format!("`{SCRIPT_FILE}`, `{EXPECTED_ERROR_FILE}`")
        } else {
            format!("`{SCRIPT_FILE}`, `expected.json`")
        };
        out.push_str(&format!(
            "**Downloads:** [example directory](../code/{rel_dir}/) ({bundle_files}), [chapter archive](../code/{}), [all examples](../code/{BOOK_ARCHIVE})\n\n",
            chapter_archive_name(&chapter.id)
        ));
    }
}

fn push_json_fence(out: &mut String, value: &Value) {
    out.push_str("```json\n");
    out.push_str(&serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
    out.push_str("\n```\n\n");
}

fn push_paragraph(out: &mut String, text: &str) {
    out.push_str(text.trim());
    out.push_str("\n\n");
}

fn ensure_blank_line(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}
