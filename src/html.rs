//! HTML rendering through an external document converter.
//!
//! The converter command is split like a shell would split it. `{input}` and
//! `{output}` placeholders are substituted; without them the markdown path,
//! `-o`, and the HTML path are appended. Converters do not rewrite link
//! targets, so pages are staged with `<page>.md` links pointing at
//! `<page>.html` before conversion.
use crate::fsutil::{remove_dir_if_exists, write_text};
use crate::util::{bounded_snippet, format_command_line};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

fn page_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\]\(([A-Za-z0-9_.-]+)\.md(#[^)\s]*)?\)").expect("valid page link regex")
    })
}

/// Point links at sibling markdown pages to their HTML counterparts.
pub fn rewrite_page_links(markdown: &str) -> Cow<'_, str> {
    page_link_re().replace_all(markdown, "](${1}.html${2})")
}

/// Program and argument vector for converting `input` into `output`.
pub fn converter_argv(
    converter: &str,
    input: &Path,
    output: &Path,
) -> Result<(String, Vec<String>)> {
    let words = shell_words::split(converter)
        .with_context(|| format!("parse converter command {converter:?}"))?;
    let Some((program, rest)) = words.split_first() else {
        return Err(anyhow!("converter command is empty"));
    };
    let input = input.display().to_string();
    let output = output.display().to_string();
    let has_placeholders = rest
        .iter()
        .any(|arg| arg.contains(INPUT_PLACEHOLDER) || arg.contains(OUTPUT_PLACEHOLDER));
    let mut args: Vec<String> = rest
        .iter()
        .map(|arg| {
            arg.replace(INPUT_PLACEHOLDER, &input)
                .replace(OUTPUT_PLACEHOLDER, &output)
        })
        .collect();
    if !has_placeholders {
        args.push(input);
        args.push("-o".to_string());
        args.push(output);
    }
    Ok((program.clone(), args))
}

/// Convert every markdown page into `html_dir`; returns the written paths.
pub fn convert_pages(converter: &str, pages: &[PathBuf], html_dir: &Path) -> Result<Vec<PathBuf>> {
    let (program, _) = converter_argv(converter, Path::new("in.md"), Path::new("out.html"))?;
    let resolved = which::which(&program)
        .with_context(|| format!("converter {program:?} not found on PATH"))?;
    remove_dir_if_exists(html_dir)?;
    fs::create_dir_all(html_dir).with_context(|| format!("create {}", html_dir.display()))?;
    let staging = tempfile::Builder::new()
        .prefix("exbook-html-")
        .tempdir()
        .context("create HTML staging dir")?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let file_name = page
            .file_name()
            .ok_or_else(|| anyhow!("page {} has no file name", page.display()))?;
        let stem = page
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| anyhow!("page {} has no file name", page.display()))?;
        let markdown =
            fs::read_to_string(page).with_context(|| format!("read {}", page.display()))?;
        let staged = staging.path().join(file_name);
        write_text(&staged, &rewrite_page_links(&markdown))?;
        let output = html_dir.join(format!("{stem}.html"));
        let (_, args) = converter_argv(converter, &staged, &output)?;
        let result = Command::new(&resolved)
            .args(&args)
            .output()
            .with_context(|| format!("run {}", format_command_line(&program, &args)))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!(
                "{} failed ({}): {}",
                format_command_line(&program, &args),
                result.status,
                bounded_snippet(stderr.trim(), 20, 2048)
            ));
        }
        written.push(output);
    }
    tracing::info!(pages = written.len(), converter = %program, "converted pages to HTML");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_input_and_output_without_placeholders() {
        let (program, args) = converter_argv(
            "pandoc --standalone",
            Path::new("out/ch01.md"),
            Path::new("html/ch01.html"),
        )
        .unwrap();
        assert_eq!(program, "pandoc");
        assert_eq!(args, vec!["--standalone", "out/ch01.md", "-o", "html/ch01.html"]);
    }

    #[test]
    fn substitutes_placeholders() {
        let (program, args) = converter_argv(
            "md2html --title 'My Book' --out={output} {input}",
            Path::new("a.md"),
            Path::new("a.html"),
        )
        .unwrap();
        assert_eq!(program, "md2html");
        assert_eq!(args, vec!["--title", "My Book", "--out=a.html", "a.md"]);
    }

    #[test]
    fn rejects_empty_and_unbalanced_commands() {
        assert!(converter_argv("   ", Path::new("a"), Path::new("b")).is_err());
        assert!(converter_argv("pandoc 'oops", Path::new("a"), Path::new("b")).is_err());
    }

    #[test]
    fn page_links_point_at_html() {
        let md = "See [Chapter 2](ch02.md#ch02) and [index](index.md).\n\
                  [site](https://example.org/a.md) [code](../code/ch01/README.md)\n";
        assert_eq!(
            rewrite_page_links(md),
            "See [Chapter 2](ch02.html#ch02) and [index](index.html).\n\
             [site](https://example.org/a.md) [code](../code/ch01/README.md)\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn converted_pages_link_html_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("ch01.md");
        fs::write(&page, "# One\n\nNext: [Chapter 2](ch02.md#ch02)\n").unwrap();
        let html_dir = dir.path().join("html");
        let written = convert_pages("cp {input} {output}", &[page.clone()], &html_dir).unwrap();
        assert_eq!(written, vec![html_dir.join("ch01.html")]);
        let html = fs::read_to_string(html_dir.join("ch01.html")).unwrap();
        assert!(html.contains("(ch02.html#ch02)"));
        assert!(fs::read_to_string(&page).unwrap().contains("(ch02.md#ch02)"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_converter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("ch01.md");
        fs::write(&page, "# hi\n").unwrap();
        let err = convert_pages("false", &[page], &dir.path().join("html")).unwrap_err();
        assert!(err.to_string().contains("failed"));
    }
}
