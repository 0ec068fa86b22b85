//! Typed paths into the build output layout.
//!
//! ```text
//! <output>/out/<chapter>.md, index.md
//! <output>/html/<chapter>.html
//! <output>/reports/<chapter>.{md,json}, book.{md,json}
//! <output>/code/<chapter>/<category>/<example>/...
//! <output>/code/<chapter>_examples.tar.gz, download_all_examples.tar.gz
//! <output>/build_summary.md
//! ```
use crate::source::{ChapterSource, Example};
use std::path::{Path, PathBuf};

pub const BOOK_ARCHIVE: &str = "download_all_examples.tar.gz";
pub const BOOK_REPORT_STEM: &str = "book";
pub const INDEX_PAGE: &str = "index.md";

#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expanded markdown pages.
    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    pub fn chapter_doc(&self, chapter_id: &str) -> PathBuf {
        self.docs_dir().join(format!("{chapter_id}.md"))
    }

    pub fn index_doc(&self) -> PathBuf {
        self.docs_dir().join(INDEX_PAGE)
    }

    pub fn html_dir(&self) -> PathBuf {
        self.root.join("html")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn chapter_report(&self, chapter_id: &str, ext: &str) -> PathBuf {
        self.reports_dir().join(format!("{chapter_id}.{ext}"))
    }

    pub fn book_report(&self, ext: &str) -> PathBuf {
        self.chapter_report(BOOK_REPORT_STEM, ext)
    }

    /// Root of all runnable bundles; deleted before every packaging run.
    pub fn code_dir(&self) -> PathBuf {
        self.root.join("code")
    }

    pub fn chapter_code_dir(&self, chapter_id: &str) -> PathBuf {
        self.code_dir().join(chapter_id)
    }

    pub fn example_dir(&self, chapter: &ChapterSource, example: &Example) -> PathBuf {
        self.code_dir().join(example_rel_dir(chapter, example))
    }

    pub fn chapter_archive(&self, chapter_id: &str) -> PathBuf {
        self.code_dir().join(chapter_archive_name(chapter_id))
    }

    pub fn book_archive(&self) -> PathBuf {
        self.code_dir().join(BOOK_ARCHIVE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("build_summary.md")
    }
}

/// `<chapter>/<category>/<example>`, relative to the code directory.
pub fn example_rel_dir(chapter: &ChapterSource, example: &Example) -> String {
    format!(
        "{}/{}/{}",
        chapter.id,
        example.category_dir(),
        example.dir_name()
    )
}

pub fn chapter_archive_name(chapter_id: &str) -> String {
    format!("{chapter_id}_examples.tar.gz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_output_dir() {
        let paths = OutputPaths::new(PathBuf::from("build"));
        assert_eq!(paths.chapter_doc("ch01"), PathBuf::from("build/out/ch01.md"));
        assert_eq!(paths.book_report("json"), PathBuf::from("build/reports/book.json"));
        assert_eq!(
            paths.chapter_archive("ch01"),
            PathBuf::from("build/code/ch01_examples.tar.gz")
        );
        assert_eq!(
            paths.book_archive(),
            PathBuf::from("build/code/download_all_examples.tar.gz")
        );
    }
}
