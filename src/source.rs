//! Chapter sources: the immutable book model and its TOML loader.
mod flags;
mod json;
mod load;
mod model;

pub use flags::CliFlag;
pub use load::{discover_sources, load_book, load_book_files, load_chapter_file, load_chapter_str};
pub use model::{
    input_file_names, Book, ChapterKind, ChapterSource, Example, ExpectedFailure,
    NarrativeBlock, Segment, SourceLocation, DEFAULT_CATEGORY, EXPECTED_ERROR_FILE,
    EXPECTED_FILE, SCRIPT_FILE,
};
