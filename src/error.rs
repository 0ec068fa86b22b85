//! Build-level error taxonomy.
//!
//! Per-example execution and comparison failures never show up here: they are
//! recorded as [`crate::validation::ValidationRecord`]s. These errors abort a
//! phase, and each class maps to its own process exit code.
use std::path::PathBuf;
use thiserror::Error;

/// Structural problems in the chapter sources. Fatal for the whole build.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: invalid TOML: {message}")]
    Syntax { path: PathBuf, message: String },

    #[error("{path}: {context}: missing required field `{field}`")]
    MissingField {
        path: PathBuf,
        context: String,
        field: String,
    },

    #[error("{path}: {context}: field `{field}` {message}")]
    InvalidField {
        path: PathBuf,
        context: String,
        field: String,
        message: String,
    },

    #[error("{path}: duplicate example name {name:?} (lines {first_line} and {second_line})")]
    DuplicateExample {
        path: PathBuf,
        name: String,
        first_line: usize,
        second_line: usize,
    },

    #[error(
        "{path}: examples {first:?} (line {first_line}) and {second:?} (line {second_line}) \
         both bundle into {dir}/"
    )]
    BundleDirCollision {
        path: PathBuf,
        first: String,
        second: String,
        dir: String,
        first_line: usize,
        second_line: usize,
    },

    #[error("{path}: duplicate chapter id {id:?} (also declared in {other})")]
    DuplicateChapter {
        path: PathBuf,
        id: String,
        other: PathBuf,
    },

    #[error("{path}: section {section:?} references unknown example {name:?}")]
    UnknownExample {
        path: PathBuf,
        section: String,
        name: String,
    },

    #[error("{path}: section {section:?} references unknown chapter {id:?}")]
    UnknownChapter {
        path: PathBuf,
        section: String,
        id: String,
    },

    #[error("no chapter sources found in {0}")]
    NoSources(PathBuf),
}

/// Invalid build configuration (config file or flag combination).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Filesystem or converter failure while writing artifacts.
#[derive(Debug, Error)]
#[error("{phase}: {source:#}")]
pub struct PackagingError {
    pub phase: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl PackagingError {
    pub fn new(phase: &'static str, source: anyhow::Error) -> Self {
        Self { phase, source }
    }
}

/// Unrecoverable build failure, as surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),
}

impl BuildError {
    pub fn exit_code(&self) -> BuildExit {
        match self {
            BuildError::Load(_) | BuildError::Config(_) => BuildExit::LoadError,
            BuildError::Packaging(_) => BuildExit::PackagingError,
        }
    }
}

/// Process exit codes of the `exbook` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildExit {
    Clean = 0,
    ValidationFailures = 1,
    LoadError = 2,
    PackagingError = 3,
}

impl BuildExit {
    pub fn code(self) -> u8 {
        self as u8
    }
}
