//! Verified example book builder.
//!
//! Chapter sources declare examples as data; every example is executed against
//! an external engine and compared structurally before it is expanded into
//! markdown pages or packaged as a runnable bundle.
pub mod build;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod expand;
pub mod fsutil;
pub mod html;
pub mod package;
pub mod paths;
pub mod publish;
pub mod runner;
pub mod source;
pub mod util;
pub mod validation;

pub use build::{check, run_build, BuildOutcome, BuildState};
pub use error::{BuildError, BuildExit};
