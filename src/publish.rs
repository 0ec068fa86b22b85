//! Which examples may be published, given the validation outcome.
use crate::config::ValidationMode;
use crate::validation::{BuildReport, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// Validated and passing.
    Verified,
    /// Published with a visible marker; `None` means it was never run.
    Unverified(Option<Verdict>),
    /// Left out of every artifact.
    Withheld(Option<Verdict>),
}

impl Publication {
    pub fn is_published(self) -> bool {
        !matches!(self, Publication::Withheld(_))
    }
}

/// Gate shared by the expander and the packager.
#[derive(Debug, Clone, Copy)]
pub struct PublishGate<'a> {
    mode: ValidationMode,
    report: Option<&'a BuildReport>,
}

impl<'a> PublishGate<'a> {
    pub fn new(mode: ValidationMode, report: Option<&'a BuildReport>) -> Self {
        Self { mode, report }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn decide(&self, chapter_id: &str, example: &str) -> Publication {
        let verdict = self
            .report
            .and_then(|report| report.record(chapter_id, example))
            .map(|record| record.verdict);
        match (verdict, self.mode) {
            (Some(Verdict::Pass), _) => Publication::Verified,
            (verdict, ValidationMode::Advisory) => Publication::Unverified(verdict),
            (verdict, ValidationMode::Required) => Publication::Withheld(verdict),
        }
    }
}
