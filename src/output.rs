//! Result types for a batch run.
//!
//! Every located document produces exactly one [`DocumentOutcome`], success
//! or failure, so `report.attempted()` always equals the number of PDFs
//! found. The report is serialisable for `--json` output.

use crate::error::{ErrorKind, PipelineError};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Pipeline step a document was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStage {
    Read,
    Extract,
    Title,
    Summary,
    Categorize,
    Write,
}

/// A document that produced a canvas.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    /// Vault path of the source PDF.
    pub source: String,
    /// Title as answered by the model (trimmed, unsanitized).
    pub title: String,
    /// Vault path of the category folder.
    pub category_folder: String,
    /// Vault path of the written canvas.
    pub canvas_path: String,
    /// Characters of text after reference stripping.
    pub text_chars: usize,
    /// True when the text exceeded the length budget.
    pub over_length_budget: bool,
    pub duration_ms: u64,
}

/// A document that failed somewhere in the pipeline.
#[derive(Debug, Serialize)]
pub struct FailedDocument {
    pub source: String,
    pub stage: DocumentStage,
    #[serde(serialize_with = "serialize_error")]
    pub error: PipelineError,
}

fn serialize_error<S: Serializer>(error: &PipelineError, s: S) -> Result<S::Ok, S::Error> {
    let mut st = s.serialize_struct("PipelineError", 2)?;
    st.serialize_field("kind", &error.kind())?;
    st.serialize_field("message", &error.to_string())?;
    st.end()
}

/// Outcome of one document.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Done(ProcessedDocument),
    Failed(FailedDocument),
}

impl DocumentOutcome {
    pub fn source(&self) -> &str {
        match self {
            DocumentOutcome::Done(d) => &d.source,
            DocumentOutcome::Failed(f) => &f.source,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, DocumentOutcome::Done(_))
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            DocumentOutcome::Done(_) => None,
            DocumentOutcome::Failed(f) => Some(&f.error),
        }
    }
}

/// Everything a run produced, in processing order.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
    pub total_duration_ms: u64,
}

impl BatchReport {
    /// Documents the driver attempted (always every located document).
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Successful documents.
    pub fn processed(&self) -> impl Iterator<Item = &ProcessedDocument> {
        self.outcomes.iter().filter_map(|o| match o {
            DocumentOutcome::Done(d) => Some(d),
            DocumentOutcome::Failed(_) => None,
        })
    }

    /// Failed documents.
    pub fn failures(&self) -> impl Iterator<Item = &FailedDocument> {
        self.outcomes.iter().filter_map(|o| match o {
            DocumentOutcome::Failed(f) => Some(f),
            DocumentOutcome::Done(_) => None,
        })
    }

    /// Failure count per error category.
    pub fn failures_by_kind(&self) -> Vec<(ErrorKind, usize)> {
        let mut counts: Vec<(ErrorKind, usize)> = Vec::new();
        for f in self.failures() {
            let kind = f.error.kind();
            match counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }
}
