//! Error types for the pdf2canvas library.
//!
//! A single enum, [`PipelineError`], covers every failure. Where it ends up
//! depends on the step that produced it:
//!
//! * **Run-level**: missing input/output folder, nothing to process, the PDF
//!   engine cannot be loaded. Returned as `Err(PipelineError)` from
//!   [`crate::run::Pipeline::run`] before any document is touched.
//!
//! * **Document-level**: a corrupt PDF, an unreachable endpoint, a folder
//!   that cannot be created. Stored inside
//!   [`crate::output::DocumentOutcome::Failed`] so the batch carries on with
//!   the next document.
//!
//! [`ErrorKind`] folds the variants into the handful of categories a user
//! cares about when reading a batch report.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2canvas library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// `input_folder` or `output_folder` is not set.
    #[error("The {which} folder is not configured.\nSet it in the settings file or with --{which}-folder.")]
    MissingFolder { which: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The settings file exists but could not be read or written.
    #[error("Failed to access settings file '{path}': {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`crate::config::Settings`].
    #[error("Settings file '{path}' is malformed: {detail}")]
    SettingsFormat { path: PathBuf, detail: String },

    // ── Enumeration ───────────────────────────────────────────────────────
    /// No PDF document lives under the input folder.
    #[error("No PDF documents found under '{folder}'")]
    NoDocuments { folder: String },

    // ── Extraction ────────────────────────────────────────────────────────
    /// The document bytes could not be decoded as a PDF.
    #[error("Failed to extract text from '{path}': {detail}")]
    Extraction { path: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or `pdfium_lib_path` in settings).\n\
  • Place libpdfium next to the binary or in the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Inference ─────────────────────────────────────────────────────────
    /// The endpoint could not be reached or the body could not be read.
    #[error("Inference endpoint '{url}' unreachable: {reason}")]
    Transport { url: String, reason: String },

    /// The endpoint answered with something other than JSON.
    #[error("Inference endpoint returned a non-JSON body: {detail}")]
    InvalidJson { detail: String },

    /// The endpoint reported an error in its payload.
    #[error("Inference endpoint error: {message}")]
    ServerError { message: String },

    /// The payload is JSON but has no `message.content` string.
    #[error("Malformed inference response: {detail}")]
    MalformedResponse { detail: String },

    // ── File store ────────────────────────────────────────────────────────
    /// A vault read, folder creation or file creation failed.
    #[error("File store operation failed on '{path}': {source}")]
    Vault {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A path that must be a folder is missing or is a file.
    #[error("'{path}' is not a folder")]
    NotAFolder { path: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// User-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    EnumerationEmpty,
    Extraction,
    Transport,
    Response,
    Filesystem,
    Internal,
}

impl PipelineError {
    /// Classify this error into one of the user-facing categories.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingFolder { .. }
            | PipelineError::InvalidConfig(_)
            | PipelineError::SettingsIo { .. }
            | PipelineError::SettingsFormat { .. } => ErrorKind::Configuration,
            PipelineError::NoDocuments { .. } => ErrorKind::EnumerationEmpty,
            PipelineError::Extraction { .. } | PipelineError::PdfiumBindingFailed(_) => {
                ErrorKind::Extraction
            }
            PipelineError::Transport { .. } => ErrorKind::Transport,
            PipelineError::InvalidJson { .. }
            | PipelineError::ServerError { .. }
            | PipelineError::MalformedResponse { .. } => ErrorKind::Response,
            PipelineError::Vault { .. }
            | PipelineError::NotAFolder { .. } => ErrorKind::Filesystem,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for errors that end the whole run rather than one document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::EnumerationEmpty
        ) || matches!(self, PipelineError::PdfiumBindingFailed(_))
    }
}
