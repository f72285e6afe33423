//! # pdf2canvas
//!
//! Summarise a folder of PDFs with a local LLM and file each summary as a
//! JSON Canvas under a subject folder.
//!
//! For every PDF found under the input folder, the text is extracted, cut at
//! the reference section and sent to an Ollama-compatible `/api/chat`
//! endpoint three times: once for a title, once for a structured summary and
//! once for a subject category (chosen from the categories that already
//! exist where possible). The result is a `.canvas` file linking the PDF to
//! its summary, written to `{output}/{category}/{title}.canvas`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input folder
//!  │
//!  ├─ 1. Locate    every .pdf under the folder, recursively
//!  ├─ 2. Extract   page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Strip     drop everything from "References" onward
//!  ├─ 4. LLM       title, summary, category (sequential chat calls)
//!  ├─ 5. Folder    reuse or create {output}/{category}
//!  └─ 6. Canvas    file node + text node + edge, written once
//! ```
//!
//! Documents are processed one at a time. A failing document is reported and
//! skipped; the batch always attempts every PDF it found.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2canvas::{FsVault, OllamaClient, PdfiumExtractor, Pipeline, Settings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::builder()
//!         .input_folder("Papers")
//!         .output_folder("Canvases")
//!         .build()?;
//!
//!     let pipeline = Pipeline::new(
//!         settings.clone(),
//!         Arc::new(FsVault::new("/home/me/Vault")),
//!         Arc::new(PdfiumExtractor::new(settings.pdfium_lib_path.clone())?),
//!         Arc::new(OllamaClient::from_settings(&settings)?),
//!     );
//!
//!     let report = pipeline.run().await?;
//!     eprintln!("{}/{} documents summarised", report.succeeded(), report.attempted());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2canvas` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2canvas = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod vault;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Settings, SettingsBuilder, CHARS_PER_TOKEN};
pub use error::{ErrorKind, PipelineError};
pub use output::{BatchReport, DocumentOutcome, DocumentStage, FailedDocument, ProcessedDocument};
pub use pipeline::canvas::{build_canvas, Canvas};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::llm::{ChatMessage, ChatProvider, OllamaClient, SamplingOptions};
pub use pipeline::locate::DocumentRef;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use run::{OutcomeStream, Pipeline};
pub use vault::{EntryKind, FsVault, MemoryVault, Vault};
