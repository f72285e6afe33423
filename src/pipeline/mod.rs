//! Pipeline stages for PDF-to-canvas summarisation.
//!
//! Each submodule implements one step of the per-document flow. The driver
//! in [`crate::run`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! locate ──▶ extract ──▶ strip ──▶ llm ──▶ sanitize ──▶ category ──▶ canvas
//! (vault)    (pdfium)    (regex)   (chat)   (names)      (folders)    (JSON)
//! ```
//!
//! 1. [`locate`]   find `.pdf` files under the input folder
//! 2. [`extract`]  page-ordered plain text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`strip`]    cut the text at the first reference-section heading
//! 4. [`llm`]      title, summary and category calls; the only stage with
//!    network I/O
//! 5. [`sanitize`] turn model answers into safe folder and file names
//! 6. [`category`] list, reuse or create category folders
//! 7. [`canvas`]   build the two-node canvas document

pub mod canvas;
pub mod category;
pub mod extract;
pub mod llm;
pub mod locate;
pub mod sanitize;
pub mod strip;
