//! Text extraction: PDF bytes → plain text, page by page.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on the async executor. Each extraction moves onto
//! tokio's blocking pool, binds pdfium, and drops it again when done.
//!
//! ## Output shape
//!
//! For each page in order, the page's text segments are joined with single
//! spaces and followed by a blank line (`"\n\n"`).

use crate::error::PipelineError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit libpdfium path.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Header bytes are searched for within this many leading bytes.
const PDF_HEADER_WINDOW: usize = 1024;

/// Turns document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of `bytes`; `path` is used for error messages only.
    async fn extract_text(&self, path: &str, bytes: Vec<u8>) -> Result<String, PipelineError>;
}

/// True when the `%PDF` marker occurs within the first kilobyte.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// Join per-page text items the way every extractor reports them.
pub fn assemble_pages<I, P>(pages: I) -> String
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = String>,
{
    let mut out = String::new();
    for page in pages {
        let items: Vec<String> = page.into_iter().collect();
        out.push_str(&items.join(" "));
        out.push_str("\n\n");
    }
    out
}

/// pdfium-backed extractor.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    library: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Locate and test-bind pdfium.
    ///
    /// Resolution order: `library`, then `$PDFIUM_LIB_PATH`, then a library
    /// in the working directory, then the system library paths.
    ///
    /// # Errors
    /// [`PipelineError::PdfiumBindingFailed`] when no library can be loaded.
    pub fn new(library: Option<PathBuf>) -> Result<Self, PipelineError> {
        let library = library.or_else(|| {
            std::env::var(PDFIUM_LIB_PATH_ENV)
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
        });
        bind_pdfium(library.as_deref())?;
        info!(
            "pdfium available ({})",
            library
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "search path".to_string())
        );
        Ok(Self { library })
    }
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, PipelineError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PipelineError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract_text(&self, path: &str, bytes: Vec<u8>) -> Result<String, PipelineError> {
        if !looks_like_pdf(&bytes) {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(PipelineError::Extraction {
                path: path.to_string(),
                detail: format!("not a PDF (first bytes: {magic:?})"),
            });
        }

        let library = self.library.clone();
        let owned_path = path.to_string();
        let result = tokio::task::spawn_blocking(move || {
            extract_blocking(library.as_deref(), &owned_path, &bytes)
        })
        .await;
        flatten_join(path, result)
    }
}

/// Fold a failed extraction task into an extraction error for `path`.
fn flatten_join(
    path: &str,
    result: Result<Result<String, PipelineError>, tokio::task::JoinError>,
) -> Result<String, PipelineError> {
    result.map_err(|e| PipelineError::Extraction {
        path: path.to_string(),
        detail: format!("extraction task failed: {e}"),
    })?
}

/// Blocking implementation of text extraction.
fn extract_blocking(
    library: Option<&Path>,
    path: &str,
    bytes: &[u8],
) -> Result<String, PipelineError> {
    let pdfium = bind_pdfium(library)?;
    let extraction_err = |detail: String| PipelineError::Extraction {
        path: path.to_string(),
        detail,
    };

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| extraction_err(format!("{e:?}")))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| extraction_err(format!("page {}: {e:?}", idx + 1)))?;
        let items: Vec<String> = text.segments().iter().map(|s| s.text()).collect();
        pages.push(items);
    }

    debug!("Extracted {} pages from {}", pages.len(), path);
    Ok(assemble_pages(pages))
}
