//! Document discovery: find the PDFs under the input folder.

use crate::error::PipelineError;
use crate::vault::{normalize_path, Vault};
use std::path::Path;
use tracing::debug;

/// A located document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Vault path, e.g. `Papers/attention.pdf`.
    pub path: String,
    /// Lowercased extension without the dot.
    pub extension: String,
}

impl DocumentRef {
    /// File name without its directory.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Lowercased extension of a vault path, if any.
pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// True when `path` is `folder` itself or lives under it.
///
/// Matching is on whole path segments: folder `Papers` does not claim
/// `Papers2/x.pdf`. An empty folder matches the whole vault.
fn is_under(path: &str, folder: &str) -> bool {
    folder.is_empty()
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// List every PDF (case-insensitive extension) under `folder`, in the
/// vault's enumeration order.
///
/// # Errors
/// [`PipelineError::NoDocuments`] when nothing matches.
pub async fn locate_documents(
    vault: &dyn Vault,
    folder: &str,
) -> Result<Vec<DocumentRef>, PipelineError> {
    let folder = normalize_path(folder);
    let docs: Vec<DocumentRef> = vault
        .list_files()
        .await?
        .into_iter()
        .filter(|path| is_under(path, &folder))
        .filter_map(|path| match extension_of(&path) {
            Some(ext) if ext == "pdf" => Some(DocumentRef {
                path,
                extension: ext,
            }),
            _ => None,
        })
        .collect();

    if docs.is_empty() {
        return Err(PipelineError::NoDocuments { folder });
    }

    debug!("Located {} PDF documents under '{}'", docs.len(), folder);
    Ok(docs)
}
