//! File store the pipeline reads documents from and writes canvases to.
//!
//! The pipeline only ever sees vault paths: `/`-separated, relative to the
//! vault root, no leading slash (`Papers/attention.pdf`). [`Vault`] is the
//! seam; [`FsVault`] maps it onto a directory on disk and [`MemoryVault`]
//! keeps everything in memory for tests and dry runs.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// What lives at a vault path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Key-path store used by the pipeline.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Every file in the vault, in the store's enumeration order.
    async fn list_files(&self) -> Result<Vec<String>, PipelineError>;

    /// Raw bytes of the file at `path`.
    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, PipelineError>;

    /// Kind of entry at `path`, or `None` if nothing is there.
    async fn entry(&self, path: &str) -> Result<Option<EntryKind>, PipelineError>;

    /// Names of the folders directly inside `path`.
    async fn list_folders(&self, path: &str) -> Result<Vec<String>, PipelineError>;

    /// Create the folder at `path`.
    async fn create_folder(&self, path: &str) -> Result<(), PipelineError>;

    /// Create a new file at `path`. Fails if an entry already exists.
    async fn create_file(&self, path: &str, content: &str) -> Result<(), PipelineError>;
}

/// Strip surrounding slashes and whitespace from a vault path.
pub fn normalize_path(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

/// Join a folder and a child name into a vault path.
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = normalize_path(folder);
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

fn vault_err(path: &str, source: io::Error) -> PipelineError {
    PipelineError::Vault {
        path: path.to_string(),
        source,
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// A vault rooted at a directory on the local filesystem.
///
/// Hidden entries (names starting with `.`) are skipped during enumeration so
/// tool state such as `.obsidian/` or `.git/` never shows up as documents.
/// Symlinks to files are listed under the link's own path; symlinks to
/// folders are not followed.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault path onto the filesystem, refusing anything that would
    /// escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, PipelineError> {
        let rel = normalize_path(path);
        let rel_path = Path::new(&rel);
        if rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(vault_err(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path escapes the vault root"),
            ));
        }
        Ok(self.root.join(rel_path))
    }
}

#[async_trait]
impl Vault for FsVault {
    async fn list_files(&self) -> Result<Vec<String>, PipelineError> {
        let mut files = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(dir) = pending.pop() {
            let abs = self.resolve(&dir)?;
            let mut entries = tokio::fs::read_dir(&abs)
                .await
                .map_err(|e| vault_err(&dir, e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| vault_err(&dir, e))? {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    continue;
                }
                let child = join_path(&dir, &name);
                let file_type = entry.file_type().await.map_err(|e| vault_err(&child, e))?;
                if file_type.is_dir() {
                    pending.push(child);
                } else if file_type.is_file() {
                    files.push(child);
                } else if file_type.is_symlink() {
                    // Linked files count; linked folders are not descended
                    // into, so a link cycle cannot loop the walk.
                    match tokio::fs::metadata(entry.path()).await {
                        Ok(meta) if meta.is_file() => files.push(child),
                        Ok(_) => debug!("Not following folder link '{}'", child),
                        Err(e) => debug!("Skipping dangling link '{}': {}", child, e),
                    }
                }
            }
        }

        files.sort();
        debug!("Enumerated {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        let abs = self.resolve(path)?;
        tokio::fs::read(&abs).await.map_err(|e| vault_err(path, e))
    }

    async fn entry(&self, path: &str) -> Result<Option<EntryKind>, PipelineError> {
        let abs = self.resolve(path)?;
        match tokio::fs::metadata(&abs).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Folder)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(vault_err(path, e)),
        }
    }

    async fn list_folders(&self, path: &str) -> Result<Vec<String>, PipelineError> {
        let abs = self.resolve(path)?;
        let mut entries = tokio::fs::read_dir(&abs)
            .await
            .map_err(|e| vault_err(path, e))?;
        let mut folders = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| vault_err(path, e))? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| vault_err(path, e))?
                .is_dir();
            if is_dir {
                folders.push(name);
            }
        }
        folders.sort();
        Ok(folders)
    }

    async fn create_folder(&self, path: &str) -> Result<(), PipelineError> {
        let abs = self.resolve(path)?;
        tokio::fs::create_dir_all(&abs)
            .await
            .map_err(|e| vault_err(path, e))
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<(), PipelineError> {
        use tokio::io::AsyncWriteExt;

        let abs = self.resolve(path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .await
            .map_err(|e| vault_err(path, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| vault_err(path, e))?;
        file.flush().await.map_err(|e| vault_err(path, e))
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum MemEntry {
    File(Vec<u8>),
    Folder,
}

/// A vault held entirely in memory. Enumeration is in path order.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: Mutex<BTreeMap<String, MemEntry>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, creating its parent folders.
    pub fn with_file(self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let path = normalize_path(path);
        if let Ok(mut entries) = self.entries.lock() {
            insert_parents(&mut entries, &path);
            entries.insert(path, MemEntry::File(bytes.into()));
        }
        self
    }

    /// Insert a folder and its parents.
    pub fn with_folder(self, path: &str) -> Self {
        let path = normalize_path(path);
        if let Ok(mut entries) = self.entries.lock() {
            insert_parents(&mut entries, &path);
            entries.insert(path, MemEntry::Folder);
        }
        self
    }

    /// Text content of a file, if it exists and is UTF-8.
    pub fn read_text(&self, path: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        match entries.get(&normalize_path(path))? {
            MemEntry::File(bytes) => String::from_utf8(bytes.clone()).ok(),
            MemEntry::Folder => None,
        }
    }

    /// All folder paths currently in the vault.
    pub fn folders(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, e)| matches!(e, MemEntry::Folder))
                    .map(|(p, _)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, MemEntry>>, PipelineError> {
        self.entries
            .lock()
            .map_err(|_| PipelineError::Internal("memory vault lock poisoned".into()))
    }
}

fn insert_parents(entries: &mut BTreeMap<String, MemEntry>, path: &str) {
    let mut prefix = String::new();
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        prefix = join_path(&prefix, segment);
        entries.entry(prefix.clone()).or_insert(MemEntry::Folder);
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

#[async_trait]
impl Vault for MemoryVault {
    async fn list_files(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, e)| matches!(e, MemEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        match self.lock()?.get(&normalize_path(path)) {
            Some(MemEntry::File(bytes)) => Ok(bytes.clone()),
            Some(MemEntry::Folder) => Err(vault_err(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "is a folder"),
            )),
            None => Err(vault_err(path, io::ErrorKind::NotFound.into())),
        }
    }

    async fn entry(&self, path: &str) -> Result<Option<EntryKind>, PipelineError> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Ok(Some(EntryKind::Folder));
        }
        Ok(self.lock()?.get(&path).map(|e| match e {
            MemEntry::File(_) => EntryKind::File,
            MemEntry::Folder => EntryKind::Folder,
        }))
    }

    async fn list_folders(&self, path: &str) -> Result<Vec<String>, PipelineError> {
        let path = normalize_path(path);
        Ok(self
            .lock()?
            .iter()
            .filter(|(p, e)| matches!(e, MemEntry::Folder) && parent_of(p) == path)
            .map(|(p, _)| p.rsplit('/').next().unwrap_or(p.as_str()).to_string())
            .collect())
    }

    async fn create_folder(&self, path: &str) -> Result<(), PipelineError> {
        let norm = normalize_path(path);
        let mut entries = self.lock()?;
        match entries.get(&norm) {
            Some(MemEntry::Folder) => Ok(()),
            Some(MemEntry::File(_)) => Err(vault_err(path, io::ErrorKind::AlreadyExists.into())),
            None => {
                insert_parents(&mut entries, &norm);
                entries.insert(norm, MemEntry::Folder);
                Ok(())
            }
        }
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<(), PipelineError> {
        let norm = normalize_path(path);
        let mut entries = self.lock()?;
        if entries.contains_key(&norm) {
            return Err(vault_err(path, io::ErrorKind::AlreadyExists.into()));
        }
        match entries.get(parent_of(&norm)) {
            Some(MemEntry::Folder) => {}
            _ if parent_of(&norm).is_empty() => {}
            _ => return Err(vault_err(path, io::ErrorKind::NotFound.into())),
        }
        entries.insert(norm, MemEntry::File(content.as_bytes().to_vec()));
        Ok(())
    }
}
