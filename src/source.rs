//! Document discovery.
//!
//! The engine never owns course documents; it reads them through a
//! [`DocumentSource`]. Discovery order is part of the contract: the catalog
//! breaks gateway ties by it, so every source must list documents in a stable
//! order.
//!
//! [`FsDocumentSource`] walks a content directory:
//!
//! ```text
//! content/
//! ├── config.toml                  # Engine config (not a document)
//! ├── 010-stabilize.md             # Course document
//! ├── 020-regulate.md
//! ├── drafts/
//! │   └── 030-integrate.md         # Nested directories are walked too
//! └── .trash/                      # Hidden entries are skipped
//! ```
//!
//! Documents are listed in file-name order per directory, depth first, with
//! names relative to the root using `/` separators.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Document is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),
}

/// Read-only supplier of raw course documents.
pub trait DocumentSource: Sync {
    /// Names of all available documents, in discovery order.
    fn list(&self) -> Result<Vec<String>, SourceError>;

    /// Raw text of one document.
    fn read(&self, name: &str) -> Result<String, SourceError>;
}

/// Course documents stored as files under a content directory.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

impl DocumentSource for FsDocumentSource {
    fn list(&self) -> Result<Vec<String>, SourceError> {
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            // Depth 0 is the root itself, which may legitimately be `.`.
            .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()));

        let mut names = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.is_document(entry.path()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(name);
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<String, SourceError> {
        let path = self.root.join(name);
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(name.to_string()),
            _ => SourceError::Io(e),
        })?;
        String::from_utf8(bytes).map_err(|_| SourceError::NotUtf8(path))
    }
}

/// Documents held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentSource {
    documents: Vec<(String, String)>,
}

impl MemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document; a repeated name replaces the text but keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        match self.documents.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = text,
            None => self.documents.push((name, text)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }
}

impl DocumentSource for MemoryDocumentSource {
    fn list(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.documents.iter().map(|(n, _)| n.clone()).collect())
    }

    fn read(&self, name: &str) -> Result<String, SourceError> {
        self.documents
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }
}
