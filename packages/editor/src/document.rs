//! # Document Handle
//!
//! A Document is one `.tn` file (or an in-memory source) with its [`Store`].
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Parse → Model → Edit → Print → Save
//!   ↓      ↓       ↓       ↓       ↓       ↓
//! File  TennNode Store  Operations Text   File
//! ```
//!
//! A source with parse errors never becomes a Document: loading fails with
//! the full error list and nothing is committed.

use crate::config::EditorConfig;
use crate::persistence;
use crate::store::Store;
use crate::EditorError;
use std::path::{Path, PathBuf};
use tenniarb_parser::{parse, parse_bytes};

#[derive(Debug)]
pub struct Document {
    /// Path of the backing file, `None` for memory-backed documents
    path: Option<PathBuf>,
    store: Store,
}

impl Document {
    /// Memory-backed document from source text
    pub fn from_source(source: &str) -> Result<Self, EditorError> {
        Self::from_source_with_config(source, EditorConfig::default())
    }

    pub fn from_source_with_config(source: &str, config: EditorConfig) -> Result<Self, EditorError> {
        let node = parse(source)?;
        Ok(Self {
            path: None,
            store: Store::with_config(persistence::parse_tenn(&node), config),
        })
    }

    /// File-backed document
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        Self::load_with_config(path, EditorConfig::default())
    }

    pub fn load_with_config(path: impl AsRef<Path>, config: EditorConfig) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let node = parse_bytes(&bytes)?;
        tracing::debug!(path = %path.display(), "document loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            store: Store::with_config(persistence::parse_tenn(&node), config),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn is_modified(&self) -> bool {
        self.store.is_modified()
    }

    /// Current model as Tenn source, ending with a newline
    pub fn to_source(&self) -> String {
        let mut source = persistence::to_tenn_str(self.store.model());
        source.push('\n');
        source
    }

    /// Write back to the backing file
    pub fn save(&mut self) -> Result<(), EditorError> {
        let path = self.path.clone().ok_or(EditorError::NotFileBacked)?;
        self.write(&path)
    }

    /// Write to `path` and make it the backing file
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), EditorError> {
        let path = path.into();
        self.write(&path)?;
        self.path = Some(path);
        Ok(())
    }

    fn write(&mut self, path: &Path) -> Result<(), EditorError> {
        // Deliver outstanding events first so they do not re-mark the store.
        self.store.flush();
        std::fs::write(path, self.to_source())?;
        self.store.mark_saved();
        tracing::debug!(path = %path.display(), "document saved");
        Ok(())
    }
}
