//! In-memory document source shared by unit tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::document::{Document, DocumentKind, DocumentSource};
use crate::error::Error;

/// Documents keyed by path, with optional paths that exist but cannot be read.
pub struct Memory {
    /// Readable documents.
    pub files: HashMap<PathBuf, String>,
    /// Number of successful `open` calls.
    pub opens: Cell<usize>,
    /// Paths reported as existing whose `open` fails.
    pub unreadable: Vec<PathBuf>,
}

impl Memory {
    /// Build a source from `(path, text)` pairs.
    pub fn new(files: &[(&str, &str)]) -> Self {
        return Self {
            files: files.iter().map(|(p, t)| return (PathBuf::from(p), (*t).to_string())).collect(),
            opens: Cell::new(0),
            unreadable: Vec::new(),
        };
    }
}

impl DocumentSource for Memory {
    fn exists(&self, path: &Path) -> bool {
        return self.files.contains_key(path) || self.unreadable.iter().any(|p| return p == path);
    }

    fn open(&self, path: &Path) -> Result<Document, Error> {
        let Some(text) = self.files.get(path) else {
            return Err(Error::FileNotFound { path: path.to_path_buf() });
        };
        self.opens.set(self.opens.get().saturating_add(1));
        let kind = DocumentKind::classify(path, &Config::default());
        return Ok(Document::new(path, text.clone(), kind));
    }
}
