// Destinations for generated documents

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Accepts a rendered document and its path relative to the docs root
pub trait DocumentSink {
    fn write(&mut self, relative_path: &str, content: &str) -> Result<()>;
}

/// Writes documents under a root directory
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSink for FileSink {
    fn write(&mut self, relative_path: &str, content: &str) -> Result<()> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        tracing::info!("Generated: {}", relative_path);
        Ok(())
    }
}

/// Keeps documents in memory, keyed by relative path
#[derive(Debug, Default)]
pub struct MemorySink {
    pub documents: BTreeMap<String, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relative_path: &str) -> Option<&str> {
        self.documents.get(relative_path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSink for MemorySink {
    fn write(&mut self, relative_path: &str, content: &str) -> Result<()> {
        self.documents
            .insert(relative_path.to_string(), content.to_string());
        Ok(())
    }
}
