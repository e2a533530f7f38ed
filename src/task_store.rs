//! The JSON task file (`{memory.root}/tasks.txt`).

use anyhow::{Context, Result};
use memchat_core::tasks::TaskBook;
use std::path::{Path, PathBuf};

use crate::files::write_atomic;

pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with empty lists if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        if !self.path.exists() {
            self.save(&TaskBook::new())?;
        }
        Ok(())
    }

    pub fn load(&self) -> Result<TaskBook> {
        self.ensure()?;
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read task file: {}", self.path.display()))?;
        let book = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse task file: {}", self.path.display()))?;
        Ok(book)
    }

    pub fn save(&self, book: &TaskBook) -> Result<()> {
        let json = serde_json::to_string_pretty(book)?;
        write_atomic(&self.path, json.as_bytes())
    }
}
