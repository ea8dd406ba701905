//! Append-only bookmark log, one JSON object per line.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub chapter_index: usize,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn now(chapter_index: usize) -> Self {
        Self {
            chapter_index,
            created_at: Utc::now(),
        }
    }
}

pub struct BookmarkLog {
    path: PathBuf,
}

impl BookmarkLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, bookmark: &Bookmark) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(bookmark)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// All bookmarks in the order they were added. Malformed lines are skipped.
    pub fn entries(&self) -> Result<Vec<Bookmark>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut bookmarks = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Bookmark>(&line) {
                Ok(bookmark) => bookmarks.push(bookmark),
                Err(e) => log::warn!("Skipping malformed bookmark on line {}: {}", n + 1, e),
            }
        }
        Ok(bookmarks)
    }
}
