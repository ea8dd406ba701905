//! Audio assembly: chapter manifest, concatenation, chapter metadata.

pub mod assembler;
pub mod ffmpeg;
pub mod metadata;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use assembler::{AssemblyTargets, Audiobook, assemble_audiobook, measure_segments};
pub use ffmpeg::FfmpegToolkit;
pub use metadata::{ManifestEntry, build_manifest};

/// One chapter's synthesized audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// 1-based chapter index
    pub index: usize,
    /// Chapter title
    pub title: String,
    /// Audio artifact
    pub path: PathBuf,
}

impl AudioSegment {
    pub fn new(index: usize, title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            title: title.into(),
            path: path.into(),
        }
    }

    /// Title for chapter markers, falling back to the artifact's file stem.
    pub fn display_title(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("Chapter {}", self.index))
    }
}

/// A segment with its measured duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredSegment {
    pub segment: AudioSegment,
    pub duration_ms: u64,
}

/// Audio container operations.
pub trait AudioToolkit {
    /// Exact duration of an audio artifact in milliseconds.
    fn duration_ms(&self, audio_path: &Path) -> Result<u64>;

    /// Join artifacts, in the given order, into `output_path`.
    fn concatenate(&self, audio_files: &[&Path], output_path: &Path) -> Result<()>;

    /// Write `audio_path` plus the chapter metadata file to `output_path`.
    fn attach_chapters(&self, audio_path: &Path, metadata_path: &Path, output_path: &Path)
    -> Result<()>;
}
