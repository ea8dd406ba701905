//! Chapter manifest generation and FFmpeg metadata files.

use super::MeasuredSegment;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One chapter marker in the final audiobook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// 1-based chapter index
    pub index: usize,
    /// Chapter title
    pub title: String,
    /// Start position in milliseconds
    pub start_ms: u64,
    /// End position in milliseconds
    pub end_ms: u64,
}

impl ManifestEntry {
    pub fn new(index: usize, title: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            index,
            title: title.into(),
            start_ms,
            end_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Build contiguous chapter markers from measured segments.
///
/// Segments are taken in ascending chapter index; each entry starts where the
/// previous one ended, beginning at 0.
pub fn build_manifest(segments: &[MeasuredSegment]) -> Vec<ManifestEntry> {
    let mut ordered: Vec<&MeasuredSegment> = segments.iter().collect();
    ordered.sort_by_key(|m| m.segment.index);

    let mut offset_ms = 0u64;
    ordered
        .into_iter()
        .map(|measured| {
            let start_ms = offset_ms;
            offset_ms += measured.duration_ms;
            ManifestEntry::new(
                measured.segment.index,
                measured.segment.display_title(),
                start_ms,
                offset_ms,
            )
        })
        .collect()
}

/// Write an FFMETADATA1 file with global tags and chapter markers.
pub fn create_ffmpeg_metadata(
    title: &str,
    chapters: &[ManifestEntry],
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)?;
    let mut file = BufWriter::new(file);

    writeln!(file, ";FFMETADATA1")?;
    writeln!(file, "title={}", escape_metadata_value(title))?;
    writeln!(file, "album={}", escape_metadata_value(title))?;
    writeln!(file, "genre=Audiobook")?;
    writeln!(file)?;

    for chapter in chapters {
        writeln!(file, "[CHAPTER]")?;
        writeln!(file, "TIMEBASE=1/1000")?;
        writeln!(file, "START={}", chapter.start_ms)?;
        writeln!(file, "END={}", chapter.end_ms)?;
        writeln!(file, "title={}", escape_metadata_value(&chapter.title))?;
        writeln!(file)?;
    }

    file.flush()?;
    Ok(())
}

/// Write the manifest as JSON for tools and the playback controller.
pub fn write_manifest_json(chapters: &[ManifestEntry], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), chapters)?;
    Ok(())
}

/// Read a manifest written by [`write_manifest_json`].
pub fn read_manifest_json(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Escape special characters in metadata values.
///
/// FFmpeg metadata values need to escape: = ; # \ and newlines
fn escape_metadata_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '=' | ';' | '#' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }

    escaped
}
