//! Turns per-chapter segments into one audiobook with chapter markers.
//!
//! Three stages, each checked before the next: measure every segment,
//! derive the manifest from the measured durations, then concatenate and
//! attach the manifest. The manifest and the concatenation list are built
//! from the same ordered slice, so marker order and audio order agree.
//! `chapters.txt` and `manifest.json` only appear once the audiobook exists.

use super::metadata::{build_manifest, create_ffmpeg_metadata, write_manifest_json};
use super::{AudioSegment, AudioToolkit, ManifestEntry, MeasuredSegment};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Where the assembler writes its outputs.
#[derive(Debug, Clone)]
pub struct AssemblyTargets {
    /// FFMETADATA1 chapter file
    pub metadata_path: PathBuf,
    /// JSON manifest
    pub manifest_path: PathBuf,
    /// Final audiobook
    pub output_path: PathBuf,
}

/// The finished audiobook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audiobook {
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    pub chapters: Vec<ManifestEntry>,
}

impl Audiobook {
    pub fn total_duration_ms(&self) -> u64 {
        self.chapters.last().map(|c| c.end_ms).unwrap_or(0)
    }
}

/// Measure each segment, dropping any that cannot be read.
///
/// Returns the valid segments in ascending chapter order.
pub fn measure_segments(
    segments: &[AudioSegment],
    toolkit: &dyn AudioToolkit,
) -> Result<Vec<MeasuredSegment>> {
    log::info!("Measuring {} audio segments...", segments.len());

    let mut measured: Vec<MeasuredSegment> = segments
        .iter()
        .filter_map(|segment| {
            if !segment.path.exists() {
                log::warn!(
                    "Audio file '{}' does not exist. Skipping.",
                    segment.path.display()
                );
                return None;
            }
            match toolkit.duration_ms(&segment.path) {
                Ok(0) => {
                    log::error!("Audio file '{}' is empty. Skipping.", segment.path.display());
                    None
                }
                Ok(duration_ms) => {
                    log::debug!("{}: {} ms", segment.path.display(), duration_ms);
                    Some(MeasuredSegment {
                        segment: segment.clone(),
                        duration_ms,
                    })
                }
                Err(e) => {
                    log::error!("Error reading audio file '{}': {}", segment.path.display(), e);
                    None
                }
            }
        })
        .collect();

    if measured.is_empty() {
        return Err(PipelineError::NoValidAudioFiles);
    }

    measured.sort_by_key(|m| m.segment.index);
    Ok(measured)
}

/// Measure, build the manifest, concatenate, and attach chapter metadata.
pub fn assemble_audiobook(
    segments: &[AudioSegment],
    toolkit: &dyn AudioToolkit,
    book_title: &str,
    targets: &AssemblyTargets,
) -> Result<Audiobook> {
    let measured = measure_segments(segments, toolkit)?;

    // Metadata is staged beside the intermediate audio and only published
    // once the audiobook itself has been written
    let temp_dir = TempDir::new()?;
    let staged_metadata = temp_dir.path().join("chapters.txt");

    log::info!("Generating metadata for chapters...");
    let chapters = build_manifest(&measured);
    create_ffmpeg_metadata(book_title, &chapters, &staged_metadata)?;
    log::info!("Chapter metadata created.");

    let ordered_files: Vec<&Path> = measured.iter().map(|m| m.segment.path.as_path()).collect();

    log::info!("Combining audio files into a single audiobook with chapters...");
    let concatenated = temp_dir.path().join(concat_file_name(&targets.output_path));
    toolkit.concatenate(&ordered_files, &concatenated)?;

    log::info!("Applying chapter metadata...");
    toolkit.attach_chapters(&concatenated, &staged_metadata, &targets.output_path)?;

    std::fs::copy(&staged_metadata, &targets.metadata_path)?;
    write_manifest_json(&chapters, &targets.manifest_path)?;

    log::info!(
        "Audiobook created with chapters: '{}'",
        targets.output_path.display()
    );

    Ok(Audiobook {
        path: targets.output_path.clone(),
        manifest_path: targets.manifest_path.clone(),
        chapters,
    })
}

/// Intermediate file name with the final container's extension.
fn concat_file_name(output_path: &Path) -> String {
    match output_path.extension() {
        Some(ext) => format!("audiobook.{}", ext.to_string_lossy()),
        None => "audiobook".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolkit;
    use tempfile::TempDir;

    fn write_segment(dir: &Path, index: usize, title: &str, bytes: usize) -> AudioSegment {
        let path = dir.join(format!("chapter_{:03}.mp3", index));
        std::fs::write(&path, vec![b'a'; bytes]).unwrap();
        AudioSegment::new(index, title, path)
    }

    fn targets(dir: &Path) -> AssemblyTargets {
        AssemblyTargets {
            metadata_path: dir.join("chapters.txt"),
            manifest_path: dir.join("manifest.json"),
            output_path: dir.join("audiobook_with_chapters.mp3"),
        }
    }

    #[test]
    fn test_measure_drops_missing_and_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let good = write_segment(temp_dir.path(), 1, "Good", 10);
        let missing = AudioSegment::new(2, "Missing", temp_dir.path().join("chapter_002.mp3"));
        let corrupt = write_segment(temp_dir.path(), 3, "Corrupt", 10);
        let toolkit = FakeToolkit::new().unreadable(&corrupt.path);

        let measured = measure_segments(&[corrupt, missing, good], &toolkit).unwrap();
        assert_eq!(measured.len(), 1);
        assert_eq!(measured[0].segment.index, 1);
        assert_eq!(measured[0].duration_ms, 10_000);
    }

    #[test]
    fn test_measure_nothing_valid() {
        let temp_dir = TempDir::new().unwrap();
        let missing = AudioSegment::new(1, "Missing", temp_dir.path().join("nope.mp3"));
        assert!(matches!(
            measure_segments(&[missing], &FakeToolkit::new()),
            Err(PipelineError::NoValidAudioFiles)
        ));
    }

    #[test]
    fn test_assemble_orders_concat_like_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let segments = vec![
            write_segment(temp_dir.path(), 4, "Four", 4),
            write_segment(temp_dir.path(), 1, "One", 1),
            write_segment(temp_dir.path(), 3, "Three", 3),
        ];
        let toolkit = FakeToolkit::new();

        let book = assemble_audiobook(&segments, &toolkit, "Book", &targets(temp_dir.path())).unwrap();

        let manifest_order: Vec<usize> = book.chapters.iter().map(|c| c.index).collect();
        assert_eq!(manifest_order, vec![1, 3, 4]);
        assert_eq!(
            toolkit.concatenated_stems(),
            vec!["chapter_001", "chapter_003", "chapter_004"]
        );
        assert_eq!(book.chapters[1], ManifestEntry::new(3, "Three", 1000, 4000));
        assert_eq!(book.total_duration_ms(), 8000);
        assert!(book.path.exists());

        let metadata = std::fs::read_to_string(temp_dir.path().join("chapters.txt")).unwrap();
        assert!(metadata.contains("START=1000\nEND=4000\ntitle=Three"));
        assert!(temp_dir.path().join("manifest.json").exists());
    }

    #[test]
    fn test_concat_failure_surfaces_tool_error() {
        let temp_dir = TempDir::new().unwrap();
        let segments = vec![write_segment(temp_dir.path(), 1, "One", 1)];
        let toolkit = FakeToolkit::new().failing_concat("Invalid data found when processing input");

        let err = assemble_audiobook(&segments, &toolkit, "Book", &targets(temp_dir.path()))
            .unwrap_err();
        match err {
            PipelineError::Concat(message) => assert!(message.contains("Invalid data")),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!temp_dir.path().join("manifest.json").exists());
        assert!(!temp_dir.path().join("chapters.txt").exists());
    }

    #[test]
    fn test_attach_failure_surfaces_tool_error() {
        let temp_dir = TempDir::new().unwrap();
        let segments = vec![
            write_segment(temp_dir.path(), 1, "One", 1),
            write_segment(temp_dir.path(), 2, "Two", 2),
        ];
        let toolkit = FakeToolkit::new().failing_attach("Could not find tag for codec");

        let err = assemble_audiobook(&segments, &toolkit, "Book", &targets(temp_dir.path()))
            .unwrap_err();
        assert_eq!(err.stage(), "audio assembly");
        match err {
            PipelineError::Multiplex(message) => assert!(message.contains("Could not find tag")),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!temp_dir.path().join("manifest.json").exists());
        assert!(!temp_dir.path().join("chapters.txt").exists());
        assert!(!temp_dir.path().join("audiobook_with_chapters.mp3").exists());
    }

    #[test]
    fn test_concat_file_name_keeps_extension() {
        assert_eq!(concat_file_name(Path::new("/out/book.m4b")), "audiobook.m4b");
        assert_eq!(concat_file_name(Path::new("/out/book")), "audiobook");
    }
}
