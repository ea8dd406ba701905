//! Chapter playback over the per-chapter audio segments.
//!
//! Transitions are pure: each takes the current [`PlaybackState`] and returns
//! a [`Transition`] holding the next state, the audio [`Effect`] to carry out,
//! and any error. [`Player`] drives an [`AudioSink`] with those effects.

pub mod bookmarks;
pub mod player;

use crate::audio::metadata::read_manifest_json;
use crate::error::{PipelineError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use bookmarks::{Bookmark, BookmarkLog};
pub use player::{AudioSink, FfplaySink, Player};

static SEGMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^chapter_(\d+)\.[A-Za-z0-9]+$").expect("valid segment regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    /// 1-based chapter index
    pub current_chapter: usize,
    pub status: PlayerStatus,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_chapter: 1,
            status: PlayerStatus::Stopped,
        }
    }
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == PlayerStatus::Playing
    }
}

/// What the audio output should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Stop anything playing, then start this file
    Start(PathBuf),
    Pause,
    Resume,
    Stop,
}

#[derive(Debug)]
pub struct Transition {
    pub state: PlaybackState,
    pub effect: Effect,
    pub error: Option<PipelineError>,
}

impl Transition {
    fn ok(state: PlaybackState, effect: Effect) -> Self {
        Self {
            state,
            effect,
            error: None,
        }
    }

    fn unchanged(state: &PlaybackState) -> Self {
        Self::ok(state.clone(), Effect::None)
    }
}

/// Per-chapter segments available for playback.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    segments: BTreeMap<usize, PathBuf>,
    chapter_count: usize,
}

impl SegmentCatalog {
    /// Index the `chapter_NNN.<ext>` files in `audio_dir`.
    ///
    /// The chapter count is the highest index found in either the manifest
    /// (when present) or the directory.
    pub fn open(audio_dir: &Path, manifest_path: &Path) -> Result<Self> {
        let mut segments = BTreeMap::new();
        if audio_dir.is_dir() {
            for entry in std::fs::read_dir(audio_dir)? {
                let path = entry?.path();
                let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                    continue;
                };
                if let Some(caps) = SEGMENT_NAME.captures(&name) {
                    if let Ok(index) = caps[1].parse::<usize>() {
                        segments.insert(index, path);
                    }
                }
            }
        }

        let manifest_max = if manifest_path.exists() {
            read_manifest_json(manifest_path)?
                .iter()
                .map(|entry| entry.index)
                .max()
        } else {
            None
        };
        let dir_max = segments.keys().next_back().copied();
        let chapter_count = manifest_max.max(dir_max).unwrap_or(0);

        Ok(Self {
            segments,
            chapter_count,
        })
    }

    pub fn from_segments(segments: BTreeMap<usize, PathBuf>, chapter_count: usize) -> Self {
        Self {
            segments,
            chapter_count,
        }
    }

    pub fn chapter_count(&self) -> usize {
        self.chapter_count
    }

    /// Existing segment for a chapter.
    pub fn segment(&self, chapter: usize) -> Option<&Path> {
        self.segments
            .get(&chapter)
            .map(PathBuf::as_path)
            .filter(|path| path.exists())
    }
}

/// Load and start a chapter. Valid from any state.
pub fn play(state: &PlaybackState, chapter: usize, catalog: &SegmentCatalog) -> Transition {
    match catalog.segment(chapter) {
        Some(path) => Transition::ok(
            PlaybackState {
                current_chapter: chapter,
                status: PlayerStatus::Playing,
            },
            Effect::Start(path.to_path_buf()),
        ),
        None => {
            let effect = if state.status == PlayerStatus::Stopped {
                Effect::None
            } else {
                Effect::Stop
            };
            Transition {
                state: PlaybackState {
                    current_chapter: chapter,
                    status: PlayerStatus::Stopped,
                },
                effect,
                error: Some(PipelineError::AudioNotFound { chapter }),
            }
        }
    }
}

/// Playing → Paused; no-op otherwise.
pub fn pause(state: &PlaybackState) -> Transition {
    if state.status != PlayerStatus::Playing {
        return Transition::unchanged(state);
    }
    Transition::ok(
        PlaybackState {
            status: PlayerStatus::Paused,
            ..state.clone()
        },
        Effect::Pause,
    )
}

/// Paused → Playing; no-op otherwise.
pub fn resume(state: &PlaybackState) -> Transition {
    if state.status != PlayerStatus::Paused {
        return Transition::unchanged(state);
    }
    Transition::ok(
        PlaybackState {
            status: PlayerStatus::Playing,
            ..state.clone()
        },
        Effect::Resume,
    )
}

/// Stop and play the following chapter.
///
/// Advancing past the last chapter fails with `NoSuchChapter` and leaves
/// the state untouched.
pub fn next_chapter(state: &PlaybackState, catalog: &SegmentCatalog) -> Transition {
    let next = state.current_chapter + 1;
    if next > catalog.chapter_count() {
        return Transition {
            state: state.clone(),
            effect: Effect::None,
            error: Some(PipelineError::NoSuchChapter {
                chapter: next,
                total: catalog.chapter_count(),
            }),
        };
    }

    let stopped = PlaybackState {
        current_chapter: state.current_chapter,
        status: PlayerStatus::Stopped,
    };
    let mut transition = play(&stopped, next, catalog);
    if transition.error.is_some() && state.status != PlayerStatus::Stopped {
        transition.effect = Effect::Stop;
    }
    transition
}

/// Record the current chapter in the bookmark log. Does not change state.
pub fn add_bookmark(state: &PlaybackState, log: &BookmarkLog) -> Result<Bookmark> {
    let bookmark = Bookmark::now(state.current_chapter);
    log.append(&bookmark)?;
    log::info!("Bookmark added for Chapter {}", state.current_chapter);
    Ok(bookmark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ManifestEntry;
    use crate::audio::metadata::write_manifest_json;
    use tempfile::TempDir;

    fn catalog_with(dir: &Path, present: &[usize], count: usize) -> SegmentCatalog {
        let mut segments = BTreeMap::new();
        for index in present {
            let path = dir.join(format!("chapter_{:03}.mp3", index));
            std::fs::write(&path, b"audio").unwrap();
            segments.insert(*index, path);
        }
        SegmentCatalog::from_segments(segments, count)
    }

    fn state(chapter: usize, status: PlayerStatus) -> PlaybackState {
        PlaybackState {
            current_chapter: chapter,
            status,
        }
    }

    #[test]
    fn test_play_existing_chapter() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog_with(temp_dir.path(), &[1, 2], 2);

        let t = play(&PlaybackState::default(), 2, &catalog);
        assert!(t.error.is_none());
        assert_eq!(t.state, state(2, PlayerStatus::Playing));
        assert_eq!(t.effect, Effect::Start(temp_dir.path().join("chapter_002.mp3")));
    }

    #[test]
    fn test_play_missing_chapter_stops() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog_with(temp_dir.path(), &[1, 3], 3);

        let t = play(&state(1, PlayerStatus::Playing), 2, &catalog);
        assert!(matches!(t.error, Some(PipelineError::AudioNotFound { chapter: 2 })));
        assert_eq!(t.state.status, PlayerStatus::Stopped);
        assert_eq!(t.effect, Effect::Stop);

        let t = play(&PlaybackState::default(), 2, &catalog);
        assert_eq!(t.effect, Effect::None);
    }

    #[test]
    fn test_pause_and_resume_only_from_valid_states() {
        let playing = state(1, PlayerStatus::Playing);
        let paused = pause(&playing);
        assert_eq!(paused.state.status, PlayerStatus::Paused);
        assert_eq!(paused.effect, Effect::Pause);

        let again = pause(&paused.state);
        assert_eq!(again.state, paused.state);
        assert_eq!(again.effect, Effect::None);

        let resumed = resume(&paused.state);
        assert_eq!(resumed.state, playing);
        assert_eq!(resumed.effect, Effect::Resume);

        let stopped = PlaybackState::default();
        assert_eq!(resume(&stopped).effect, Effect::None);
        assert_eq!(pause(&stopped).state, stopped);
    }

    #[test]
    fn test_next_chapter_advances() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog_with(temp_dir.path(), &[1, 2], 2);

        let t = next_chapter(&state(1, PlayerStatus::Playing), &catalog);
        assert!(t.error.is_none());
        assert_eq!(t.state, state(2, PlayerStatus::Playing));
    }

    #[test]
    fn test_next_chapter_into_missing_segment() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog_with(temp_dir.path(), &[1, 3], 3);

        let t = next_chapter(&state(1, PlayerStatus::Paused), &catalog);
        assert!(matches!(t.error, Some(PipelineError::AudioNotFound { chapter: 2 })));
        assert_eq!(t.state, state(2, PlayerStatus::Stopped));
        assert_eq!(t.effect, Effect::Stop);

        // From the gap, advancing again reaches chapter 3
        let t = next_chapter(&t.state, &catalog);
        assert_eq!(t.state, state(3, PlayerStatus::Playing));
    }

    #[test]
    fn test_next_chapter_past_end() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog_with(temp_dir.path(), &[1, 2], 2);
        let current = state(2, PlayerStatus::Playing);

        let t = next_chapter(&current, &catalog);
        assert!(matches!(
            t.error,
            Some(PipelineError::NoSuchChapter { chapter: 3, total: 2 })
        ));
        assert_eq!(t.state, current);
        assert_eq!(t.effect, Effect::None);
    }

    #[test]
    fn test_add_bookmark_keeps_state() {
        let temp_dir = TempDir::new().unwrap();
        let log = BookmarkLog::new(temp_dir.path().join("bookmarks.jsonl"));
        let current = state(3, PlayerStatus::Paused);

        let bookmark = add_bookmark(&current, &log).unwrap();
        assert_eq!(bookmark.chapter_index, 3);
        assert_eq!(log.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_catalog_open_reads_dir_and_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let audio_dir = temp_dir.path().join("audio_files");
        std::fs::create_dir_all(&audio_dir).unwrap();
        std::fs::write(audio_dir.join("chapter_001.mp3"), b"a").unwrap();
        std::fs::write(audio_dir.join("chapter_003.mp3"), b"c").unwrap();
        std::fs::write(audio_dir.join("notes.txt"), b"x").unwrap();

        let manifest = temp_dir.path().join("manifest.json");
        write_manifest_json(
            &[
                ManifestEntry::new(1, "One", 0, 10),
                ManifestEntry::new(3, "Three", 10, 20),
                ManifestEntry::new(5, "Five", 20, 30),
            ],
            &manifest,
        )
        .unwrap();

        let catalog = SegmentCatalog::open(&audio_dir, &manifest).unwrap();
        assert_eq!(catalog.chapter_count(), 5);
        assert!(catalog.segment(1).is_some());
        assert!(catalog.segment(2).is_none());
        assert!(catalog.segment(3).is_some());
    }

    #[test]
    fn test_catalog_open_without_manifest() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("chapter_002.wav"), b"b").unwrap();
        let catalog =
            SegmentCatalog::open(temp_dir.path(), &temp_dir.path().join("manifest.json")).unwrap();
        assert_eq!(catalog.chapter_count(), 2);
    }
}
