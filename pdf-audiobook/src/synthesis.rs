//! Per-chapter speech synthesis as an ordered batch.
//!
//! Each chapter is synthesized independently. A failing chapter has its
//! partial artifact removed and is recorded as a failure; the batch always
//! runs to the end. Whether an empty result is fatal is the caller's call
//! (see [`SynthesisBatch::require_segments`]).

use crate::audio::AudioSegment;
use crate::error::{PipelineError, Result};
use crate::text::PersistedUnit;
use crate::tts::{SpeechSynthesizer, SynthesisOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A chapter whose synthesis failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisFailure {
    pub index: usize,
    pub title: String,
    pub error: String,
}

/// Progress after one chapter.
#[derive(Debug, Clone)]
pub struct SynthesisProgress {
    /// Chapters processed so far
    pub completed: usize,
    /// Chapters in the batch
    pub total: usize,
    /// Index of the chapter just processed
    pub index: usize,
    /// Title of the chapter just processed
    pub title: String,
    /// Whether it succeeded
    pub ok: bool,
}

/// Outcome of a synthesis batch, both halves in ascending chapter order.
#[derive(Debug, Default)]
pub struct SynthesisBatch {
    pub segments: Vec<AudioSegment>,
    pub failures: Vec<SynthesisFailure>,
}

impl SynthesisBatch {
    /// The produced segments, or `NoAudioProduced` if there are none.
    pub fn require_segments(&self) -> Result<&[AudioSegment]> {
        if self.segments.is_empty() {
            return Err(PipelineError::NoAudioProduced);
        }
        Ok(&self.segments)
    }
}

/// Audio artifact path for a chapter.
pub fn segment_path(audio_dir: &Path, index: usize, extension: &str) -> PathBuf {
    audio_dir.join(format!("chapter_{:03}.{}", index, extension))
}

/// Synthesize every unit in ascending index order.
pub fn synthesize_chapters<F>(
    units: &[PersistedUnit],
    synthesizer: &dyn SpeechSynthesizer,
    options: &SynthesisOptions,
    audio_dir: &Path,
    mut on_progress: F,
) -> SynthesisBatch
where
    F: FnMut(SynthesisProgress),
{
    let mut ordered: Vec<&PersistedUnit> = units.iter().collect();
    ordered.sort_by_key(|p| p.unit.index);

    log::info!(
        "Converting {} chapters to audio using {}...",
        ordered.len(),
        synthesizer.name()
    );

    let total = ordered.len();
    let batch = ordered
        .into_iter()
        .enumerate()
        .fold(SynthesisBatch::default(), |mut batch, (i, persisted)| {
            let unit = &persisted.unit;
            let path = segment_path(audio_dir, unit.index, synthesizer.extension());

            let ok = match synthesizer.synthesize(&unit.text, &path, options) {
                Ok(()) if path.exists() => {
                    log::info!("Audio saved: {}", path.display());
                    batch
                        .segments
                        .push(AudioSegment::new(unit.index, unit.title.clone(), path));
                    true
                }
                Ok(()) => {
                    record_failure(&mut batch, unit.index, &unit.title, &path, "no audio written");
                    false
                }
                Err(e) => {
                    record_failure(&mut batch, unit.index, &unit.title, &path, &e.to_string());
                    false
                }
            };

            on_progress(SynthesisProgress {
                completed: i + 1,
                total,
                index: unit.index,
                title: unit.title.clone(),
                ok,
            });
            batch
        });

    log::info!(
        "Synthesis finished: {} succeeded, {} failed",
        batch.segments.len(),
        batch.failures.len()
    );
    batch
}

fn record_failure(batch: &mut SynthesisBatch, index: usize, title: &str, path: &Path, error: &str) {
    log::error!(
        "Error converting chapter {} '{}' to speech: {}",
        index,
        title,
        error
    );
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Could not remove partial audio {}: {}", path.display(), e);
        }
    }
    batch.failures.push(SynthesisFailure {
        index,
        title: title.to_string(),
        error: error.to_string(),
    });
}
