//! Test doubles for the external collaborators.

use crate::audio::AudioToolkit;
use crate::document::{PageSource, TocEntry};
use crate::error::{PipelineError, Result};
use crate::playback::AudioSink;
use crate::text::{ChapterTextUnit, PersistedUnit};
use crate::tts::{SpeechSynthesizer, SynthesisOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Document held in memory.
pub struct MemoryDocument {
    pages: Vec<String>,
    toc: Vec<TocEntry>,
    unreadable: HashSet<usize>,
}

impl MemoryDocument {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            toc: Vec::new(),
            unreadable: HashSet::new(),
        }
    }

    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        self.toc = toc;
        self
    }

    pub fn with_unreadable_page(mut self, page: usize) -> Self {
        self.unreadable.insert(page);
        self
    }
}

impl PageSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String> {
        if self.unreadable.contains(&page) {
            return Err(PipelineError::PageText {
                page,
                message: "damaged page".to_string(),
            });
        }
        self.pages.get(page).cloned().ok_or(PipelineError::PageText {
            page,
            message: "out of range".to_string(),
        })
    }

    fn table_of_contents(&self) -> Result<Vec<TocEntry>> {
        Ok(self.toc.clone())
    }
}

/// Units with text "<title> text", written under `dir`.
pub fn persisted_units(dir: &Path, titles: &[&str]) -> Vec<PersistedUnit> {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let unit = ChapterTextUnit::new(i + 1, *title, format!("{} text", title));
            let path = dir.join(unit.file_name());
            std::fs::write(&path, &unit.text).unwrap();
            PersistedUnit { unit, path }
        })
        .collect()
}

/// Synthesizer that writes the text itself as the "audio".
///
/// Fails for texts starting with any configured prefix.
pub struct ScriptedSynthesizer {
    fail_prefixes: Vec<String>,
    partial_output: bool,
    calls: AtomicUsize,
    spoken: Mutex<Vec<String>>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self {
            fail_prefixes: Vec::new(),
            partial_output: false,
            calls: AtomicUsize::new(0),
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_prefixes.push(prefix.to_string());
        self
    }

    /// Write a truncated file before failing.
    pub fn leaving_partial_output(mut self) -> Self {
        self.partial_output = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Default for ScriptedSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for ScriptedSynthesizer {
    fn synthesize(&self, text: &str, output_path: &Path, _options: &SynthesisOptions) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.spoken.lock().unwrap().push(text.to_string());

        if self.fail_prefixes.iter().any(|p| text.starts_with(p.as_str())) {
            if self.partial_output {
                std::fs::write(output_path, b"partial")?;
            }
            return Err(PipelineError::Synthesis(format!("cannot speak '{}'", text)));
        }

        std::fs::write(output_path, text)?;
        Ok(())
    }

    fn extension(&self) -> &str {
        "mp3"
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Toolkit where one byte of audio lasts one second.
pub struct FakeToolkit {
    unreadable: HashSet<PathBuf>,
    concat_error: Option<String>,
    attach_error: Option<String>,
    concatenated: Mutex<Vec<PathBuf>>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self {
            unreadable: HashSet::new(),
            concat_error: None,
            attach_error: None,
            concatenated: Mutex::new(Vec::new()),
        }
    }

    pub fn unreadable(mut self, path: &Path) -> Self {
        self.unreadable.insert(path.to_path_buf());
        self
    }

    pub fn failing_concat(mut self, message: &str) -> Self {
        self.concat_error = Some(message.to_string());
        self
    }

    pub fn failing_attach(mut self, message: &str) -> Self {
        self.attach_error = Some(message.to_string());
        self
    }

    /// File stems passed to the last `concatenate` call, in order.
    pub fn concatenated_stems(&self) -> Vec<String> {
        self.concatenated
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().to_string())
            .collect()
    }
}

impl Default for FakeToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioToolkit for FakeToolkit {
    fn duration_ms(&self, audio_path: &Path) -> Result<u64> {
        if self.unreadable.contains(audio_path) {
            return Err(PipelineError::UnreadableAudio {
                path: audio_path.to_path_buf(),
                message: "invalid header".to_string(),
            });
        }
        let bytes = std::fs::metadata(audio_path)?.len();
        Ok(bytes * 1000)
    }

    fn concatenate(&self, audio_files: &[&Path], output_path: &Path) -> Result<()> {
        if let Some(message) = &self.concat_error {
            return Err(PipelineError::Concat(message.clone()));
        }
        let mut joined = Vec::new();
        for path in audio_files {
            joined.extend(std::fs::read(path)?);
        }
        std::fs::write(output_path, joined)?;
        *self.concatenated.lock().unwrap() = audio_files.iter().map(|p| p.to_path_buf()).collect();
        Ok(())
    }

    fn attach_chapters(&self, audio_path: &Path, metadata_path: &Path, output_path: &Path) -> Result<()> {
        if let Some(message) = &self.attach_error {
            return Err(PipelineError::Multiplex(message.clone()));
        }
        if !metadata_path.exists() {
            return Err(PipelineError::Multiplex("metadata file missing".to_string()));
        }
        std::fs::copy(audio_path, output_path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Start(PathBuf),
    Pause,
    Resume,
    Stop,
}

/// Sink that records the calls it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    pub fail_next_start: bool,
    pub finished: bool,
}

impl AudioSink for RecordingSink {
    fn start(&mut self, path: &Path) -> Result<()> {
        if std::mem::take(&mut self.fail_next_start) {
            return Err(PipelineError::Io(std::io::Error::other("no audio device")));
        }
        self.calls.push(SinkCall::Start(path.to_path_buf()));
        self.finished = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.calls.push(SinkCall::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.calls.push(SinkCall::Resume);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.calls.push(SinkCall::Stop);
        Ok(())
    }

    fn is_finished(&mut self) -> bool {
        self.finished
    }
}
