//! End-to-end conversion: document → chapters → text → speech → audiobook.
//!
//! A run owns its output folder for its whole duration through [`OutputLock`].
//! Everything an earlier run produced, apart from bookmarks, is cleared up
//! front so a failed re-run never leaves one run's manifest beside another
//! run's audiobook.

use crate::audio::{AssemblyTargets, AudioToolkit, Audiobook, assemble_audiobook};
use crate::chapters::{ChapterStrategy, MatchMode, Resolution, ScanRange, resolve};
use crate::document::PageSource;
use crate::error::{PipelineError, Result};
use crate::synthesis::{SynthesisFailure, SynthesisProgress, synthesize_chapters};
use crate::text::{extract_units, persist_units};
use crate::tts::{SpeechSynthesizer, SynthesisOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = ".pdf-audio.lock";
const AUDIOBOOK_STEM: &str = "audiobook_with_chapters";
const HASH_PREFIX_BYTES: usize = 1024 * 1024;

/// File locations under one output folder.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join("text_files")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio_files")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join("chapters.txt")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn audiobook_path(&self, extension: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", AUDIOBOOK_STEM, extension))
    }

    pub fn run_record_path(&self) -> PathBuf {
        self.root.join("run.json")
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        self.root.join("bookmarks.jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Create empty per-run directories and remove the previous run's
    /// audiobook, metadata, manifest and run record. Bookmarks are kept.
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.text_dir(), self.audio_dir()] {
            if dir.exists() {
                log::debug!("Clearing {}", dir.display());
                fs::remove_dir_all(&dir)?;
            }
            fs::create_dir_all(&dir)?;
        }

        let mut stale = vec![
            self.metadata_path(),
            self.manifest_path(),
            self.run_record_path(),
        ];
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_audiobook = path.is_file()
                && path.file_stem().is_some_and(|stem| stem == AUDIOBOOK_STEM);
            if is_audiobook {
                stale.push(path);
            }
        }

        for path in stale.into_iter().filter(|p| p.exists()) {
            log::debug!("Removing {}", path.display());
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Exclusive claim on an output folder, released on drop.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    pub fn acquire(layout: &OutputLayout) -> Result<Self> {
        fs::create_dir_all(layout.root())?;
        let path = layout.lock_path();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(PipelineError::OutputLocked {
                    root: layout.root().to_path_buf(),
                    lock: path,
                });
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        log::debug!("Acquired output lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

/// Summary of a finished run, saved as `run.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub document: PathBuf,
    pub document_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// How chapters were found ("embedded-index", "heuristic-scan", "fixed-pages")
    pub method: String,
    /// Chapters identified in the document
    pub chapters: usize,
    /// Chapters with audio
    pub synthesized: usize,
    pub failed: Vec<SynthesisFailure>,
    pub audiobook: Audiobook,
}

impl RunRecord {
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Short SHA256 of the first megabyte of the document.
pub fn compute_document_hash(document_path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(document_path)?);

    let mut buffer = Vec::with_capacity(HASH_PREFIX_BYTES);
    reader
        .by_ref()
        .take(HASH_PREFIX_BYTES as u64)
        .read_to_end(&mut buffer)?;

    let digest = Sha256::digest(&buffer);
    Ok(format!("{:x}", digest)[..16].to_string())
}

/// Knobs for one conversion run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub strategy: ChapterStrategy,
    pub scan_range: ScanRange,
    pub match_mode: MatchMode,
    pub synthesis: SynthesisOptions,
    /// Title written into the audiobook metadata
    pub title: String,
}

/// Receives progress from a running pipeline. All methods default to no-ops.
pub trait PipelineObserver {
    fn page_scanned(&mut self, _scanned: usize, _total: usize) {}

    fn chapters_resolved(&mut self, _resolution: &Resolution) {}

    fn chapter_synthesized(&mut self, _progress: &SynthesisProgress) {}
}

/// Observer that ignores everything.
pub struct Quiet;

impl PipelineObserver for Quiet {}

/// Run every stage against `layout`, holding its lock throughout.
pub fn run_pipeline(
    source: &dyn PageSource,
    document_path: &Path,
    layout: &OutputLayout,
    options: &PipelineOptions,
    synthesizer: &dyn SpeechSynthesizer,
    toolkit: &dyn AudioToolkit,
    observer: &mut dyn PipelineObserver,
) -> Result<RunRecord> {
    let _lock = OutputLock::acquire(layout)?;
    let started_at = Utc::now();
    let document_hash = compute_document_hash(document_path)?;
    layout.prepare()?;

    log::info!(
        "Converting '{}' ({} pages) into {}",
        document_path.display(),
        source.page_count(),
        layout.root().display()
    );

    let matcher = options.match_mode.matcher();
    let resolution = resolve(
        source,
        options.strategy,
        &options.scan_range,
        matcher.as_ref(),
        |scanned, total| observer.page_scanned(scanned, total),
    )?;
    observer.chapters_resolved(&resolution);

    let units = extract_units(source, &resolution.boundaries);
    let persisted = persist_units(units, &layout.text_dir())?;

    let batch = synthesize_chapters(
        &persisted,
        synthesizer,
        &options.synthesis,
        &layout.audio_dir(),
        |progress| observer.chapter_synthesized(&progress),
    );
    let segments = batch.require_segments()?;

    let targets = AssemblyTargets {
        metadata_path: layout.metadata_path(),
        manifest_path: layout.manifest_path(),
        output_path: layout.audiobook_path(synthesizer.extension()),
    };
    let audiobook = assemble_audiobook(segments, toolkit, &options.title, &targets)?;

    let record = RunRecord {
        document: document_path.to_path_buf(),
        document_hash,
        started_at,
        finished_at: Utc::now(),
        method: resolution.method.to_string(),
        chapters: resolution.boundaries.len(),
        synthesized: segments.len(),
        failed: batch.failures.clone(),
        audiobook,
    };
    record.save(&layout.run_record_path())?;

    Ok(record)
}
