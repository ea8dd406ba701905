use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to open document {}: {message}", path.display())]
    DocumentOpen { path: PathBuf, message: String },

    #[error("Failed to read text of page {page}: {message}")]
    PageText { page: usize, message: String },

    #[error("Document has no table of contents")]
    NoTableOfContents,

    #[error("No chapters were identified. Adjust the TOC page range or content start page.")]
    NoChaptersIdentified,

    #[error("No chapter text could be saved")]
    NoChaptersSaved,

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("No audio files were generated")]
    NoAudioProduced,

    #[error("Unreadable audio file {}: {message}", path.display())]
    UnreadableAudio { path: PathBuf, message: String },

    #[error("No valid audio files found for chapter metadata")]
    NoValidAudioFiles,

    #[error("Audio concatenation failed: {0}")]
    Concat(String),

    #[error("Applying chapter metadata failed: {0}")]
    Multiplex(String),

    #[error("Audio file not found for chapter {chapter}. Convert a document first.")]
    AudioNotFound { chapter: usize },

    #[error("No chapter {chapter}: the audiobook has {total} chapter(s)")]
    NoSuchChapter { chapter: usize, total: usize },

    #[error("Output folder {} is in use by another run (remove {} if stale)", root.display(), lock.display())]
    OutputLocked { root: PathBuf, lock: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Pipeline stage the error belongs to, for user-facing reports.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::DocumentOpen { .. } | PipelineError::PageText { .. } => "document",
            PipelineError::NoTableOfContents | PipelineError::NoChaptersIdentified => {
                "chapter resolution"
            }
            PipelineError::NoChaptersSaved => "text extraction",
            PipelineError::Synthesis(_) | PipelineError::NoAudioProduced => "speech synthesis",
            PipelineError::UnreadableAudio { .. }
            | PipelineError::NoValidAudioFiles
            | PipelineError::Concat(_)
            | PipelineError::Multiplex(_) => "audio assembly",
            PipelineError::AudioNotFound { .. } | PipelineError::NoSuchChapter { .. } => {
                "playback"
            }
            PipelineError::OutputLocked { .. } | PipelineError::Io(_) | PipelineError::Json(_) => {
                "output"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
