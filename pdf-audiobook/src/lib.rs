//! pdf-audiobook - Turn paginated PDF books into chaptered audiobooks
//!
//! The conversion runs as an ordered series of stages:
//! chapter boundaries are resolved from the document ([`chapters`]), the text
//! of each chapter is extracted and saved ([`text`]), every chapter is spoken
//! by a text-to-speech engine ([`synthesis`], [`tts`]) and the segments are
//! joined into one file with chapter markers ([`audio`]). [`pipeline`] drives
//! the stages; [`playback`] plays the result back chapter by chapter.
//!
//! External programs (poppler, espeak, ffmpeg) sit behind traits so every
//! stage can be exercised without them.

pub mod audio;
pub mod chapters;
pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod synthesis;
pub mod text;
pub mod tools;
pub mod tts;

#[cfg(test)]
mod testing;

pub use error::{PipelineError, Result};
