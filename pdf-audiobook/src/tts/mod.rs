//! Speech synthesis backend trait and options.

pub mod espeak;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use espeak::EspeakSynthesizer;

const DEFAULT_VOICE: &str = "en";
const DEFAULT_RATE: u32 = 170;
const DEFAULT_VOLUME: u32 = 100;

/// Voice configuration passed to every synthesis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Voice code (e.g. "en", "en-us", "de")
    pub voice: String,
    /// Speaking rate in words per minute (80-450)
    pub rate: u32,
    /// Amplitude (0-200)
    pub volume: u32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl SynthesisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate.clamp(80, 450);
        self
    }

    pub fn with_volume(mut self, volume: u32) -> Self {
        self.volume = volume.min(200);
        self
    }
}

/// Text-to-speech engine. Writes one audio artifact per call.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, output_path: &Path, options: &SynthesisOptions) -> Result<()>;

    /// File extension of the artifacts this engine writes.
    fn extension(&self) -> &str;

    /// Engine name for display.
    fn name(&self) -> &str;
}
