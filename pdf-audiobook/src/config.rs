//! pdf-audio configuration management.

use crate::tools::ToolPaths;
use crate::tts::SynthesisOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// Defaults match a typical book: a few pages of contents, then the body
const DEFAULT_TOC_START_PAGE: usize = 1;
const DEFAULT_TOC_END_PAGE: usize = 5;
const DEFAULT_CONTENT_START_PAGE: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfAudioConfig {
    /// Default eSpeak voice code
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speech rate in words per minute
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Volume level (0-200)
    #[serde(default = "default_volume")]
    pub volume: u32,

    /// Folder that receives text, audio and the final audiobook
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,

    /// First page (1-based) of the printed table of contents
    #[serde(default = "default_toc_start_page")]
    pub toc_start_page: usize,

    /// Last page (1-based) of the printed table of contents
    #[serde(default = "default_toc_end_page")]
    pub toc_end_page: usize,

    /// First page (1-based) of the body text
    #[serde(default = "default_content_start_page")]
    pub content_start_page: usize,

    /// Overrides for external tool locations
    #[serde(default)]
    pub tools: ToolPaths,
}

fn default_voice() -> String {
    "en".to_string()
}

fn default_rate() -> u32 {
    170
}

fn default_volume() -> u32 {
    100
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

fn default_toc_start_page() -> usize {
    DEFAULT_TOC_START_PAGE
}

fn default_toc_end_page() -> usize {
    DEFAULT_TOC_END_PAGE
}

fn default_content_start_page() -> usize {
    DEFAULT_CONTENT_START_PAGE
}

impl Default for PdfAudioConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            rate: default_rate(),
            volume: default_volume(),
            output_folder: default_output_folder(),
            toc_start_page: default_toc_start_page(),
            toc_end_page: default_toc_end_page(),
            content_start_page: default_content_start_page(),
            tools: ToolPaths::default(),
        }
    }
}

impl PdfAudioConfig {
    /// Get the config file path: ~/.config/cli-programs/pdf-audio.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("cli-programs")
            .join("pdf-audio.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: PdfAudioConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Voice settings for the speech engine, clamped to its accepted ranges.
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions::new()
            .with_voice(self.voice.as_str())
            .with_rate(self.rate)
            .with_volume(self.volume)
    }
}
