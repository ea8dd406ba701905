//! eSpeak backend: renders WAV with espeak, then encodes MP3 with ffmpeg.

use super::{SpeechSynthesizer, SynthesisOptions};
use crate::error::{PipelineError, Result};
use crate::tools::ToolPaths;
use std::path::Path;
use tempfile::TempDir;

pub struct EspeakSynthesizer {
    tools: ToolPaths,
}

impl EspeakSynthesizer {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            tools: tools.clone(),
        }
    }

    /// Check that both espeak and ffmpeg can be run.
    pub fn is_available(&self) -> bool {
        ToolPaths::is_available(self.tools.espeak(), "--version")
            && ToolPaths::is_available(self.tools.ffmpeg(), "-version")
    }

    fn render_wav(&self, text_file: &Path, wav_file: &Path, options: &SynthesisOptions) -> Result<()> {
        let output = self
            .tools
            .espeak()
            .args(["-v", &options.voice])
            .args(["-s", &options.rate.to_string()])
            .args(["-a", &options.volume.to_string()])
            .arg("-f")
            .arg(text_file)
            .arg("-w")
            .arg(wav_file)
            .output()
            .map_err(|e| PipelineError::Synthesis(format!("failed to run espeak: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Synthesis(format!("espeak failed: {}", stderr.trim())));
        }
        Ok(())
    }

    fn encode_mp3(&self, wav_file: &Path, output_path: &Path) -> Result<()> {
        let output = self
            .tools
            .ffmpeg()
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(wav_file)
            .args(["-codec:a", "libmp3lame", "-q:a", "4"])
            .arg(output_path)
            .output()
            .map_err(|e| PipelineError::Synthesis(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Synthesis(format!(
                "MP3 encoding failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn synthesize(&self, text: &str, output_path: &Path, options: &SynthesisOptions) -> Result<()> {
        // espeak reads long input more reliably from a file than from argv
        let work_dir = TempDir::new()?;
        let text_file = work_dir.path().join("input.txt");
        let wav_file = work_dir.path().join("speech.wav");
        std::fs::write(&text_file, text)?;

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.render_wav(&text_file, &wav_file, options)?;
        self.encode_mp3(&wav_file, output_path)?;
        Ok(())
    }

    fn extension(&self) -> &str {
        "mp3"
    }

    fn name(&self) -> &str {
        "espeak"
    }
}
