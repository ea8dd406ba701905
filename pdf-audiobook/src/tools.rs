//! External command-line tools used by the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;

/// Optional overrides for the external tools; unset entries resolve via `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
    #[serde(default)]
    pub ffprobe: Option<PathBuf>,
    #[serde(default)]
    pub ffplay: Option<PathBuf>,
    #[serde(default)]
    pub espeak: Option<PathBuf>,
    /// Directory holding the poppler utilities (pdfinfo, pdftotext, pdftohtml)
    #[serde(default)]
    pub poppler_dir: Option<PathBuf>,
}

impl ToolPaths {
    pub fn ffmpeg(&self) -> Command {
        command_for(self.ffmpeg.as_ref(), "ffmpeg")
    }

    pub fn ffprobe(&self) -> Command {
        command_for(self.ffprobe.as_ref(), "ffprobe")
    }

    pub fn ffplay(&self) -> Command {
        command_for(self.ffplay.as_ref(), "ffplay")
    }

    pub fn espeak(&self) -> Command {
        command_for(self.espeak.as_ref(), "espeak")
    }

    /// A poppler utility, e.g. `pdftotext`.
    pub fn poppler(&self, tool: &str) -> Command {
        let configured = self.poppler_dir.as_ref().map(|dir| dir.join(tool));
        command_for(configured.as_ref(), tool)
    }

    /// Check that a tool runs at all (`-v`/`-version` style check).
    pub fn is_available(mut command: Command, version_arg: &str) -> bool {
        command
            .arg(version_arg)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Prefer the configured executable, falling back to the system one.
fn command_for(configured: Option<&PathBuf>, fallback: &str) -> Command {
    if let Some(path) = configured {
        if path.exists() {
            return Command::new(path);
        }
        log::warn!(
            "Configured {} not found at {}, using {} from PATH",
            fallback,
            path.display(),
            fallback
        );
    }
    Command::new(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_path_lookup() {
        let tools = ToolPaths::default();
        assert_eq!(tools.ffmpeg().get_program(), "ffmpeg");
        assert_eq!(tools.poppler("pdftotext").get_program(), "pdftotext");
    }

    #[test]
    fn test_configured_tool_is_preferred_when_present() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let fake = temp_dir.path().join("espeak-ng");
        std::fs::write(&fake, b"").unwrap();

        let tools = ToolPaths {
            espeak: Some(fake.clone()),
            ..Default::default()
        };
        assert_eq!(tools.espeak().get_program(), fake.as_os_str());
    }

    #[test]
    fn test_missing_configured_tool_falls_back() {
        let tools = ToolPaths {
            ffprobe: Some(PathBuf::from("/nonexistent/ffprobe")),
            ..Default::default()
        };
        assert_eq!(tools.ffprobe().get_program(), "ffprobe");
    }

    #[test]
    fn test_poppler_dir_joins_tool_name() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("pdfinfo"), b"").unwrap();
        let tools = ToolPaths {
            poppler_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(
            tools.poppler("pdfinfo").get_program(),
            temp_dir.path().join("pdfinfo").as_os_str()
        );
    }
}
