//! Applies playback transitions to an audio output.

use super::{
    BookmarkLog, Bookmark, Effect, PlaybackState, PlayerStatus, SegmentCatalog, Transition,
};
use crate::error::Result;
use crate::tools::ToolPaths;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

/// Audio output device.
pub trait AudioSink {
    /// Stop anything playing and start `path` from the beginning.
    fn start(&mut self, path: &Path) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;

    /// True once the current file has played to its end.
    fn is_finished(&mut self) -> bool {
        false
    }
}

/// Caller-owned playback session: state, segments, bookmarks and a sink.
pub struct Player<S: AudioSink> {
    sink: S,
    state: PlaybackState,
    catalog: SegmentCatalog,
    bookmarks: BookmarkLog,
}

impl<S: AudioSink> Player<S> {
    pub fn new(sink: S, catalog: SegmentCatalog, bookmarks: BookmarkLog) -> Self {
        Self {
            sink,
            state: PlaybackState::default(),
            catalog,
            bookmarks,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn play(&mut self, chapter: usize) -> Result<()> {
        let transition = super::play(&self.state, chapter, &self.catalog);
        self.apply(transition)
    }

    /// Notice a chapter that played to its end.
    pub fn poll(&mut self) {
        if self.state.status == PlayerStatus::Playing && self.sink.is_finished() {
            log::debug!("Chapter {} finished", self.state.current_chapter);
            self.state.status = PlayerStatus::Stopped;
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        self.poll();
        let transition = super::pause(&self.state);
        self.apply(transition)
    }

    pub fn resume(&mut self) -> Result<()> {
        let transition = super::resume(&self.state);
        self.apply(transition)
    }

    pub fn next_chapter(&mut self) -> Result<()> {
        let transition = super::next_chapter(&self.state, &self.catalog);
        self.apply(transition)
    }

    pub fn add_bookmark(&mut self) -> Result<Bookmark> {
        super::add_bookmark(&self.state, &self.bookmarks)
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.state.status != PlayerStatus::Stopped {
            self.sink.stop()?;
            self.state.status = PlayerStatus::Stopped;
        }
        Ok(())
    }

    fn apply(&mut self, transition: Transition) -> Result<()> {
        let Transition {
            state,
            effect,
            error,
        } = transition;

        let outcome = match &effect {
            Effect::None => Ok(()),
            Effect::Start(path) => self.sink.start(path),
            Effect::Pause => self.sink.pause(),
            Effect::Resume => self.sink.resume(),
            Effect::Stop => self.sink.stop(),
        };

        match outcome {
            Ok(()) => self.state = state,
            Err(e) => {
                // The sink could not follow; nothing is audible any more
                let _ = self.sink.stop();
                self.state = PlaybackState {
                    current_chapter: state.current_chapter,
                    status: PlayerStatus::Stopped,
                };
                return Err(e);
            }
        }

        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Plays through `ffplay` without a window.
///
/// ffplay cannot be paused from outside, so pausing ends the process and
/// remembers the position; resuming starts a new process seeking to it.
pub struct FfplaySink {
    tools: ToolPaths,
    child: Option<Child>,
    current: Option<PathBuf>,
    offset: Duration,
    started_at: Option<Instant>,
}

impl FfplaySink {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            tools: tools.clone(),
            child: None,
            current: None,
            offset: Duration::ZERO,
            started_at: None,
        }
    }

    /// Position within the current chapter.
    pub fn position(&self) -> Duration {
        self.offset + self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn spawn(&mut self, path: &Path, from: Duration) -> Result<()> {
        let child = self
            .tools
            .ffplay()
            .args(["-nodisp", "-autoexit", "-loglevel", "quiet"])
            .args(["-ss", &format!("{:.3}", from.as_secs_f64())])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("ffplay already exited: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl AudioSink for FfplaySink {
    fn is_finished(&mut self) -> bool {
        let exited = match self.child.as_mut().map(|child| child.try_wait()) {
            Some(Ok(Some(_))) => true,
            Some(Ok(None)) | None => false,
            Some(Err(e)) => {
                log::debug!("Could not poll ffplay: {}", e);
                false
            }
        };
        if exited {
            self.child = None;
            self.current = None;
            self.offset = Duration::ZERO;
            self.started_at = None;
        }
        exited
    }

    fn start(&mut self, path: &Path) -> Result<()> {
        self.kill_child();
        self.current = Some(path.to_path_buf());
        self.offset = Duration::ZERO;
        self.spawn(path, Duration::ZERO)
    }

    fn pause(&mut self) -> Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        self.offset = self.position();
        self.started_at = None;
        self.kill_child();
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        match self.current.clone() {
            Some(path) => self.spawn(&path, self.offset),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.kill_child();
        self.current = None;
        self.offset = Duration::ZERO;
        self.started_at = None;
        Ok(())
    }
}

impl Drop for FfplaySink {
    fn drop(&mut self) {
        self.kill_child();
    }
}
