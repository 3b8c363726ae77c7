//! Fake collaborators shared by unit tests

use crate::audio::{AudioLauncher, AudioProcess};
use crate::bandwidth::{IoCounters, IoSnapshot};
use crate::display::{DisplaySink, DisplayStats, SharedDisplay};
use crate::error::{AbrSimError, Result};
use crate::frame::VideoFrame;
use crate::source::{FrameSource, MediaOpener, SyntheticSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters that replay a script, then either repeat the last value or grow
pub struct ScriptedCounters {
    state: Mutex<ScriptState>,
}

struct ScriptState {
    script: VecDeque<IoSnapshot>,
    last: IoSnapshot,
    step: u64,
}

impl ScriptedCounters {
    pub fn new(script: Vec<IoSnapshot>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                script: script.into(),
                last: IoSnapshot::default(),
                step: 0,
            }),
        }
    }

    /// Each read adds `step` bytes in both directions
    pub fn repeating_growth(step: u64) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                script: VecDeque::new(),
                last: IoSnapshot::default(),
                step,
            }),
        }
    }
}

impl IoCounters for ScriptedCounters {
    fn read(&self) -> Result<IoSnapshot> {
        let mut state = self.state.lock();
        if let Some(next) = state.script.pop_front() {
            state.last = next;
        } else if state.step > 0 {
            state.last = IoSnapshot::new(
                state.last.bytes_sent + state.step,
                state.last.bytes_recv + state.step,
            );
        }
        Ok(state.last)
    }
}

pub struct FailingCounters;

impl IoCounters for FailingCounters {
    fn read(&self) -> Result<IoSnapshot> {
        Err(AbrSimError::host_metric("counters withheld by test"))
    }
}

/// What the recording audio launcher saw
#[derive(Default)]
pub struct AudioLog {
    launches: AtomicUsize,
    terminations: AtomicUsize,
    running: AtomicUsize,
    last_source: Mutex<Option<PathBuf>>,
}

impl AudioLog {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Players launched and not yet terminated
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_source(&self) -> Option<PathBuf> {
        self.last_source.lock().clone()
    }
}

pub struct RecordingAudioLauncher {
    log: Arc<AudioLog>,
    fail: bool,
}

impl RecordingAudioLauncher {
    pub fn new() -> Self {
        Self {
            log: Arc::new(AudioLog::default()),
            fail: false,
        }
    }

    /// Every launch fails as if the player binary were missing
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn log(&self) -> Arc<AudioLog> {
        Arc::clone(&self.log)
    }
}

impl AudioLauncher for RecordingAudioLauncher {
    fn launch(&self, source: &Path) -> Result<Box<dyn AudioProcess>> {
        if self.fail {
            return Err(AbrSimError::ExternalProcess {
                program: "fake-player".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            });
        }

        self.log.launches.fetch_add(1, Ordering::SeqCst);
        self.log.running.fetch_add(1, Ordering::SeqCst);
        *self.log.last_source.lock() = Some(source.to_path_buf());
        Ok(Box::new(RecordingAudioProcess {
            log: Arc::clone(&self.log),
            terminated: false,
        }))
    }

    fn name(&self) -> &str {
        "fake-player"
    }
}

struct RecordingAudioProcess {
    log: Arc<AudioLog>,
    terminated: bool,
}

impl AudioProcess for RecordingAudioProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn is_running(&mut self) -> bool {
        !self.terminated
    }

    fn terminate(&mut self) -> Result<()> {
        if !self.terminated {
            self.terminated = true;
            self.log.terminations.fetch_add(1, Ordering::SeqCst);
            self.log.running.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// What the recording display saw
#[derive(Default)]
pub struct DisplayLog {
    shown: Mutex<Vec<u64>>,
    shown_while_closed: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    open: AtomicBool,
}

impl DisplayLog {
    pub fn shown(&self) -> Vec<u64> {
        self.shown.lock().clone()
    }

    pub fn shown_count(&self) -> usize {
        self.shown.lock().len()
    }

    pub fn shown_while_closed(&self) -> usize {
        self.shown_while_closed.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Display sink that records frames and can raise quit after a number of them
pub struct RecordingDisplay {
    log: Arc<DisplayLog>,
    quit_after: Option<usize>,
    stats: DisplayStats,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self {
            log: Arc::new(DisplayLog::default()),
            quit_after: None,
            stats: DisplayStats::default(),
        }
    }

    pub fn quit_after(mut self, frames: usize) -> Self {
        self.quit_after = Some(frames);
        self
    }

    pub fn log(&self) -> Arc<DisplayLog> {
        Arc::clone(&self.log)
    }

    pub fn shared(self) -> SharedDisplay {
        let sink: Box<dyn DisplaySink> = Box::new(self);
        Arc::new(Mutex::new(sink))
    }
}

impl DisplaySink for RecordingDisplay {
    fn open(&mut self) -> Result<()> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        self.log.open.store(true, Ordering::SeqCst);
        self.stats.reset();
        Ok(())
    }

    fn show(&mut self, frame: &VideoFrame) -> Result<()> {
        if !self.log.is_open() {
            self.log.shown_while_closed.fetch_add(1, Ordering::SeqCst);
        }
        self.log.shown.lock().push(frame.id);
        self.stats.record_frame_render(frame.resolution());
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        self.quit_after
            .map(|limit| self.log.shown_count() >= limit)
            .unwrap_or(false)
    }

    fn close(&mut self) {
        if self.log.open.swap(false, Ordering::SeqCst) {
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stats(&self) -> DisplayStats {
        self.stats.clone()
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Opener handing out synthetic frames, counting opens, or failing on demand
pub struct FakeOpener {
    width: u32,
    height: u32,
    frame_count: u64,
    fail: bool,
    delay: Option<Duration>,
    opens: AtomicUsize,
}

impl FakeOpener {
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            width,
            height,
            frame_count,
            fail: false,
            delay: None,
            opens: AtomicUsize::new(0),
        }
    }

    /// Opening takes `delay`, leaving room for a concurrent stop
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::new(1, 1, 0)
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaOpener for FakeOpener {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AbrSimError::source_unavailable(
                path.display().to_string(),
                "missing in test",
            ));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticSource::new(
            self.width,
            self.height,
            self.frame_count,
        )))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Source whose reads fail after `good_frames` frames
pub struct BrokenSource {
    inner: SyntheticSource,
    good_frames: u64,
}

impl BrokenSource {
    pub fn new(width: u32, height: u32, good_frames: u64) -> Self {
        Self {
            inner: SyntheticSource::new(width, height, u64::MAX),
            good_frames,
        }
    }
}

#[async_trait]
impl FrameSource for BrokenSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.inner.frames_read() >= self.good_frames {
            return Err(AbrSimError::Decode {
                details: "corrupt packet".to_string(),
            });
        }
        self.inner.next_frame().await
    }

    async fn release(&mut self) {
        self.inner.release().await;
    }

    fn frames_read(&self) -> u64 {
        self.inner.frames_read()
    }
}
