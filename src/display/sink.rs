use super::stats::DisplayStats;
use crate::error::Result;
use crate::frame::VideoFrame;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Where rendered frames go.
///
/// Calls are short and synchronous; the consumer holds the sink lock only
/// for the duration of one call.
pub trait DisplaySink: Send {
    /// Prepare for a new session
    fn open(&mut self) -> Result<()>;

    fn show(&mut self, frame: &VideoFrame) -> Result<()>;

    /// True when the viewer asked to quit since the last poll
    fn poll_quit(&mut self) -> bool;

    /// Close every window; safe to call repeatedly
    fn close(&mut self);

    fn stats(&self) -> DisplayStats;

    fn name(&self) -> &str;
}

/// Sink shared between the consumer task and the controller's stop path
pub type SharedDisplay = Arc<Mutex<Box<dyn DisplaySink>>>;

/// Discards frames, counting them
#[derive(Debug, Default)]
pub struct NullDisplaySink {
    stats: DisplayStats,
}

impl DisplaySink for NullDisplaySink {
    fn open(&mut self) -> Result<()> {
        self.stats.reset();
        Ok(())
    }

    fn show(&mut self, frame: &VideoFrame) -> Result<()> {
        trace!("Discarding frame {}", frame.id);
        self.stats.record_frame_render(frame.resolution());
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        false
    }

    fn close(&mut self) {}

    fn stats(&self) -> DisplayStats {
        self.stats.clone()
    }

    fn name(&self) -> &str {
        "null"
    }
}
