use crate::error::Result;
use crate::frame::VideoFrame;
use async_trait::async_trait;
use std::path::Path;

/// Opens decodable media by path.
///
/// A failure here is `SourceUnavailable` and aborts the session start.
#[async_trait]
pub trait MediaOpener: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// An opened media source yielding decoded frames in order
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` at end of stream
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>>;

    /// Release decoder resources; further reads return end of stream
    async fn release(&mut self);

    /// Frames handed out so far
    fn frames_read(&self) -> u64;
}
