use super::interface::{FrameSource, MediaOpener};
use crate::error::Result;
use crate::frame::{FrameFormat, VideoFrame};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

/// Opens a generated moving test pattern; the path is only logged
#[derive(Debug, Clone)]
pub struct SyntheticOpener {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticOpener {
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            width,
            height,
            frame_count,
        }
    }
}

#[async_trait]
impl MediaOpener for SyntheticOpener {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        info!(
            "Opening synthetic source for {} ({}x{}, {} frames)",
            path.display(),
            self.width,
            self.height,
            self.frame_count
        );
        Ok(Box::new(SyntheticSource::new(
            self.width,
            self.height,
            self.frame_count,
        )))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Diagonal gradient that scrolls one step per frame
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
    next_id: u64,
    released: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            width,
            height,
            frame_count,
            next_id: 0,
            released: false,
        }
    }

    fn render(&self, id: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        let shift = (id % 256) as u32;
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x * 255 / self.width.max(1) + shift) % 256) as u8);
                data.push(((y * 255 / self.height.max(1) + shift) % 256) as u8);
                data.push(((x + y + shift) % 256) as u8);
            }
        }
        data
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.released || self.next_id >= self.frame_count {
            return Ok(None);
        }

        let id = self.next_id;
        self.next_id += 1;
        Ok(Some(VideoFrame::new(
            id,
            self.render(id),
            self.width,
            self.height,
            FrameFormat::Rgb24,
        )))
    }

    async fn release(&mut self) {
        if !self.released {
            debug!("Synthetic source released after {} frames", self.next_id);
            self.released = true;
        }
    }

    fn frames_read(&self) -> u64 {
        self.next_id
    }
}
