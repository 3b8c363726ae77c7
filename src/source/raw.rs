use super::interface::{FrameSource, MediaOpener};
use crate::error::{AbrSimError, Result};
use crate::frame::{FrameFormat, VideoFrame};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

/// Opens headerless RGB24 frame dumps of a fixed geometry
/// (e.g. `ffmpeg -i in.mp4 -f rawvideo -pix_fmt rgb24 out.rgb`)
#[derive(Debug, Clone)]
pub struct RawFileOpener {
    width: u32,
    height: u32,
}

impl RawFileOpener {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait]
impl MediaOpener for RawFileOpener {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let file = File::open(path)
            .await
            .map_err(|e| AbrSimError::source_unavailable(path.display().to_string(), e.to_string()))?;

        let frame_size = self.width as u64 * self.height as u64 * 3;
        let length = file
            .metadata()
            .await
            .map_err(|e| AbrSimError::source_unavailable(path.display().to_string(), e.to_string()))?
            .len();

        if length < frame_size {
            return Err(AbrSimError::source_unavailable(
                path.display().to_string(),
                format!(
                    "file holds {} bytes, less than one {}x{} frame",
                    length, self.width, self.height
                ),
            ));
        }

        info!(
            "Opened raw source {} ({} frames of {}x{})",
            path.display(),
            length / frame_size,
            self.width,
            self.height
        );

        Ok(Box::new(RawFileSource {
            reader: Some(BufReader::new(file)),
            width: self.width,
            height: self.height,
            frames_read: 0,
        }))
    }

    fn name(&self) -> &str {
        "raw"
    }
}

pub struct RawFileSource {
    reader: Option<BufReader<File>>,
    width: u32,
    height: u32,
    frames_read: u64,
}

#[async_trait]
impl FrameSource for RawFileSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut data = vec![0u8; self.width as usize * self.height as usize * 3];
        match reader.read_exact(&mut data).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Raw source exhausted after {} frames", self.frames_read);
                return Ok(None);
            }
            Err(e) => {
                return Err(AbrSimError::Decode {
                    details: format!("Raw frame {} read failed: {}", self.frames_read, e),
                })
            }
        }

        let frame = VideoFrame::new(
            self.frames_read,
            data,
            self.width,
            self.height,
            FrameFormat::Rgb24,
        );
        self.frames_read += 1;
        Ok(Some(frame))
    }

    async fn release(&mut self) {
        if self.reader.take().is_some() {
            debug!("Raw source released after {} frames", self.frames_read);
        } else {
            warn!("Raw source released twice");
        }
    }

    fn frames_read(&self) -> u64 {
        self.frames_read
    }
}
