use crate::config::ResizeFilter;
use crate::error::{AbrSimError, Result};
use crate::rendition::Resolution;
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

/// Pixel layout of decoded frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Packed 8-bit RGB
    Rgb24,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Rgb24 => 3,
        }
    }
}

/// Decoded video frame and its metadata
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Position of the frame in the source, starting at 0
    pub id: u64,
    /// When the frame left the decoder
    pub timestamp: SystemTime,
    /// Pixel data (shared ownership for cheap clones)
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
}

impl VideoFrame {
    pub fn new(id: u64, data: Vec<u8>, width: u32, height: u32, format: FrameFormat) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Byte length the pixel data must have
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    pub fn validate_size(&self) -> bool {
        self.data.len() == self.expected_size()
    }

    /// Frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Scales frames to a rendition's dimensions
#[derive(Debug, Clone, Copy)]
pub struct FrameResizer {
    filter: ResizeFilter,
}

impl FrameResizer {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }

    /// Resize on the calling thread
    pub fn resize(&self, frame: &VideoFrame, target: Resolution) -> Result<VideoFrame> {
        if frame.resolution() == target {
            return Ok(frame.clone());
        }

        if !frame.validate_size() {
            return Err(AbrSimError::Decode {
                details: format!(
                    "Frame {} has {} bytes, expected {} for {}",
                    frame.id,
                    frame.data.len(),
                    frame.expected_size(),
                    frame.resolution()
                ),
            });
        }

        let source = RgbImage::from_raw(frame.width, frame.height, frame.data.to_vec())
            .ok_or_else(|| AbrSimError::Decode {
                details: format!("Frame {} could not be viewed as RGB", frame.id),
            })?;

        let resized = imageops::resize(&source, target.width, target.height, self.filter.into());
        trace!(
            "Resized frame {} from {} to {}",
            frame.id,
            frame.resolution(),
            target
        );

        Ok(VideoFrame {
            id: frame.id,
            timestamp: frame.timestamp,
            data: Arc::new(resized.into_raw()),
            width: target.width,
            height: target.height,
            format: FrameFormat::Rgb24,
        })
    }

    /// Resize on the blocking pool
    pub async fn resize_blocking(&self, frame: VideoFrame, target: Resolution) -> Result<VideoFrame> {
        if frame.resolution() == target {
            return Ok(frame);
        }

        let resizer = *self;
        tokio::task::spawn_blocking(move || resizer.resize(&frame, target))
            .await
            .map_err(|e| AbrSimError::system(format!("Resize task failed: {}", e)))?
    }
}

impl Default for FrameResizer {
    fn default() -> Self {
        Self::new(ResizeFilter::default())
    }
}
