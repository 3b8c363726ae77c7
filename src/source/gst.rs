use super::interface::{FrameSource, MediaOpener};
use crate::error::{AbrSimError, Result};
use crate::frame::{FrameFormat, VideoFrame};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

/// Decodes any container GStreamer understands into RGB frames
#[derive(Debug, Clone, Default)]
pub struct GstOpener;

impl GstOpener {
    pub fn new() -> Self {
        Self
    }

    fn build_pipeline_string(path: &Path) -> String {
        format!(
            "filesrc location=\"{}\" ! decodebin ! videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=8 drop=false enable-last-sample=false",
            path.display()
        )
    }
}

#[async_trait]
impl MediaOpener for GstOpener {
    async fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let location = path.display().to_string();
        if !path.is_file() {
            return Err(AbrSimError::source_unavailable(location, "no such file"));
        }

        gstreamer::init().map_err(|e| {
            AbrSimError::source_unavailable(location.clone(), format!("GStreamer init failed: {}", e))
        })?;

        let pipeline_desc = Self::build_pipeline_string(path);
        info!("Creating GStreamer decode pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| AbrSimError::source_unavailable(location.clone(), e.to_string()))?
            .downcast::<Pipeline>()
            .map_err(|_| {
                AbrSimError::source_unavailable(location.clone(), "Failed to downcast to Pipeline")
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| AbrSimError::source_unavailable(location.clone(), "missing appsink"))?
            .downcast::<AppSink>()
            .map_err(|_| {
                AbrSimError::source_unavailable(location.clone(), "Failed to downcast to AppSink")
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| AbrSimError::source_unavailable(location.clone(), e.to_string()))?;

        Ok(Box::new(GstSource {
            pipeline: Some(pipeline),
            appsink,
            frames_read: 0,
        }))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

pub struct GstSource {
    pipeline: Option<Pipeline>,
    appsink: AppSink,
    frames_read: u64,
}

impl GstSource {
    /// Copy a sample into a tightly packed RGB frame
    fn sample_to_frame(sample: &gstreamer::Sample, id: u64) -> Result<VideoFrame> {
        let caps = sample.caps().ok_or_else(|| AbrSimError::Decode {
            details: "Sample without caps".to_string(),
        })?;
        let info = VideoInfo::from_caps(caps).map_err(|e| AbrSimError::Decode {
            details: format!("Unreadable video caps: {}", e),
        })?;
        let buffer = sample.buffer().ok_or_else(|| AbrSimError::Decode {
            details: "Sample without buffer".to_string(),
        })?;
        let map = buffer.map_readable().map_err(|e| AbrSimError::Decode {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let width = info.width();
        let height = info.height();
        let row_bytes = width as usize * 3;
        let stride = info.stride()[0] as usize;
        let bytes = map.as_slice();

        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            if end > bytes.len() {
                return Err(AbrSimError::Decode {
                    details: format!("Frame {} truncated at row {}", id, row),
                });
            }
            data.extend_from_slice(&bytes[start..end]);
        }

        Ok(VideoFrame::new(id, data, width, height, FrameFormat::Rgb24))
    }
}

#[async_trait]
impl FrameSource for GstSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.pipeline.is_none() {
            return Ok(None);
        }

        loop {
            let appsink = self.appsink.clone();
            let sample = tokio::task::spawn_blocking(move || {
                appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(100))
            })
            .await
            .map_err(|e| AbrSimError::system(format!("Decode task failed: {}", e)))?;

            match sample {
                Some(sample) => {
                    let frame = Self::sample_to_frame(&sample, self.frames_read)?;
                    self.frames_read += 1;
                    return Ok(Some(frame));
                }
                None if self.appsink.is_eos() => {
                    debug!("GStreamer source reached EOS after {} frames", self.frames_read);
                    return Ok(None);
                }
                None => {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
        }
    }

    async fn release(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                error!("Failed to stop GStreamer decode pipeline: {}", e);
            }
            debug!("GStreamer source released after {} frames", self.frames_read);
        }
    }

    fn frames_read(&self) -> u64 {
        self.frames_read
    }
}
