use super::sink::DisplaySink;
use super::stats::DisplayStats;
use crate::error::{AbrSimError, Result};
use crate::frame::VideoFrame;
use crate::rendition::Resolution;
use gstreamer::prelude::*;
use gstreamer::{MessageView, Pipeline};
use gstreamer_app::AppSrc;
use gstreamer_video::{VideoFormat, VideoInfo};
use tracing::{debug, error, info, warn};

/// Shows frames in a native video window
pub struct GstDisplaySink {
    window_title: String,
    pipeline: Option<Pipeline>,
    appsrc: Option<AppSrc>,
    caps_resolution: Option<Resolution>,
    stats: DisplayStats,
}

impl GstDisplaySink {
    pub fn new(window_title: String) -> Self {
        Self {
            window_title,
            pipeline: None,
            appsrc: None,
            caps_resolution: None,
            stats: DisplayStats::default(),
        }
    }

    fn display_error(details: String) -> AbrSimError {
        AbrSimError::Display { details }
    }

    fn update_caps(&mut self, appsrc: &AppSrc, resolution: Resolution) -> Result<()> {
        if self.caps_resolution == Some(resolution) {
            return Ok(());
        }

        let caps = VideoInfo::builder(VideoFormat::Rgb, resolution.width, resolution.height)
            .build()
            .and_then(|info| info.to_caps())
            .map_err(|e| Self::display_error(format!("Failed to build caps: {}", e)))?;
        appsrc.set_caps(Some(&caps));
        self.caps_resolution = Some(resolution);
        debug!("Display caps set to {}", resolution);
        Ok(())
    }
}

impl DisplaySink for GstDisplaySink {
    fn open(&mut self) -> Result<()> {
        self.stats.reset();
        if self.pipeline.is_some() {
            return Ok(());
        }

        gstreamer::init()
            .map_err(|e| Self::display_error(format!("Failed to initialize GStreamer: {}", e)))?;

        let pipeline_desc = "appsrc name=src is-live=true format=time do-timestamp=true ! \
             queue max-size-buffers=2 leaky=downstream ! videoconvert ! videoscale ! \
             autovideosink sync=false";
        info!(
            "Creating GStreamer display pipeline for '{}': {}",
            self.window_title, pipeline_desc
        );

        let pipeline = gstreamer::parse::launch(pipeline_desc)
            .map_err(|e| Self::display_error(format!("Failed to create display pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| Self::display_error("Failed to downcast to Pipeline".to_string()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| Self::display_error("Failed to get appsrc element".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| Self::display_error("Failed to downcast to AppSrc".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| Self::display_error(format!("Failed to start display: {}", e)))?;

        self.pipeline = Some(pipeline);
        self.appsrc = Some(appsrc);
        self.caps_resolution = None;
        Ok(())
    }

    fn show(&mut self, frame: &VideoFrame) -> Result<()> {
        let Some(appsrc) = self.appsrc.clone() else {
            return Err(Self::display_error("Display is not open".to_string()));
        };

        self.update_caps(&appsrc, frame.resolution())?;

        let buffer = gstreamer::Buffer::from_slice(frame.data.as_ref().clone());
        match appsrc.push_buffer(buffer) {
            Ok(_) => {
                self.stats.record_frame_render(frame.resolution());
                Ok(())
            }
            Err(e) => {
                self.stats.record_render_error();
                Err(Self::display_error(format!(
                    "Failed to push frame {}: {:?}",
                    frame.id, e
                )))
            }
        }
    }

    fn poll_quit(&mut self) -> bool {
        let Some(bus) = self.pipeline.as_ref().and_then(|p| p.bus()) else {
            return false;
        };

        while let Some(message) = bus.pop() {
            match message.view() {
                MessageView::Eos(..) => {
                    info!("Display window reached end of stream");
                    return true;
                }
                MessageView::Error(err) => {
                    warn!("Display window closed: {}", err.error());
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    fn close(&mut self) {
        self.appsrc = None;
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                error!("Failed to close display pipeline: {}", e);
            }
            debug!("Display window closed");
        }
    }

    fn stats(&self) -> DisplayStats {
        self.stats.clone()
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

impl Drop for GstDisplaySink {
    fn drop(&mut self) {
        self.close();
    }
}
