use super::PlaybackResources;
use crate::context::SimulationContext;
use crate::error::Result;
use crate::events::{EventBus, PlaybackEvent, StopReason};
use crate::frame::VideoFrame;
use crate::rendition;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shows buffered frames at a fixed pace and picks the next rendition
pub struct FrameConsumer {
    resources: PlaybackResources,
    interval: Duration,
    frames_shown: u64,
}

impl FrameConsumer {
    pub fn new(resources: PlaybackResources, interval: Duration) -> Self {
        Self {
            resources,
            interval,
            frames_shown: 0,
        }
    }

    /// Render until the run stops, the viewer quits or the buffer is exhausted
    pub async fn run(
        mut self,
        context: Arc<SimulationContext>,
        event_bus: Arc<EventBus>,
    ) -> Result<()> {
        info!("Frame consumer started (interval {:?})", self.interval);

        loop {
            if !context.is_running() {
                break;
            }

            let frame = context.frame_buffer.try_pop();
            let shown = frame.is_some();
            if let Some(frame) = frame {
                self.show(&context, &frame);
            }

            if self.resources.display.lock().poll_quit() {
                self.resources
                    .end_session(&context, &event_bus, StopReason::UserQuit);
                break;
            }

            if !shown && context.frame_buffer.is_exhausted() {
                self.resources
                    .end_session(&context, &event_bus, StopReason::EndOfStream);
                break;
            }

            self.adapt(&context, &event_bus);

            if !context.run_state.sleep(self.interval).await {
                break;
            }
        }

        // A stop from elsewhere may have raced the last show
        self.resources.release();
        debug!("Frame consumer exited after {} frames", self.frames_shown);
        Ok(())
    }

    fn show(&mut self, context: &SimulationContext, frame: &VideoFrame) {
        let mut display = self.resources.display.lock();
        // Checked under the display lock so nothing is shown after a stop closed it
        if !context.is_running() {
            return;
        }
        match display.show(frame) {
            Ok(()) => self.frames_shown += 1,
            Err(e) => warn!("Failed to show frame {}: {}", frame.id, e),
        }
    }

    fn adapt(&self, context: &SimulationContext, event_bus: &EventBus) {
        let Some(sample) = context.bandwidth.latest() else {
            return;
        };

        let target = rendition::select(sample.kbps, &context.renditions);
        if let Some(previous) = context.update_rendition(target) {
            let _ = event_bus.publish(PlaybackEvent::RenditionChanged {
                previous,
                current: target,
                bandwidth_kbps: sample.kbps,
            });
        }
    }
}
