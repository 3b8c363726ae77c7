use crate::context::SimulationContext;
use crate::error::Result;
use crate::events::{EventBus, PlaybackEvent};
use crate::frame::FrameResizer;
use crate::frame_buffer::PushOutcome;
use crate::source::FrameSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Decodes source frames, scales them to the current rendition and buffers them
pub struct FrameProducer {
    source: Box<dyn FrameSource>,
    resizer: FrameResizer,
    idle: Duration,
}

impl FrameProducer {
    pub fn new(source: Box<dyn FrameSource>, resizer: FrameResizer, idle: Duration) -> Self {
        Self {
            source,
            resizer,
            idle,
        }
    }

    /// Produce until end of stream or until the run stops.
    ///
    /// The source is released on every exit path. Read and resize failures
    /// are returned to the caller.
    pub async fn run(
        mut self,
        context: Arc<SimulationContext>,
        event_bus: Arc<EventBus>,
    ) -> Result<()> {
        info!("Frame producer started");
        let result = self.produce(&context, &event_bus).await;
        self.source.release().await;
        debug!(
            "Frame producer exited after reading {} frames",
            self.source.frames_read()
        );
        result
    }

    async fn produce(&mut self, context: &SimulationContext, event_bus: &EventBus) -> Result<()> {
        while context.is_running() {
            let Some(frame) = self.source.next_frame().await? else {
                let frames_read = self.source.frames_read();
                info!("End of stream after {} frames", frames_read);
                context.frame_buffer.finish();
                let _ = event_bus.publish(PlaybackEvent::EndOfStream { frames_read });
                return Ok(());
            };

            let target = context.current_rendition();
            let frame = self.resizer.resize_blocking(frame, target).await?;
            trace!("Enqueueing frame {} at {}", frame.id, target);

            match context
                .frame_buffer
                .push(frame, self.idle, || context.is_running())
                .await
            {
                PushOutcome::Pushed => {}
                PushOutcome::Abandoned(frame) => {
                    debug!("Run stopped while frame {} waited for space", frame.id);
                    break;
                }
            }
        }
        Ok(())
    }
}
