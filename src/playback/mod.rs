mod consumer;
mod producer;
#[cfg(test)]
mod tests;

pub use consumer::FrameConsumer;
pub use producer::FrameProducer;

use crate::audio::AudioSidecar;
use crate::context::SimulationContext;
use crate::display::SharedDisplay;
use crate::events::{EventBus, PlaybackEvent, StopReason};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

/// Outputs that must be torn down whenever a session ends
#[derive(Clone)]
pub struct PlaybackResources {
    pub display: SharedDisplay,
    pub audio: Arc<AudioSidecar>,
}

impl PlaybackResources {
    pub fn new(display: SharedDisplay, audio: Arc<AudioSidecar>) -> Self {
        Self { display, audio }
    }

    /// Close the display and stop audio; safe to call from every exit path
    pub fn release(&self) {
        self.display.lock().close();
        self.audio.stop();
    }

    /// Stop the run for `reason`, release outputs and announce the stop.
    ///
    /// Returns whether this call ended an active run.
    pub fn end_session(
        &self,
        context: &SimulationContext,
        event_bus: &EventBus,
        reason: StopReason,
    ) -> bool {
        let ended = context.end_run(reason.clone());
        self.release();

        if ended {
            info!("Playback stopped: {}", reason.describe());
            let _ = event_bus.publish(PlaybackEvent::PlaybackStopped {
                reason,
                timestamp: SystemTime::now(),
            });
        }
        ended
    }
}
