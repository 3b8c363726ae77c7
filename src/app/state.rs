use super::types::SimulationStats;
use super::{ComponentState, SimulationController};
use crate::context::BandwidthSample;
use crate::events::{EventFilter, EventReceiver, PlaybackEvent};
use crate::rendition::Resolution;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Update one component's state in a shared map
pub(super) fn record_state(
    states: &Mutex<HashMap<String, ComponentState>>,
    component: &str,
    state: ComponentState,
) {
    states.lock().insert(component.to_string(), state);
    debug!("Component '{}' state changed to: {:?}", component, state);
}

impl SimulationController {
    /// Receive every presentation event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_bus.subscribe()
    }

    /// Receive only events accepted by `filter`
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.event_bus.subscribe(), filter, name.to_string())
    }

    pub fn is_running(&self) -> bool {
        self.context.is_running()
    }

    pub fn current_rendition(&self) -> Resolution {
        self.context.current_rendition()
    }

    pub fn latest_bandwidth(&self) -> Option<BandwidthSample> {
        self.context.bandwidth.latest()
    }

    pub fn buffered_frames(&self) -> usize {
        self.context.frame_buffer.len()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.lock().id
    }

    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().get(component).copied()
    }

    pub fn component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().clone()
    }

    /// Serializable snapshot of the current or last session
    pub fn stats(&self) -> SimulationStats {
        let (session_id, started_at) = {
            let session = self.session.lock();
            (session.id, session.started_at)
        };
        let display = self.resources.display.lock().stats();

        SimulationStats {
            session_id,
            started_at,
            running: self.context.is_running(),
            stop_reason: self.context.stop_reason(),
            current_rendition: self.context.current_rendition(),
            latest_bandwidth_kbps: self.context.bandwidth.latest().map(|s| s.kbps),
            average_bandwidth_kbps: self.context.bandwidth.average_kbps(),
            bandwidth_samples: self.context.bandwidth.len(),
            buffered_frames: self.context.frame_buffer.len(),
            buffer: self.context.frame_buffer.stats(),
            display,
            audio_running: self.resources.audio.is_running(),
            components: self.component_states(),
        }
    }
}
