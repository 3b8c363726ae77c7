use crate::error::EventBusError;
use crate::rendition::Resolution;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a playback session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// `stop()` was called by the presentation layer
    Requested,
    /// The display sink reported a quit signal
    UserQuit,
    /// Every source frame was shown
    EndOfStream,
    /// A task hit a condition it cannot recover from
    Fatal { component: String, error: String },
}

impl StopReason {
    pub fn describe(&self) -> String {
        match self {
            StopReason::Requested => "stop requested".to_string(),
            StopReason::UserQuit => "user quit".to_string(),
            StopReason::EndOfStream => "end of stream".to_string(),
            StopReason::Fatal { component, error } => {
                format!("fatal error in {}: {}", component, error)
            }
        }
    }
}

/// Events observable by the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// A session started
    PlaybackStarted {
        session_id: Uuid,
        rendition: Resolution,
        timestamp: SystemTime,
    },
    /// A new bandwidth estimate was recorded
    BandwidthUpdated { kbps: f64, timestamp: SystemTime },
    /// The consumer switched the target rendition
    RenditionChanged {
        previous: Resolution,
        current: Resolution,
        bandwidth_kbps: f64,
    },
    /// The producer reached the end of the source
    EndOfStream { frames_read: u64 },
    /// The audio player could not be launched; playback continues silently
    AudioUnavailable { error: String },
    /// A component failed
    SystemError { component: String, error: String },
    /// A session ended
    PlaybackStopped {
        reason: StopReason,
        timestamp: SystemTime,
    },
}

impl PlaybackEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            PlaybackEvent::PlaybackStarted {
                session_id,
                rendition,
                ..
            } => format!(
                "Playback started at {} (session {})",
                rendition.label(),
                session_id
            ),
            PlaybackEvent::BandwidthUpdated { kbps, .. } => {
                format!("Bandwidth: {:.2} kbps", kbps)
            }
            PlaybackEvent::RenditionChanged {
                previous, current, ..
            } => format!("Resolution: {} (was {})", current.label(), previous.label()),
            PlaybackEvent::EndOfStream { frames_read } => {
                format!("End of stream after {} frames", frames_read)
            }
            PlaybackEvent::AudioUnavailable { error } => {
                format!("Audio unavailable: {}", error)
            }
            PlaybackEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            PlaybackEvent::PlaybackStopped { reason, .. } => {
                format!("Playback stopped: {}", reason.describe())
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaybackEvent::PlaybackStarted { .. } => "playback_started",
            PlaybackEvent::BandwidthUpdated { .. } => "bandwidth_updated",
            PlaybackEvent::RenditionChanged { .. } => "rendition_changed",
            PlaybackEvent::EndOfStream { .. } => "end_of_stream",
            PlaybackEvent::AudioUnavailable { .. } => "audio_unavailable",
            PlaybackEvent::SystemError { .. } => "system_error",
            PlaybackEvent::PlaybackStopped { .. } => "playback_stopped",
        }
    }
}

/// Broadcast bus from the simulation core to any number of observers
pub struct EventBus {
    sender: broadcast::Sender<PlaybackEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Fails only when nobody is subscribed.
    pub fn publish(&self, event: PlaybackEvent) -> Result<usize, EventBusError> {
        match &event {
            PlaybackEvent::RenditionChanged {
                previous,
                current,
                bandwidth_kbps,
            } => {
                info!(
                    "Rendition changed {} -> {} at {:.2} kbps",
                    previous, current, bandwidth_kbps
                );
            }
            PlaybackEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            PlaybackEvent::AudioUnavailable { error } => {
                warn!("Continuing without audio: {}", error);
            }
            PlaybackEvent::BandwidthUpdated { .. } => {}
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &PlaybackEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<PlaybackEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<PlaybackEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event, skipping over lag
    pub async fn recv(&mut self) -> Result<PlaybackEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<PlaybackEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
