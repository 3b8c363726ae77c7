use crate::events::{EventReceiver, PlaybackEvent};
use crate::rendition::Resolution;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// The two live lines the presentation layer shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFields {
    pub bandwidth: String,
    pub resolution: String,
}

/// Keeps the live status lines current from playback events
pub struct StatusBoard {
    fields: RwLock<StatusFields>,
}

impl StatusBoard {
    pub fn new(initial: Resolution) -> Self {
        Self {
            fields: RwLock::new(StatusFields {
                bandwidth: format_bandwidth(0.0),
                resolution: format_resolution(initial),
            }),
        }
    }

    pub fn fields(&self) -> StatusFields {
        self.fields.read().clone()
    }

    /// Fold one event into the fields; returns whether anything changed
    pub fn apply(&self, event: &PlaybackEvent) -> bool {
        let mut fields = self.fields.write();
        let before = fields.clone();
        match event {
            PlaybackEvent::BandwidthUpdated { kbps, .. } => {
                fields.bandwidth = format_bandwidth(*kbps);
            }
            PlaybackEvent::RenditionChanged { current, .. } => {
                fields.resolution = format_resolution(*current);
            }
            PlaybackEvent::PlaybackStarted { rendition, .. } => {
                fields.bandwidth = format_bandwidth(0.0);
                fields.resolution = format_resolution(*rendition);
            }
            _ => {}
        }
        *fields != before
    }

    /// Apply events from `receiver` until the bus closes, calling `on_update`
    /// after each change
    pub fn spawn<F>(self: Arc<Self>, mut receiver: EventReceiver, on_update: F) -> JoinHandle<()>
    where
        F: Fn(&StatusFields) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                if self.apply(&event) {
                    on_update(&self.fields());
                }
            }
            debug!("Status board stopped");
        })
    }
}

fn format_bandwidth(kbps: f64) -> String {
    format!("Bandwidth: {:.2} kbps", kbps)
}

fn format_resolution(resolution: Resolution) -> String {
    format!("Resolution: {}", resolution.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use uuid::Uuid;

    #[test]
    fn test_status_fields_follow_events() {
        let board = StatusBoard::new(Resolution::new(1920, 1080));
        assert_eq!(
            board.fields(),
            StatusFields {
                bandwidth: "Bandwidth: 0.00 kbps".to_string(),
                resolution: "Resolution: 1080p".to_string(),
            }
        );

        assert!(board.apply(&PlaybackEvent::BandwidthUpdated {
            kbps: 3125.456,
            timestamp: SystemTime::now(),
        }));
        assert!(board.apply(&PlaybackEvent::RenditionChanged {
            previous: Resolution::new(1920, 1080),
            current: Resolution::new(1280, 720),
            bandwidth_kbps: 3125.456,
        }));
        assert!(!board.apply(&PlaybackEvent::EndOfStream { frames_read: 3 }));

        let fields = board.fields();
        assert_eq!(fields.bandwidth, "Bandwidth: 3125.46 kbps");
        assert_eq!(fields.resolution, "Resolution: 720p");

        assert!(board.apply(&PlaybackEvent::PlaybackStarted {
            session_id: Uuid::new_v4(),
            rendition: Resolution::new(1920, 1080),
            timestamp: SystemTime::now(),
        }));
        assert_eq!(board.fields().resolution, "Resolution: 1080p");
    }
}
