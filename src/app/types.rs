use crate::display::DisplayStats;
use crate::events::StopReason;
use crate::frame_buffer::FrameBufferStatsSnapshot;
use crate::rendition::Resolution;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Component lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Stopped,
    Running,
    Failed,
    /// Not started because configuration turned it off
    Disabled,
}

/// Point-in-time view of a controller and its current or last session
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStats {
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub running: bool,
    pub stop_reason: Option<StopReason>,
    pub current_rendition: Resolution,
    pub latest_bandwidth_kbps: Option<f64>,
    pub average_bandwidth_kbps: Option<f64>,
    pub bandwidth_samples: usize,
    pub buffered_frames: usize,
    pub buffer: FrameBufferStatsSnapshot,
    pub display: DisplayStats,
    pub audio_running: bool,
    pub components: HashMap<String, ComponentState>,
}
