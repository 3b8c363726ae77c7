use crate::rendition::Resolution;
use serde::Serialize;
use std::time::SystemTime;

/// Display sink statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisplayStats {
    pub frames_rendered: u64,
    pub render_errors: u64,
    /// Times consecutive frames arrived at a different size
    pub resolution_changes: u64,
    pub last_resolution: Option<Resolution>,
    pub last_frame_time: Option<SystemTime>,
}

impl DisplayStats {
    /// Record a shown frame; returns true when its size differs from the previous one
    pub fn record_frame_render(&mut self, resolution: Resolution) -> bool {
        self.frames_rendered += 1;
        self.last_frame_time = Some(SystemTime::now());

        let changed = self
            .last_resolution
            .map(|last| last != resolution)
            .unwrap_or(false);
        if changed {
            self.resolution_changes += 1;
        }
        self.last_resolution = Some(resolution);
        changed
    }

    pub fn record_render_error(&mut self) {
        self.render_errors += 1;
        self.last_frame_time = Some(SystemTime::now());
    }

    pub fn render_success_rate(&self) -> f64 {
        let attempts = self.frames_rendered + self.render_errors;
        if attempts == 0 {
            0.0
        } else {
            self.frames_rendered as f64 / attempts as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
