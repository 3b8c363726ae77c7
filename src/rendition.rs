use crate::error::{AbrSimError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single encoding profile and the bandwidth it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rendition {
    pub width: u32,
    pub height: u32,
    /// Minimum estimated bandwidth (kbps) at which this rendition is chosen
    pub min_bandwidth_kbps: u32,
}

impl Rendition {
    pub const fn new(width: u32, height: u32, min_bandwidth_kbps: u32) -> Self {
        Self {
            width,
            height,
            min_bandwidth_kbps,
        }
    }

    /// Frame dimensions of this rendition
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Short label such as "720p"
    pub fn label(&self) -> String {
        format!("{}p", self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Rendition ladder ordered from highest to lowest quality.
///
/// Thresholds and pixel counts are strictly decreasing; the last entry is the
/// fallback for bandwidth below every threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionTable {
    entries: Vec<Rendition>,
}

impl RenditionTable {
    /// Validate and wrap a ladder
    pub fn new(entries: Vec<Rendition>) -> Result<Self> {
        if entries.is_empty() {
            return Err(AbrSimError::system(
                "Rendition table must contain at least one entry",
            ));
        }

        for entry in &entries {
            if entry.width == 0 || entry.height == 0 {
                return Err(AbrSimError::system(format!(
                    "Rendition {}x{} has a zero dimension",
                    entry.width, entry.height
                )));
            }
        }

        for pair in entries.windows(2) {
            let (higher, lower) = (&pair[0], &pair[1]);
            if higher.min_bandwidth_kbps <= lower.min_bandwidth_kbps {
                return Err(AbrSimError::system(format!(
                    "Rendition thresholds must strictly decrease: {}x{}@{} then {}x{}@{}",
                    higher.width,
                    higher.height,
                    higher.min_bandwidth_kbps,
                    lower.width,
                    lower.height,
                    lower.min_bandwidth_kbps
                )));
            }
            if higher.pixel_count() <= lower.pixel_count() {
                return Err(AbrSimError::system(format!(
                    "Rendition quality must strictly decrease: {}x{} then {}x{}",
                    higher.width, higher.height, lower.width, lower.height
                )));
            }
        }

        Ok(Self { entries })
    }

    /// The 1080p to 144p ladder
    pub fn standard() -> Self {
        Self {
            entries: vec![
                Rendition::new(1920, 1080, 5000),
                Rendition::new(1280, 720, 2500),
                Rendition::new(854, 480, 1000),
                Rendition::new(640, 360, 500),
                Rendition::new(426, 240, 200),
                Rendition::new(256, 144, 50),
            ],
        }
    }

    pub fn entries(&self) -> &[Rendition] {
        &self.entries
    }

    pub fn highest(&self) -> &Rendition {
        &self.entries[0]
    }

    /// Fallback entry for bandwidth below every threshold
    pub fn lowest(&self) -> &Rendition {
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the entry for the given bandwidth
    pub fn select_entry(&self, bandwidth_kbps: f64) -> &Rendition {
        self.entries
            .iter()
            .find(|entry| bandwidth_kbps >= entry.min_bandwidth_kbps as f64)
            .unwrap_or_else(|| self.lowest())
    }
}

impl Default for RenditionTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Map a bandwidth estimate to the target resolution.
///
/// Every entry is considered in order; the first whose threshold is at or
/// below `bandwidth_kbps` wins, otherwise the lowest entry is returned.
pub fn select(bandwidth_kbps: f64, table: &RenditionTable) -> Resolution {
    table.select_entry(bandwidth_kbps).resolution()
}
