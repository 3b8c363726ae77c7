#[cfg(feature = "gstreamer")]
mod gst;
mod interface;
mod raw;
mod synthetic;

#[cfg(feature = "gstreamer")]
pub use gst::GstOpener;
pub use interface::{FrameSource, MediaOpener};
pub use raw::{RawFileOpener, RawFileSource};
pub use synthetic::{SyntheticOpener, SyntheticSource};

use crate::config::{SourceConfig, SourceKind};
use crate::error::Result;
use std::sync::Arc;

/// Build the opener selected by `source.kind`
pub fn opener_for(config: &SourceConfig) -> Result<Arc<dyn MediaOpener>> {
    let (width, height) = config.resolution;
    match config.kind {
        SourceKind::Synthetic => Ok(Arc::new(SyntheticOpener::new(
            width,
            height,
            config.frame_count,
        ))),
        SourceKind::Raw => Ok(Arc::new(RawFileOpener::new(width, height))),
        #[cfg(feature = "gstreamer")]
        SourceKind::Gstreamer => Ok(Arc::new(GstOpener::new())),
        #[cfg(not(feature = "gstreamer"))]
        SourceKind::Gstreamer => Err(crate::error::AbrSimError::system(
            "GStreamer sources require building with the `gstreamer` feature",
        )),
    }
}
