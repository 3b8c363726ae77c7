#[cfg(feature = "gstreamer")]
mod gst;
mod sink;
mod stats;
mod terminal;
#[cfg(test)]
mod tests;

#[cfg(feature = "gstreamer")]
pub use gst::GstDisplaySink;
pub use sink::{DisplaySink, NullDisplaySink, SharedDisplay};
pub use stats::DisplayStats;
pub use terminal::TerminalDisplaySink;

use crate::config::{DisplayConfig, DisplayKind};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Build the sink selected by `display.sink`
pub fn sink_for(config: &DisplayConfig) -> Result<SharedDisplay> {
    let sink: Box<dyn DisplaySink> = match config.sink {
        DisplayKind::Terminal => Box::new(TerminalDisplaySink::new(config.keyboard_quit)),
        DisplayKind::Null => Box::new(NullDisplaySink::default()),
        #[cfg(feature = "gstreamer")]
        DisplayKind::Gstreamer => Box::new(GstDisplaySink::new(config.window_title.clone())),
        #[cfg(not(feature = "gstreamer"))]
        DisplayKind::Gstreamer => {
            return Err(crate::error::AbrSimError::system(
                "GStreamer display requires building with the `gstreamer` feature",
            ))
        }
    };
    Ok(Arc::new(Mutex::new(sink)))
}
