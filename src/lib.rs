pub mod app;
pub mod audio;
pub mod bandwidth;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod events;
pub mod frame;
pub mod frame_buffer;
pub mod paths;
pub mod playback;
pub mod rendition;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{
    ComponentState, SimulationController, SimulationControllerBuilder, SimulationStats,
    StatusBoard, StatusFields,
};
pub use audio::{AudioLauncher, AudioProcess, AudioSidecar, FfplayLauncher};
pub use bandwidth::{BandwidthEstimator, IoCounters, IoSnapshot, ProcNetDevCounters};
pub use config::AbrSimConfig;
pub use context::{BandwidthHistory, BandwidthSample, RunState, SimulationContext};
pub use display::{DisplaySink, DisplayStats, NullDisplaySink, SharedDisplay, TerminalDisplaySink};
pub use error::{AbrSimError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, PlaybackEvent, StopReason};
pub use frame::{FrameFormat, FrameResizer, VideoFrame};
pub use frame_buffer::{FrameBuffer, PushOutcome};
pub use playback::{FrameConsumer, FrameProducer, PlaybackResources};
pub use rendition::{select, Rendition, RenditionTable, Resolution};
pub use source::{FrameSource, MediaOpener, RawFileOpener, SyntheticOpener};
