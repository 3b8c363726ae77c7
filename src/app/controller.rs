use super::types::ComponentState;
use crate::audio::{AudioLauncher, AudioSidecar, FfplayLauncher};
use crate::bandwidth::{IoCounters, ProcNetDevCounters};
use crate::config::AbrSimConfig;
use crate::context::SimulationContext;
use crate::display::{self, SharedDisplay};
use crate::error::Result;
use crate::events::EventBus;
use crate::paths;
use crate::playback::PlaybackResources;
use crate::source::{self, MediaOpener};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Drives playback sessions: owns the shared context, the worker tasks and
/// the display and audio outputs.
///
/// `start` and `stop` take `&self` so a controller shared behind an `Arc`
/// can be stopped while a start is still in flight.
pub struct SimulationController {
    pub(super) config: AbrSimConfig,
    pub(super) context: Arc<SimulationContext>,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) opener: Arc<dyn MediaOpener>,
    pub(super) counters: Arc<dyn IoCounters>,
    pub(super) resources: PlaybackResources,
    pub(super) source_path: PathBuf,

    // Lifecycle management
    pub(super) session: Mutex<Session>,
    pub(super) start_lock: tokio::sync::Mutex<()>,
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
}

/// Bookkeeping for the current or most recent session
#[derive(Default)]
pub(super) struct Session {
    /// Bumped by every stop; a start that sees it move is cancelled
    pub epoch: u64,
    pub id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl SimulationController {
    pub fn builder(config: AbrSimConfig) -> SimulationControllerBuilder {
        SimulationControllerBuilder::new(config)
    }

    pub fn config(&self) -> &AbrSimConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<SimulationContext> {
        Arc::clone(&self.context)
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn source_path(&self) -> &PathBuf {
        &self.source_path
    }
}

/// Assembles a controller, defaulting each collaborator from configuration
pub struct SimulationControllerBuilder {
    config: AbrSimConfig,
    opener: Option<Arc<dyn MediaOpener>>,
    counters: Option<Arc<dyn IoCounters>>,
    display: Option<SharedDisplay>,
    audio_launcher: Option<Arc<dyn AudioLauncher>>,
    source_path: Option<PathBuf>,
}

impl SimulationControllerBuilder {
    pub fn new(config: AbrSimConfig) -> Self {
        Self {
            config,
            opener: None,
            counters: None,
            display: None,
            audio_launcher: None,
            source_path: None,
        }
    }

    pub fn with_opener(mut self, opener: Arc<dyn MediaOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn with_counters(mut self, counters: Arc<dyn IoCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    pub fn with_display(mut self, display: SharedDisplay) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_audio_launcher(mut self, launcher: Arc<dyn AudioLauncher>) -> Self {
        self.audio_launcher = Some(launcher);
        self
    }

    /// Use `path` as-is instead of resolving `source.path`
    pub fn with_source_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SimulationController> {
        let config = self.config;
        config.validate()?;

        let renditions = config.rendition_table()?;
        let context = Arc::new(SimulationContext::new(renditions, config.buffer.capacity));
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));

        let opener = match self.opener {
            Some(opener) => opener,
            None => source::opener_for(&config.source)?,
        };
        let counters = self.counters.unwrap_or_else(|| {
            Arc::new(ProcNetDevCounters::new(
                &config.bandwidth.counters_path,
                config.bandwidth.include_loopback,
            ))
        });
        let display = match self.display {
            Some(display) => display,
            None => display::sink_for(&config.display)?,
        };
        let launcher = self
            .audio_launcher
            .unwrap_or_else(|| Arc::new(FfplayLauncher::from_config(&config.audio)));
        let audio = Arc::new(AudioSidecar::new(launcher, config.audio.enabled));
        let source_path = match self.source_path {
            Some(path) => path,
            None => paths::resolve_source_path(&config)?,
        };

        let sink_name = display.lock().name().to_string();
        debug!(
            "Controller built: opener={}, display={}, audio={}",
            opener.name(),
            sink_name,
            audio.launcher_name()
        );

        Ok(SimulationController {
            config,
            context,
            event_bus,
            opener,
            counters,
            resources: PlaybackResources::new(display, audio),
            source_path,
            session: Mutex::new(Session::default()),
            start_lock: tokio::sync::Mutex::new(()),
            component_states: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}
