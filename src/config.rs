use crate::rendition::{Rendition, RenditionTable};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AbrSimConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub abr: AbrConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub bandwidth: BandwidthConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub system: SystemConfig,

    /// Directory of the file this configuration was loaded from
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// Media path, resolved against `base` when relative
    #[serde(default = "default_source_path")]
    pub path: String,

    /// Which decoder opens the source
    #[serde(default)]
    pub kind: SourceKind,

    /// Base directory for relative media paths
    #[serde(default)]
    pub base: PathBase,

    /// Frame geometry for synthetic and raw sources (width, height)
    #[serde(default = "default_source_resolution")]
    pub resolution: (u32, u32),

    /// Number of frames the synthetic source generates
    #[serde(default = "default_frame_count")]
    pub frame_count: u64,

    /// Nominal source frame rate
    #[serde(default = "default_source_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Generated test pattern, no file required
    #[default]
    Synthetic,
    /// Headerless RGB24 frames of `source.resolution`
    Raw,
    /// Any container GStreamer can decode
    Gstreamer,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PathBase {
    /// Current working directory
    #[default]
    Cwd,
    /// Directory holding the configuration file
    Config,
    /// Directory holding the running executable (bundled deployments)
    Executable,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AbrConfig {
    /// Rendition ladder, highest quality first
    #[serde(default = "default_renditions")]
    pub renditions: Vec<Rendition>,

    /// Resampling filter used when resizing frames
    #[serde(default)]
    pub resize_filter: ResizeFilter,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BufferConfig {
    /// Maximum number of frames held between producer and consumer
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TimingConfig {
    /// Bandwidth sampling period in milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Producer back-off while the buffer is full, in milliseconds
    #[serde(default = "default_producer_idle_ms")]
    pub producer_idle_ms: u64,

    /// Render pacing interval in milliseconds
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BandwidthConfig {
    /// Host interface counters file
    #[serde(default = "default_counters_path")]
    pub counters_path: String,

    /// Count loopback traffic towards the estimate
    #[serde(default = "default_include_loopback")]
    pub include_loopback: bool,

    /// Divide each delta by the elapsed sampling time
    #[serde(default)]
    pub normalize_per_second: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AudioConfig {
    /// Launch the external audio player alongside playback
    #[serde(default = "default_audio_enabled")]
    pub enabled: bool,

    /// Player executable
    #[serde(default = "default_audio_program")]
    pub program: String,

    /// Arguments placed before the source path
    #[serde(default = "default_audio_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Which display sink renders frames
    #[serde(default)]
    pub sink: DisplayKind,

    /// Read q/Esc/Ctrl-C from the terminal as a quit signal
    #[serde(default)]
    pub keyboard_quit: bool,

    /// Window title for windowed sinks
    #[serde(default = "default_window_title")]
    pub window_title: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    #[default]
    Terminal,
    Null,
    Gstreamer,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Exported as GST_PLUGIN_PATH before decoders initialise
    #[serde(default)]
    pub plugin_path: Option<String>,
}

impl AbrSimConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("abrsim.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("source.path", default_source_path())?
            .set_default("source.kind", "synthetic")?
            .set_default("source.base", "cwd")?
            .set_default(
                "source.resolution",
                vec![default_source_resolution().0, default_source_resolution().1],
            )?
            .set_default("source.frame_count", default_frame_count())?
            .set_default("source.fps", default_source_fps())?
            .set_default("abr.resize_filter", "triangle")?
            .set_default("buffer.capacity", default_buffer_capacity() as i64)?
            .set_default("timing.sample_interval_ms", default_sample_interval_ms())?
            .set_default("timing.producer_idle_ms", default_producer_idle_ms())?
            .set_default("timing.render_interval_ms", default_render_interval_ms())?
            .set_default("bandwidth.counters_path", default_counters_path())?
            .set_default("bandwidth.include_loopback", default_include_loopback())?
            .set_default("bandwidth.normalize_per_second", false)?
            .set_default("audio.enabled", default_audio_enabled())?
            .set_default("audio.program", default_audio_program())?
            .set_default("audio.args", default_audio_args())?
            .set_default("display.sink", "terminal")?
            .set_default("display.keyboard_quit", false)?
            .set_default("display.window_title", default_window_title())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // ABRSIM_BUFFER__CAPACITY=50 overrides buffer.capacity
            .add_source(
                Environment::with_prefix("ABRSIM")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("audio.args")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AbrSimConfig = settings.try_deserialize()?;
        config.config_dir = path
            .as_ref()
            .parent()
            .map(|dir| dir.to_path_buf())
            .filter(|dir| !dir.as_os_str().is_empty());

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Source path must not be empty".to_string(),
            ));
        }

        if self.source.resolution.0 == 0 || self.source.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Source resolution must be greater than 0".to_string(),
            ));
        }

        if self.source.fps == 0 {
            return Err(ConfigError::Message(
                "Source fps must be greater than 0".to_string(),
            ));
        }

        self.rendition_table()?;

        if self.buffer.capacity == 0 {
            return Err(ConfigError::Message(
                "Buffer capacity must be greater than 0".to_string(),
            ));
        }

        if self.timing.sample_interval_ms == 0
            || self.timing.producer_idle_ms == 0
            || self.timing.render_interval_ms == 0
        {
            return Err(ConfigError::Message(
                "Timing intervals must be greater than 0".to_string(),
            ));
        }

        if self.audio.enabled && self.audio.program.trim().is_empty() {
            return Err(ConfigError::Message(
                "Audio program must be set when audio is enabled".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the validated rendition table
    pub fn rendition_table(&self) -> Result<RenditionTable, ConfigError> {
        RenditionTable::new(self.abr.renditions.clone())
            .map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.timing.sample_interval_ms)
    }

    pub fn producer_idle(&self) -> Duration {
        Duration::from_millis(self.timing.producer_idle_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.timing.render_interval_ms)
    }

    /// Render as a TOML document that `load_from_file` accepts
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for AbrSimConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            abr: AbrConfig::default(),
            buffer: BufferConfig::default(),
            timing: TimingConfig::default(),
            bandwidth: BandwidthConfig::default(),
            audio: AudioConfig::default(),
            display: DisplayConfig::default(),
            system: SystemConfig::default(),
            config_dir: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            kind: SourceKind::default(),
            base: PathBase::default(),
            resolution: default_source_resolution(),
            frame_count: default_frame_count(),
            fps: default_source_fps(),
        }
    }
}

impl Default for AbrConfig {
    fn default() -> Self {
        Self {
            renditions: default_renditions(),
            resize_filter: ResizeFilter::default(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_buffer_capacity(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            producer_idle_ms: default_producer_idle_ms(),
            render_interval_ms: default_render_interval_ms(),
        }
    }
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            counters_path: default_counters_path(),
            include_loopback: default_include_loopback(),
            normalize_per_second: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_audio_enabled(),
            program: default_audio_program(),
            args: default_audio_args(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sink: DisplayKind::default(),
            keyboard_quit: false,
            window_title: default_window_title(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
            plugin_path: None,
        }
    }
}

// Default value functions
fn default_source_path() -> String {
    "media/source.mp4".to_string()
}
fn default_source_resolution() -> (u32, u32) {
    (1920, 1080)
}
fn default_frame_count() -> u64 {
    900
}
fn default_source_fps() -> u32 {
    30
}

fn default_renditions() -> Vec<Rendition> {
    RenditionTable::standard().entries().to_vec()
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_sample_interval_ms() -> u64 {
    50
}
fn default_producer_idle_ms() -> u64 {
    10
}
fn default_render_interval_ms() -> u64 {
    15
}

fn default_counters_path() -> String {
    "/proc/net/dev".to_string()
}
fn default_include_loopback() -> bool {
    true
}

fn default_audio_enabled() -> bool {
    true
}
fn default_audio_program() -> String {
    "ffplay".to_string()
}
fn default_audio_args() -> Vec<String> {
    vec!["-nodisp".to_string(), "-autoexit".to_string()]
}

fn default_window_title() -> String {
    "Adaptive Video Player".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}
