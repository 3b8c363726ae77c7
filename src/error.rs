use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbrSimError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Source unavailable at {path}: {details}")]
    SourceUnavailable { path: String, details: String },

    #[error("Host network counters unavailable: {details}")]
    HostMetricUnavailable { details: String },

    #[error("External process '{program}' failed: {source}")]
    ExternalProcess {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error: {details}")]
    Decode { details: String },

    #[error("Display error: {details}")]
    Display { details: String },

    #[error("System error: {message}")]
    System { message: String },
}

impl AbrSimError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn source_unavailable<P: Into<String>, D: Into<String>>(path: P, details: D) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn host_metric<S: Into<String>>(details: S) -> Self {
        Self::HostMetricUnavailable {
            details: details.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, AbrSimError>;
