use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No frame source could be opened; the session never leaves Idle.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("a measurement is already running")]
    AlreadyMeasuring,

    #[error("no measurement is running")]
    NotMeasuring,

    #[error("measurement worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, PulseError>;
