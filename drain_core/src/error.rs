use thiserror::Error;

/// Failures reading the weighing device. Always recoverable: the poll cycle is skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("invalid reading: {0}")]
    InvalidReading(String),
}

/// Backend failed to record a start/stop event. Never reverses a phase transition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    #[error("backend rejected record (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("backend unavailable: {0}")]
    Transient(String),
}

impl SyncError {
    /// 4xx rejections will fail the same way again; only transient failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient(_))
    }
}

/// Operator action violated a precondition. No state was mutated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("monitoring has not started")]
    NotStarted,
    #[error("session already finished")]
    AlreadyFinished,
    #[error("initial weight must be a positive, finite mass (got {0} kg)")]
    InvalidInitialWeight(f64),
    #[error("initial weight cannot change once drainage has started")]
    DrainageInProgress,
    #[error("session is still active; stop or cancel it before submitting")]
    SessionActive,
}

#[derive(Debug, Error, Clone)]
pub enum DrainError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("rejected: {0}")]
    Validation(#[from] ValidationError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing weight source")]
    MissingSource,
    #[error("missing device probe")]
    MissingProbe,
    #[error("missing session recorder")]
    MissingRecorder,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
