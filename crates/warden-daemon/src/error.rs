//! Error types for the Warden daemon

use thiserror::Error;

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Errors that can occur in the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] warden_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Range sensor produced no echo within its bound
    #[error("Sensor measurement timed out")]
    SensorTimeout,

    /// Range sensor hardware fault
    #[error("Sensor fault: {0}")]
    SensorFault(String),

    /// Credential store read/write failed
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for DaemonError {
    fn from(e: serde_json::Error) -> Self {
        DaemonError::Serialization(e.to_string())
    }
}

impl From<crate::sensor::SensorError> for DaemonError {
    fn from(e: crate::sensor::SensorError) -> Self {
        match e {
            crate::sensor::SensorError::Timeout => DaemonError::SensorTimeout,
            crate::sensor::SensorError::Fault(reason) => DaemonError::SensorFault(reason),
        }
    }
}
