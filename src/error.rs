//! Bridge error types
//!
//! Provides structured error types for camera bridge operations.

use std::fmt;
use std::time::Duration;

use crate::config::WidgetKind;
use crate::driver::StatusCode;

/// Camera bridge errors
#[derive(Debug, Clone)]
pub enum GpError {
    /// Native handle could not be opened (device unplugged, busy, wrong port)
    DeviceOpen {
        model: String,
        port: String,
        status: StatusCode,
    },
    /// Native call returned a negative status during capture or config I/O
    Io {
        operation: &'static str,
        status: StatusCode,
    },
    /// Config key path does not resolve to an existing widget
    ConfigLookup { key: String },
    /// Supplied value's type is incompatible with the target widget kind
    TypeMismatch {
        key: String,
        kind: WidgetKind,
        supplied: &'static str,
    },
    /// Malformed call arguments, detected before any work is scheduled
    Usage(String),
    /// Operation did not complete within its configured timeout
    OperationTimeout {
        operation: &'static str,
        duration: Duration,
    },
    /// Worker task failed to report a result (panicked or was torn down)
    WorkerGone(String),
}

impl std::error::Error for GpError {}

impl fmt::Display for GpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpError::DeviceOpen {
                model,
                port,
                status,
            } => {
                write!(f, "Failed to open '{}' on {}: {}", model, port, status)
            }
            GpError::Io { operation, status } => {
                write!(f, "Operation '{}' failed: {}", operation, status)
            }
            GpError::ConfigLookup { key } => {
                write!(f, "Config key not found: {}", key)
            }
            GpError::TypeMismatch {
                key,
                kind,
                supplied,
            } => {
                write!(
                    f,
                    "Type mismatch for {}: widget kind {:?} does not accept {} values",
                    key, kind, supplied
                )
            }
            GpError::Usage(msg) => write!(f, "Usage error: {}", msg),
            GpError::OperationTimeout {
                operation,
                duration,
            } => {
                write!(
                    f,
                    "Operation '{}' timed out after {:?}",
                    operation, duration
                )
            }
            GpError::WorkerGone(msg) => write!(f, "Worker task failed: {}", msg),
        }
    }
}

impl From<GpError> for String {
    fn from(err: GpError) -> String {
        err.to_string()
    }
}

/// Result type for camera bridge operations
pub type GpResult<T> = Result<T, GpError>;
