//! Error types for the bridge.
//!
//! Every fallible operation in the crate returns [`BridgeError`]. Errors carry
//! structured context so that they can be turned into `Error` protocol lines
//! for the consumer and into log records for the operator.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: malformed lines or payloads, out-of-range values
//! - **Buffer Errors**: caller supplied a destination of the wrong size
//! - **Transport Errors**: shared-memory open/read/write failures
//! - **Fatal Errors**: no sensor at startup, unacknowledged pings
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use bodylink::BridgeError;
//!
//! let error = BridgeError::transport_unavailable("KinectColorFrame", "mapping denied");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Malformed payload in {context}: {details} (token {token:?} at position {position})")]
    MalformedPayload { context: String, token: String, position: usize, details: String },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Invalid buffer size: expected {expected} elements, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    #[error("Shared frame buffer '{name}' unavailable: {reason}")]
    TransportUnavailable {
        name: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("No sensor device was found")]
    NoSensorAvailable,

    #[error("Consumer did not acknowledge {missed} consecutive pings")]
    WatchdogTimeout { missed: u32 },

    #[error("Recording file error: {path}")]
    Recording {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Recording format error in {path}: {details}")]
    RecordingFormat { path: PathBuf, details: String },

    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: String },

    #[error("Task '{task}' failed: {details}")]
    TaskFailed { task: String, details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::TransportUnavailable { .. } => true,
            BridgeError::Io(_) => true,
            BridgeError::MalformedPayload { .. } => false,
            BridgeError::Decode { .. } => false,
            BridgeError::InvalidBufferSize { .. } => false,
            BridgeError::NoSensorAvailable => false,
            BridgeError::WatchdogTimeout { .. } => false,
            BridgeError::Recording { .. } => false,
            BridgeError::RecordingFormat { .. } => false,
            BridgeError::ChannelClosed { .. } => false,
            BridgeError::TaskFailed { .. } => false,
        }
    }

    /// Returns whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::NoSensorAvailable | BridgeError::WatchdogTimeout { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::MalformedPayload { .. } => vec![
                "Check that producer and consumer use the same protocol revision",
                "Verify numeric fields use '.' as the decimal separator",
            ],
            BridgeError::Decode { .. } => vec![
                "Check joint ids are below the joint count",
                "Verify enumeration codes match the sensor SDK",
            ],
            BridgeError::InvalidBufferSize { .. } => {
                vec!["Allocate the destination with exactly one slot per joint"]
            }
            BridgeError::TransportUnavailable { .. } => vec![
                "Check shared memory permissions",
                "Verify producer and consumer agree on region names and sizes",
                "Retry on the next frame",
            ],
            BridgeError::NoSensorAvailable => vec![
                "Connect a sensor and restart the bridge",
                "Check the sensor runtime is installed",
            ],
            BridgeError::WatchdogTimeout { .. } => vec![
                "Ensure the consumer echoes ping lines back",
                "Increase the ping interval if the consumer is slow to start",
            ],
            BridgeError::Recording { .. } => {
                vec!["Check the recording file exists and is readable", "Check file permissions"]
            }
            BridgeError::RecordingFormat { .. } => vec![
                "Validate the recording YAML structure",
                "Check enumeration codes in the recording",
            ],
            BridgeError::ChannelClosed { .. } => {
                vec!["The peer process exited; restart the bridge with a live consumer"]
            }
            BridgeError::TaskFailed { .. } => {
                vec!["Check the log for a panic in the named task", "Restart the bridge"]
            }
            BridgeError::Io(_) => vec!["Check the standard streams are still open"],
        }
    }

    /// Helper constructor for malformed payload errors.
    pub fn malformed(
        context: impl Into<String>,
        token: impl Into<String>,
        position: usize,
        details: impl Into<String>,
    ) -> Self {
        BridgeError::MalformedPayload {
            context: context.into(),
            token: token.into(),
            position,
            details: details.into(),
        }
    }

    /// Helper constructor for decode errors.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for transport errors without an OS source.
    pub fn transport_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::TransportUnavailable { name: name.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors caused by an OS error.
    pub fn transport_io(
        name: impl Into<String>,
        reason: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        BridgeError::TransportUnavailable {
            name: name.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for tasks that panicked or were aborted.
    pub fn task_failed(task: impl Into<String>, details: impl std::fmt::Display) -> Self {
        BridgeError::TaskFailed { task: task.into(), details: details.to_string() }
    }

    /// Helper constructor for closed channels.
    pub fn channel_closed(channel: impl Into<String>) -> Self {
        BridgeError::ChannelClosed { channel: channel.into() }
    }
}
