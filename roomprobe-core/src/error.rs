//! Error types for the roomprobe harness

use std::time::Duration;
use thiserror::Error;

/// Main error type for roomprobe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Configuration field with the invalid value
        field: String,
        /// Reason the value was rejected
        reason: String,
    },

    /// Token issuance failed
    #[error("Token issuance failed: {reason}")]
    TokenIssuance {
        /// Reason for issuance failure
        reason: String,
    },

    /// Room admin request failed
    #[error("Room admin request failed for {room}: {reason}")]
    Admin {
        /// Room the request was about
        room: String,
        /// Reason for the failure
        reason: String,
    },

    /// Connection error
    #[error("Connection failed for room {room}: {reason}")]
    Connection {
        /// Room the connection was for
        room: String,
        /// Reason for connection failure
        reason: String,
    },

    /// Signaling error
    #[error("Signaling error: {reason}")]
    Signaling {
        /// Reason for signaling error
        reason: String,
    },

    /// A bounded wait elapsed its deadline
    #[error("Timed out waiting for {operation} after {waited:?}")]
    WaitTimeout {
        /// Operation that was being waited on
        operation: String,
        /// How long the wait lasted
        waited: Duration,
    },

    /// A bounded wait exhausted its attempt budget
    #[error("Gave up waiting for {operation} after {attempts} attempts")]
    WaitExhausted {
        /// Operation that was being waited on
        operation: String,
        /// How many events were inspected before giving up
        attempts: u32,
    },

    /// A wait was cancelled by its cancellation token
    #[error("Wait for {operation} was cancelled")]
    WaitCancelled {
        /// Operation that was being waited on
        operation: String,
    },

    /// The room event bus closed while a waiter was attached
    #[error("Room event bus closed while waiting for {operation}")]
    EventBusClosed {
        /// Operation that was being waited on
        operation: String,
    },

    /// A subscription event fired but no media stream materialized
    #[error("Track {track_sid} reported subscribed but no media stream materialized")]
    TrackResolution {
        /// Track sid the subscription was for
        track_sid: String,
    },

    /// Discovery completed with no usable stream
    #[error("Discovery finished without a usable {what} stream")]
    StreamAbsent {
        /// What kind of stream was expected
        what: String,
    },

    /// Snapshot encoding failed
    #[error("Encoding failed: {reason}")]
    Encoding {
        /// Reason for failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ProbeError::MissingConfiguration { .. } => "MISSING_CONFIGURATION",
            ProbeError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ProbeError::TokenIssuance { .. } => "TOKEN_ISSUANCE_FAILED",
            ProbeError::Admin { .. } => "ADMIN_REQUEST_FAILED",
            ProbeError::Connection { .. } => "CONNECTION_FAILED",
            ProbeError::Signaling { .. } => "SIGNALING_ERROR",
            ProbeError::WaitTimeout { .. } => "WAIT_TIMEOUT",
            ProbeError::WaitExhausted { .. } => "WAIT_EXHAUSTED",
            ProbeError::WaitCancelled { .. } => "WAIT_CANCELLED",
            ProbeError::EventBusClosed { .. } => "EVENT_BUS_CLOSED",
            ProbeError::TrackResolution { .. } => "TRACK_RESOLUTION_FAILED",
            ProbeError::StreamAbsent { .. } => "STREAM_ABSENT",
            ProbeError::Encoding { .. } => "ENCODING_FAILED",
            ProbeError::Io(..) => "IO_ERROR",
        }
    }
}
