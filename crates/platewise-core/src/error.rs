//! Error types for the platewise analysis pipeline.
//!
//! Two families live here. [`Fault`] is the raw failure a collaborator call
//! produced (remote analysis, health sink, photo store); it is fed to the
//! classifier exactly once and never inspected again. The remaining enums are
//! ordinary operational errors for configuration, storage and dispatch.

use crate::jobs::JobState;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for platewise operations.
#[derive(Error, Debug)]
pub enum PlatewiseError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Photo store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Job dispatch errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// A failure raised by a collaborator call, before classification.
///
/// The variants describe the *shape* of the failure (timed out, carried an
/// HTTP status, could not be decoded, ...), never protocol internals.
#[derive(Error, Debug)]
pub enum Fault {
    /// The call did not complete within its deadline
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The remote end could not be reached or dropped the connection
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The remote end answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body was malformed or not what we expected
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Storage or health-data access was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A value produced by a collaborator is outside its allowed range
    #[error("{field} out of range: {value}")]
    OutOfRange { field: String, value: String },

    /// The analysis service found nothing it could identify as food
    #[error("No identifiable food in photo")]
    NoFoodDetected,

    /// The photo disappeared from the store while the job still referenced it
    #[error("Photo resource missing: {0}")]
    ResourceMissing(String),

    /// Low-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl Fault {
    /// HTTP status of a remote failure, the only part of a fault safe to log.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Fault::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<StoreError> for Fault {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing(id) => Fault::ResourceMissing(id),
            StoreError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Fault::PermissionDenied(e.to_string())
            }
            StoreError::Io(e) => Fault::Io(e),
            other => Fault::Other(other.to_string()),
        }
    }
}

/// Photo store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No photo with this id exists in the store
    #[error("Photo not found: {0}")]
    Missing(String),

    /// The id contains characters that could escape the store directory
    #[error("Invalid photo id: {0:?}")]
    InvalidId(String),

    /// The source file handed to `import` does not exist
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Metadata sidecar could not be (de)serialized
    #[error("Corrupt metadata for {id}: {source}")]
    Metadata {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when handing a photo to the job dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A job for this photo is already pending, in flight or retrying
    #[error("A job for photo {0} is already active")]
    AlreadyActive(String),

    /// The dispatcher has been shut down
    #[error("Dispatcher is shut down")]
    ShutDown,

    /// Resubmission target could not be loaded
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by the job state machine itself.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobError {
    /// The requested transition is not an edge of the state machine
    #[error("Illegal job transition {from:?} -> {to:?} for photo {photo_id}")]
    IllegalTransition {
        photo_id: String,
        from: JobState,
        to: JobState,
    },
}

/// Convenience type alias for platewise results.
pub type Result<T> = std::result::Result<T, PlatewiseError>;

/// Convenience type alias for photo store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
