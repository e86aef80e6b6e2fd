//! Error types for storage operations.

use thiserror::Error;

/// Errors returned by a [`StorageClient`](crate::StorageClient) call.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Object or upload session not found.
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Access denied.
    #[error("Access denied to s3://{bucket}/{key}: {message}")]
    AccessDenied {
        bucket: String,
        key: String,
        message: String,
    },

    /// Network or service error.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// A store call exceeded the configured per-call timeout.
    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },

    /// Operation cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Static credentials could not be materialized.
    #[error("Invalid credentials: {message}")]
    Credential { message: String },

    /// The client session could not be constructed.
    #[error("Could not construct storage session: {message}")]
    Session { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::Timeout { .. } => true,
            StorageError::NotFound { .. }
            | StorageError::AccessDenied { .. }
            | StorageError::Cancelled
            | StorageError::Credential { .. }
            | StorageError::Session { .. }
            | StorageError::InvalidConfig { .. }
            | StorageError::Other { .. } => false,
        }
    }

    /// Build a retryable network error.
    pub fn transient(message: impl Into<String>) -> Self {
        StorageError::NetworkError {
            message: message.into(),
            retryable: true,
        }
    }
}

/// Per-file failure of an upload or lifecycle operation.
///
/// Upload failures are returned as data inside
/// [`UploadResult`](crate::UploadResult), never raised across a batch.
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    /// The file was rejected before any network call.
    #[error("Validation failed for {filename}: {message}")]
    Validation { filename: String, message: String },

    /// The multipart session could not be opened.
    #[error("Could not open multipart upload for {key}: {source}")]
    SessionOpen {
        key: String,
        #[source]
        source: StorageError,
    },

    /// A part failed on every attempt (or with a non-retryable error).
    /// The session was aborted successfully.
    #[error("Part {part_number} failed after {attempts} attempt(s): {source}")]
    PartFailed {
        part_number: i32,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    /// Aborting the session failed after an earlier failure.
    /// Both causes are kept.
    #[error("Abort of upload {upload_id} failed: {source}; original failure: {cause}")]
    AbortFailed {
        upload_id: String,
        cause: Box<UploadError>,
        #[source]
        source: StorageError,
    },

    /// All parts were uploaded but the completion call failed.
    #[error("Could not complete upload {upload_id}: {source}")]
    Completion {
        upload_id: String,
        #[source]
        source: StorageError,
    },

    /// The transfer was cancelled. The session was aborted.
    #[error("Upload of {filename} cancelled")]
    Cancelled { filename: String },

    /// The task running the transfer stopped without producing a result.
    #[error("Upload of {filename} interrupted: {message}")]
    Interrupted { filename: String, message: String },

    /// The delete request itself failed. The object is untouched.
    #[error("Could not delete {key}: {source}")]
    Delete {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The delete succeeded but absence was not confirmed in time.
    #[error("Deleted {key} but it was still visible after {waited_ms}ms")]
    ConsistencyTimeout { key: String, waited_ms: u64 },
}
