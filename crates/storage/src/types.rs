//! Shared data structures for storage operations.

use std::ops::Range;
use std::time::Duration;

use acourse_common::{
    DEFAULT_MAX_PART_SIZE, DEFAULT_PART_ATTEMPTS, DEFAULT_UPLOAD_CONCURRENCY, S3_MIN_PART_SIZE,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, UploadError};

/// Client construction settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// AWS region.
    pub region: String,
    /// Static credentials. `None` falls back to the default provider chain.
    pub credentials: Option<AwsCredentials>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            region: "ap-southeast-1".into(),
            credentials: None,
            endpoint_url: None,
        }
    }
}

impl StorageSettings {
    /// Settings with static credentials.
    pub fn with_static_credentials(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            credentials: Some(AwsCredentials {
                access_key_id: access_key_id.into(),
                secret_access_key: secret_access_key.into(),
                session_token: None,
            }),
            endpoint_url: None,
        }
    }

    /// Point the client at an S3-compatible endpoint.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// AWS credentials.
#[derive(Clone, Deserialize)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Retry settings for part uploads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of attempts per part, first attempt included.
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Backoff multiplier (exponential backoff).
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PART_ATTEMPTS,
            initial_backoff_ms: 100,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    /// Retry `max_attempts` times with no delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is 1-based.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent: i32 = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay: f64 = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms as f64) as u64)
    }
}

/// How long to wait for a deleted object to disappear.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// First delay between existence checks.
    pub min_delay_ms: u64,
    /// Cap on the delay between checks.
    pub max_delay_ms: u64,
    /// Total time allowed before giving up.
    pub max_wait_ms: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: 5_000,
            max_delay_ms: 120_000,
            max_wait_ms: 300_000,
        }
    }
}

/// Storage origin and CDN prefixes for public URL rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnSettings {
    /// Storage origin, e.g. `https://my-bucket.s3.ap-southeast-1.amazonaws.com`.
    pub origin: String,
    /// CDN replacement, e.g. `https://d1234.cloudfront.net`.
    pub cdn: String,
}

/// Upload engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Destination bucket.
    pub bucket: String,
    /// Maximum bytes per part.
    pub max_part_size: u64,
    /// Per-part retry policy.
    pub part_retry: RetrySettings,
    /// Largest accepted file, if any.
    pub max_file_size: Option<u64>,
    /// Accepted content types. Empty accepts everything.
    pub allowed_content_types: Vec<String>,
    /// Files uploaded concurrently within one batch.
    pub max_concurrency: usize,
    /// Timeout for each individual store call.
    pub call_timeout_ms: Option<u64>,
    /// Public URL rewriting.
    pub cdn: Option<CdnSettings>,
    /// Delete confirmation policy.
    pub delete_wait: WaitPolicy,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            max_part_size: DEFAULT_MAX_PART_SIZE,
            part_retry: RetrySettings::default(),
            max_file_size: None,
            allowed_content_types: Vec::new(),
            max_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            call_timeout_ms: None,
            cdn: None,
            delete_wait: WaitPolicy::default(),
        }
    }
}

impl UploadSettings {
    /// Settings for `bucket` with defaults elsewhere.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set the maximum part size.
    pub fn with_max_part_size(mut self, max_part_size: u64) -> Self {
        self.max_part_size = max_part_size;
        self
    }

    /// Set the per-part retry policy.
    pub fn with_part_retry(mut self, part_retry: RetrySettings) -> Self {
        self.part_retry = part_retry;
        self
    }

    /// Set the file size ceiling.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    /// Set the content type allow-list.
    pub fn with_allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the worker pool size.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Enable CDN rewriting.
    pub fn with_cdn(mut self, origin: impl Into<String>, cdn: impl Into<String>) -> Self {
        self.cdn = Some(CdnSettings {
            origin: origin.into(),
            cdn: cdn.into(),
        });
        self
    }

    /// Set the delete confirmation policy.
    pub fn with_delete_wait(mut self, delete_wait: WaitPolicy) -> Self {
        self.delete_wait = delete_wait;
        self
    }

    /// Per-call timeout as a `Duration`.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), StorageError> {
        let problem: Option<&str> = if self.bucket.is_empty() {
            Some("bucket name is empty")
        } else if self.max_part_size == 0 {
            Some("max_part_size must be greater than zero")
        } else if self.max_concurrency == 0 {
            Some("max_concurrency must be greater than zero")
        } else {
            None
        };

        match problem {
            Some(message) => Err(StorageError::InvalidConfig {
                message: message.to_string(),
            }),
            None => {
                if self.max_part_size < S3_MIN_PART_SIZE {
                    log::warn!(
                        "max_part_size {} is below the S3 minimum of {} bytes; \
                         multi-part files will be rejected by S3",
                        self.max_part_size,
                        S3_MIN_PART_SIZE
                    );
                }
                Ok(())
            }
        }
    }
}

/// An open multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSession {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// 1-based part number.
    pub part_number: i32,
    /// Byte offset within the file.
    pub offset: u64,
    /// Length of this part in bytes.
    pub length: u64,
    /// ETag returned by the store, set once the part is uploaded.
    pub e_tag: Option<String>,
}

impl PartDescriptor {
    /// Byte range covered by this part.
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize
    }
}

/// Store response to a completed multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    /// Raw storage URL of the object.
    pub location: String,
    /// Stored object key.
    pub key: String,
}

/// A file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadTask {
    /// Caller-assigned position within the batch.
    pub ordinal: usize,
    /// Original file name.
    pub filename: String,
    /// Full file content. Parts are zero-copy slices of it.
    pub content: Bytes,
    /// Key prefix, e.g. `"course-42/"`.
    pub prefix: String,
    /// Content type declared by the caller, if any.
    pub content_type: Option<String>,
}

impl UploadTask {
    /// Create a task.
    pub fn new(
        ordinal: usize,
        filename: impl Into<String>,
        content: impl Into<Bytes>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            ordinal,
            filename: filename.into(),
            content: content.into(),
            prefix: prefix.into(),
            content_type: None,
        }
    }

    /// Declare the content type sent by the client.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Build tasks for a batch, numbering ordinals in input order.
    pub fn batch<I, N, B>(prefix: &str, files: I) -> Vec<UploadTask>
    where
        I: IntoIterator<Item = (N, B)>,
        N: Into<String>,
        B: Into<Bytes>,
    {
        files
            .into_iter()
            .enumerate()
            .map(|(ordinal, (filename, content))| UploadTask::new(ordinal, filename, content, prefix))
            .collect()
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Outcome of uploading one file.
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Ordinal of the originating task.
    pub ordinal: usize,
    pub filename: String,
    pub success: bool,
    /// Stored object key; empty on failure.
    pub storage_key: String,
    /// Raw storage URL; empty on failure.
    pub location: String,
    /// Public CDN URL; empty on failure.
    pub rewritten_url: String,
    /// Human-readable outcome.
    pub message: String,
    /// Bytes committed to the store.
    pub bytes_transferred: u64,
    /// Parts committed to the store.
    pub parts_uploaded: usize,
    /// The failure, when `success` is false.
    pub error: Option<UploadError>,
}

impl UploadResult {
    /// Result for a completed upload.
    pub fn succeeded(
        task: &UploadTask,
        completed: CompletedUpload,
        rewritten_url: String,
        parts_uploaded: usize,
    ) -> Self {
        Self {
            ordinal: task.ordinal,
            filename: task.filename.clone(),
            success: true,
            storage_key: completed.key,
            location: completed.location,
            rewritten_url,
            message: format!("File {} successfully uploaded", task.filename),
            bytes_transferred: task.size(),
            parts_uploaded,
            error: None,
        }
    }

    /// Result for a failed upload.
    pub fn failed(ordinal: usize, filename: impl Into<String>, error: UploadError) -> Self {
        Self {
            ordinal,
            filename: filename.into(),
            success: false,
            storage_key: String::new(),
            location: String::new(),
            rewritten_url: String::new(),
            message: error.to_string(),
            bytes_transferred: 0,
            parts_uploaded: 0,
            error: Some(error),
        }
    }
}

/// Progress update emitted after each uploaded part.
#[derive(Debug, Clone)]
pub struct PartProgress {
    pub ordinal: usize,
    pub filename: String,
    pub part_number: i32,
    pub part_count: usize,
    /// Bytes uploaded so far for this file.
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

/// Aggregated statistics for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStatistics {
    pub files_processed: u64,
    pub files_succeeded: u64,
    pub files_failed: u64,
    pub bytes_transferred: u64,
    pub parts_uploaded: u64,
}

impl TransferStatistics {
    /// Summarize a batch of results.
    pub fn from_results(results: &[UploadResult]) -> Self {
        results.iter().fold(Self::default(), |mut stats, result| {
            stats.merge(Self::from_result(result));
            stats
        })
    }

    fn from_result(result: &UploadResult) -> Self {
        Self {
            files_processed: 1,
            files_succeeded: u64::from(result.success),
            files_failed: u64::from(!result.success),
            bytes_transferred: result.bytes_transferred,
            parts_uploaded: result.parts_uploaded as u64,
        }
    }

    /// Merge another statistics into this one.
    pub fn merge(&mut self, other: Self) {
        self.files_processed += other.files_processed;
        self.files_succeeded += other.files_succeeded;
        self.files_failed += other.files_failed;
        self.bytes_transferred += other.bytes_transferred;
        self.parts_uploaded += other.parts_uploaded;
    }
}
