//! Storage traits/interfaces for S3 operations.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;
use crate::types::{CompletedUpload, MultipartSession, PartDescriptor};

/// Low-level object store operations - implemented by each backend.
///
/// Implementations are shared read-only across concurrent uploads.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Open a multipart upload session.
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<MultipartSession, StorageError>;

    /// Upload one part and return its ETag.
    ///
    /// # Arguments
    /// * `session` - Open multipart session
    /// * `part_number` - 1-based part number
    /// * `data` - Part bytes, a shared slice of the file content
    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: i32,
        data: Bytes,
    ) -> Result<String, StorageError>;

    /// Commit a session from its parts, in ascending part number order.
    async fn complete_multipart_upload(
        &self,
        session: &MultipartSession,
        parts: &[PartDescriptor],
    ) -> Result<CompletedUpload, StorageError>;

    /// Discard a session and any parts already uploaded to it.
    async fn abort_multipart_upload(&self, session: &MultipartSession)
        -> Result<(), StorageError>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Check if an object exists and return its size.
    /// Returns None if object doesn't exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError>;
}
