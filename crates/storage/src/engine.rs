//! Chunked multipart transfer of a single file.
//!
//! A file is uploaded as an ordered sequence of parts into one multipart
//! session:
//!
//! 1. Validate size and content type (no network)
//! 2. Open the session under `prefix + timestamp + "-" + filename`
//! 3. Upload parts sequentially, retrying each part up to the
//!    configured attempt count
//! 4. Complete the session with the ordered part list
//!
//! A part that fails on every attempt aborts the session and stops the
//! transfer. Cancellation is observed between and during part uploads
//! and also aborts the session. A failed completion call is reported
//! but the session is left for the store to expire.

use acourse_common::ProgressCallback;
use bytes::Bytes;

use crate::content_type::detect_content_type;
use crate::control::TransferControl;
use crate::error::{StorageError, UploadError};
use crate::parts::{key_timestamp, object_key, plan_parts};
use crate::rewrite::UrlRewriter;
use crate::traits::StorageClient;
use crate::types::{
    CompletedUpload, MultipartSession, PartDescriptor, PartProgress, UploadResult, UploadSettings,
    UploadTask,
};

/// Uploads one file per call as a multipart session.
pub struct ChunkedTransferEngine<'a, C: StorageClient> {
    client: &'a C,
    settings: &'a UploadSettings,
    rewriter: &'a UrlRewriter,
    control: &'a TransferControl,
    progress: Option<&'a dyn ProgressCallback<PartProgress>>,
}

impl<'a, C: StorageClient> ChunkedTransferEngine<'a, C> {
    /// Create an engine.
    ///
    /// # Arguments
    /// * `client` - Storage client, shared read-only
    /// * `settings` - Bucket, part size, retry and validation settings
    /// * `rewriter` - Maps storage locations to public URLs
    /// * `control` - Cancellation token and per-call timeout
    pub fn new(
        client: &'a C,
        settings: &'a UploadSettings,
        rewriter: &'a UrlRewriter,
        control: &'a TransferControl,
    ) -> Self {
        Self {
            client,
            settings,
            rewriter,
            control,
            progress: None,
        }
    }

    /// Report progress after every uploaded part.
    pub fn with_progress(mut self, progress: Option<&'a dyn ProgressCallback<PartProgress>>) -> Self {
        self.progress = progress;
        self
    }

    /// Upload one file. Failures are returned inside the result.
    pub async fn upload_file(&self, task: UploadTask) -> UploadResult {
        match self.transfer(&task).await {
            Ok((completed, parts_uploaded)) => {
                log::info!(
                    "File successfully uploaded: {} -> {}",
                    task.filename,
                    completed.key
                );
                let rewritten_url: String = self.rewriter.rewrite(&completed.location);
                UploadResult::succeeded(&task, completed, rewritten_url, parts_uploaded)
            }
            Err(error) => {
                log::warn!("Upload of {} failed: {}", task.filename, error);
                UploadResult::failed(task.ordinal, task.filename, error)
            }
        }
    }

    async fn transfer(&self, task: &UploadTask) -> Result<(CompletedUpload, usize), UploadError> {
        let content_type: &'static str = self.validate(task)?;

        if self.control.is_cancelled() {
            return Err(cancelled(task));
        }

        let key: String = object_key(&task.prefix, &key_timestamp(), &task.filename);
        let session: MultipartSession = self
            .control
            .deadline(
                "CreateMultipartUpload",
                self.client
                    .create_multipart_upload(&self.settings.bucket, &key, Some(content_type)),
            )
            .await
            .map_err(|source| UploadError::SessionOpen {
                key: key.clone(),
                source,
            })?;

        log::info!(
            "Created multipart upload {} for {}",
            session.upload_id,
            session.key
        );

        let parts: Vec<PartDescriptor> = match self.upload_parts(task, &session).await {
            Ok(parts) => parts,
            Err(cause) => return Err(self.abort(&session, cause).await),
        };

        log::debug!(
            "Completing upload {} with {} part(s)",
            session.upload_id,
            parts.len()
        );

        let completed: CompletedUpload = self
            .control
            .deadline(
                "CompleteMultipartUpload",
                self.client.complete_multipart_upload(&session, &parts),
            )
            .await
            .map_err(|source| UploadError::Completion {
                upload_id: session.upload_id.clone(),
                source,
            })?;

        Ok((completed, parts.len()))
    }

    /// Check the file before any network call; returns the sniffed type.
    fn validate(&self, task: &UploadTask) -> Result<&'static str, UploadError> {
        let reject = |message: String| UploadError::Validation {
            filename: task.filename.clone(),
            message,
        };

        if task.content.is_empty() {
            return Err(reject("file is empty".to_string()));
        }

        if let Some(limit) = self.settings.max_file_size {
            if task.size() > limit {
                return Err(reject(format!(
                    "file too large: {} bytes exceeds the {} byte limit",
                    task.size(),
                    limit
                )));
            }
        }

        let sniffed: &'static str = detect_content_type(&task.content);
        let checked: &str = task.content_type.as_deref().unwrap_or(sniffed);
        let allowed: &[String] = &self.settings.allowed_content_types;
        if !allowed.is_empty() && !allowed.iter().any(|t| t.eq_ignore_ascii_case(checked)) {
            return Err(reject(format!("file type {checked} is not supported")));
        }

        Ok(sniffed)
    }

    async fn upload_parts(
        &self,
        task: &UploadTask,
        session: &MultipartSession,
    ) -> Result<Vec<PartDescriptor>, UploadError> {
        let mut parts: Vec<PartDescriptor> = plan_parts(task.size(), self.settings.max_part_size);
        let part_count: usize = parts.len();
        let mut bytes_sent: u64 = 0;

        for part in parts.iter_mut() {
            if self.control.is_cancelled() {
                return Err(cancelled(task));
            }

            let data: Bytes = task.content.slice(part.range());
            let e_tag: String = self
                .upload_part_with_retry(task, session, part.part_number, data)
                .await?;
            part.e_tag = Some(e_tag);
            bytes_sent += part.length;

            if let Some(cb) = self.progress {
                let update = PartProgress {
                    ordinal: task.ordinal,
                    filename: task.filename.clone(),
                    part_number: part.part_number,
                    part_count,
                    bytes_sent,
                    total_bytes: task.size(),
                };
                if !cb.on_progress(&update) {
                    return Err(cancelled(task));
                }
            }
        }

        Ok(parts)
    }

    async fn upload_part_with_retry(
        &self,
        task: &UploadTask,
        session: &MultipartSession,
        part_number: i32,
        data: Bytes,
    ) -> Result<String, UploadError> {
        let max_attempts: u32 = self.settings.part_retry.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            let outcome: Result<String, StorageError> = self
                .control
                .guarded(
                    "UploadPart",
                    self.client.upload_part(session, part_number, data.clone()),
                )
                .await;

            match outcome {
                Ok(e_tag) => return Ok(e_tag),
                Err(StorageError::Cancelled) => return Err(cancelled(task)),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    log::warn!(
                        "Retrying upload of part #{} of {} (attempt {}/{}): {}",
                        part_number,
                        task.filename,
                        attempt,
                        max_attempts,
                        err
                    );
                    let delay = self.settings.part_retry.backoff(attempt);
                    if !delay.is_zero() && self.control.pause(delay).await.is_err() {
                        return Err(cancelled(task));
                    }
                    attempt += 1;
                }
                Err(source) => {
                    return Err(UploadError::PartFailed {
                        part_number,
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    /// Abort the session after `cause`. The abort is not cancellable.
    async fn abort(&self, session: &MultipartSession, cause: UploadError) -> UploadError {
        log::warn!(
            "Aborting multipart upload {} for {}: {}",
            session.upload_id,
            session.key,
            cause
        );

        match self
            .control
            .deadline(
                "AbortMultipartUpload",
                self.client.abort_multipart_upload(session),
            )
            .await
        {
            Ok(()) => cause,
            Err(source) => {
                log::warn!(
                    "Abort of multipart upload {} failed: {}",
                    session.upload_id,
                    source
                );
                UploadError::AbortFailed {
                    upload_id: session.upload_id.clone(),
                    cause: Box::new(cause),
                    source,
                }
            }
        }
    }
}

fn cancelled(task: &UploadTask) -> UploadError {
    UploadError::Cancelled {
        filename: task.filename.clone(),
    }
}
