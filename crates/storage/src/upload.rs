//! Upload orchestration for course media.
//!
//! This module fans a batch of files out to a bounded pool of concurrent
//! transfers, each driven by a [`ChunkedTransferEngine`], and gathers one
//! [`UploadResult`] per file:
//!
//! - At most `max_concurrency` files are in flight at once
//! - A failing file never affects its siblings
//! - Results are correlated to inputs by `ordinal`, never by position
//! - A shared cancellation token stops every in-flight transfer
//! - Dropping a batch future aborts its in-flight sessions
//!
//! # Example
//!
//! ```ignore
//! use acourse_storage::{UploadOrchestrator, UploadSettings, UploadTask};
//!
//! let orchestrator = UploadOrchestrator::new(Arc::new(client), UploadSettings::new("course-videos"))?;
//! let tasks = UploadTask::batch("course-42/", files);
//! for result in orchestrator.upload_batch(tasks).await {
//!     println!("{} -> {}: {}", result.ordinal, result.rewritten_url, result.message);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use acourse_common::ProgressCallback;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::control::TransferControl;
use crate::engine::ChunkedTransferEngine;
use crate::error::{StorageError, UploadError};
use crate::lifecycle::ObjectLifecycle;
use crate::rewrite::UrlRewriter;
use crate::traits::StorageClient;
use crate::types::{PartProgress, TransferStatistics, UploadResult, UploadSettings, UploadTask};

/// Shared per-part progress callback.
pub type SharedProgress = Arc<dyn ProgressCallback<PartProgress>>;

/// Outcome of replacing a stored object with a new upload.
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    /// Result of uploading the replacement.
    pub upload: UploadResult,
    /// Deletion of the old object; `None` when the upload failed and
    /// the old object was kept.
    pub old_object: Option<Result<(), UploadError>>,
}

/// High-level upload operations using any StorageClient implementation.
///
/// Every file of a batch runs as its own spawned task. Dropping the
/// future returned by [`upload_batch`](Self::upload_batch) cancels the
/// batch: in-flight files abort their sessions and queued files never
/// start.
pub struct UploadOrchestrator<C: StorageClient + 'static> {
    /// The storage client for S3 operations.
    client: Arc<C>,
    /// Upload settings.
    settings: Arc<UploadSettings>,
    /// Storage-origin to CDN rewriting.
    rewriter: Arc<UrlRewriter>,
    /// Cancellation and per-call timeout.
    control: TransferControl,
    /// Optional per-part progress callback.
    progress: Option<SharedProgress>,
}

impl<C: StorageClient + 'static> UploadOrchestrator<C> {
    /// Create a new upload orchestrator.
    ///
    /// # Arguments
    /// * `client` - Storage client for S3 operations
    /// * `settings` - Upload settings; rejected if invalid
    pub fn new(client: Arc<C>, settings: UploadSettings) -> Result<Self, StorageError> {
        settings.validate()?;
        let rewriter = UrlRewriter::from_settings(settings.cdn.as_ref());
        let control = TransferControl::new(settings.call_timeout());

        Ok(Self {
            client,
            settings: Arc::new(settings),
            rewriter: Arc::new(rewriter),
            control,
            progress: None,
        })
    }

    /// Report per-part progress; returning `false` cancels that file.
    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Cancel transfers when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.control = self.control.with_cancellation(token);
        self
    }

    /// Token that cancels every transfer started by this orchestrator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.control.token()
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Engine that uploads single files with this orchestrator's settings.
    ///
    /// The engine runs inside the caller's future; prefer
    /// [`upload_single`](Self::upload_single) unless the caller keeps the
    /// future alive until it resolves.
    pub fn engine(&self) -> ChunkedTransferEngine<'_, C> {
        ChunkedTransferEngine::new(
            self.client.as_ref(),
            &self.settings,
            &self.rewriter,
            &self.control,
        )
            .with_progress(self.progress.as_deref())
    }

    /// Delete operations on the configured bucket.
    pub fn lifecycle(&self) -> ObjectLifecycle<'_, C> {
        ObjectLifecycle::new(
            self.client.as_ref(),
            self.settings.bucket.clone(),
            self.settings.delete_wait.clone(),
        )
        .with_call_timeout(self.settings.call_timeout())
    }

    /// Upload every task and return one result per task, sorted by ordinal.
    ///
    /// At most `max_concurrency` files run at once, each on its own task.
    /// Per-file failures are reported in the results, never raised.
    pub async fn upload_batch(&self, tasks: Vec<UploadTask>) -> Vec<UploadResult> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let total: usize = tasks.len();
        let max_concurrency: usize = self.settings.max_concurrency.max(1);

        log::info!(
            "Uploading {} file(s) to {} with {} worker(s)",
            total,
            self.settings.bucket,
            max_concurrency.min(total)
        );

        // Cancelled when this future completes or is dropped.
        let batch_token: CancellationToken = self.control.token().child_token();
        let _batch_guard = batch_token.clone().drop_guard();
        let control: TransferControl = self.control.clone().with_cancellation(batch_token);

        let mut results: Vec<UploadResult> = stream::iter(tasks)
            .map(|task| self.spawn_transfer(task, control.clone()))
            .buffer_unordered(max_concurrency)
            .collect()
            .await;

        results.sort_by_key(|r| r.ordinal);

        let stats = TransferStatistics::from_results(&results);
        log::info!(
            "Batch finished: {} succeeded, {} failed, {} bytes in {} part(s)",
            stats.files_succeeded,
            stats.files_failed,
            stats.bytes_transferred,
            stats.parts_uploaded
        );

        results
    }

    /// Start one file on its own task and resolve to its result.
    fn spawn_transfer(
        &self,
        task: UploadTask,
        control: TransferControl,
    ) -> impl Future<Output = UploadResult> {
        let ordinal: usize = task.ordinal;
        let filename: String = task.filename.clone();
        let client: Arc<C> = Arc::clone(&self.client);
        let settings: Arc<UploadSettings> = Arc::clone(&self.settings);
        let rewriter: Arc<UrlRewriter> = Arc::clone(&self.rewriter);
        let progress: Option<SharedProgress> = self.progress.clone();

        let handle = tokio::spawn(async move {
            ChunkedTransferEngine::new(&*client, &settings, &rewriter, &control)
                .with_progress(progress.as_deref())
                .upload_file(task)
                .await
        });

        async move {
            handle.await.unwrap_or_else(|err| {
                log::error!("Upload task for {} stopped: {}", filename, err);
                let error = UploadError::Interrupted {
                    filename: filename.clone(),
                    message: err.to_string(),
                };
                UploadResult::failed(ordinal, filename, error)
            })
        }
    }

    /// Upload a single file through the same path as a batch.
    pub async fn upload_single(&self, task: UploadTask) -> UploadResult {
        let ordinal: usize = task.ordinal;
        let filename: String = task.filename.clone();

        self.upload_batch(vec![task])
            .await
            .pop()
            .unwrap_or_else(|| {
                let error = UploadError::Cancelled {
                    filename: filename.clone(),
                };
                UploadResult::failed(ordinal, filename, error)
            })
    }

    /// Upload named files under `prefix`, numbering them in input order.
    pub async fn upload_files<I, N, B>(&self, prefix: &str, files: I) -> Vec<UploadResult>
    where
        I: IntoIterator<Item = (N, B)>,
        N: Into<String>,
        B: Into<bytes::Bytes>,
    {
        self.upload_batch(UploadTask::batch(prefix, files)).await
    }

    /// Upload a replacement, then delete `old_key` if the upload succeeded.
    pub async fn replace_object(&self, task: UploadTask, old_key: &str) -> ReplaceOutcome {
        let upload: UploadResult = self.upload_single(task).await;

        let old_object = if upload.success && !old_key.is_empty() {
            Some(self.lifecycle().delete_object(old_key).await)
        } else {
            None
        };

        ReplaceOutcome { upload, old_object }
    }
}
