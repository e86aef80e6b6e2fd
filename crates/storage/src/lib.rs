//! Chunked multipart upload engine for course media.
//!
//! This crate pushes course videos and images into an S3-compatible
//! object store through a platform-agnostic [`StorageClient`] trait:
//!
//! - **ChunkedTransferEngine** - one file as an ordered multipart session,
//!   with bounded per-part retry and abort on unrecoverable failure
//! - **UploadOrchestrator** - bounded parallel fan-out over a batch with
//!   per-file results correlated by ordinal, one spawned task per file
//! - **ObjectLifecycle** - deletion with wait-for-absence confirmation
//! - **UrlRewriter** - storage origin to CDN URL mapping
//!
//! The AWS SDK backend lives in the `acourse-storage-s3` crate.

mod content_type;
mod control;
mod engine;
mod error;
mod lifecycle;
mod parts;
mod rewrite;
mod traits;
mod types;
mod upload;

#[cfg(test)]
mod test_support;

pub use content_type::{detect_content_type, OCTET_STREAM, TEXT_PLAIN};
pub use control::TransferControl;
pub use engine::ChunkedTransferEngine;
pub use error::{StorageError, UploadError};
pub use lifecycle::ObjectLifecycle;
pub use parts::{expected_part_count, key_timestamp, object_key, plan_parts};
pub use rewrite::UrlRewriter;
pub use traits::StorageClient;
pub use types::{
    AwsCredentials, CdnSettings, CompletedUpload, MultipartSession, PartDescriptor, PartProgress,
    RetrySettings, StorageSettings, TransferStatistics, UploadResult, UploadSettings, UploadTask,
    WaitPolicy,
};
pub use upload::{ReplaceOutcome, SharedProgress, UploadOrchestrator};

pub use bytes::Bytes;
pub use tokio_util::sync::CancellationToken;
