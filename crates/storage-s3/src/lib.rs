//! AWS SDK S3 backend for acourse storage.
//!
//! Provides [`S3StorageClient`], the credentialed `StorageClient` used by the
//! upload orchestrator to talk to S3 or an S3-compatible store.
//!
//! # Example
//!
//! ```ignore
//! use acourse_storage::{UploadOrchestrator, UploadSettings, UploadTask};
//! use acourse_storage_s3::S3StorageClient;
//!
//! let client = S3StorageClient::from_static_credentials(&access_key, &secret_key, "ap-southeast-1")?;
//! let settings = UploadSettings::new("course-assets").with_max_part_size(5 * 1024 * 1024);
//! let orchestrator = UploadOrchestrator::new(Arc::new(client), settings)?;
//!
//! let result = orchestrator
//!     .upload_single(UploadTask::new(0, "intro.mp4", bytes, "course-42/"))
//!     .await;
//! ```

mod client;
mod error;

pub use client::S3StorageClient;
