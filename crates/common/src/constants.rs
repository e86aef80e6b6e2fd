//! Shared constants used across acourse crates.

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Default maximum part size for multipart uploads (100MB).
pub const DEFAULT_MAX_PART_SIZE: u64 = 100 * MIB;

/// Smallest part size S3 accepts for any part but the last (5MB).
pub const S3_MIN_PART_SIZE: u64 = 5 * MIB;

/// Default number of upload attempts per part.
pub const DEFAULT_PART_ATTEMPTS: u32 = 3;

/// Default number of files uploaded concurrently in one batch.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 10;

/// Number of leading bytes inspected when sniffing a content type.
pub const SNIFF_LEN: usize = 512;
