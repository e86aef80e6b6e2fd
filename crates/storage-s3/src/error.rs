//! Mapping of AWS SDK errors onto `StorageError`.

use acourse_storage::StorageError;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Service error codes worth another attempt.
const RETRYABLE_CODES: &[&str] = &[
    "InternalError",
    "ServiceUnavailable",
    "SlowDown",
    "RequestTimeout",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// Classify an SDK error for an operation on `bucket`/`key`.
pub(crate) fn sdk_error<E, R>(err: SdkError<E, R>, bucket: &str, key: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message: String = DisplayErrorContext(&err).to_string();
    let transport_failure: bool = matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    );

    match err.code() {
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message,
            }
        }
        Some("NoSuchUpload" | "NoSuchKey" | "NoSuchBucket") => StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        Some(code) => StorageError::NetworkError {
            retryable: RETRYABLE_CODES.contains(&code),
            message,
        },
        None => StorageError::NetworkError {
            message,
            retryable: transport_failure,
        },
    }
}
