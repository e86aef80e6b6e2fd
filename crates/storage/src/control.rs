//! Cancellation and per-call deadlines for store calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::StorageError;

/// Cancellation token and per-call timeout shared by every transfer of
/// a batch.
#[derive(Debug, Clone, Default)]
pub struct TransferControl {
    cancel: CancellationToken,
    call_timeout: Option<Duration>,
}

impl TransferControl {
    /// Create a control with an optional per-call timeout.
    pub fn new(call_timeout: Option<Duration>) -> Self {
        Self {
            cancel: CancellationToken::new(),
            call_timeout,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels every transfer using this control.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all transfers using this control.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a store call under the per-call timeout only.
    pub async fn deadline<T, F>(&self, operation: &str, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(StorageError::Timeout {
                    operation: operation.to_string(),
                })
            }),
            None => call.await,
        }
    }

    /// Run a store call under the per-call timeout, giving up early if
    /// the transfer is cancelled.
    pub async fn guarded<T, F>(&self, operation: &str, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled),
            result = self.deadline(operation, call) => result,
        }
    }

    /// Sleep for `delay` unless cancelled first.
    pub async fn pause(&self, delay: Duration) -> Result<(), StorageError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
