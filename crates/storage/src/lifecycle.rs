//! Object deletion with consistency confirmation.

use std::time::Duration;

use tokio::time::Instant;

use crate::control::TransferControl;
use crate::error::UploadError;
use crate::traits::StorageClient;
use crate::types::WaitPolicy;

/// Floor for the delay between existence checks.
const MIN_POLL_DELAY: Duration = Duration::from_millis(1);

/// Deletes stored objects and waits until the store stops serving them.
pub struct ObjectLifecycle<'a, C: StorageClient> {
    client: &'a C,
    bucket: String,
    wait: WaitPolicy,
    control: TransferControl,
}

impl<'a, C: StorageClient> ObjectLifecycle<'a, C> {
    /// Create lifecycle operations for `bucket`.
    pub fn new(client: &'a C, bucket: impl Into<String>, wait: WaitPolicy) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            wait,
            control: TransferControl::default(),
        }
    }

    /// Apply a timeout to each individual delete / head call.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.control = TransferControl::new(call_timeout);
        self
    }

    /// Delete `key` and block until it is confirmed absent.
    ///
    /// Deleting a key that does not exist succeeds.
    pub async fn delete_object(&self, key: &str) -> Result<(), UploadError> {
        self.control
            .deadline("DeleteObject", self.client.delete_object(&self.bucket, key))
            .await
            .map_err(|source| UploadError::Delete {
                key: key.to_string(),
                source,
            })?;

        log::debug!("Deleted s3://{}/{}, waiting for absence", self.bucket, key);
        self.wait_until_absent(key).await
    }

    /// Delete every key, continuing past failures.
    pub async fn delete_objects<I, S>(&self, keys: I) -> Vec<(String, Result<(), UploadError>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut outcomes = Vec::new();
        for key in keys {
            let key: String = key.into();
            if key.is_empty() {
                continue;
            }
            let outcome = self.delete_object(&key).await;
            if let Err(ref err) = outcome {
                log::warn!("{}", err);
            }
            outcomes.push((key, outcome));
        }
        outcomes
    }

    /// Poll until `key` is absent, doubling the delay between checks.
    pub async fn wait_until_absent(&self, key: &str) -> Result<(), UploadError> {
        let started = Instant::now();
        let max_wait = Duration::from_millis(self.wait.max_wait_ms);
        let mut delay = Duration::from_millis(self.wait.min_delay_ms).max(MIN_POLL_DELAY);
        let max_delay = Duration::from_millis(self.wait.max_delay_ms).max(delay);

        loop {
            match self
                .control
                .deadline("HeadObject", self.client.head_object(&self.bucket, key))
                .await
            {
                Ok(None) => {
                    log::debug!("Confirmed s3://{}/{} is absent", self.bucket, key);
                    return Ok(());
                }
                Ok(Some(_)) => {}
                Err(err) => log::debug!("Existence check for {} failed: {}", key, err),
            }

            let elapsed: Duration = started.elapsed();
            if elapsed >= max_wait {
                return Err(UploadError::ConsistencyTimeout {
                    key: key.to_string(),
                    waited_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }

            tokio::time::sleep(delay.min(max_wait - elapsed)).await;
            delay = (delay * 2).min(max_delay);
        }
    }
}
