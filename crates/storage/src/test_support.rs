//! In-memory storage client for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;
use crate::traits::StorageClient;
use crate::types::{CompletedUpload, MultipartSession, PartDescriptor};

/// A recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Create { key: String, content_type: Option<String> },
    UploadPart { key: String, part_number: i32, length: usize },
    Complete { key: String, part_numbers: Vec<i32> },
    Abort { key: String },
    Delete { key: String },
    Head { key: String },
}

impl Call {
    pub(crate) fn key(&self) -> &str {
        match self {
            Call::Create { key, .. }
            | Call::UploadPart { key, .. }
            | Call::Complete { key, .. }
            | Call::Abort { key }
            | Call::Delete { key }
            | Call::Head { key } => key,
        }
    }
}

struct PartFault {
    key_suffix: String,
    part_number: Option<i32>,
    remaining: Option<u32>,
    error: StorageError,
}

struct Session {
    bucket: String,
    key: String,
    parts: BTreeMap<i32, Vec<u8>>,
}

#[derive(Default)]
struct State {
    objects: HashMap<(String, String), Vec<u8>>,
    sessions: HashMap<String, Session>,
    next_upload_id: u64,
    calls: Vec<Call>,
    part_faults: Vec<PartFault>,
    create_faults: Vec<String>,
    complete_faults: Vec<String>,
    abort_faults: Vec<String>,
    delete_faults: Vec<String>,
    delete_lag: u32,
    received: Vec<Bytes>,
    lingering: HashMap<(String, String), u32>,
}

/// In-memory [`StorageClient`] with call recording and fault injection.
///
/// Faults are matched by key suffix so tests can target a file by name
/// without knowing the timestamped key.
#[derive(Default)]
pub(crate) struct MemoryStorageClient {
    state: Mutex<State>,
    part_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStorageClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sleep inside every part upload.
    pub(crate) fn with_part_delay(mut self, delay: Duration) -> Self {
        self.part_delay = delay;
        self
    }

    pub(crate) fn fail_create(&self, key_suffix: &str) {
        self.state.lock().unwrap().create_faults.push(key_suffix.to_string());
    }

    /// Fail part uploads with a retryable error. `None` means every
    /// part / forever.
    pub(crate) fn fail_parts(&self, key_suffix: &str, part_number: Option<i32>, times: Option<u32>) {
        self.fail_parts_with(
            key_suffix,
            part_number,
            times,
            StorageError::transient("connection reset by peer"),
        );
    }

    pub(crate) fn fail_parts_with(
        &self,
        key_suffix: &str,
        part_number: Option<i32>,
        times: Option<u32>,
        error: StorageError,
    ) {
        self.state.lock().unwrap().part_faults.push(PartFault {
            key_suffix: key_suffix.to_string(),
            part_number,
            remaining: times,
            error,
        });
    }

    pub(crate) fn fail_complete(&self, key_suffix: &str) {
        self.state.lock().unwrap().complete_faults.push(key_suffix.to_string());
    }

    pub(crate) fn fail_abort(&self, key_suffix: &str) {
        self.state.lock().unwrap().abort_faults.push(key_suffix.to_string());
    }

    pub(crate) fn fail_delete(&self, key_suffix: &str) {
        self.state.lock().unwrap().delete_faults.push(key_suffix.to_string());
    }

    /// Deleted objects stay visible to this many head checks.
    pub(crate) fn lag_deletes(&self, head_checks: u32) {
        self.state.lock().unwrap().delete_lag = head_checks;
    }

    pub(crate) fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
    }

    pub(crate) fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls whose key ends with `key_suffix`.
    pub(crate) fn calls_for(&self, key_suffix: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.key().ends_with(key_suffix))
            .collect()
    }

    pub(crate) fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// Every part buffer handed to `upload_part`, in call order.
    pub(crate) fn received_parts(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().received.clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn location(bucket: &str, key: &str) -> String {
        format!("https://{bucket}.s3.ap-southeast-1.amazonaws.com/{key}")
    }

    fn take_part_fault(&self, key: &str, part_number: i32) -> Option<StorageError> {
        let mut state = self.state.lock().unwrap();
        let fault = state.part_faults.iter_mut().find(|f| {
            key.ends_with(&f.key_suffix)
                && f.part_number.map_or(true, |n| n == part_number)
                && f.remaining != Some(0)
        })?;
        if let Some(remaining) = fault.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(fault.error.clone())
    }
}

fn matches_any(suffixes: &[String], key: &str) -> bool {
    suffixes.iter().any(|s| key.ends_with(s.as_str()))
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<MultipartSession, StorageError> {
        self.record(Call::Create {
            key: key.to_string(),
            content_type: content_type.map(str::to_string),
        });

        let mut state = self.state.lock().unwrap();
        if matches_any(&state.create_faults, key) {
            return Err(StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "multipart uploads disabled".to_string(),
            });
        }

        state.next_upload_id += 1;
        let upload_id: String = format!("upload-{}", state.next_upload_id);
        state.sessions.insert(
            upload_id.clone(),
            Session {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );

        Ok(MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: i32,
        data: Bytes,
    ) -> Result<String, StorageError> {
        self.record(Call::UploadPart {
            key: session.key.clone(),
            part_number,
            length: data.len(),
        });

        let now: usize = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.part_delay.is_zero() {
            tokio::time::sleep(self.part_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.take_part_fault(&session.key, part_number) {
            return Err(error);
        }

        let mut state = self.state.lock().unwrap();
        let stored = state
            .sessions
            .get_mut(&session.upload_id)
            .ok_or_else(|| StorageError::NotFound {
                bucket: session.bucket.clone(),
                key: session.key.clone(),
            })?;
        stored.parts.insert(part_number, data.to_vec());
        state.received.push(data);

        Ok(format!("\"etag-{}-{}\"", session.upload_id, part_number))
    }

    async fn complete_multipart_upload(
        &self,
        session: &MultipartSession,
        parts: &[PartDescriptor],
    ) -> Result<CompletedUpload, StorageError> {
        self.record(Call::Complete {
            key: session.key.clone(),
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
        });

        let mut state = self.state.lock().unwrap();
        if matches_any(&state.complete_faults, &session.key) {
            return Err(StorageError::transient("completion timed out"));
        }

        let stored = state
            .sessions
            .remove(&session.upload_id)
            .ok_or_else(|| StorageError::NotFound {
                bucket: session.bucket.clone(),
                key: session.key.clone(),
            })?;

        let mut content: Vec<u8> = Vec::new();
        for part in parts {
            let data = stored.parts.get(&part.part_number).ok_or_else(|| StorageError::Other {
                message: format!("part {} was never uploaded", part.part_number),
            })?;
            content.extend_from_slice(data);
        }
        state
            .objects
            .insert((stored.bucket.clone(), stored.key.clone()), content);

        Ok(CompletedUpload {
            location: Self::location(&stored.bucket, &stored.key),
            key: stored.key,
        })
    }

    async fn abort_multipart_upload(&self, session: &MultipartSession) -> Result<(), StorageError> {
        self.record(Call::Abort {
            key: session.key.clone(),
        });

        let mut state = self.state.lock().unwrap();
        if matches_any(&state.abort_faults, &session.key) {
            return Err(StorageError::transient("abort rejected"));
        }
        state.sessions.remove(&session.upload_id);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.record(Call::Delete {
            key: key.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        if matches_any(&state.delete_faults, key) {
            return Err(StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "delete not permitted".to_string(),
            });
        }

        let id: (String, String) = (bucket.to_string(), key.to_string());
        if state.objects.remove(&id).is_some() && state.delete_lag > 0 {
            let lag: u32 = state.delete_lag;
            state.lingering.insert(id, lag);
        }
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        self.record(Call::Head {
            key: key.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        let id: (String, String) = (bucket.to_string(), key.to_string());
        if let Some(size) = state.objects.get(&id).map(|data| data.len() as u64) {
            return Ok(Some(size));
        }
        match state.lingering.get_mut(&id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(Some(0))
            }
            _ => Ok(None),
        }
    }
}
