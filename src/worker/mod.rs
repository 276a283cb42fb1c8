//! Upload workers
//!
//! A worker carries one chunk at a time from its first attempt to a terminal
//! outcome. It never touches scheduler state: the manager moves the worker into
//! a task, and the task hands the worker back together with its outcome.

mod retry;

pub use retry::{MAX_BACKOFF, RetryPolicy};

use crate::transfer::{FormField, RequestBody, RequestOptions, TransferError, Transport};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifies a worker within one manager's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Sending,
    /// Last chunk exhausted its attempts
    Failed,
}

/// Terminal result of one chunk assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Uploaded {
        chunk: u64,
        attempts: u32,
    },
    Failed {
        chunk: u64,
        attempts: u32,
        error: TransferError,
    },
}

impl ChunkOutcome {
    pub fn chunk(&self) -> u64 {
        match self {
            ChunkOutcome::Uploaded { chunk, .. } | ChunkOutcome::Failed { chunk, .. } => *chunk,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ChunkOutcome::Uploaded { attempts, .. } | ChunkOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, ChunkOutcome::Uploaded { .. })
    }
}

/// Multipart body of a chunk request: `chunkNumber`, `data`, `token`
pub fn chunk_request(chunk_number: u64, payload: Bytes, token: &str) -> RequestOptions {
    RequestOptions::new().with_body(RequestBody::Multipart(vec![
        FormField::text("chunkNumber", chunk_number.to_string()),
        FormField::bytes("data", payload),
        FormField::text("token", token),
    ]))
}

/// POSTs chunks through a [`Transport`] with bounded retry
pub struct UploadWorker {
    id: WorkerId,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    attempts: u32,
    state: WorkerState,
}

impl fmt::Debug for UploadWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadWorker")
            .field("id", &self.id)
            .field("retry", &self.retry)
            .field("attempts", &self.attempts)
            .field("state", &self.state)
            .finish()
    }
}

impl UploadWorker {
    pub fn new(id: WorkerId, transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            id,
            transport,
            retry,
            attempts: 0,
            state: WorkerState::Idle,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Failed attempts on the current (or last failed) chunk
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Upload one chunk, retrying with the same arguments until it succeeds or
    /// `max_attempts` is reached. Exactly one outcome per call.
    pub async fn perform(
        &mut self,
        chunk_number: u64,
        payload: Bytes,
        endpoint: &str,
        token: &str,
    ) -> ChunkOutcome {
        self.attempts = 0;
        self.state = WorkerState::Sending;

        loop {
            let options = chunk_request(chunk_number, payload.clone(), token);

            match self.transport.post(endpoint, options).await {
                Ok(_) => {
                    let attempts = self.attempts + 1;
                    if attempts > 1 {
                        debug!(worker = %self.id, chunk = chunk_number, attempts, "Chunk uploaded after retry");
                    } else {
                        debug!(worker = %self.id, chunk = chunk_number, "Chunk uploaded");
                    }

                    self.release();
                    return ChunkOutcome::Uploaded {
                        chunk: chunk_number,
                        attempts,
                    };
                }
                Err(error) => {
                    self.attempts += 1;

                    if self.attempts >= self.retry.max_attempts {
                        warn!(
                            worker = %self.id,
                            chunk = chunk_number,
                            attempts = self.attempts,
                            reason = error.reason(),
                            error = %error,
                            "Chunk failed after retries"
                        );
                        self.state = WorkerState::Failed;
                        return ChunkOutcome::Failed {
                            chunk: chunk_number,
                            attempts: self.attempts,
                            error,
                        };
                    }

                    let delay = self.retry.delay_for(self.attempts);
                    warn!(
                        worker = %self.id,
                        chunk = chunk_number,
                        attempts = self.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Chunk failed, retrying"
                    );

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// Ready for the next assignment: `Idle` with a cleared attempt counter.
    /// Called by the pool once a terminal outcome has been recorded.
    pub fn release(&mut self) {
        self.attempts = 0;
        self.state = WorkerState::Idle;
    }
}
