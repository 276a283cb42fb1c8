//! Upload manager
//!
//! Flow:
//! 1. `upload(blob)` checks the session is idle, marks it in progress and
//!    spawns one coordinating task for the upload
//! 2. The coordinator runs an assignment pass: every idle worker gets the next
//!    chunk and is moved into a task of the coordinator's `JoinSet`
//! 3. Each finished task hands back its worker and a [`ChunkOutcome`]; the
//!    coordinator recycles the worker and, after a success, runs another pass
//! 4. When every chunk is acknowledged, or the first terminal failure has let
//!    in-flight siblings settle, the session is reset and the result is sent
//!    to the caller's [`UploadHandle`]

mod session;

pub use session::{SessionSnapshot, UploadSession};

use crate::blob::Blob;
use crate::chunker::{Chunk, Chunker};
use crate::config::{UploadConfig, ValidationError};
use crate::error::UploadError;
use crate::observability::{MetricsSnapshot, UploadMetrics};
use crate::transfer::{TransferClient, Transport};
use crate::worker::{ChunkOutcome, RetryPolicy, UploadWorker};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Summary of a finished upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub upload_id: Uuid,
    pub chunks: u64,
    pub bytes: u64,
    /// Extra attempts beyond the first, summed over all chunks
    pub retries: u64,
    pub elapsed: Duration,
}

/// Resolves once with the result of one `upload()` call
#[derive(Debug)]
pub struct UploadHandle {
    upload_id: Uuid,
    receiver: oneshot::Receiver<Result<UploadReport, UploadError>>,
}

impl UploadHandle {
    pub fn upload_id(&self) -> Uuid {
        self.upload_id
    }

    /// Wait for the upload to finish.
    ///
    /// The manager's session is already reset when this returns, so the next
    /// `upload()` can start right away.
    pub async fn wait(self) -> Result<UploadReport, UploadError> {
        self.receiver.await.map_err(|_| {
            UploadError::Interrupted("upload task stopped without reporting".to_string())
        })?
    }
}

/// Uploads one blob at a time through a bounded pool of workers
#[derive(Clone)]
pub struct UploadManager {
    config: Arc<UploadConfig>,
    session: Arc<Mutex<UploadSession>>,
    metrics: Arc<UploadMetrics>,
}

impl UploadManager {
    /// Manager sending over HTTP with a client built from `config.http()`
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = TransferClient::new(config.http())
            .map_err(|e| ValidationError::HttpClient(e.message()))?;
        Ok(Self::with_transport(config, Arc::new(client)))
    }

    /// Manager sending through any [`Transport`]
    pub fn with_transport(config: UploadConfig, transport: Arc<dyn Transport>) -> Self {
        let retry = RetryPolicy::new(config.max_retries_per_chunk(), config.retry_backoff());
        let session = UploadSession::new(config.max_concurrent_workers(), transport, retry);

        Self {
            config: Arc::new(config),
            session: Arc::new(Mutex::new(session)),
            metrics: Arc::new(UploadMetrics::new()),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Start uploading `blob`.
    ///
    /// Fails with [`UploadError::InvalidInput`] while another upload is running,
    /// leaving that upload untouched. Must be called inside a tokio runtime.
    pub async fn upload<B: Blob>(&self, blob: B) -> Result<UploadHandle, UploadError> {
        let chunker = Chunker::new(blob, self.config.chunk_size())?;

        let upload_id = {
            let mut session = self.session.lock().await;
            if session.in_progress {
                return Err(UploadError::InvalidInput(
                    "an upload is already in progress".to_string(),
                ));
            }
            session.begin(chunker.chunk_count())
        };

        self.metrics.upload_started();
        info!(
            %upload_id,
            bytes = chunker.blob_size(),
            chunks = chunker.chunk_count(),
            workers = self.config.max_concurrent_workers(),
            "Upload started"
        );

        let (sender, receiver) = oneshot::channel();
        let coordinator = Coordinator {
            upload_id,
            config: self.config.clone(),
            session: self.session.clone(),
            metrics: self.metrics.clone(),
        };

        let span = info_span!("upload", %upload_id);
        tokio::spawn(coordinator.run(chunker, sender).instrument(span));

        Ok(UploadHandle {
            upload_id,
            receiver,
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Counters accumulated across every upload of this manager
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// What a transfer task hands back to the coordinator
enum Settled {
    /// The worker carried the chunk to a terminal outcome
    Transferred {
        worker: UploadWorker,
        outcome: ChunkOutcome,
        byte_length: u64,
    },
    /// The chunk's bytes could not be read, so nothing was sent
    Unreadable {
        worker: UploadWorker,
        chunk: u64,
        message: String,
    },
}

/// Per-upload scheduling task
struct Coordinator {
    upload_id: Uuid,
    config: Arc<UploadConfig>,
    session: Arc<Mutex<UploadSession>>,
    metrics: Arc<UploadMetrics>,
}

impl Coordinator {
    async fn run<B: Blob>(
        self,
        chunker: Chunker<B>,
        reply: oneshot::Sender<Result<UploadReport, UploadError>>,
    ) {
        let started = Instant::now();
        let result = self.drive(chunker).await;

        let result = {
            let mut session = self.session.lock().await;
            let result = result.map(|()| UploadReport {
                upload_id: self.upload_id,
                chunks: session.chunks_uploaded,
                bytes: session.bytes_uploaded,
                retries: session.retries,
                elapsed: started.elapsed(),
            });
            session.reset();
            result
        };

        match &result {
            Ok(report) => {
                self.metrics.upload_completed();
                info!(
                    chunks = report.chunks,
                    bytes = report.bytes,
                    retries = report.retries,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Upload completed"
                );
            }
            Err(error) => {
                self.metrics.upload_failed();
                warn!(error = %error, "Upload failed");
            }
        }

        if reply.send(result).is_err() {
            debug!("Upload handle dropped before the result arrived");
        }
    }

    async fn drive<B: Blob>(&self, mut chunker: Chunker<B>) -> Result<(), UploadError> {
        let mut tasks: JoinSet<Settled> = JoinSet::new();
        let mut failure: Option<UploadError> = None;

        {
            let mut session = self.session.lock().await;
            if session.is_complete() {
                return Ok(());
            }
            self.assign(&mut session, &mut chunker, &mut tasks);
        }

        while let Some(joined) = tasks.join_next().await {
            let mut session = self.session.lock().await;

            let settled = match joined {
                Ok(settled) => settled,
                Err(join_error) => {
                    // The worker went down with its task; the reset at the end
                    // rebuilds the pool.
                    warn!(error = %join_error, "Transfer task ended abnormally");
                    if failure.is_none() {
                        failure = Some(UploadError::Interrupted(format!(
                            "transfer task ended abnormally: {}",
                            join_error
                        )));
                    }
                    continue;
                }
            };

            let (chunk, outcome, byte_length) = match settled {
                Settled::Transferred {
                    worker,
                    outcome,
                    byte_length,
                } => {
                    let chunk = outcome.chunk();
                    session.settle(chunk, worker);
                    (chunk, outcome, byte_length)
                }
                Settled::Unreadable {
                    worker,
                    chunk,
                    message,
                } => {
                    session.settle(chunk, worker);
                    self.metrics.chunk_failed(0);

                    if failure.is_none() {
                        warn!(chunk, error = %message, "Chunk could not be read, halting assignment");
                        failure = Some(UploadError::Unreadable { chunk, message });
                    } else {
                        warn!(chunk, error = %message, "Another chunk could not be read while settling");
                    }
                    session.check_invariants();
                    continue;
                }
            };

            match outcome {
                ChunkOutcome::Uploaded { attempts, .. } => {
                    let retries = u64::from(attempts.saturating_sub(1));
                    session.chunks_uploaded += 1;
                    session.bytes_uploaded += byte_length;
                    session.retries += retries;
                    self.metrics.chunk_uploaded(byte_length, retries);

                    debug!(
                        chunk,
                        uploaded = session.chunks_uploaded,
                        expected = session.expected_chunk_count,
                        "Chunk acknowledged"
                    );

                    if failure.is_none() && !session.is_complete() {
                        self.assign(&mut session, &mut chunker, &mut tasks);
                    }
                }
                ChunkOutcome::Failed {
                    attempts, error, ..
                } => {
                    let retries = u64::from(attempts.saturating_sub(1));
                    session.retries += retries;
                    self.metrics.chunk_failed(retries);

                    if failure.is_none() {
                        warn!(
                            chunk,
                            attempts,
                            in_flight = session.in_flight.len(),
                            error = %error,
                            "Chunk failed terminally, halting assignment"
                        );
                        failure = Some(UploadError::TransferFailure {
                            chunk,
                            source: error,
                        });
                    } else {
                        warn!(chunk, error = %error, "Another chunk failed while settling");
                    }
                }
            }

            session.check_invariants();
        }

        if let Some(error) = failure {
            return Err(error);
        }

        let session = self.session.lock().await;
        if session.is_complete() {
            Ok(())
        } else {
            Err(UploadError::Interrupted(format!(
                "ran out of work after {} of {} chunks",
                session.chunks_uploaded, session.expected_chunk_count
            )))
        }
    }

    /// Give every idle worker the next chunk, until workers or chunks run out
    fn assign<B: Blob>(
        &self,
        session: &mut UploadSession,
        chunker: &mut Chunker<B>,
        tasks: &mut JoinSet<Settled>,
    ) {
        while let Some(mut worker) = session.idle_workers.pop_front() {
            let Some(chunk) = chunker.next() else {
                session.idle_workers.push_front(worker);
                break;
            };

            session.next_chunk_index = chunk.index + 1;
            session.in_flight.insert(chunk.index, worker.id());

            debug!(chunk = chunk.index, worker = %worker.id(), bytes = chunk.byte_length, "Chunk assigned");

            let config = self.config.clone();
            let Chunk {
                index,
                payload,
                byte_length,
            } = chunk;

            tasks.spawn(
                async move {
                    let payload = match payload.into_payload().await {
                        Ok(payload) => payload,
                        Err(error) => {
                            return Settled::Unreadable {
                                worker,
                                chunk: index,
                                message: error.to_string(),
                            };
                        }
                    };

                    let outcome = worker
                        .perform(index, payload, config.endpoint(), config.token())
                        .await;
                    Settled::Transferred {
                        worker,
                        outcome,
                        byte_length,
                    }
                }
                .in_current_span(),
            );
        }

        session.check_invariants();
    }
}
