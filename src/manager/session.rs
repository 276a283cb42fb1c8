use crate::transfer::Transport;
use crate::worker::{RetryPolicy, UploadWorker, WorkerId};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Progress of the upload a manager is running.
///
/// Owned by the manager behind one mutex. While `in_progress`, every worker is
/// either in `idle_workers` or has its id recorded in `in_flight`.
pub struct UploadSession {
    pub in_progress: bool,
    pub upload_id: Option<Uuid>,
    pub next_chunk_index: u64,
    pub chunks_uploaded: u64,
    pub expected_chunk_count: u64,
    pub bytes_uploaded: u64,
    /// Extra attempts spent across all chunks of this upload
    pub retries: u64,
    pub idle_workers: VecDeque<UploadWorker>,
    pub in_flight: BTreeMap<u64, WorkerId>,
    pool_size: usize,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("in_progress", &self.in_progress)
            .field("upload_id", &self.upload_id)
            .field("next_chunk_index", &self.next_chunk_index)
            .field("chunks_uploaded", &self.chunks_uploaded)
            .field("expected_chunk_count", &self.expected_chunk_count)
            .field("idle_workers", &self.idle_workers.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl UploadSession {
    pub fn new(pool_size: usize, transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        let mut session = Self {
            in_progress: false,
            upload_id: None,
            next_chunk_index: 0,
            chunks_uploaded: 0,
            expected_chunk_count: 0,
            bytes_uploaded: 0,
            retries: 0,
            idle_workers: VecDeque::with_capacity(pool_size),
            in_flight: BTreeMap::new(),
            pool_size,
            transport,
            retry,
        };
        session.fill_pool();
        session
    }

    /// Mark a new upload as running and return its id
    pub fn begin(&mut self, expected_chunk_count: u64) -> Uuid {
        let upload_id = Uuid::now_v7();
        self.in_progress = true;
        self.upload_id = Some(upload_id);
        self.expected_chunk_count = expected_chunk_count;
        upload_id
    }

    /// Back to a clean idle state with a freshly built, full worker pool
    pub fn reset(&mut self) {
        self.in_progress = false;
        self.upload_id = None;
        self.next_chunk_index = 0;
        self.chunks_uploaded = 0;
        self.expected_chunk_count = 0;
        self.bytes_uploaded = 0;
        self.retries = 0;
        self.in_flight.clear();
        self.fill_pool();
    }

    /// Take back a worker whose chunk reached a terminal outcome
    pub fn settle(&mut self, chunk: u64, mut worker: UploadWorker) {
        self.in_flight.remove(&chunk);
        worker.release();
        self.idle_workers.push_back(worker);
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn is_complete(&self) -> bool {
        self.chunks_uploaded == self.expected_chunk_count
    }

    pub fn check_invariants(&self) {
        debug_assert_eq!(
            self.idle_workers.len() + self.in_flight.len(),
            self.pool_size,
            "every worker is either idle or in flight"
        );
        debug_assert!(self.chunks_uploaded <= self.expected_chunk_count);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            in_progress: self.in_progress,
            upload_id: self.upload_id,
            next_chunk_index: self.next_chunk_index,
            chunks_uploaded: self.chunks_uploaded,
            expected_chunk_count: self.expected_chunk_count,
            bytes_uploaded: self.bytes_uploaded,
            retries: self.retries,
            idle_workers: self.idle_workers.len(),
            in_flight: self.in_flight.keys().copied().collect(),
        }
    }

    fn fill_pool(&mut self) {
        self.idle_workers.clear();
        for id in 0..self.pool_size {
            self.idle_workers.push_back(UploadWorker::new(
                WorkerId(id),
                self.transport.clone(),
                self.retry,
            ));
        }
    }
}

/// Point-in-time copy of an [`UploadSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub in_progress: bool,
    pub upload_id: Option<Uuid>,
    pub next_chunk_index: u64,
    pub chunks_uploaded: u64,
    pub expected_chunk_count: u64,
    pub bytes_uploaded: u64,
    pub retries: u64,
    pub idle_workers: usize,
    /// Chunk indices currently being transferred, ascending
    pub in_flight: Vec<u64>,
}
