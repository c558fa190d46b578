//! Upload Worker Pool
//!
//! N workers drain the transfer queue concurrently, each PUTting the chunks it
//! pops to their chunk keys. A worker keeps going after a failed PUT so the
//! queue is always drained; its verdict is the AND of every status it saw.
//! The pool verdict is the AND of all worker verdicts, and a worker that
//! panicked counts as failed.

use tracing::{debug, warn};

use crate::domain::ports::ObjectStore;

use super::keys::ObjectKey;
use super::queue::{Chunk, ChunkQueue};

/// What one worker did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub ok: bool,
    pub chunks: usize,
    pub bytes: u64,
    pub failed: Vec<usize>,
}

/// Aggregate of every worker in the pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub ok: bool,
    pub chunks: usize,
    pub bytes: u64,
    /// Indices whose PUT did not succeed, sorted
    pub failed: Vec<usize>,
    pub panicked_workers: usize,
}

/// Consumer side of a write transfer
pub struct UploadPool<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    workers: usize,
}

impl<'a, S: ObjectStore + ?Sized> UploadPool<'a, S> {
    pub fn new(store: &'a S, workers: usize) -> Self {
        Self {
            store,
            workers: workers.max(1),
        }
    }

    /// Run the pool until `queue` is closed and drained.
    pub fn run(&self, key: &ObjectKey, queue: &ChunkQueue<Chunk>) -> UploadReport {
        let joined = crossbeam::scope(|scope| {
            let handles: Vec<_> = (0..self.workers)
                .map(|worker| scope.spawn(move |_| self.worker(worker, key, queue)))
                .collect();

            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        let mut report = UploadReport {
            ok: true,
            ..Default::default()
        };

        let outcomes = match joined {
            Ok(outcomes) => outcomes,
            Err(_) => {
                warn!(object = %key, "upload scope panicked");
                report.ok = false;
                Vec::new()
            }
        };

        for outcome in outcomes {
            match outcome {
                Ok(worker) => {
                    report.ok &= worker.ok;
                    report.chunks += worker.chunks;
                    report.bytes += worker.bytes;
                    report.failed.extend(worker.failed);
                }
                Err(_) => {
                    warn!(object = %key, "upload worker panicked");
                    report.ok = false;
                    report.panicked_workers += 1;
                }
            }
        }
        report.failed.sort_unstable();
        report
    }

    /// One worker: pop, PUT, repeat until the queue reports end of stream.
    pub fn worker(&self, worker: usize, key: &ObjectKey, queue: &ChunkQueue<Chunk>) -> WorkerReport {
        let mut report = WorkerReport {
            ok: true,
            ..Default::default()
        };

        while let Some(chunk) = queue.pop_wait() {
            let chunk_key = key.chunk_key(chunk.index);
            let status = self.store.put(&chunk_key, &chunk.payload);

            if status.is_success() {
                report.chunks += 1;
                report.bytes += chunk.payload.len() as u64;
            } else {
                warn!(
                    worker,
                    index = chunk.index,
                    key = %chunk_key,
                    status = %status,
                    "chunk upload failed"
                );
                report.ok = false;
                report.failed.push(chunk.index);
            }
        }

        debug!(worker, chunks = report.chunks, ok = report.ok, "upload worker finished");
        report
    }
}
