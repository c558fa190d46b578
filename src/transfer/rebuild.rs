//! Rebuild Worker Pool
//!
//! The read path knows every chunk index up front, so the work queue is filled
//! with `0..blocks` and closed before any worker starts. Workers fetch and
//! inflate chunks into a slot table indexed by chunk number; nothing reaches
//! the sink until every worker has joined and every slot is filled, and then
//! the slots are written strictly in index order.
//!
//! A worker stops at its first failed fetch or decompress. The remaining
//! workers carry on with the queue, but the pool verdict is already false.

use std::io::Write;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::ports::ObjectStore;
use crate::error::{Error, Result};

use super::codec::ChunkCodec;
use super::keys::ObjectKey;
use super::queue::ChunkQueue;

/// Result of rebuilding one object
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    pub ok: bool,
    /// Inflated chunks in index order; empty unless `ok`
    pub chunks: Vec<Bytes>,
    /// Chunks fetched and inflated, whether or not the rebuild succeeded
    pub fetched: usize,
    pub stored_bytes: u64,
    pub panicked_workers: usize,
}

impl RebuildReport {
    /// Total inflated size
    pub fn raw_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    /// Write every chunk to `sink` in index order.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64> {
        if !self.ok {
            return Err(Error::Internal("refusing to write an incomplete rebuild".into()));
        }
        let mut written = 0u64;
        for chunk in &self.chunks {
            sink.write_all(chunk)?;
            written += chunk.len() as u64;
        }
        sink.flush()?;
        Ok(written)
    }
}

/// Parallel fetch and inflate of every chunk of one object
pub struct RebuildPool<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    codec: &'a ChunkCodec,
    workers: usize,
}

impl<'a, S: ObjectStore + ?Sized> RebuildPool<'a, S> {
    pub fn new(store: &'a S, codec: &'a ChunkCodec, workers: usize) -> Self {
        Self {
            store,
            codec,
            workers: workers.max(1),
        }
    }

    /// Fetch chunks `0..blocks` of `key`.
    pub fn run(&self, key: &ObjectKey, blocks: usize) -> RebuildReport {
        let work = ChunkQueue::closed_with(0..blocks);

        let slots: Mutex<Vec<Option<Bytes>>> = Mutex::new(vec![None; blocks]);
        let stored = Mutex::new(0u64);

        let joined = crossbeam::scope(|scope| {
            let handles: Vec<_> = (0..self.workers.min(blocks.max(1)))
                .map(|worker| {
                    let work = &work;
                    let slots = &slots;
                    let stored = &stored;
                    scope.spawn(move |_| self.worker(worker, key, work, slots, stored))
                })
                .collect();

            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        let mut report = RebuildReport {
            ok: true,
            ..Default::default()
        };

        match joined {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match outcome {
                        Ok(ok) => report.ok &= ok,
                        Err(_) => {
                            warn!(object = %key, "rebuild worker panicked");
                            report.ok = false;
                            report.panicked_workers += 1;
                        }
                    }
                }
            }
            Err(_) => report.ok = false,
        }

        report.stored_bytes = stored.into_inner();
        let slots = slots.into_inner();
        report.fetched = slots.iter().filter(|s| s.is_some()).count();

        if report.ok {
            let filled: Option<Vec<Bytes>> = slots.into_iter().collect();
            match filled {
                Some(chunks) => report.chunks = chunks,
                None => {
                    warn!(object = %key, "rebuild finished with unfilled slots");
                    report.ok = false;
                }
            }
        }

        report
    }

    fn worker(
        &self,
        worker: usize,
        key: &ObjectKey,
        work: &ChunkQueue<usize>,
        slots: &Mutex<Vec<Option<Bytes>>>,
        stored: &Mutex<u64>,
    ) -> bool {
        let mut fetched = 0usize;

        while let Some(index) = work.pop_wait() {
            let chunk_key = key.chunk_key(index);
            let (body, status) = self.store.get(&chunk_key);
            if !status.is_success() {
                warn!(worker, index, key = %chunk_key, status = %status, "chunk fetch failed");
                return false;
            }

            let raw = match self.codec.decompress(&body) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(worker, index, key = %chunk_key, error = %e, "chunk decompress failed");
                    return false;
                }
            };

            *stored.lock() += body.len() as u64;
            slots.lock()[index] = Some(raw);
            fetched += 1;
        }

        debug!(worker, chunks = fetched, "rebuild worker finished");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryObjectStore;
    use crate::transfer::codec::CodecKind;

    fn seed(store: &InMemoryObjectStore, key: &ObjectKey, codec: &ChunkCodec, parts: &[&str]) {
        for (i, part) in parts.iter().enumerate() {
            let body = codec.compress(part.as_bytes(), 6).unwrap();
            assert!(store.put(&key.chunk_key(i), &body).is_success());
        }
    }

    #[test]
    fn test_rebuild_in_index_order() {
        let store = InMemoryObjectStore::new();
        let codec = ChunkCodec::new(CodecKind::Zlib);
        let key = ObjectKey::new("/c/doc").unwrap();
        let parts: Vec<String> = (0..20).map(|i| format!("<{}>", i)).collect();
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        seed(&store, &key, &codec, &refs);

        let report = RebuildPool::new(&store, &codec, 6).run(&key, parts.len());
        assert!(report.ok);

        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        assert_eq!(out, parts.concat().into_bytes());
        assert_eq!(report.raw_bytes(), out.len() as u64);
    }

    #[test]
    fn test_missing_chunk_fails() {
        let store = InMemoryObjectStore::new();
        let codec = ChunkCodec::new(CodecKind::None);
        let key = ObjectKey::new("/c/doc").unwrap();
        seed(&store, &key, &codec, &["a", "b"]);

        let report = RebuildPool::new(&store, &codec, 2).run(&key, 3);
        assert!(!report.ok);
        assert!(report.chunks.is_empty());
        assert!(report.fetched <= 2);

        let mut out = Vec::new();
        assert!(report.write_to(&mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_corrupt_chunk_fails() {
        let store = InMemoryObjectStore::new();
        let codec = ChunkCodec::new(CodecKind::Zlib);
        let key = ObjectKey::new("/c/doc").unwrap();
        seed(&store, &key, &codec, &["a", "b"]);
        store.put(&key.chunk_key(1), b"garbage");

        let report = RebuildPool::new(&store, &codec, 2).run(&key, 2);
        assert!(!report.ok);
    }

    #[test]
    fn test_zero_blocks_is_empty_success() {
        let store = InMemoryObjectStore::new();
        let codec = ChunkCodec::default();
        let key = ObjectKey::new("/c/empty").unwrap();

        let report = RebuildPool::new(&store, &codec, 4).run(&key, 0);
        assert!(report.ok);
        assert!(report.chunks.is_empty());
        assert_eq!(store.get_count(), 0);
    }
}
