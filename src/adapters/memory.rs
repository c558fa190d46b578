//! In-memory object store
//!
//! Keys live in a `DashMap`, so worker threads never serialise on one lock.
//! Besides local runs it backs most tests, which is why it can inject
//! failures for keys matching a pattern and records every request it served.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::domain::ports::{ObjectStore, Status};

/// Request kinds recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Put,
    Get,
    Delete,
    Copy,
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreStats {
    /// Objects currently stored
    pub object_count: u64,
    /// Bytes currently stored
    pub total_bytes: u64,
    pub puts: u64,
    pub gets: u64,
    pub deletes: u64,
    pub copies: u64,
}

/// Process-local [`ObjectStore`]
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, Bytes>,
    failing_puts: RwLock<Vec<String>>,
    failing_gets: RwLock<Vec<String>>,
    journal: Mutex<Vec<(StoreOp, String)>>,
    puts: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
    copies: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer 500 to every PUT (and copy onto) a key containing `pattern`.
    pub fn fail_puts_matching(&self, pattern: impl Into<String>) {
        self.failing_puts.write().push(pattern.into());
    }

    /// Answer 500 to every GET of a key containing `pattern`.
    pub fn fail_gets_matching(&self, pattern: impl Into<String>) {
        self.failing_gets.write().push(pattern.into());
    }

    /// Drop every injected failure
    pub fn clear_failures(&self) {
        self.failing_puts.write().clear();
        self.failing_gets.write().clear();
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Every stored key, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Requests served so far, in arrival order
    pub fn journal(&self) -> Vec<(StoreOp, String)> {
        self.journal.lock().clone()
    }

    /// Keys of every request of kind `op`, in arrival order
    pub fn journal_keys(&self, op: StoreOp) -> Vec<String> {
        self.journal
            .lock()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    pub fn copy_count(&self) -> u64 {
        self.copies.load(Ordering::Relaxed)
    }

    /// Current statistics
    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            object_count: self.objects.len() as u64,
            total_bytes: self.objects.iter().map(|e| e.value().len() as u64).sum(),
            puts: self.put_count(),
            gets: self.get_count(),
            deletes: self.delete_count(),
            copies: self.copy_count(),
        }
    }

    fn record(&self, op: StoreOp, key: &str) {
        self.journal.lock().push((op, key.to_string()));
    }

    fn matches(patterns: &RwLock<Vec<String>>, key: &str) -> bool {
        patterns.read().iter().any(|p| key.contains(p.as_str()))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &str, body: &[u8]) -> Status {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.record(StoreOp::Put, key);

        if Self::matches(&self.failing_puts, key) {
            return Status::INTERNAL_ERROR;
        }
        self.objects
            .insert(key.to_string(), Bytes::copy_from_slice(body));
        Status::CREATED
    }

    fn get(&self, key: &str) -> (Bytes, Status) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.record(StoreOp::Get, key);

        if Self::matches(&self.failing_gets, key) {
            return (Bytes::new(), Status::INTERNAL_ERROR);
        }
        match self.objects.get(key) {
            Some(body) => (body.value().clone(), Status::OK),
            None => (Bytes::new(), Status::NOT_FOUND),
        }
    }

    fn delete(&self, key: &str) -> Status {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.record(StoreOp::Delete, key);

        match self.objects.remove(key) {
            Some(_) => Status::NO_CONTENT,
            None => Status::NOT_FOUND,
        }
    }

    fn copy(&self, src: &str, dst: &str) -> Status {
        self.copies.fetch_add(1, Ordering::Relaxed);
        self.record(StoreOp::Copy, dst);

        if Self::matches(&self.failing_puts, dst) {
            return Status::INTERNAL_ERROR;
        }
        // Clone out before inserting so no shard guard is held across the insert.
        let body = match self.objects.get(src) {
            Some(body) => body.value().clone(),
            None => return Status::NOT_FOUND,
        };
        self.objects.insert(dst.to_string(), body);
        Status::CREATED
    }
}
