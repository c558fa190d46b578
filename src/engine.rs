//! Chunk Engine
//!
//! Entry point for callers such as a filesystem adapter or the CLI. Every
//! public operation returns a single `bool`: any failure anywhere in a
//! transfer fails the whole operation, and the cause is logged rather than
//! returned.
//!
//! # Write path
//!
//! ```text
//!            ┌──────────┐   push    ┌────────────┐   pop_wait   ┌──────────────┐
//!  bytes ───▶│ Splitter │──────────▶│ ChunkQueue │─────────────▶│ Upload x N   │──▶ store
//!            └──────────┘           └────────────┘              └──────────────┘
//!                 ▲  level              │ depth
//!                 └──── Controller ◀────┘
//! ```
//!
//! An existing manifest is withdrawn before the first chunk PUT and the new
//! one is published only after every chunk landed. A failed overwrite leaves
//! no object behind rather than one that reads back as mixed content.
//!
//! # Read path
//!
//! Manifest first, then [`RebuildPool`] fetches and inflates every chunk in
//! parallel, then a single pass writes them to the sink in index order.

use std::io::Write;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, field, info, instrument, warn, Span};

use crate::config::EngineConfig;
use crate::domain::ports::ObjectStore;
use crate::error::{Error, Result};
use crate::metrics::{TransferMetrics, TransferStats};
use crate::transfer::codec::ChunkCodec;
use crate::transfer::context::TransferContext;
use crate::transfer::keys::ObjectKey;
use crate::transfer::lifecycle;
use crate::transfer::manifest::Manifest;
use crate::transfer::rebuild::RebuildPool;
use crate::transfer::splitter::{block_count, Splitter};
use crate::transfer::upload::UploadPool;

/// Chunked transfer engine over an [`ObjectStore`]
pub struct ChunkEngine<S: ObjectStore> {
    store: S,
    config: EngineConfig,
    codec: ChunkCodec,
    metrics: TransferMetrics,
    last_stats: Mutex<Option<TransferStats>>,
}

impl<S: ObjectStore> ChunkEngine<S> {
    /// Create an engine after validating `config`.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            codec: ChunkCodec::new(config.codec),
            store,
            config,
            metrics: TransferMetrics::new()?,
            last_stats: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TransferMetrics {
        &self.metrics
    }

    /// Stats of the most recent successful write or read
    pub fn last_stats(&self) -> Option<TransferStats> {
        self.last_stats.lock().clone()
    }

    fn key(&self, path: &str) -> Result<ObjectKey> {
        ObjectKey::with_store_dir(path, &self.config.store_dir_name)
    }

    fn finish(&self, op: &'static str, path: &str, result: Result<bool>) -> bool {
        match result {
            Ok(true) => true,
            Ok(false) => {
                warn!(op, path, "operation failed");
                self.metrics.record_failure(op);
                false
            }
            Err(e) => {
                warn!(op, path, error = %e, "operation failed");
                self.metrics.record_failure(op);
                false
            }
        }
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Store `data` as the object at `path`, replacing any previous version.
    #[instrument(skip(self, data), fields(size = data.len(), transfer_id = field::Empty))]
    pub fn write_object(&self, path: &str, data: &[u8]) -> bool {
        self.metrics.record_operation("write");
        let result = self.try_write(path, data).map(|stats| {
            info!(
                blocks = stats.blocks,
                raw_bytes = stats.raw_bytes,
                stored_bytes = stats.stored_bytes,
                final_level = stats.final_level,
                peak_level = stats.peak_level,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "object written"
            );
            self.metrics.record_write(&stats);
            *self.last_stats.lock() = Some(stats);
            true
        });
        self.finish("write", path, result)
    }

    fn try_write(&self, path: &str, data: &[u8]) -> Result<TransferStats> {
        let key = self.key(path)?;
        let started = Instant::now();
        let ctx = TransferContext::new();
        Span::current().record("transfer_id", field::display(ctx.id()));

        let manifest = Manifest::new(block_count(data.len(), self.config.chunk_size));

        // Chunk keys are rewritten in place: no manifest may exist while they change.
        let previous = lifecycle::withdraw_manifest(&self.store, &key)?;

        let splitter = Splitter::new(&self.codec, self.config.chunk_size);
        let pool = UploadPool::new(&self.store, self.config.workers);

        let (produced, uploaded) = crossbeam::scope(|scope| {
            let producer = scope.spawn(|_| splitter.produce(data, &ctx));
            let uploaded = pool.run(&key, ctx.queue());
            (producer.join(), uploaded)
        })
        .map_err(|_| Error::WorkerPanicked(format!("write of {}", key)))?;

        let produced =
            produced.map_err(|_| Error::WorkerPanicked(format!("producer for {}", key)))??;

        if !uploaded.ok || uploaded.chunks != manifest.blocks || produced.blocks != manifest.blocks {
            return Err(Error::ChunkTransfer {
                path: key.path().to_string(),
                failed: manifest.blocks.saturating_sub(uploaded.chunks).max(uploaded.failed.len()),
                total: manifest.blocks,
            });
        }

        lifecycle::write_manifest(&self.store, &key, &manifest)?;

        if let Some(previous) = previous.filter(|_| self.config.reap_stale_chunks) {
            self.reap_stale_chunks(&key, manifest.blocks, previous.blocks);
        }

        Ok(TransferStats {
            transfer_id: ctx.id(),
            blocks: manifest.blocks,
            raw_bytes: produced.raw_bytes,
            stored_bytes: produced.stored_bytes,
            final_level: produced.final_level,
            peak_level: produced.peak_level,
            elapsed: started.elapsed(),
        })
    }

    /// Delete chunk keys `new_blocks..old_blocks` left by a longer previous version.
    fn reap_stale_chunks(&self, key: &ObjectKey, new_blocks: usize, old_blocks: usize) {
        if old_blocks <= new_blocks {
            return;
        }
        let mut reaped = 0usize;
        for index in new_blocks..old_blocks {
            let chunk_key = key.chunk_key(index);
            let status = self.store.delete(&chunk_key);
            if status.is_success() {
                reaped += 1;
            } else {
                warn!(key = %chunk_key, status = %status, "failed to reap stale chunk");
            }
        }
        debug!(object = %key, reaped, "stale chunks reaped");
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Rebuild the object at `path` into `sink`.
    ///
    /// Nothing is written to `sink` unless every chunk was fetched and inflated.
    #[instrument(skip(self, sink), fields(transfer_id = field::Empty))]
    pub fn read_object<W: Write + ?Sized>(&self, path: &str, sink: &mut W) -> bool {
        self.metrics.record_operation("read");
        let result = self.try_read(path, sink).map(|stats| {
            info!(
                blocks = stats.blocks,
                raw_bytes = stats.raw_bytes,
                stored_bytes = stats.stored_bytes,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "object read"
            );
            self.metrics.record_read(&stats);
            *self.last_stats.lock() = Some(stats);
            true
        });
        self.finish("read", path, result)
    }

    /// Rebuild the object at `path` into memory.
    pub fn read_object_to_vec(&self, path: &str) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        self.read_object(path, &mut out).then_some(out)
    }

    fn try_read<W: Write + ?Sized>(&self, path: &str, sink: &mut W) -> Result<TransferStats> {
        let key = self.key(path)?;
        let started = Instant::now();
        let transfer_id = uuid::Uuid::new_v4();
        Span::current().record("transfer_id", field::display(transfer_id));

        let manifest = lifecycle::read_manifest(&self.store, &key)?;
        let report = RebuildPool::new(&self.store, &self.codec, self.config.workers)
            .run(&key, manifest.blocks);

        if !report.ok {
            return Err(Error::ChunkTransfer {
                path: key.path().to_string(),
                failed: manifest.blocks - report.fetched.min(manifest.blocks),
                total: manifest.blocks,
            });
        }

        let raw_bytes = report.write_to(sink)?;

        Ok(TransferStats {
            transfer_id,
            blocks: manifest.blocks,
            raw_bytes,
            stored_bytes: report.stored_bytes,
            final_level: 0,
            peak_level: 0,
            elapsed: started.elapsed(),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Delete every chunk of `path`, then its manifest.
    #[instrument(skip(self))]
    pub fn delete_object(&self, path: &str) -> bool {
        self.metrics.record_operation("delete");
        let result = self
            .key(path)
            .and_then(|key| lifecycle::delete_object(&self.store, &key));
        self.finish("delete", path, result)
    }

    /// Server-side copy of `src` to `dst`.
    #[instrument(skip(self))]
    pub fn copy_object(&self, src: &str, dst: &str) -> bool {
        self.metrics.record_operation("copy");
        let result = self.key(src).and_then(|from| {
            let to = self.key(dst)?;
            lifecycle::copy_object(&self.store, &from, &to)
        });
        self.finish("copy", src, result)
    }

    /// Create a directory marker at `path`.
    #[instrument(skip(self))]
    pub fn create_directory(&self, path: &str) -> bool {
        self.metrics.record_operation("mkdir");
        let status = self.store.create_directory(path);
        let result = if status.is_success() {
            Ok(true)
        } else {
            Err(Error::Store {
                op: "MKDIR",
                key: path.to_string(),
                status: status.code(),
            })
        };
        self.finish("mkdir", path, result)
    }

    /// Truncate `path` to `size` bytes. Only `size == 0` is supported.
    #[instrument(skip(self))]
    pub fn truncate_object(&self, path: &str, size: u64) -> bool {
        self.metrics.record_operation("truncate");
        let result = self
            .key(path)
            .and_then(|key| lifecycle::truncate_object(&self.store, &key, size));
        self.finish("truncate", path, result)
    }
}

impl<S: ObjectStore> std::fmt::Debug for ChunkEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkEngine")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
