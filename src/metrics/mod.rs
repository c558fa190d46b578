//! Transfer Metrics
//!
//! Per-operation [`TransferStats`] plus cumulative prometheus counters kept on
//! a private registry, so that several engines in one process never collide
//! on metric names.

use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Summary of one write or read
#[derive(Debug, Clone, PartialEq)]
pub struct TransferStats {
    pub transfer_id: Uuid,
    pub blocks: usize,
    /// Uncompressed bytes
    pub raw_bytes: u64,
    /// Bytes as stored in the object store
    pub stored_bytes: u64,
    /// Controller level after the last chunk (0 on reads)
    pub final_level: u32,
    /// Highest controller level during the transfer (0 on reads)
    pub peak_level: u32,
    pub elapsed: Duration,
}

impl TransferStats {
    /// Stored bytes per raw byte; 1.0 for an empty transfer
    pub fn compression_ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            1.0
        } else {
            self.stored_bytes as f64 / self.raw_bytes as f64
        }
    }

    /// Raw bytes per second
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.raw_bytes as f64 / secs
        }
    }
}

/// Cumulative engine counters
#[derive(Clone)]
pub struct TransferMetrics {
    registry: Registry,
    chunks_uploaded: IntCounter,
    chunks_downloaded: IntCounter,
    bytes_raw: IntCounter,
    bytes_stored: IntCounter,
    operations: IntCounterVec,
    failures: IntCounterVec,
    compression_level: IntGauge,
}

impl TransferMetrics {
    /// Create the counters on a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let chunks_uploaded = IntCounter::new(
            "cloudchunk_chunks_uploaded_total",
            "Chunks successfully uploaded",
        )
        .map_err(metrics_error)?;
        let chunks_downloaded = IntCounter::new(
            "cloudchunk_chunks_downloaded_total",
            "Chunks successfully downloaded and inflated",
        )
        .map_err(metrics_error)?;
        let bytes_raw = IntCounter::new(
            "cloudchunk_bytes_raw_total",
            "Uncompressed bytes moved by successful transfers",
        )
        .map_err(metrics_error)?;
        let bytes_stored = IntCounter::new(
            "cloudchunk_bytes_stored_total",
            "Stored (compressed) bytes moved by successful transfers",
        )
        .map_err(metrics_error)?;
        let operations = IntCounterVec::new(
            Opts::new("cloudchunk_operations_total", "Engine operations started"),
            &["op"],
        )
        .map_err(metrics_error)?;
        let failures = IntCounterVec::new(
            Opts::new(
                "cloudchunk_transfer_failures_total",
                "Engine operations that returned false",
            ),
            &["op"],
        )
        .map_err(metrics_error)?;
        let compression_level = IntGauge::new(
            "cloudchunk_compression_level",
            "Compression level at the end of the last write",
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(chunks_uploaded.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(chunks_downloaded.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(bytes_raw.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(bytes_stored.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(operations.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(failures.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(compression_level.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            chunks_uploaded,
            chunks_downloaded,
            bytes_raw,
            bytes_stored,
            operations,
            failures,
            compression_level,
        })
    }

    pub fn record_operation(&self, op: &str) {
        self.operations.with_label_values(&[op]).inc();
    }

    pub fn record_failure(&self, op: &str) {
        self.failures.with_label_values(&[op]).inc();
    }

    /// Account a successful write
    pub fn record_write(&self, stats: &TransferStats) {
        self.chunks_uploaded.inc_by(stats.blocks as u64);
        self.bytes_raw.inc_by(stats.raw_bytes);
        self.bytes_stored.inc_by(stats.stored_bytes);
        self.compression_level.set(stats.final_level as i64);
    }

    /// Account a successful read
    pub fn record_read(&self, stats: &TransferStats) {
        self.chunks_downloaded.inc_by(stats.blocks as u64);
        self.bytes_raw.inc_by(stats.raw_bytes);
        self.bytes_stored.inc_by(stats.stored_bytes);
    }

    pub fn chunks_uploaded(&self) -> u64 {
        self.chunks_uploaded.get()
    }

    pub fn chunks_downloaded(&self) -> u64 {
        self.chunks_downloaded.get()
    }

    pub fn failures(&self, op: &str) -> u64 {
        self.failures.with_label_values(&[op]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for TransferMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferMetrics")
            .field("chunks_uploaded", &self.chunks_uploaded.get())
            .field("chunks_downloaded", &self.chunks_downloaded.get())
            .finish()
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics: {}", e))
}
