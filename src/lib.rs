//! cloudchunk - Chunked, Adaptively Compressed Object Transfer
//!
//! Stores large files in a remote object store as ordered, independently
//! compressed chunks plus a small manifest, and rebuilds them on read.
//!
//! # Architecture
//!
//! The write path is a single producer feeding a pool of upload workers
//! through a shared queue, with a feedback loop on compression effort:
//!
//! ```text
//! Splitter (producer) → ChunkQueue → Upload Pool → ObjectStore
//!         ▲                  │
//!         └── Controller ◀───┘  (queue depth → compression level)
//! ```
//!
//! The read path fetches the manifest, then rebuilds every chunk in parallel
//! and writes them back in index order.
//!
//! # Example
//!
//! ```
//! use cloudchunk::adapters::InMemoryObjectStore;
//! use cloudchunk::config::EngineConfig;
//! use cloudchunk::ChunkEngine;
//!
//! let config = EngineConfig { chunk_size: 1024, ..Default::default() };
//! let engine = ChunkEngine::new(InMemoryObjectStore::new(), config).unwrap();
//!
//! let data = vec![42u8; 10_000];
//! assert!(engine.write_object("/backups/disk.img", &data));
//! assert_eq!(engine.read_object_to_vec("/backups/disk.img"), Some(data));
//! assert!(engine.delete_object("/backups/disk.img"));
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Object store implementations (memory, local, Swift)
//! - [`config`] - Engine and store configuration
//! - [`domain`] - The object store port
//! - [`engine`] - Public write/read/delete/copy operations
//! - [`error`] - Error types
//! - [`metrics`] - Transfer statistics and prometheus counters
//! - [`transfer`] - Queue, controller, codecs, worker pools and key layout

pub mod adapters;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod transfer;

// Re-export commonly used types
pub use config::{AppConfig, EngineConfig, StoreConfig};
pub use domain::{ObjectStore, Status};
pub use engine::ChunkEngine;
pub use error::{Error, Result};
pub use metrics::{TransferMetrics, TransferStats};
pub use transfer::CodecKind;
