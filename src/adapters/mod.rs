//! Infrastructure Adapters
//!
//! Implementations of the [`ObjectStore`](crate::domain::ports::ObjectStore)
//! port, following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Port (Trait)                             │ │
//! │  │                    ObjectStore                              │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ InMemoryObjectStore │ LocalDirStore │ SwiftStore           │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use cloudchunk::adapters::LocalDirStore;
//! use cloudchunk::domain::ports::ObjectStore;
//!
//! let store = LocalDirStore::new("/var/lib/cloudchunk").unwrap();
//! assert!(store.put("container/file.", b"0").is_success());
//! ```

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::domain::ports::ObjectStore;
use crate::error::Result;

mod local;
mod memory;
mod swift;

pub use local::LocalDirStore;
pub use memory::{InMemoryObjectStore, MemoryStoreStats, StoreOp};
pub use swift::SwiftStore;

/// Build the store described by `config`.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    config.validate()?;
    let store: Arc<dyn ObjectStore> = match config {
        StoreConfig::Memory => Arc::new(InMemoryObjectStore::new()),
        StoreConfig::Local { root } => Arc::new(LocalDirStore::new(root)?),
        StoreConfig::Swift { .. } => Arc::new(SwiftStore::from_config(config)?),
    };
    Ok(store)
}
