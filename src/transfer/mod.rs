//! Chunked Transfer Module
//!
//! Building blocks of the engine: a file is split into fixed-size chunks,
//! each compressed independently and stored as its own object, plus a small
//! manifest recording how many chunks make up the file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         TransferContext                                  │
//! │  ┌──────────────┐   push    ┌──────────────┐   pop_wait  ┌───────────┐  │
//! │  │   Splitter   │──────────▶│  ChunkQueue  │────────────▶│  Upload   │  │
//! │  │  (producer)  │           │   (FIFO +    │             │  Pool xN  │  │
//! │  └──────┬───────┘           │    close)    │             └───────────┘  │
//! │         │ level                └──────┬───────┘                         │
//! │  ┌──────┴───────────────────┐        │ depth, delta                     │
//! │  │  CompressionController   │◀───────┘                                  │
//! │  └──────────────────────────┘                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Queue** (`queue.rs`): blocking FIFO with an explicit close signal
//! - **Controller** (`controller.rs`): maps queue depth and growth to a
//!   compression level in `0..=9`
//! - **Codec** (`codec.rs`): zlib, lz4 or raw chunk payloads
//! - **Splitter** (`splitter.rs`): slices, compresses and enqueues chunks
//! - **Upload / Rebuild pools** (`upload.rs`, `rebuild.rs`): parallel PUT of
//!   queued chunks; parallel GET + inflate with ordered write-back
//! - **Keys / Manifest** (`keys.rs`, `manifest.rs`): store layout of an object
//! - **Lifecycle** (`lifecycle.rs`): delete, copy and truncate

pub mod codec;
pub mod context;
pub mod controller;
pub mod keys;
pub mod lifecycle;
pub mod manifest;
pub mod queue;
pub mod rebuild;
pub mod splitter;
pub mod upload;

#[cfg(test)]
mod proptest;

pub use codec::{ChunkCodec, CodecKind, Compressor};
pub use context::TransferContext;
pub use controller::{CompressionController, MAX_LEVEL};
pub use keys::ObjectKey;
pub use manifest::Manifest;
pub use queue::{Chunk, ChunkQueue};
pub use rebuild::{RebuildPool, RebuildReport};
pub use splitter::{block_count, ProduceReport, Splitter};
pub use upload::{UploadPool, UploadReport};
