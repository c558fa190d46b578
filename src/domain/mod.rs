//! Domain Layer
//!
//! The only domain abstraction the engine needs is the object-store port.
//!
//! # Usage
//!
//! ```ignore
//! use cloudchunk::domain::ports::{ObjectStore, Status};
//!
//! fn publish<S: ObjectStore>(store: &S, key: &str, body: &[u8]) -> bool {
//!     store.put(key, body).is_success()
//! }
//! ```

pub mod ports;

pub use ports::{ObjectStore, Status};
