//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the abstraction the transfer engine depends on: a
//! remote object store that can put, get, delete and server-side copy whole
//! objects by key. Infrastructure adapters implement [`ObjectStore`] to provide
//! concrete transports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transfer Engine                         │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Port (Trait)                      │    │
//! │  │                    ObjectStore                       │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  InMemoryObjectStore │ LocalDirStore │ SwiftStore   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The port speaks in status codes rather than `Result`: the engine reduces
//! every per-key outcome to a boolean, and retry/backoff is the adapter's job.

use bytes::Bytes;

// =============================================================================
// Value Objects
// =============================================================================

/// Status code reported by the object store for a single request.
///
/// Codes in `[200, 400)` are success; anything else, including
/// [`Status::NO_RESPONSE`], is failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

impl Status {
    /// No response was received (transport failure)
    pub const NO_RESPONSE: Status = Status(0);
    pub const OK: Status = Status(200);
    pub const CREATED: Status = Status(201);
    pub const NO_CONTENT: Status = Status(204);
    pub const BAD_REQUEST: Status = Status(400);
    pub const NOT_FOUND: Status = Status(404);
    pub const INTERNAL_ERROR: Status = Status(500);

    /// Raw status code
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Whether the engine treats this status as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.0)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

// =============================================================================
// Object Store Port
// =============================================================================

/// Port for the remote object store.
///
/// Implementations must be safe to call from many worker threads at once.
///
/// # Example
///
/// ```
/// use cloudchunk::adapters::InMemoryObjectStore;
/// use cloudchunk::domain::ports::ObjectStore;
///
/// let store = InMemoryObjectStore::new();
/// assert!(store.put("dir/file.", b"3").is_success());
///
/// let (body, status) = store.get("dir/file.");
/// assert!(status.is_success());
/// assert_eq!(body.as_ref(), b"3");
/// ```
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any previous object.
    fn put(&self, key: &str, body: &[u8]) -> Status;

    /// Fetch the object stored under `key`.
    fn get(&self, key: &str) -> (Bytes, Status);

    /// Remove the object stored under `key`.
    fn delete(&self, key: &str) -> Status;

    /// Server-side copy of `src` to `dst`.
    fn copy(&self, src: &str, dst: &str) -> Status;

    /// Create a directory marker at `key`.
    fn create_directory(&self, key: &str) -> Status {
        self.put(key, &[])
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    fn put(&self, key: &str, body: &[u8]) -> Status {
        (**self).put(key, body)
    }

    fn get(&self, key: &str) -> (Bytes, Status) {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> Status {
        (**self).delete(key)
    }

    fn copy(&self, src: &str, dst: &str) -> Status {
        (**self).copy(src, dst)
    }

    fn create_directory(&self, key: &str) -> Status {
        (**self).create_directory(key)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_success_range() {
        assert!(Status(200).is_success());
        assert!(Status(201).is_success());
        assert!(Status(304).is_success());
        assert!(Status(399).is_success());

        assert!(!Status(199).is_success());
        assert!(!Status(400).is_success());
        assert!(!Status(404).is_success());
        assert!(!Status(503).is_success());
        assert!(!Status::NO_RESPONSE.is_success());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::NOT_FOUND.to_string(), "404");
        assert_eq!(Status::from(201).code(), 201);
    }
}
