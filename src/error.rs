//! Error types for the chunked transfer engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside the transfer engine and its store adapters
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Object path cannot be mapped to store keys
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Manifest body is not a chunk count
    #[error("Invalid manifest for {path}: {reason}")]
    Manifest { path: String, reason: String },

    /// Object store returned a non-success status
    #[error("Object store {op} of '{key}' failed with status {status}")]
    Store {
        op: &'static str,
        key: String,
        status: u16,
    },

    /// One or more chunks of a transfer failed
    #[error("{failed} of {total} chunks of {path} failed to transfer")]
    ChunkTransfer {
        path: String,
        failed: usize,
        total: usize,
    },

    /// HTTP transport error
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Operation is not supported by the engine
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A pool worker thread panicked
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Compression Errors
    // =========================================================================
    /// Compression failed
    #[error("Compression with {algorithm} failed: {reason}")]
    CompressionFailed { algorithm: String, reason: String },

    /// Decompression failed
    #[error("Decompression with {algorithm} failed: {reason}")]
    DecompressionFailed { algorithm: String, reason: String },
}
