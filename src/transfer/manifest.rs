//! Manifest Encoding
//!
//! The manifest body is the chunk count in ASCII decimal and nothing else.
//! An empty body is a zero-chunk object (what truncate-to-zero leaves behind).

use crate::error::{Error, Result};

/// Chunk count of one logical object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Manifest {
    pub blocks: usize,
}

impl Manifest {
    pub fn new(blocks: usize) -> Self {
        Self { blocks }
    }

    /// Manifest body bytes
    pub fn encode(&self) -> Vec<u8> {
        self.blocks.to_string().into_bytes()
    }

    /// Parse a manifest body fetched for `path`
    pub fn decode(path: &str, body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body).map_err(|_| Error::Manifest {
            path: path.to_string(),
            reason: "body is not ASCII".into(),
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::new(0));
        }
        text.parse::<usize>()
            .map(Self::new)
            .map_err(|e| Error::Manifest {
                path: path.to_string(),
                reason: format!("'{}' is not a chunk count: {}", text, e),
            })
    }
}
