//! Chunk Payload Codecs
//!
//! Every chunk is compressed independently so that it can be fetched and
//! inflated on its own. The effort applied to each chunk is the controller
//! level (0-9) read at the moment the chunk is produced.
//!
//! # Example
//!
//! ```
//! use cloudchunk::transfer::codec::{ChunkCodec, CodecKind};
//!
//! let codec = ChunkCodec::new(CodecKind::Zlib);
//!
//! let data = b"Hello, this is test data that should compress well!";
//! let compressed = codec.compress(data, 6).unwrap();
//!
//! let decompressed = codec.decompress(&compressed).unwrap();
//! assert_eq!(decompressed.as_ref(), data);
//! ```

use std::io::{Read, Write};
use std::str::FromStr;

use bytes::Bytes;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::transfer::controller::MAX_LEVEL;

// =============================================================================
// Codec Kind
// =============================================================================

/// Supported chunk codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// zlib stream, level used as-is
    Zlib,
    /// LZ4 block with size prefix
    Lz4,
    /// Raw bytes
    None,
}

impl CodecKind {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Zlib => "zlib",
            CodecKind::Lz4 => "lz4",
            CodecKind::None => "none",
        }
    }

    /// Get list of available codecs
    pub fn available() -> Vec<Self> {
        vec![Self::Zlib, Self::Lz4, Self::None]
    }
}

impl Default for CodecKind {
    fn default() -> Self {
        CodecKind::Zlib
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CodecKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zlib" | "deflate" => Ok(CodecKind::Zlib),
            "lz4" => Ok(CodecKind::Lz4),
            "none" | "raw" => Ok(CodecKind::None),
            other => Err(Error::Config(format!("unknown codec '{}'", other))),
        }
    }
}

// =============================================================================
// Compressor Trait
// =============================================================================

/// Trait for compression implementations
pub trait Compressor: Send + Sync {
    /// Get the codec identifier
    fn kind(&self) -> CodecKind;

    /// Compress data at `level` (0 = least effort, 9 = most)
    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>>;

    /// Decompress data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

// =============================================================================
// No-Op Compressor
// =============================================================================

/// Pass-through compressor (no compression)
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn kind(&self) -> CodecKind {
        CodecKind::None
    }

    fn compress(&self, data: &[u8], _level: u32) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

// =============================================================================
// Zlib Compressor
// =============================================================================

/// zlib compressor. Level 0 still emits a valid (stored) stream.
pub struct ZlibCompressor;

impl Compressor for ZlibCompressor {
    fn kind(&self) -> CodecKind {
        CodecKind::Zlib
    }

    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>> {
        let level = flate2::Compression::new(level.min(MAX_LEVEL));
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
        encoder
            .write_all(data)
            .and_then(|_| encoder.finish())
            .map_err(|e| Error::CompressionFailed {
                algorithm: "zlib".into(),
                reason: e.to_string(),
            })
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 2);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::DecompressionFailed {
                algorithm: "zlib".into(),
                reason: e.to_string(),
            })?;
        Ok(out)
    }
}

// =============================================================================
// LZ4 Compressor
// =============================================================================

/// LZ4 compressor. Level 0 uses the fast mode, 1-9 the high-compression mode.
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn kind(&self) -> CodecKind {
        CodecKind::Lz4
    }

    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>> {
        let mode = match level.min(MAX_LEVEL) {
            0 => lz4::block::CompressionMode::DEFAULT,
            n => lz4::block::CompressionMode::HIGHCOMPRESSION(n as i32),
        };
        lz4::block::compress(data, Some(mode), true).map_err(|e| Error::CompressionFailed {
            algorithm: "lz4".into(),
            reason: e.to_string(),
        })
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::decompress(data, None).map_err(|e| Error::DecompressionFailed {
            algorithm: "lz4".into(),
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// Chunk Codec
// =============================================================================

/// Codec applied to every chunk of a transfer
pub struct ChunkCodec {
    compressor: Box<dyn Compressor>,
}

impl ChunkCodec {
    /// Create a codec of the given kind
    pub fn new(kind: CodecKind) -> Self {
        let compressor: Box<dyn Compressor> = match kind {
            CodecKind::Zlib => Box::new(ZlibCompressor),
            CodecKind::Lz4 => Box::new(Lz4Compressor),
            CodecKind::None => Box::new(NoopCompressor),
        };
        Self { compressor }
    }

    /// Codec in use
    pub fn kind(&self) -> CodecKind {
        self.compressor.kind()
    }

    /// Compress one chunk at `level`
    pub fn compress(&self, data: &[u8], level: u32) -> Result<Bytes> {
        self.compressor.compress(data, level).map(Bytes::from)
    }

    /// Decompress one chunk
    pub fn decompress(&self, data: &[u8]) -> Result<Bytes> {
        self.compressor.decompress(data).map(Bytes::from)
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(CodecKind::default())
    }
}

impl std::fmt::Debug for ChunkCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCodec")
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const TEST_DATA: &[u8] = b"Hello, this is test data that should compress well. \
        It has some repetition: Hello, this is test data that should compress well.";

    #[test]
    fn test_zlib_roundtrip_every_level() {
        let compressor = ZlibCompressor;

        for level in 0..=MAX_LEVEL {
            let compressed = compressor.compress(TEST_DATA, level).unwrap();
            let decompressed = compressor.decompress(&compressed).unwrap();
            assert_eq!(decompressed, TEST_DATA, "level {}", level);
        }
    }

    #[test]
    fn test_zlib_effort_shrinks_output() {
        let compressor = ZlibCompressor;
        let data: Vec<u8> = TEST_DATA.iter().cycle().take(64 * 1024).copied().collect();

        let stored = compressor.compress(&data, 0).unwrap();
        let best = compressor.compress(&data, 9).unwrap();
        assert!(stored.len() >= data.len());
        assert!(best.len() < data.len() / 10);
    }

    #[test]
    fn test_zlib_empty_input() {
        let compressor = ZlibCompressor;
        let compressed = compressor.compress(b"", 5).unwrap();
        assert!(compressor.decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_lz4_roundtrip() {
        let compressor = Lz4Compressor;

        for level in [0, 1, 5, 9] {
            let compressed = compressor.compress(TEST_DATA, level).unwrap();
            let decompressed = compressor.decompress(&compressed).unwrap();
            assert_eq!(decompressed, TEST_DATA);
        }
    }

    #[test]
    fn test_noop_roundtrip() {
        let compressor = NoopCompressor;

        let compressed = compressor.compress(TEST_DATA, 9).unwrap();
        assert_eq!(compressed, TEST_DATA);

        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, TEST_DATA);
    }

    #[test]
    fn test_corrupt_input_is_reported() {
        let codec = ChunkCodec::new(CodecKind::Zlib);
        assert_matches!(
            codec.decompress(b"definitely not zlib"),
            Err(Error::DecompressionFailed { .. })
        );
    }

    #[test]
    fn test_codec_kind_parsing() {
        assert_eq!("zlib".parse::<CodecKind>().unwrap(), CodecKind::Zlib);
        assert_eq!("LZ4".parse::<CodecKind>().unwrap(), CodecKind::Lz4);
        assert_eq!("none".parse::<CodecKind>().unwrap(), CodecKind::None);
        assert_matches!("brotli".parse::<CodecKind>(), Err(Error::Config(_)));
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(CodecKind::Zlib.to_string(), "zlib");
        assert_eq!(CodecKind::available().len(), 3);
        assert_eq!(ChunkCodec::new(CodecKind::Lz4).kind(), CodecKind::Lz4);
    }
}
