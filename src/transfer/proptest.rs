//! Property-Based Tests for the Transfer Pipeline
//!
//! # Test Properties
//!
//! 1. **Level range**: the controller never leaves `0..=9`
//! 2. **Growth saturates**: sustained growth past depth 30 pins the level at 9
//! 3. **Drain relaxes**: no growth below depth 10 pins the level at 0
//! 4. **Roundtrip**: write then read reproduces the bytes for any size,
//!    chunk size, worker count and codec
//! 5. **Exactly once**: every chunk index is uploaded exactly once

#![cfg(test)]

use proptest::prelude::*;

use super::codec::CodecKind;
use super::controller::{next_level, CompressionController, MAX_LEVEL};
use super::keys::ObjectKey;
use super::splitter::block_count;
use crate::adapters::{InMemoryObjectStore, StoreOp};
use crate::config::EngineConfig;
use crate::engine::ChunkEngine;

// =============================================================================
// Property Strategies
// =============================================================================

/// Observations fed to the controller: (depth after push, delta)
fn observation_strategy() -> impl Strategy<Value = (usize, i64)> {
    (0usize..60, -5i64..=5)
}

fn codec_strategy() -> impl Strategy<Value = CodecKind> {
    prop_oneof![
        Just(CodecKind::Zlib),
        Just(CodecKind::Lz4),
        Just(CodecKind::None),
    ]
}

/// Compressible but not constant
fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcdefgh \n".to_vec()), 0..4000)
}

fn engine(chunk_size: usize, workers: usize, codec: CodecKind) -> ChunkEngine<InMemoryObjectStore> {
    let config = EngineConfig {
        chunk_size,
        workers,
        codec,
        ..Default::default()
    };
    ChunkEngine::new(InMemoryObjectStore::new(), config).unwrap()
}

// =============================================================================
// Controller Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: any observation sequence keeps the level in range.
    #[test]
    fn prop_level_stays_in_range(
        observations in prop::collection::vec(observation_strategy(), 0..200),
    ) {
        let controller = CompressionController::new();
        for (depth, delta) in observations {
            let level = controller.update(depth, delta);
            prop_assert!(level <= MAX_LEVEL);
        }
    }

    /// Property: from any level, growth at depth >= 30 reaches 9 within five steps and stays.
    #[test]
    fn prop_growth_saturates(start in 0u32..=MAX_LEVEL, depth in 30usize..500, delta in 1i64..50) {
        let mut level = start;
        for _ in 0..5 {
            level = next_level(level, depth, delta);
        }
        prop_assert_eq!(level, MAX_LEVEL);
        prop_assert_eq!(next_level(level, depth, delta), MAX_LEVEL);
    }

    /// Property: from any level, no growth below depth 10 reaches 0 within four steps and stays.
    #[test]
    fn prop_drain_relaxes(start in 0u32..=MAX_LEVEL, depth in 0usize..10, delta in -50i64..=0) {
        let mut level = start;
        for _ in 0..4 {
            level = next_level(level, depth, delta);
        }
        prop_assert_eq!(level, 0);
        prop_assert_eq!(next_level(level, depth, delta), 0);
    }

    /// Property: a mid-depth step moves the level by at most two.
    #[test]
    fn prop_steps_are_small(level in 0u32..=MAX_LEVEL, (depth, delta) in observation_strategy()) {
        let next = next_level(level, depth, delta);
        prop_assert!(next <= level + 2);
    }
}

// =============================================================================
// Pipeline Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: write then read returns the original bytes.
    #[test]
    fn prop_roundtrip(
        data in data_strategy(),
        chunk_size in 1usize..700,
        workers in 1usize..6,
        codec in codec_strategy(),
    ) {
        let engine = engine(chunk_size, workers, codec);

        prop_assert!(engine.write_object("/box/item", &data));
        let read = engine.read_object_to_vec("/box/item");
        prop_assert_eq!(read, Some(data.clone()));

        let stats = engine.last_stats().unwrap();
        prop_assert_eq!(stats.blocks, block_count(data.len(), chunk_size));
    }

    /// Property: every chunk index is PUT exactly once, then the manifest.
    #[test]
    fn prop_each_chunk_uploaded_once(
        len in 0usize..3000,
        chunk_size in 1usize..300,
        workers in 1usize..9,
    ) {
        let engine = engine(chunk_size, workers, CodecKind::None);
        let data = vec![0x5au8; len];
        prop_assert!(engine.write_object("/box/item", &data));

        let key = ObjectKey::new("/box/item").unwrap();
        let blocks = block_count(len, chunk_size);
        let mut puts = engine.store().journal_keys(StoreOp::Put);

        prop_assert_eq!(puts.pop(), Some(key.manifest_key()));
        puts.sort();
        let mut expected: Vec<String> = key.chunk_keys(blocks).collect();
        expected.sort();
        prop_assert_eq!(puts, expected);
    }
}
