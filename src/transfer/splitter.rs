//! Splitter / Producer
//!
//! Slices a file buffer into `chunk_size` pieces, compresses each at the
//! controller's current level and pushes it onto the transfer queue. The level
//! is re-read for every chunk, so effort can change in the middle of a file.
//!
//! The queue-depth delta fed to the controller spans the whole production
//! step: it is sampled before compressing and again right after the push, so
//! chunks the uploaders took off the queue meanwhile show up as negative
//! growth.

use tracing::{debug, trace};

use crate::error::Result;

use super::codec::ChunkCodec;
use super::context::TransferContext;
use super::queue::{Chunk, CloseOnDrop};

/// Number of chunks needed for `size` bytes
pub fn block_count(size: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size)
}

/// Byte range of chunk `index`
pub fn chunk_range(index: usize, size: usize, chunk_size: usize) -> std::ops::Range<usize> {
    let start = (index * chunk_size).min(size);
    let end = ((index + 1) * chunk_size).min(size);
    start..end
}

/// What the producer pushed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProduceReport {
    pub blocks: usize,
    pub raw_bytes: u64,
    pub stored_bytes: u64,
    pub final_level: u32,
    pub peak_level: u32,
}

/// Producer side of a write transfer
pub struct Splitter<'a> {
    codec: &'a ChunkCodec,
    chunk_size: usize,
}

impl<'a> Splitter<'a> {
    pub fn new(codec: &'a ChunkCodec, chunk_size: usize) -> Self {
        Self { codec, chunk_size }
    }

    /// Produce every chunk of `data` into the context's queue, then close it.
    ///
    /// The queue is closed on every exit path, including errors, so that the
    /// consumers always terminate.
    pub fn produce(&self, data: &[u8], ctx: &TransferContext) -> Result<ProduceReport> {
        let queue = ctx.queue();
        let controller = ctx.controller();
        let _close = CloseOnDrop(queue.as_ref());

        controller.reset();

        let blocks = block_count(data.len(), self.chunk_size);
        let mut report = ProduceReport {
            blocks,
            ..Default::default()
        };

        for index in 0..blocks {
            let depth_before = queue.depth();
            let level = controller.level();

            let slice = &data[chunk_range(index, data.len(), self.chunk_size)];
            let payload = self.codec.compress(slice, level)?;

            report.raw_bytes += slice.len() as u64;
            report.stored_bytes += payload.len() as u64;

            let depth_after = queue.push(Chunk::new(index, payload))?;
            let delta = depth_after as i64 - depth_before as i64;
            let next = controller.update(depth_after, delta);

            if next != level {
                debug!(
                    transfer_id = %ctx.id(),
                    index,
                    depth = depth_after,
                    delta,
                    "compression level {} -> {}",
                    level,
                    next
                );
            } else {
                trace!(transfer_id = %ctx.id(), index, depth = depth_after, delta, level);
            }
        }

        report.final_level = controller.level();
        report.peak_level = controller.peak();
        Ok(report)
    }
}
