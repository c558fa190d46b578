//! Per-transfer shared state
//!
//! Queue and controller are created fresh for each write and dropped once the
//! producer and every worker have joined, so nothing leaks between transfers.

use std::sync::Arc;

use uuid::Uuid;

use super::controller::CompressionController;
use super::queue::{Chunk, ChunkQueue};

/// State shared by the producer and the upload workers of one write
#[derive(Debug, Clone)]
pub struct TransferContext {
    id: Uuid,
    queue: Arc<ChunkQueue<Chunk>>,
    controller: Arc<CompressionController>,
}

impl TransferContext {
    /// Fresh queue, controller at level 0, random transfer id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: Arc::new(ChunkQueue::new()),
            controller: Arc::new(CompressionController::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn queue(&self) -> &Arc<ChunkQueue<Chunk>> {
        &self.queue
    }

    pub fn controller(&self) -> &Arc<CompressionController> {
        &self.controller
    }
}

impl Default for TransferContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_do_not_share_state() {
        let a = TransferContext::new();
        let b = TransferContext::new();

        a.queue().push(Chunk::new(0, "x")).unwrap();
        a.controller().update(15, 1);

        assert_ne!(a.id(), b.id());
        assert_eq!(b.queue().depth(), 0);
        assert_eq!(b.controller().level(), 0);
    }

    #[test]
    fn test_clone_shares_handles() {
        let a = TransferContext::new();
        let b = a.clone();
        a.queue().push(Chunk::new(0, "x")).unwrap();
        assert_eq!(b.queue().depth(), 1);
        assert_eq!(a.id(), b.id());
    }
}
