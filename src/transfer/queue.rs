//! Chunk Queue
//!
//! Unbounded FIFO shared by the producer and the worker pool of one transfer.
//! A single lock guards the items and the closed flag; a condition variable
//! wakes consumers when an item arrives or the queue is closed.
//!
//! Termination protocol: the producer pushes every item, then calls
//! [`close`](ChunkQueue::close). Consumers loop on
//! [`pop_wait`](ChunkQueue::pop_wait) until it returns `None`, which only
//! happens once the queue is both closed and drained.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// One slice of a file, compressed on the write path and inflated on the read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position; covers bytes `index * chunk_size ..`
    pub index: usize,
    /// Payload bytes
    pub payload: Bytes,
}

impl Chunk {
    pub fn new(index: usize, payload: impl Into<Bytes>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    pushed: u64,
}

/// Thread-safe FIFO with a close signal
#[derive(Debug)]
pub struct ChunkQueue<T = Chunk> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> Default for ChunkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChunkQueue<T> {
    /// Create an open, empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                pushed: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Create a queue already holding `items` and already closed.
    ///
    /// Consumers drain it with [`pop_wait`](Self::pop_wait) and stop at the end.
    pub fn closed_with(items: impl IntoIterator<Item = T>) -> Self {
        let items: VecDeque<T> = items.into_iter().collect();
        Self {
            state: Mutex::new(QueueState {
                pushed: items.len() as u64,
                items,
                closed: true,
            }),
            available: Condvar::new(),
        }
    }

    /// Append to the tail and return the depth right after the push.
    pub fn push(&self, item: T) -> Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Internal("push to a closed chunk queue".into()));
        }
        state.items.push_back(item);
        state.pushed += 1;
        let depth = state.items.len();
        drop(state);
        self.available.notify_one();
        Ok(depth)
    }

    /// Remove the head without waiting.
    pub fn pop_or_empty(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Remove the head, waiting for a producer if the queue is open and empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop_wait(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Signal that no more items will be pushed and wake every waiter.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Current number of queued items
    pub fn depth(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the queue currently holds no items
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Total items ever pushed
    pub fn pushed(&self) -> u64 {
        self.state.lock().pushed
    }
}

/// Closes the queue when dropped, so consumers terminate even if the
/// producer bails out early or panics.
pub struct CloseOnDrop<'a, T>(pub &'a ChunkQueue<T>);

impl<T> Drop for CloseOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = ChunkQueue::new();
        assert_eq!(queue.push(Chunk::new(0, "a")).unwrap(), 1);
        assert_eq!(queue.push(Chunk::new(1, "b")).unwrap(), 2);
        assert_eq!(queue.push(Chunk::new(2, "c")).unwrap(), 3);

        assert_eq!(queue.pop_or_empty().unwrap().index, 0);
        assert_eq!(queue.pop_or_empty().unwrap().index, 1);
        assert_eq!(queue.depth(), 1);
        assert_eq!(queue.pop_or_empty().unwrap().payload, Bytes::from("c"));
        assert!(queue.pop_or_empty().is_none());
        assert_eq!(queue.pushed(), 3);
    }

    #[test]
    fn test_pop_or_empty_never_blocks() {
        let queue: ChunkQueue<usize> = ChunkQueue::new();
        assert!(queue.pop_or_empty().is_none());
        assert!(queue.is_empty());
        assert!(!queue.is_closed());
    }

    #[test]
    fn test_closed_queue_drains_then_ends() {
        let queue = ChunkQueue::new();
        queue.push(7usize).unwrap();
        queue.close();

        assert_eq!(queue.pop_wait(), Some(7));
        assert_eq!(queue.pop_wait(), None);
        assert!(queue.push(8).is_err());
    }

    #[test]
    fn test_closed_with_is_prefilled_and_closed() {
        let queue = ChunkQueue::closed_with(0..3usize);
        assert!(queue.is_closed());
        assert_eq!(queue.depth(), 3);
        assert_eq!(queue.pushed(), 3);

        let drained: Vec<_> = std::iter::from_fn(|| queue.pop_wait()).collect();
        assert_eq!(drained, vec![0, 1, 2]);
        assert!(queue.push(3).is_err());
    }

    #[test]
    fn test_pop_wait_blocks_until_push() {
        let queue = Arc::new(ChunkQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.pop_wait())
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!consumer.is_finished(), "consumer should be waiting");

        queue.push(42usize).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn test_close_wakes_all_waiters() {
        let queue: Arc<ChunkQueue<usize>> = Arc::new(ChunkQueue::new());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || queue.pop_wait())
            })
            .collect();

        std::thread::sleep(Duration::from_millis(20));
        queue.close();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), None);
        }
    }

    #[test]
    fn test_close_on_drop_guard() {
        let queue: ChunkQueue<usize> = ChunkQueue::new();
        {
            let _guard = CloseOnDrop(&queue);
            queue.push(1).unwrap();
        }
        assert!(queue.is_closed());
        assert_eq!(queue.pop_wait(), Some(1));
        assert_eq!(queue.pop_wait(), None);
    }

    #[test]
    fn test_concurrent_consumers_take_each_item_once() {
        let queue = Arc::new(ChunkQueue::new());
        for i in 0..1000usize {
            queue.push(i).unwrap();
        }
        queue.close();

        let consumers: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(i) = queue.pop_wait() {
                        seen.push(i);
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<usize> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
