//! Adaptive Compression Controller
//!
//! Closed-loop rate control for the producer. After every chunk is pushed the
//! controller looks at the queue depth and at how much the queue grew while
//! that chunk was being produced:
//!
//! ```text
//! depth_after_push   delta > 0     delta < 0     delta == 0
//! ─────────────────  ────────────  ────────────  ───────────
//!        < 10        unchanged     level / 2     level / 2
//!   10 ..< 20        +1            -1            unchanged
//!   20 ..< 30        +2            -1            unchanged
//!       >= 30        +2            unchanged     unchanged
//! ```
//!
//! A growing queue means uploads lag production, so more CPU goes into
//! shrinking each chunk. A shrinking queue means spare bandwidth, so effort
//! drops. The result is always clamped to `0..=MAX_LEVEL`.

use parking_lot::Mutex;

/// Highest compression level
pub const MAX_LEVEL: u32 = 9;

/// Queue depth below which the controller relaxes
pub const LOW_WATERMARK: usize = 10;

/// Queue depth from which growth is answered with a double step
pub const HIGH_WATERMARK: usize = 20;

/// Queue depth from which the controller only ever raises the level
pub const SATURATION_WATERMARK: usize = 30;

/// Compute the level that follows `level` for one observation.
pub fn next_level(level: u32, depth_after_push: usize, depth_delta: i64) -> u32 {
    let level = level.min(MAX_LEVEL) as i64;

    let next = if depth_after_push < LOW_WATERMARK {
        if depth_delta <= 0 {
            level / 2
        } else {
            level
        }
    } else if depth_after_push < HIGH_WATERMARK {
        match depth_delta.signum() {
            1 => level + 1,
            -1 => level - 1,
            _ => level,
        }
    } else if depth_after_push < SATURATION_WATERMARK {
        match depth_delta.signum() {
            1 => level + 2,
            -1 => level - 1,
            _ => level,
        }
    } else if depth_delta > 0 {
        level + 2
    } else {
        level
    };

    next.clamp(0, MAX_LEVEL as i64) as u32
}

/// Per-transfer compression level, mutated only through [`update`](Self::update).
#[derive(Debug, Default)]
pub struct CompressionController {
    state: Mutex<ControllerState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ControllerState {
    level: u32,
    peak: u32,
    adjustments: u64,
}

impl CompressionController {
    /// Create a controller at level 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level
    pub fn level(&self) -> u32 {
        self.state.lock().level
    }

    /// Highest level reached since the last reset
    pub fn peak(&self) -> u32 {
        self.state.lock().peak
    }

    /// Number of updates that changed the level since the last reset
    pub fn adjustments(&self) -> u64 {
        self.state.lock().adjustments
    }

    /// Back to level 0
    pub fn reset(&self) {
        *self.state.lock() = ControllerState::default();
    }

    /// Feed one observation and return the new level.
    pub fn update(&self, depth_after_push: usize, depth_delta: i64) -> u32 {
        let mut state = self.state.lock();
        let next = next_level(state.level, depth_after_push, depth_delta);
        if next != state.level {
            state.adjustments += 1;
        }
        state.level = next;
        state.peak = state.peak.max(next);
        next
    }
}
