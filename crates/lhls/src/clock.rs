//! Stream clock anchoring simulated playback to wall-clock time.

use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Source of the simulated stream position.
///
/// Readers observe `elapsed`; only the manifest loop-reset path calls `reset`.
pub trait StreamClock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Instant at which simulated playback started.
    fn stream_start(&self) -> Instant;

    /// Re-anchor the stream start to `now`.
    fn reset(&self);

    /// Time since the stream start. Never negative.
    fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.stream_start())
    }
}

/// Clock backed by `tokio::time`, so it follows a paused runtime in tests.
#[derive(Debug)]
pub struct TokioClock {
    start: RwLock<Instant>,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: RwLock::new(Instant::now()),
        }
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start: RwLock::new(start),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamClock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn stream_start(&self) -> Instant {
        *self.start.read()
    }

    fn reset(&self) {
        let now = self.now();
        *self.start.write() = now;
        debug!("Stream clock re-anchored");
    }
}
