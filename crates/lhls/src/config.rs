use std::time::Duration;

/// Default lookahead past the current stream position.
pub const DEFAULT_FUTURE_HORIZON: Duration = Duration::from_secs(5);

/// Default number of target durations kept behind the current stream position.
pub const DEFAULT_TRAILING_TARGET_DURATIONS: u32 = 3;

/// Default lower bound on how long a segment transfer is paced over.
pub const DEFAULT_MIN_DELIVERY: Duration = Duration::from_secs(1);

/// Default read size for paced segment delivery.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Tunables for the live window and segment pacing.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// How far beyond the current position the manifest reaches
    pub future_horizon: Duration,
    /// Trailing safety margin, in multiples of the playlist target duration
    pub trailing_target_durations: u32,
    /// Floor for the pacing window of a segment transfer
    pub min_delivery: Duration,
    /// Bytes read from disk per paced chunk
    pub chunk_size: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            future_horizon: DEFAULT_FUTURE_HORIZON,
            trailing_target_durations: DEFAULT_TRAILING_TARGET_DURATIONS,
            min_delivery: DEFAULT_MIN_DELIVERY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LiveConfig {
    pub fn with_future_horizon(mut self, future_horizon: Duration) -> Self {
        self.future_horizon = future_horizon;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        // A zero-sized read would never make progress.
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Trailing margin in seconds for a playlist with the given target duration.
    pub(crate) fn trailing_margin(&self, target_duration: f64) -> f64 {
        f64::from(self.trailing_target_durations) * target_duration
    }
}
