//! Segment gating and rate shaping.
//!
//! A segment request is held until the segment's nominal start offset has
//! been reached on the stream clock, then its bytes are paced so that the
//! transfer finishes roughly when the segment's play window ends.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::clock::StreamClock;
use crate::config::LiveConfig;
use crate::error::{Error, Result};
use crate::playlist::{Playlist, Segment};

/// Content type of served segments.
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

/// Timing decision for one segment transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryPlan {
    /// How long to hold the request before the segment airs
    pub wait: Duration,
    /// Time the transfer is spread over
    pub pacing_window: Duration,
    /// Target output rate in bytes per second
    pub rate: f64,
}

impl DeliveryPlan {
    /// Plan delivery of `byte_size` bytes of `segment` at stream position `elapsed`.
    ///
    /// After a wait the stream position is taken to be exactly the segment's
    /// start offset rather than measured again.
    pub fn new(segment: &Segment, elapsed: f64, byte_size: u64, min_delivery: Duration) -> Self {
        let (wait, elapsed) = if segment.start_offset > elapsed {
            (
                Duration::from_secs_f64(segment.start_offset - elapsed),
                segment.start_offset,
            )
        } else {
            (Duration::ZERO, elapsed)
        };

        let remaining = (segment.end_offset() - elapsed).max(min_delivery.as_secs_f64());
        Self {
            wait,
            pacing_window: Duration::from_secs_f64(remaining),
            rate: byte_size as f64 / remaining,
        }
    }
}

/// Resolves segment requests against the playlist and gates them on the stream clock.
#[derive(Debug, Clone)]
pub struct SegmentGate {
    playlist: Arc<Playlist>,
    config: LiveConfig,
}

impl SegmentGate {
    pub fn new(playlist: Arc<Playlist>, config: LiveConfig) -> Self {
        Self { playlist, config }
    }

    /// Resolve `uri`, wait for its airtime, and return a paced transfer.
    ///
    /// Unknown URIs and unreadable backing files fail before any waiting.
    pub async fn open(&self, uri: &str, clock: &dyn StreamClock) -> Result<ShapedSegment> {
        let segment = self
            .playlist
            .find(uri)
            .ok_or_else(|| Error::SegmentNotFound(uri.to_string()))?;

        let unavailable = |source| Error::SegmentUnavailable {
            uri: segment.uri.clone(),
            source,
        };
        let file = File::open(&segment.location).await.map_err(unavailable)?;
        let byte_size = file.metadata().await.map_err(unavailable)?.len();

        let elapsed = clock.elapsed().as_secs_f64();
        let plan = DeliveryPlan::new(segment, elapsed, byte_size, self.config.min_delivery);

        if !plan.wait.is_zero() {
            info!(
                segment = %segment.uri,
                wait_secs = plan.wait.as_secs_f64(),
                "Segment is in the future, waiting"
            );
            sleep(plan.wait).await;
        }

        debug!(
            segment = %segment.uri,
            byte_size,
            window_secs = plan.pacing_window.as_secs_f64(),
            rate = plan.rate,
            "Serving segment"
        );

        Ok(ShapedSegment {
            uri: segment.uri.clone(),
            byte_size,
            plan,
            chunk_size: self.config.chunk_size,
            file,
        })
    }
}

/// A gated segment ready to be streamed at its planned rate.
#[derive(Debug)]
pub struct ShapedSegment {
    uri: String,
    byte_size: u64,
    plan: DeliveryPlan,
    chunk_size: usize,
    file: File,
}

impl ShapedSegment {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn plan(&self) -> &DeliveryPlan {
        &self.plan
    }

    /// Paced byte stream of the segment file.
    ///
    /// Dropping the stream cancels the transfer.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        paced(self.file, self.plan.rate, self.chunk_size)
    }
}

/// Tracks bytes released so far and when the next chunk may go out.
#[derive(Debug)]
struct Pacer {
    rate: f64,
    started: Option<Instant>,
    sent: u64,
}

impl Pacer {
    fn new(rate: f64) -> Self {
        Self {
            rate,
            started: None,
            sent: 0,
        }
    }

    /// Earliest instant a chunk of `len` bytes may be released.
    fn release_at(&mut self, len: usize) -> Instant {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.sent += len as u64;

        if !self.rate.is_finite() || self.rate <= 0.0 {
            return started;
        }
        started + Duration::from_secs_f64(self.sent as f64 / self.rate)
    }
}

/// Stream `reader` in `chunk_size` reads, releasing bytes at no more than `rate` bytes/s.
///
/// A read error is yielded and ends the stream.
pub fn paced<R>(
    reader: R,
    rate: f64,
    chunk_size: usize,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + Send + 'static,
{
    let mut pacer = Pacer::new(rate);
    ReaderStream::with_capacity(reader, chunk_size.max(1)).then(move |chunk| {
        let release_at = match &chunk {
            Ok(bytes) => Some(pacer.release_at(bytes.len())),
            Err(_) => None,
        };
        async move {
            if let Some(deadline) = release_at {
                sleep_until(deadline).await;
            }
            chunk
        }
    })
}
