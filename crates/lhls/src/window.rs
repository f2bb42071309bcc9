//! Live window computation and manifest rendering.

use std::sync::Arc;

use m3u8_rs::MediaPlaylist;
use tracing::{debug, info};

use crate::clock::StreamClock;
use crate::config::LiveConfig;
use crate::error::{Error, Result};
use crate::playlist::{Playlist, Segment};

/// Content type of rendered manifests.
pub const MANIFEST_CONTENT_TYPE: &str = "application/x-mpegURL";

/// Segments currently visible to a polling client.
#[derive(Debug, Clone)]
pub struct Window<'a> {
    segments: &'a [Segment],
    media_sequence: u64,
    target_duration: u64,
    version: Option<usize>,
    elapsed: f64,
}

impl<'a> Window<'a> {
    pub fn segments(&self) -> &'a [Segment] {
        self.segments
    }

    /// Index of the first segment in the window, reported as `#EXT-X-MEDIA-SEQUENCE`.
    pub fn media_sequence(&self) -> u64 {
        self.media_sequence
    }

    /// Stream position the window was computed for, in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Encode the window as an HLS media playlist without an end tag.
    pub fn render(&self) -> Result<Vec<u8>> {
        let playlist = MediaPlaylist {
            version: Some(self.version.unwrap_or(3)),
            target_duration: self.target_duration,
            media_sequence: self.media_sequence,
            segments: self
                .segments
                .iter()
                .map(|segment| segment.media_segment().clone())
                .collect(),
            end_list: false,
            ..Default::default()
        };

        let mut body = Vec::with_capacity(64 * (self.segments.len() + 1));
        playlist
            .write_to(&mut body)
            .map_err(Error::ManifestEncode)?;
        Ok(body)
    }
}

/// Compute the window for a stream position of `elapsed` seconds.
///
/// A segment is included once its end plus the trailing margin lies beyond
/// `elapsed`; the walk stops after the first segment starting past the future
/// horizon. The included segments are therefore always contiguous.
pub fn compute_window<'a>(
    elapsed: f64,
    playlist: &'a Playlist,
    config: &LiveConfig,
) -> Result<Window<'a>> {
    let margin = config.trailing_margin(playlist.target_duration() as f64);
    let horizon = elapsed + config.future_horizon.as_secs_f64();

    let mut first = None;
    let mut last = 0;
    for segment in playlist.segments() {
        if segment.end_offset() + margin > elapsed {
            first.get_or_insert(segment.index);
            last = segment.index;
        }
        if segment.start_offset > horizon {
            break;
        }
    }

    let first = first.ok_or(Error::EmptyWindow)?;
    Ok(Window {
        segments: &playlist.segments()[first..=last],
        media_sequence: first as u64,
        target_duration: playlist.target_duration(),
        version: playlist.version(),
        elapsed,
    })
}

/// Window calculator bound to a playlist, looping the stream when it runs out.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    playlist: Arc<Playlist>,
    config: LiveConfig,
}

impl LiveWindow {
    pub fn new(playlist: Arc<Playlist>, config: LiveConfig) -> Self {
        Self { playlist, config }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Window for the clock's current position.
    ///
    /// Once the whole program has elapsed the clock is re-anchored to now and
    /// the window is computed from the start of the program again.
    pub fn next_window(&self, clock: &dyn StreamClock) -> Result<Window<'_>> {
        let mut elapsed = clock.elapsed().as_secs_f64();
        let total = self.playlist.total_duration();

        if elapsed >= total {
            info!(elapsed, total, "Program finished, looping stream");
            clock.reset();
            elapsed = 0.0;
        }

        let window = compute_window(elapsed, &self.playlist, &self.config)?;
        debug!(
            elapsed,
            media_sequence = window.media_sequence(),
            segments = window.segments().len(),
            "Computed live window"
        );
        Ok(window)
    }

    /// Render the manifest for the clock's current position.
    pub fn manifest(&self, clock: &dyn StreamClock) -> Result<Vec<u8>> {
        self.next_window(clock)?.render()
    }
}
