//! Fake low-latency live HLS from a VOD playlist.
//!
//! The engine exposes a sliding manifest window driven by a [`StreamClock`]
//! and a [`SegmentGate`] that holds segment requests until their airtime and
//! paces their bytes to the segment's nominal duration.

pub mod clock;
pub mod config;
pub mod error;
pub mod playlist;
pub mod shaper;
pub mod window;

pub use clock::{StreamClock, TokioClock};
pub use config::LiveConfig;
pub use error::{Error, Result};
pub use playlist::{Playlist, Segment};
pub use shaper::{DeliveryPlan, SEGMENT_CONTENT_TYPE, SegmentGate, ShapedSegment};
pub use window::{LiveWindow, MANIFEST_CONTENT_TYPE, Window, compute_window};
