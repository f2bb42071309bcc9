//! VOD playlist loading.
//!
//! The playlist is parsed once at startup and shared read-only afterwards.
//! Each segment carries its resolved on-disk location and its nominal start
//! offset within the program, so neither needs recomputing per request.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use m3u8_rs::{MediaPlaylist, MediaSegment, parse_playlist_res};
use tracing::debug;

use crate::error::{Error, Result};

/// A single media segment of the source playlist.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Position in the playlist
    pub index: usize,
    /// URI exactly as written in the playlist
    pub uri: String,
    /// Nominal play duration in seconds
    pub duration: f64,
    /// Sum of the durations of all preceding segments, in seconds
    pub start_offset: f64,
    /// Resolved path of the backing file
    pub location: PathBuf,
    source: MediaSegment,
}

impl Segment {
    /// Offset at which this segment's nominal play window ends.
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }

    /// Whether `uri` names this segment, ignoring ASCII case.
    pub fn matches(&self, uri: &str) -> bool {
        self.uri.eq_ignore_ascii_case(uri)
    }

    pub(crate) fn media_segment(&self) -> &MediaSegment {
        &self.source
    }
}

/// An immutable VOD media playlist.
#[derive(Debug, Clone)]
pub struct Playlist {
    segments: Vec<Segment>,
    target_duration: u64,
    total_duration: f64,
    version: Option<usize>,
    source_path: Option<PathBuf>,
    base_dir: PathBuf,
}

impl Playlist {
    /// Read and parse the playlist at `path`, resolving segments against its directory.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| Error::PlaylistRead {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut playlist = Self::parse(&bytes, base_dir)?;
        playlist.source_path = Some(path.to_path_buf());
        Ok(playlist)
    }

    /// Parse playlist bytes, resolving relative segment URIs against `base_dir`.
    pub fn parse(bytes: &[u8], base_dir: impl Into<PathBuf>) -> Result<Self> {
        let media = match parse_playlist_res(bytes) {
            Ok(m3u8_rs::Playlist::MediaPlaylist(pl)) => pl,
            Ok(m3u8_rs::Playlist::MasterPlaylist(_)) => return Err(Error::NotMediaPlaylist),
            Err(e) => {
                return Err(Error::PlaylistParse {
                    reason: e.to_string(),
                });
            }
        };

        Self::from_media_playlist(media, base_dir.into())
    }

    fn from_media_playlist(media: MediaPlaylist, base_dir: PathBuf) -> Result<Self> {
        if media.segments.is_empty() {
            return Err(Error::EmptyPlaylist);
        }

        let mut seen = HashSet::with_capacity(media.segments.len());
        let mut segments = Vec::with_capacity(media.segments.len());
        let mut cursor = 0.0_f64;

        for (index, source) in media.segments.into_iter().enumerate() {
            let duration = f64::from(source.duration);
            if !duration.is_finite() || duration <= 0.0 {
                return Err(Error::invalid_segment(
                    source.uri,
                    format!("duration must be positive, got {duration}"),
                ));
            }
            if source.uri.trim().is_empty() {
                return Err(Error::invalid_segment(
                    format!("#{index}"),
                    "segment has no URI",
                ));
            }
            if !seen.insert(source.uri.to_ascii_lowercase()) {
                return Err(Error::invalid_segment(
                    source.uri,
                    "URI appears more than once (case-insensitive)",
                ));
            }

            let location = resolve_location(&base_dir, &source.uri);
            segments.push(Segment {
                index,
                uri: source.uri.clone(),
                duration,
                start_offset: cursor,
                location,
                source,
            });
            cursor += duration;
        }

        debug!(
            segments = segments.len(),
            total_duration = cursor,
            target_duration = media.target_duration,
            "Parsed media playlist"
        );

        Ok(Self {
            segments,
            target_duration: media.target_duration,
            total_duration: cursor,
            version: media.version,
            source_path: None,
            base_dir,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Declared `#EXT-X-TARGETDURATION`, in seconds.
    pub fn target_duration(&self) -> u64 {
        self.target_duration
    }

    /// Sum of all segment durations, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn version(&self) -> Option<usize> {
        self.version
    }

    /// Path the playlist was loaded from, if it came from disk.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Directory that relative segment URIs resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Find a segment by URI, ignoring ASCII case.
    pub fn find(&self, uri: &str) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.matches(uri))
    }
}

fn resolve_location(base_dir: &Path, uri: &str) -> PathBuf {
    let candidate = Path::new(uri);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}
