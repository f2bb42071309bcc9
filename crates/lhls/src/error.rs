use std::path::PathBuf;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read playlist `{path}`: {source}")]
    PlaylistRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse playlist: {reason}")]
    PlaylistParse { reason: String },

    #[error("only media playlists are supported, got a master playlist")]
    NotMediaPlaylist,

    #[error("playlist contains no segments")]
    EmptyPlaylist,

    #[error("invalid segment `{uri}`: {reason}")]
    InvalidSegment { uri: String, reason: String },

    #[error("segment `{0}` not found in playlist")]
    SegmentNotFound(String),

    #[error("segment `{uri}` is not readable: {source}")]
    SegmentUnavailable {
        uri: String,
        source: std::io::Error,
    },

    #[error("no segment falls inside the live window")]
    EmptyWindow,

    #[error("failed to encode manifest: {0}")]
    ManifestEncode(std::io::Error),
}

impl Error {
    pub fn invalid_segment(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSegment {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the requested resource does not exist, as opposed
    /// to a failure while producing it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SegmentNotFound(_) | Error::SegmentUnavailable { .. }
        )
    }
}
