//! Metadata lookup errors

use cadence_core::TrackId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `MetadataError`
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Metadata lookup error types
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Track id has no catalog entry
    #[error("Track not in catalog: {0}")]
    UnknownTrack(TrackId),

    /// Catalog points at a missing file
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Embedded artwork over the size limit
    #[error("Artwork too large: {0} bytes (max {1} bytes)")]
    ArtworkTooLarge(usize, usize),

    /// Blocking read task failed
    #[error("Lookup task failed: {0}")]
    Task(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Lofty error
    #[error(transparent)]
    Lofty(#[from] lofty::error::LoftyError),
}

impl From<MetadataError> for cadence_core::CoreError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::UnknownTrack(track_id) => Self::TrackNotFound(track_id),
            MetadataError::Io(e) => Self::Io(e),
            other => Self::metadata(other.to_string()),
        }
    }
}
