//! Error types for playback control

use cadence_core::TrackId;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A track list with no entries was selected
    #[error("Track list is empty")]
    EmptyList,

    /// Start index outside the selected track list
    #[error("Index {index} out of bounds for track list of length {len}")]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Length of the list it was checked against
        len: usize,
    },

    /// The engine could not open the data source for a track
    #[error("Failed to open track {track_id}: {reason}")]
    EngineOpenFailure {
        /// Track whose source failed to open
        track_id: TrackId,
        /// Engine-provided reason
        reason: String,
    },

    /// Asynchronous decode/playback error reported by the engine
    #[error("Engine error (code {code}, extra {extra})")]
    EngineRuntime {
        /// Engine error code
        code: i32,
        /// Engine-specific detail code
        extra: i32,
    },

    /// The shared audio output resource was not granted
    #[error("Audio focus request denied")]
    FocusDenied,

    /// The playback service loop has ended
    #[error("Playback service has stopped")]
    ServiceStopped,
}

impl PlaybackError {
    /// Create an open failure for `track_id`
    pub fn open_failure(track_id: TrackId, reason: impl Into<String>) -> Self {
        Self::EngineOpenFailure {
            track_id,
            reason: reason.into(),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
