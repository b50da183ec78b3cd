//! Domain types shared across Cadence crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Track identifier
///
/// Opaque integer assigned by the content store. Cadence never interprets it
/// beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    /// Create a new track ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Album artwork attached to a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkData {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub mime_type: String,
}

impl ArtworkData {
    /// Create new artwork data
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Size of the image in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image has no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Display metadata for a single track
///
/// Every field is optional: the content store may know nothing about a track,
/// and a failed lookup is reported as metadata with every field empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track this metadata describes
    pub track_id: TrackId,
    /// Track title
    pub title: Option<String>,
    /// Artist name
    pub artist: Option<String>,
    /// Album name
    pub album: Option<String>,
    /// Album artwork, shared so cached copies don't duplicate the image
    pub artwork: Option<Arc<ArtworkData>>,
}

impl TrackMetadata {
    /// Metadata with every field empty
    pub fn empty(track_id: TrackId) -> Self {
        Self {
            track_id,
            title: None,
            artist: None,
            album: None,
            artwork: None,
        }
    }

    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.artwork.is_none()
    }
}
