//! Collaborator traits for Cadence

use crate::error::Result;
use crate::types::{TrackId, TrackMetadata};
use async_trait::async_trait;

/// Looks up display metadata for a track
///
/// Implementations query a content store (tag reader, database, remote API)
/// and may block on I/O, so callers run them off the playback loop.
///
/// The playback core turns an `Err` into an empty reply: every request is
/// answered exactly once, and a failed lookup is never retried automatically.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Resolve title, artist, album and artwork for `track_id`
    async fn lookup(&self, track_id: TrackId) -> Result<TrackMetadata>;
}
