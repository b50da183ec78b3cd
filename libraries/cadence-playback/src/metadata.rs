//! Metadata worker
//!
//! Answers `NotificationNeedsMetadata` events off the serialized loop and
//! posts the result back through a `PlaybackHandle`.

use crate::events::PlaybackEvent;
use crate::service::PlaybackHandle;
use crate::types::PlayState;
use cadence_core::{MetadataLookup, TrackId, TrackMetadata};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lookup result delivered to the controller
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataReply {
    /// Display metadata; every field empty when the lookup failed
    pub info: TrackMetadata,
}

impl MetadataReply {
    /// Build a reply from a lookup outcome, mapping failure to empty fields
    pub fn from_lookup(track_id: TrackId, result: cadence_core::Result<TrackMetadata>) -> Self {
        let info = match result {
            Ok(info) if info.track_id == track_id => info,
            Ok(info) => {
                warn!(
                    requested = %track_id,
                    returned = %info.track_id,
                    "Lookup answered for a different track"
                );
                TrackMetadata::empty(track_id)
            }
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "Metadata lookup failed");
                TrackMetadata::empty(track_id)
            }
        };
        Self { info }
    }

    /// Track this reply belongs to
    pub fn track_id(&self) -> TrackId {
        self.info.track_id
    }
}

/// Spawn a task serving metadata requests for `handle`
///
/// Each request is looked up on its own task and answered exactly once.
/// The worker holds only a weak handle, so it never keeps the service
/// alive; it ends once it observes the service stopping.
pub fn spawn_metadata_worker(
    lookup: Arc<dyn MetadataLookup>,
    handle: &PlaybackHandle,
) -> JoinHandle<()> {
    let mut events = handle.subscribe();
    let handle = handle.downgrade();

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let track_id = match event {
                PlaybackEvent::NotificationNeedsMetadata { track_id } => track_id,
                PlaybackEvent::PlayStateChanged {
                    state: PlayState::Stopped,
                    ..
                } => break,
                _ => continue,
            };

            debug!(track_id = %track_id, "Metadata requested");
            let lookup = Arc::clone(&lookup);
            let handle = handle.clone();
            tokio::spawn(async move {
                let reply = MetadataReply::from_lookup(track_id, lookup.lookup(track_id).await);
                let delivered = handle
                    .upgrade()
                    .is_some_and(|handle| handle.metadata_ready(reply).is_ok());
                if !delivered {
                    debug!(track_id = %track_id, "Service stopped before metadata reply");
                }
            });
        }
        debug!("Metadata worker finished");
    })
}
