//! Playback Events
//!
//! Events published by the controller for UI and notification consumers.
//! `PlayStateChanged` and `TrackChanged` are sticky: the last value of each
//! is retained and replayed to every new subscriber before live events.

use crate::types::PlayState;
use cadence_core::TrackId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::warn;

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Audible state changed
    PlayStateChanged {
        /// New state
        state: PlayState,
        /// Current track index
        index: u32,
    },

    /// The current track changed
    TrackChanged {
        /// New track index
        index: u32,
    },

    /// The notification needs fresh metadata for `track_id`
    NotificationNeedsMetadata {
        /// Track to look up
        track_id: TrackId,
    },

    /// A playback failure that observers should react to
    Error {
        /// What failed
        fault: PlaybackFault,
        /// Human-readable description
        message: String,
    },
}

/// Observable failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackFault {
    /// The data source for a track could not be opened
    EngineOpenFailure {
        /// Track that failed
        track_id: TrackId,
    },

    /// The engine reported an asynchronous error
    EngineRuntime {
        /// Engine error code
        code: i32,
        /// Engine-specific detail code
        extra: i32,
    },

    /// Audio focus was not granted
    FocusDenied,
}

impl PlaybackEvent {
    fn is_sticky(&self) -> bool {
        matches!(self, Self::PlayStateChanged { .. } | Self::TrackChanged { .. })
    }
}

/// Last published value of each sticky event, in publication order
#[derive(Debug, Default)]
struct StickyCache {
    play_state: Option<(u64, PlaybackEvent)>,
    track: Option<(u64, PlaybackEvent)>,
    sequence: u64,
}

impl StickyCache {
    fn store(&mut self, event: &PlaybackEvent) {
        self.sequence += 1;
        let entry = Some((self.sequence, event.clone()));
        match event {
            PlaybackEvent::PlayStateChanged { .. } => self.play_state = entry,
            PlaybackEvent::TrackChanged { .. } => self.track = entry,
            PlaybackEvent::NotificationNeedsMetadata { .. } | PlaybackEvent::Error { .. } => {}
        }
    }

    fn replay(&self) -> VecDeque<PlaybackEvent> {
        let mut entries: Vec<_> = [&self.track, &self.play_state]
            .into_iter()
            .flatten()
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, event)| event.clone()).collect()
    }
}

/// Publish/subscribe channel with sticky delivery
///
/// Publishing and subscribing both hold the sticky lock, so a subscriber
/// sees every event exactly once: either in its replay or live.
#[derive(Debug)]
pub struct EventChannel {
    sender: broadcast::Sender<PlaybackEvent>,
    sticky: Mutex<StickyCache>,
}

impl EventChannel {
    /// Create a channel buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sticky: Mutex::new(StickyCache::default()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, StickyCache> {
        self.sticky.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish to current subscribers, retaining sticky events
    pub fn publish(&self, event: PlaybackEvent) {
        let mut cache = self.cache();
        if event.is_sticky() {
            cache.store(&event);
        }
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Attach a subscriber; it first receives the retained sticky events
    pub fn subscribe(&self) -> EventSubscription {
        let cache = self.cache();
        EventSubscription {
            replay: cache.replay(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Last published `PlayStateChanged`, if any
    pub fn last_play_state(&self) -> Option<PlaybackEvent> {
        self.cache().play_state.as_ref().map(|(_, e)| e.clone())
    }

    /// Last published `TrackChanged`, if any
    pub fn last_track_change(&self) -> Option<PlaybackEvent> {
        self.cache().track.as_ref().map(|(_, e)| e.clone())
    }
}

/// Receiving end of an `EventChannel`
#[derive(Debug)]
pub struct EventSubscription {
    replay: VecDeque<PlaybackEvent>,
    receiver: broadcast::Receiver<PlaybackEvent>,
}

impl EventSubscription {
    /// Wait for the next event
    ///
    /// Returns `None` once the channel is gone. A subscriber that fell
    /// behind skips the overwritten events and keeps going.
    pub async fn recv(&mut self) -> Option<PlaybackEvent> {
        if let Some(event) = self.replay.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is ready, without waiting
    pub fn try_recv(&mut self) -> Option<PlaybackEvent> {
        if let Some(event) = self.replay.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Drain every ready event
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(index: u32) -> PlaybackEvent {
        PlaybackEvent::PlayStateChanged {
            state: PlayState::Playing,
            index,
        }
    }

    #[test]
    fn late_subscriber_receives_sticky_events_in_publication_order() {
        let channel = EventChannel::new(8);
        channel.publish(playing(0));
        channel.publish(PlaybackEvent::TrackChanged { index: 1 });
        channel.publish(PlaybackEvent::NotificationNeedsMetadata {
            track_id: TrackId::new(5),
        });

        let mut sub = channel.subscribe();
        assert_eq!(
            sub.drain(),
            vec![playing(0), PlaybackEvent::TrackChanged { index: 1 }]
        );
    }

    #[test]
    fn only_last_value_is_retained() {
        let channel = EventChannel::new(8);
        channel.publish(playing(0));
        channel.publish(PlaybackEvent::PlayStateChanged {
            state: PlayState::Paused,
            index: 0,
        });

        let mut sub = channel.subscribe();
        assert_eq!(
            sub.drain(),
            vec![PlaybackEvent::PlayStateChanged {
                state: PlayState::Paused,
                index: 0,
            }]
        );
    }

    #[test]
    fn live_events_follow_replay_without_duplicates() {
        let channel = EventChannel::new(8);
        channel.publish(playing(2));

        let mut sub = channel.subscribe();
        channel.publish(PlaybackEvent::TrackChanged { index: 0 });

        assert_eq!(
            sub.drain(),
            vec![playing(2), PlaybackEvent::TrackChanged { index: 0 }]
        );
    }

    #[test]
    fn errors_are_not_sticky() {
        let channel = EventChannel::new(8);
        channel.publish(PlaybackEvent::Error {
            fault: PlaybackFault::FocusDenied,
            message: "denied".into(),
        });

        assert!(channel.subscribe().drain().is_empty());
        assert!(channel.last_play_state().is_none());
    }

    #[test]
    fn lagging_subscriber_keeps_receiving() {
        let channel = EventChannel::new(2);
        let mut sub = channel.subscribe();
        for index in 0..5 {
            channel.publish(PlaybackEvent::TrackChanged { index });
        }

        let events = sub.drain();
        assert_eq!(events.last(), Some(&PlaybackEvent::TrackChanged { index: 4 }));
    }

    #[tokio::test]
    async fn recv_waits_for_live_event() {
        let channel = std::sync::Arc::new(EventChannel::new(8));
        let mut sub = channel.subscribe();

        let publisher = std::sync::Arc::clone(&channel);
        tokio::spawn(async move {
            publisher.publish(playing(1));
        });

        assert_eq!(sub.recv().await, Some(playing(1)));
    }

    #[test]
    fn event_serializes() {
        let json = serde_json::to_string(&PlaybackEvent::TrackChanged { index: 3 }).unwrap();
        assert!(json.contains("TrackChanged"));
    }
}
