//! Core types for playback control

use cadence_core::{TrackId, TrackMetadata};
use serde::{Deserialize, Serialize};

/// Engine readiness state
///
/// `Idle -> Preparing -> {Prepared | Seeking} -> Preparing -> ...`.
/// The engine accepts play/pause only in `Prepared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No source loaded, or the last load was abandoned
    Idle,

    /// Asynchronous prepare in flight
    Preparing,

    /// Ready for play/pause
    Prepared,

    /// Restoring a saved position after prepare
    Seeking,
}

/// Audible state reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    /// Audio is playing
    Playing,
    /// Paused mid-track
    Paused,
    /// Service is shutting down
    Stopped,
}

/// Whether an engine exists, independent of `PlaybackState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineLifecycle {
    /// No engine has ever been constructed
    NotCreated,
    /// Engine is alive
    Present,
    /// Engine was released after a permanent focus loss or stop
    Released,
}

/// Token attached to every prepare/seek request
///
/// Callbacks echo the token they were issued with, so a callback from a
/// superseded request can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Wrap a raw token value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Token value
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Monotonic source of request tokens
#[derive(Debug, Default)]
pub(crate) struct TokenCounter {
    last: u64,
}

impl TokenCounter {
    pub(crate) fn next_token(&mut self) -> RequestToken {
        self.last += 1;
        RequestToken(self.last)
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Position at or beyond which "previous" restarts the current track (default: 3000)
    pub restart_threshold_ms: u64,

    /// Volume while ducked for a transient, duckable focus loss (default: 0.3)
    pub duck_volume: f32,

    /// Nominal volume (default: 1.0)
    pub full_volume: f32,

    /// Broadcast buffer for event subscribers (default: 64)
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            restart_threshold_ms: 3000,
            duck_volume: 0.3,
            full_volume: 1.0,
            event_capacity: 64,
        }
    }
}

/// Point-in-time view of the controller, answered from the service loop
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    /// Whether an engine exists
    pub lifecycle: EngineLifecycle,
    /// Engine readiness
    pub state: PlaybackState,
    /// Last published audible state, if any
    pub play_state: Option<PlayState>,
    /// Current index into `track_ids`
    pub index: Option<usize>,
    /// Selected track list
    pub track_ids: Vec<TrackId>,
    /// Cached display metadata for the current track
    pub track_info: Option<TrackMetadata>,
    /// Saved position awaiting restore
    pub position_to_restore: Option<u64>,
    /// Commands waiting for the engine to become ready
    pub deferred: usize,
}
