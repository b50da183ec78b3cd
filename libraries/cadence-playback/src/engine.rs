//! Asynchronous media engine seam
//!
//! Abstracts the platform decoder/player. Load, prepare and seek complete on
//! background callbacks delivered through a `CallbackSink`; the playback
//! loop turns those into `EngineCallback` messages on its serialized queue.

use crate::error::Result;
use crate::types::{EngineLifecycle, RequestToken};
use cadence_core::TrackId;
use std::fmt;
use std::sync::Arc;

/// Callback kinds fired by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Asynchronous prepare finished
    Prepared,
    /// Seek finished
    SeekComplete,
    /// Playback reached the end of the source
    Completion,
    /// Decode or playback failed
    Error {
        /// Engine error code
        code: i32,
        /// Engine-specific detail code
        extra: i32,
    },
}

/// A callback tagged with the request it belongs to
///
/// `Prepared`, `Completion` and `Error` carry the token passed to
/// `prepare_async`; `SeekComplete` carries the token passed to `seek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCallback {
    /// Request this callback answers
    pub token: RequestToken,
    /// What happened
    pub event: EngineEvent,
}

/// Where an engine posts its callbacks
pub type CallbackSink = Arc<dyn Fn(EngineCallback) + Send + Sync>;

/// Platform-agnostic asynchronous player
///
/// Every method is fire-and-forget: none of them may block waiting for I/O.
/// Implementations report completion of `prepare_async` and `seek` through
/// the `CallbackSink` they were constructed with.
pub trait MediaEngine: Send {
    /// Drop the current source and return to an idle engine
    fn reset(&mut self);

    /// Open the data source for `track_id`
    ///
    /// # Returns
    /// * `Ok(())` - Source opened; `prepare_async` may follow
    /// * `Err(PlaybackError::EngineOpenFailure)` - Source could not be opened
    fn load(&mut self, track_id: TrackId) -> Result<()>;

    /// Begin preparing the loaded source; answer with `EngineEvent::Prepared`
    fn prepare_async(&mut self, token: RequestToken);

    /// Start or resume audible playback
    fn play(&mut self);

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Move to `position_ms`; answer with `EngineEvent::SeekComplete`
    fn seek(&mut self, position_ms: u64, token: RequestToken);

    /// Set output volume (1.0 = nominal)
    fn set_volume(&mut self, volume: f32);

    /// Current playback position in milliseconds
    fn current_position(&self) -> u64;

    /// Duration of the loaded source, if known
    fn duration(&self) -> Option<u64>;

    /// Whether audio is currently playing
    fn is_playing(&self) -> bool;

    /// Free every resource held by the engine
    fn release(&mut self);
}

/// Builds engines on demand
///
/// Called when the first track is prepared and again after a permanent
/// focus loss tore the previous engine down.
pub trait EngineFactory: Send {
    /// Construct an engine that reports to `callbacks`
    fn create(&mut self, callbacks: CallbackSink) -> Box<dyn MediaEngine>;
}

/// Engine slot held by the controller
///
/// Distinguishes "never constructed" from "torn down after focus loss" so
/// neither is confused with a live engine.
#[derive(Default)]
pub enum EngineHandle {
    /// No engine has been constructed yet
    #[default]
    NotCreated,

    /// The engine was released; a focus gain rebuilds it
    Released,

    /// Live engine
    Present(Box<dyn MediaEngine>),
}

impl EngineHandle {
    /// Borrow the live engine
    pub fn get(&self) -> Option<&dyn MediaEngine> {
        match self {
            Self::Present(engine) => Some(engine.as_ref()),
            Self::NotCreated | Self::Released => None,
        }
    }

    /// Mutably borrow the live engine
    pub fn get_mut(&mut self) -> Option<&mut (dyn MediaEngine + 'static)> {
        match self {
            Self::Present(engine) => Some(engine.as_mut()),
            Self::NotCreated | Self::Released => None,
        }
    }

    /// True when a live engine exists
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// True when the live engine reports playing
    pub fn is_playing(&self) -> bool {
        self.get().is_some_and(MediaEngine::is_playing)
    }

    /// Release the live engine, if any, and mark the slot `Released`
    pub fn release(&mut self) {
        if let Self::Present(mut engine) = std::mem::replace(self, Self::Released) {
            engine.reset();
            engine.release();
        }
    }

    /// Lifecycle of the slot
    pub fn lifecycle(&self) -> EngineLifecycle {
        match self {
            Self::NotCreated => EngineLifecycle::NotCreated,
            Self::Released => EngineLifecycle::Released,
            Self::Present(_) => EngineLifecycle::Present,
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCreated => f.write_str("NotCreated"),
            Self::Released => f.write_str("Released"),
            Self::Present(engine) => f
                .debug_struct("Present")
                .field("playing", &engine.is_playing())
                .field("position_ms", &engine.current_position())
                .finish(),
        }
    }
}
