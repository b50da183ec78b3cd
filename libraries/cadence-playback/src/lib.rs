//! Cadence - Playback Control
//!
//! Platform-agnostic playback control core for Cadence.
//!
//! This crate provides:
//! - Track sequencing with wraparound and restart-vs-previous policy
//! - A deferred command queue replayed once the engine is prepared
//! - The playback state machine driving an asynchronous media engine
//! - Audio focus and output route arbitration
//! - Sticky event delivery for UI and notification consumers
//! - A serialized tokio service loop and a metadata worker
//!
//! # Architecture
//!
//! `cadence-playback` never talks to a real decoder, focus service or
//! notification system. Those are provided via traits:
//! - [`MediaEngine`] / [`EngineFactory`] for decoding and output
//! - [`AudioFocus`] for the shared audio output
//! - [`NotificationRenderer`] for the foreground notification
//! - [`cadence_core::MetadataLookup`] for display metadata
//!
//! The engine reports prepare/seek/completion/error through a
//! [`CallbackSink`]; every callback is tagged with the [`RequestToken`] of
//! the request it answers, so callbacks from superseded requests are
//! ignored.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::TrackId;
//! use cadence_playback::TrackSequencer;
//!
//! let mut sequencer = TrackSequencer::new(3000);
//! sequencer.select(vec![TrackId::new(100), TrackId::new(101)], 1).unwrap();
//!
//! // Wraps back to the first track
//! sequencer.advance();
//! assert_eq!(sequencer.current_track(), Some(TrackId::new(100)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod arbiter;
pub mod controller;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod events;
pub mod metadata;
pub mod notification;
pub mod sequencer;
pub mod service;
pub mod types;

pub use arbiter::{
    AudioFocus, AudioResourceArbiter, AudioRoute, FocusAction, FocusChange, FocusRequestResult,
    RouteAction, RouteChange,
};
pub use controller::{Collaborators, PlaybackController};
pub use deferred::{DeferredCommand, DeferredQueue};
pub use engine::{CallbackSink, EngineCallback, EngineEvent, EngineFactory, EngineHandle, MediaEngine};
pub use error::{PlaybackError, Result};
pub use events::{EventChannel, EventSubscription, PlaybackEvent, PlaybackFault};
pub use metadata::{spawn_metadata_worker, MetadataReply};
pub use notification::{NotificationContent, NotificationRenderer, TransportAction};
pub use sequencer::{Step, TrackSequencer};
pub use service::{PlaybackHandle, PlaybackService, ServiceMessage, WeakPlaybackHandle};
pub use types::{
    EngineLifecycle, PlayState, PlaybackConfig, PlaybackSnapshot, PlaybackState, RequestToken,
};
