//! Serialized playback service
//!
//! Runs a `PlaybackController` on a single tokio task. Commands, engine
//! callbacks, focus and route signals, and metadata replies all arrive on one
//! unbounded channel and are processed one at a time.

use crate::arbiter::{FocusChange, RouteChange};
use crate::controller::{Collaborators, PlaybackController};
use crate::engine::{CallbackSink, EngineCallback};
use crate::error::{PlaybackError, Result};
use crate::events::{EventChannel, EventSubscription};
use crate::metadata::MetadataReply;
use crate::types::{PlaybackConfig, PlaybackSnapshot};
use cadence_core::TrackId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Messages processed by the service loop
#[derive(Debug)]
pub enum ServiceMessage {
    /// Replace the track list
    Select {
        /// New track list
        track_ids: Vec<TrackId>,
        /// Index to start at
        start_index: usize,
        /// Validation result
        reply: oneshot::Sender<Result<()>>,
    },
    /// Start playback
    Play,
    /// Pause playback
    Pause,
    /// Toggle play/pause
    TogglePlayPause,
    /// Stop and shut the loop down
    Stop,
    /// Next track
    Next,
    /// Previous track or restart
    Previous,
    /// Engine callback
    Engine(EngineCallback),
    /// Audio focus signal
    Focus(FocusChange),
    /// Output route signal
    Route(RouteChange),
    /// Metadata lookup result
    Metadata(MetadataReply),
    /// Snapshot request
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
}

/// Cloneable handle for sending commands to the service
#[derive(Clone)]
pub struct PlaybackHandle {
    sender: mpsc::UnboundedSender<ServiceMessage>,
    events: Arc<EventChannel>,
}

impl PlaybackHandle {
    fn send(&self, message: ServiceMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| PlaybackError::ServiceStopped)
    }

    /// Replace the track list and start index
    ///
    /// # Returns
    /// * `Ok(())` - Selection accepted
    /// * `Err(PlaybackError::EmptyList | PlaybackError::InvalidIndex)` - Rejected, nothing changed
    /// * `Err(PlaybackError::ServiceStopped)` - The loop has ended
    pub async fn select(&self, track_ids: Vec<TrackId>, start_index: usize) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(ServiceMessage::Select {
            track_ids,
            start_index,
            reply,
        })?;
        response.await.map_err(|_| PlaybackError::ServiceStopped)?
    }

    /// Start playback
    pub fn play(&self) -> Result<()> {
        self.send(ServiceMessage::Play)
    }

    /// Pause playback
    pub fn pause(&self) -> Result<()> {
        self.send(ServiceMessage::Pause)
    }

    /// Toggle play/pause
    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(ServiceMessage::TogglePlayPause)
    }

    /// Stop playback and end the service
    pub fn stop(&self) -> Result<()> {
        self.send(ServiceMessage::Stop)
    }

    /// Skip to the next track
    pub fn next(&self) -> Result<()> {
        self.send(ServiceMessage::Next)
    }

    /// Previous track or restart
    pub fn previous(&self) -> Result<()> {
        self.send(ServiceMessage::Previous)
    }

    /// Deliver an audio focus signal
    pub fn focus_changed(&self, change: FocusChange) -> Result<()> {
        self.send(ServiceMessage::Focus(change))
    }

    /// Deliver an output route signal
    pub fn route_changed(&self, change: RouteChange) -> Result<()> {
        self.send(ServiceMessage::Route(change))
    }

    /// Deliver a metadata lookup result
    pub fn metadata_ready(&self, reply: MetadataReply) -> Result<()> {
        self.send(ServiceMessage::Metadata(reply))
    }

    /// Current controller state
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(ServiceMessage::Snapshot(reply))?;
        response.await.map_err(|_| PlaybackError::ServiceStopped)
    }

    /// Subscribe to playback events, starting with the sticky ones
    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    /// True once the service loop has ended
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Handle that does not keep the service loop alive
    pub fn downgrade(&self) -> WeakPlaybackHandle {
        WeakPlaybackHandle {
            sender: self.sender.downgrade(),
            events: Arc::clone(&self.events),
        }
    }
}

/// Non-owning `PlaybackHandle` for background workers
#[derive(Clone)]
pub struct WeakPlaybackHandle {
    sender: mpsc::WeakUnboundedSender<ServiceMessage>,
    events: Arc<EventChannel>,
}

impl WeakPlaybackHandle {
    /// Full handle, or `None` once every `PlaybackHandle` is gone
    pub fn upgrade(&self) -> Option<PlaybackHandle> {
        self.sender.upgrade().map(|sender| PlaybackHandle {
            sender,
            events: Arc::clone(&self.events),
        })
    }

    /// Subscribe to playback events, starting with the sticky ones
    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for WeakPlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakPlaybackHandle").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}

/// Owner of the serialized playback loop
pub struct PlaybackService {
    controller: PlaybackController,
    receiver: mpsc::UnboundedReceiver<ServiceMessage>,
}

impl PlaybackService {
    /// Start the service on the current tokio runtime
    ///
    /// The loop ends after `stop`, or once every `PlaybackHandle` is
    /// dropped. Weak handles and engine callbacks do not keep it alive.
    pub fn spawn(
        config: PlaybackConfig,
        collaborators: Collaborators,
    ) -> (PlaybackHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let events = Arc::new(EventChannel::new(config.event_capacity));

        // Weak so that engine callbacks alone don't keep the loop alive
        let weak = sender.downgrade();
        let callbacks: CallbackSink = Arc::new(move |callback| {
            if let Some(sender) = weak.upgrade() {
                let _ = sender.send(ServiceMessage::Engine(callback));
            }
        });

        let controller =
            PlaybackController::new(config, collaborators, Arc::clone(&events), callbacks);
        let service = Self {
            controller,
            receiver,
        };

        let handle = PlaybackHandle { sender, events };
        (handle, tokio::spawn(service.run()))
    }

    async fn run(mut self) {
        info!("Playback service started");

        while let Some(message) = self.receiver.recv().await {
            self.dispatch(message);
            if self.controller.is_stopped() {
                break;
            }
        }

        // Every handle dropped without an explicit stop
        if !self.controller.is_stopped() {
            self.controller.stop();
        }
        info!("Playback service finished");
    }

    fn dispatch(&mut self, message: ServiceMessage) {
        let controller = &mut self.controller;
        match message {
            ServiceMessage::Select {
                track_ids,
                start_index,
                reply,
            } => {
                let result = controller.select(track_ids, start_index);
                if reply.send(result).is_err() {
                    debug!("Select caller went away");
                }
            }
            ServiceMessage::Play => controller.play(),
            ServiceMessage::Pause => controller.pause(),
            ServiceMessage::TogglePlayPause => controller.toggle_play_pause(),
            ServiceMessage::Stop => controller.stop(),
            ServiceMessage::Next => controller.next(),
            ServiceMessage::Previous => controller.previous(),
            ServiceMessage::Engine(callback) => controller.on_engine_callback(callback),
            ServiceMessage::Focus(change) => controller.on_focus_change(change),
            ServiceMessage::Route(change) => controller.on_route_change(change),
            ServiceMessage::Metadata(reply) => controller.on_metadata(reply),
            ServiceMessage::Snapshot(reply) => {
                let _ = reply.send(controller.snapshot());
            }
        }
    }
}
