//! Playback Controller
//!
//! The playback state machine. Owns the engine slot, the sequencer, the
//! deferred queue and the arbiter, interprets engine callbacks, and publishes
//! state changes on the event channel.
//!
//! Every method takes `&mut self`; the controller assumes it is driven from a
//! single serialized queue (see `PlaybackService`).

use crate::arbiter::{AudioFocus, AudioResourceArbiter, FocusAction, FocusChange, RouteAction, RouteChange};
use crate::deferred::{DeferredCommand, DeferredQueue};
use crate::engine::{CallbackSink, EngineCallback, EngineEvent, EngineFactory, EngineHandle};
use crate::error::Result;
use crate::events::{EventChannel, PlaybackEvent, PlaybackFault};
use crate::metadata::MetadataReply;
use crate::notification::{NotificationContent, NotificationRenderer};
use crate::sequencer::{Step, TrackSequencer};
use crate::types::{
    EngineLifecycle, PlayState, PlaybackConfig, PlaybackSnapshot, PlaybackState, RequestToken,
    TokenCounter,
};
use cadence_core::{TrackId, TrackMetadata};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// External collaborators the controller drives
pub struct Collaborators {
    /// Builds engines on demand
    pub engine_factory: Box<dyn EngineFactory>,
    /// Platform audio focus
    pub focus: Box<dyn AudioFocus>,
    /// Foreground notification
    pub renderer: Box<dyn NotificationRenderer>,
}

/// Playback state machine
pub struct PlaybackController {
    config: PlaybackConfig,
    sequencer: TrackSequencer,
    deferred: DeferredQueue,
    state: PlaybackState,
    engine: EngineHandle,
    factory: Box<dyn EngineFactory>,
    callbacks: CallbackSink,
    arbiter: AudioResourceArbiter,
    renderer: Box<dyn NotificationRenderer>,
    events: Arc<EventChannel>,

    /// Saved offset consumed by the next prepare
    position_to_restore: Option<u64>,

    /// Display metadata for the current track
    track_info: Option<TrackMetadata>,

    tokens: TokenCounter,
    prepare_token: Option<RequestToken>,
    seek_token: Option<RequestToken>,

    /// Engine holds an opened source; cleared by reset and open failure
    source_loaded: bool,

    /// Last published audible state
    play_state: Option<PlayState>,
    stopped: bool,
}

impl PlaybackController {
    /// Create a controller with no engine and no selection
    ///
    /// `callbacks` is handed to the engine factory on every construction;
    /// it must route engine callbacks back to `on_engine_callback` on the
    /// same serialized queue.
    pub fn new(
        config: PlaybackConfig,
        collaborators: Collaborators,
        events: Arc<EventChannel>,
        callbacks: CallbackSink,
    ) -> Self {
        Self {
            sequencer: TrackSequencer::new(config.restart_threshold_ms),
            config,
            deferred: DeferredQueue::new(),
            state: PlaybackState::Idle,
            engine: EngineHandle::NotCreated,
            factory: collaborators.engine_factory,
            callbacks,
            arbiter: AudioResourceArbiter::new(collaborators.focus),
            renderer: collaborators.renderer,
            events,
            position_to_restore: None,
            track_info: None,
            tokens: TokenCounter::default(),
            prepare_token: None,
            seek_token: None,
            source_loaded: false,
            play_state: None,
            stopped: false,
        }
    }

    // ===== Commands =====

    /// Replace the track list and start index
    ///
    /// Prepares the selected track unless it is already current.
    pub fn select(&mut self, track_ids: Vec<TrackId>, start_index: usize) -> Result<()> {
        match self.sequencer.select(track_ids, start_index)? {
            Step::RePrepare => {
                info!(index = start_index, len = self.sequencer.len(), "Track list selected");
                self.position_to_restore = None;
                self.track_info = None;
                self.request_prepare();
            }
            Step::Unchanged | Step::RestartCurrent => {
                debug!(index = start_index, "Current track re-selected, keeping engine");
            }
        }
        Ok(())
    }

    /// Start playback, deferring until the engine is prepared
    ///
    /// After a permanent focus loss the engine is rebuilt and the current
    /// track prepared again.
    pub fn play(&mut self) {
        if self.is_ready() {
            self.start_playback();
        } else if !self.rebuild_and_resume() {
            self.defer(DeferredCommand::Play);
        }
    }

    /// Pause playback, deferring until the engine is prepared
    pub fn pause(&mut self) {
        if self.is_ready() {
            self.pause_playback(true);
        } else if self.engine.lifecycle() == EngineLifecycle::Released {
            debug!("Engine released, nothing to pause");
        } else {
            self.defer(DeferredCommand::Pause);
        }
    }

    /// Toggle play/pause
    ///
    /// When deferred, the decision is made at execution time.
    pub fn toggle_play_pause(&mut self) {
        if self.is_ready() {
            self.execute(DeferredCommand::TogglePlayPause);
        } else if !self.rebuild_and_resume() {
            self.defer(DeferredCommand::TogglePlayPause);
        }
    }

    /// Stop playback and release every resource
    ///
    /// The controller accepts no further work afterwards.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }

        if let Some(engine) = self.engine.get_mut() {
            if engine.is_playing() {
                engine.pause();
            }
        }
        self.publish_play_state(PlayState::Stopped);
        self.arbiter.release();
        self.engine.release();
        self.source_loaded = false;
        self.deferred.clear();
        self.renderer.dismiss();
        self.set_state(PlaybackState::Idle);
        self.prepare_token = None;
        self.seek_token = None;
        self.stopped = true;
        info!("Playback stopped");
    }

    /// Skip to the next track, wrapping to the first
    pub fn next(&mut self) {
        let was_playing = self.engine.is_playing();
        if self.sequencer.advance().is_some() {
            self.skip_to_current(was_playing);
        }
    }

    /// Restart the current track, or go back one when near its start
    pub fn previous(&mut self) {
        let was_playing = self.engine.is_playing();
        let position_ms = match (self.state, self.engine.get()) {
            (PlaybackState::Prepared, Some(engine)) => engine.current_position(),
            _ => 0,
        };

        match self.sequencer.retreat(position_ms) {
            Some(Step::RestartCurrent) => self.restart_current(),
            Some(Step::RePrepare | Step::Unchanged) => self.skip_to_current(was_playing),
            None => {}
        }
    }

    // ===== External signals =====

    /// Dispatch an engine callback, ignoring superseded requests
    pub fn on_engine_callback(&mut self, callback: EngineCallback) {
        if self.stopped {
            return;
        }

        let expected = match callback.event {
            EngineEvent::SeekComplete => self.seek_token,
            EngineEvent::Prepared | EngineEvent::Completion | EngineEvent::Error { .. } => {
                self.prepare_token
            }
        };
        if expected != Some(callback.token) {
            warn!(
                event = ?callback.event,
                token = callback.token.get(),
                expected = ?expected.map(RequestToken::get),
                "Ignoring stale engine callback"
            );
            return;
        }

        match callback.event {
            EngineEvent::Prepared => self.on_prepared(),
            EngineEvent::SeekComplete => self.on_seek_complete(),
            EngineEvent::Completion => self.on_completion(),
            EngineEvent::Error { code, extra } => self.on_engine_error(code, extra),
        }
    }

    /// React to an audio focus change
    pub fn on_focus_change(&mut self, change: FocusChange) {
        if self.stopped {
            return;
        }

        match self.arbiter.on_focus_change(change) {
            FocusAction::Resume => {
                if self.engine.is_present() {
                    self.set_volume(self.config.full_volume);
                    self.play();
                } else if !self.rebuild_and_resume() {
                    self.defer(DeferredCommand::Play);
                }
            }
            FocusAction::RestoreVolume => self.set_volume(self.config.full_volume),
            FocusAction::TearDown => self.tear_down(),
            FocusAction::Pause => self.pause_playback(false),
            FocusAction::Duck => self.set_volume(self.config.duck_volume),
        }
    }

    /// React to an output route change
    pub fn on_route_change(&mut self, change: RouteChange) {
        if self.stopped {
            return;
        }

        match self.arbiter.on_route_change(change) {
            RouteAction::Pause => self.pause(),
            RouteAction::Refresh => {
                if let Some(state @ (PlayState::Playing | PlayState::Paused)) = self.play_state {
                    self.render_notification(state);
                }
            }
        }
    }

    /// Accept a metadata reply for the current track and re-render
    pub fn on_metadata(&mut self, reply: MetadataReply) {
        if self.stopped {
            return;
        }

        if self.sequencer.current_track() != Some(reply.track_id()) {
            debug!(track_id = %reply.track_id(), "Dropping metadata for a track no longer current");
            return;
        }

        // Replacing the cache drops the previous artwork
        self.track_info = Some(reply.info);
        if let Some(state @ (PlayState::Playing | PlayState::Paused)) = self.play_state {
            self.render_notification(state);
        }
    }

    // ===== Queries =====

    /// Engine readiness
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True once `stop` has run
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Channel this controller publishes on
    pub fn events(&self) -> &Arc<EventChannel> {
        &self.events
    }

    /// Point-in-time view of the controller
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            lifecycle: self.engine.lifecycle(),
            state: self.state,
            play_state: self.play_state,
            index: self.sequencer.current_index(),
            track_ids: self.sequencer.track_ids().to_vec(),
            track_info: self.track_info.clone(),
            position_to_restore: self.position_to_restore,
            deferred: self.deferred.len(),
        }
    }

    // ===== Engine callbacks =====

    fn on_prepared(&mut self) {
        if let Some(position_ms) = self.position_to_restore {
            let token = self.tokens.next_token();
            self.seek_token = Some(token);
            if let Some(engine) = self.engine.get_mut() {
                engine.seek(position_ms, token);
            }
            debug!(position_ms, "Prepared, restoring position");
            self.set_state(PlaybackState::Seeking);
            return;
        }

        self.set_state(PlaybackState::Prepared);
        self.flush_deferred();
    }

    fn on_seek_complete(&mut self) {
        self.seek_token = None;
        self.position_to_restore = None;
        self.set_state(PlaybackState::Prepared);
        self.flush_deferred();
    }

    fn on_completion(&mut self) {
        if self.sequencer.advance().is_none() {
            return;
        }

        let index = self.sequencer.current_index().unwrap_or_default();
        info!(index, "Track finished, advancing");
        self.position_to_restore = None;
        self.track_info = None;
        if self.request_prepare() {
            self.defer(DeferredCommand::AutoPlayAndAnnounce(index));
        }
    }

    fn on_engine_error(&mut self, code: i32, extra: i32) {
        error!(code, extra, "Engine error, abandoning current track");

        let was_playing = self.play_state == Some(PlayState::Playing);
        self.arbiter.release();
        if let Some(engine) = self.engine.get_mut() {
            engine.reset();
        }
        self.source_loaded = false;
        self.prepare_token = None;
        self.seek_token = None;
        self.set_state(PlaybackState::Idle);

        self.events.publish(PlaybackEvent::Error {
            fault: PlaybackFault::EngineRuntime { code, extra },
            message: format!("Engine error (code {code}, extra {extra})"),
        });
        if was_playing {
            self.publish_play_state(PlayState::Paused);
        }
    }

    // ===== Internals =====

    fn is_ready(&self) -> bool {
        self.engine.is_present() && self.source_loaded && self.state == PlaybackState::Prepared
    }

    /// Rebuild a released engine, prepare the current track and play once ready
    ///
    /// Returns `false` when the engine was not released or there is no
    /// current track.
    fn rebuild_and_resume(&mut self) -> bool {
        if self.stopped
            || self.engine.lifecycle() != EngineLifecycle::Released
            || self.sequencer.current_track().is_none()
        {
            return false;
        }

        info!(position_to_restore = ?self.position_to_restore, "Rebuilding released engine");
        self.ensure_engine();
        if self.request_prepare() {
            self.defer(DeferredCommand::Play);
        }
        true
    }

    fn defer(&mut self, command: DeferredCommand) {
        debug!(?command, state = ?self.state, "Deferring command");
        self.deferred.enqueue(command);
    }

    /// Run every deferred command; anything enqueued meanwhile waits
    fn flush_deferred(&mut self) {
        let batch = self.deferred.take_batch();
        if !batch.is_empty() {
            debug!(count = batch.len(), "Flushing deferred commands");
        }
        for command in batch {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: DeferredCommand) {
        match command {
            DeferredCommand::Play => self.start_playback(),
            DeferredCommand::Pause => self.pause_playback(true),
            DeferredCommand::TogglePlayPause => {
                if self.engine.is_playing() {
                    self.pause_playback(true);
                } else {
                    self.start_playback();
                }
            }
            DeferredCommand::AutoPlayAndAnnounce(index) => {
                self.events.publish(PlaybackEvent::TrackChanged {
                    index: event_index(index),
                });
                self.start_playback();
            }
        }
    }

    fn ensure_engine(&mut self) {
        if self.engine.is_present() {
            return;
        }

        info!(previous = ?self.engine.lifecycle(), "Constructing media engine");
        let mut engine = self.factory.create(Arc::clone(&self.callbacks));
        engine.set_volume(self.config.full_volume);
        self.engine = EngineHandle::Present(engine);
    }

    /// Load and prepare the current track
    ///
    /// Returns `false` if there is nothing to prepare or the source failed
    /// to open; the state is left as it was in that case.
    fn request_prepare(&mut self) -> bool {
        let Some(track_id) = self.sequencer.current_track() else {
            return false;
        };

        self.ensure_engine();
        let Some(engine) = self.engine.get_mut() else {
            return false;
        };

        engine.reset();
        self.source_loaded = false;
        if let Err(e) = engine.load(track_id) {
            error!(track_id = %track_id, error = %e, "Failed to open track");
            self.prepare_token = None;
            self.seek_token = None;
            self.events.publish(PlaybackEvent::Error {
                fault: PlaybackFault::EngineOpenFailure { track_id },
                message: e.to_string(),
            });
            return false;
        }

        self.source_loaded = true;
        let token = self.tokens.next_token();
        self.prepare_token = Some(token);
        self.seek_token = None;
        engine.prepare_async(token);
        debug!(track_id = %track_id, token = token.get(), "Preparing track");
        self.set_state(PlaybackState::Preparing);
        true
    }

    fn skip_to_current(&mut self, was_playing: bool) {
        let index = self.sequencer.current_index().unwrap_or_default();
        self.position_to_restore = None;
        self.track_info = None;

        let prepared = self.request_prepare();
        self.events.publish(PlaybackEvent::TrackChanged {
            index: event_index(index),
        });
        if prepared && was_playing {
            self.defer(DeferredCommand::Play);
        }
    }

    fn restart_current(&mut self) {
        let token = self.tokens.next_token();
        if let Some(engine) = self.engine.get_mut() {
            debug!("Restarting current track");
            self.seek_token = Some(token);
            engine.seek(0, token);
        }
    }

    fn start_playback(&mut self) {
        let Some(engine) = self.engine.get() else {
            return;
        };
        if engine.is_playing() {
            return;
        }

        if !self.arbiter.acquire() {
            self.events.publish(PlaybackEvent::Error {
                fault: PlaybackFault::FocusDenied,
                message: "Audio focus request denied".to_string(),
            });
            return;
        }

        if let Some(engine) = self.engine.get_mut() {
            engine.play();
        }
        self.publish_play_state(PlayState::Playing);
        if let Some(track_id) = self.sequencer.current_track() {
            self.events
                .publish(PlaybackEvent::NotificationNeedsMetadata { track_id });
        }
    }

    fn pause_playback(&mut self, release_focus: bool) {
        let Some(engine) = self.engine.get_mut() else {
            return;
        };
        if !engine.is_playing() {
            return;
        }

        engine.pause();
        if release_focus {
            self.arbiter.release();
        }
        self.publish_play_state(PlayState::Paused);
        self.render_notification(PlayState::Paused);
    }

    /// Permanent focus loss: save the position and free the engine
    fn tear_down(&mut self) {
        let was_playing = self.engine.is_playing();
        if let Some(engine) = self.engine.get_mut() {
            if was_playing {
                engine.pause();
            }
            if self.source_loaded && self.state == PlaybackState::Prepared {
                self.position_to_restore = Some(engine.current_position());
            }
        }

        info!(
            position_to_restore = ?self.position_to_restore,
            "Focus lost, releasing engine"
        );
        self.engine.release();
        self.source_loaded = false;
        self.prepare_token = None;
        self.seek_token = None;
        self.set_state(PlaybackState::Idle);
        if was_playing {
            self.publish_play_state(PlayState::Paused);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(engine) = self.engine.get_mut() {
            debug!(volume, "Setting volume");
            engine.set_volume(volume);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Playback state transition");
            self.state = state;
        }
    }

    fn publish_play_state(&mut self, state: PlayState) {
        self.play_state = Some(state);
        let index = event_index(self.sequencer.current_index().unwrap_or_default());
        self.events
            .publish(PlaybackEvent::PlayStateChanged { state, index });
    }

    fn render_notification(&mut self, state: PlayState) {
        if self.stopped {
            return;
        }
        let content = NotificationContent::new(state, self.track_info.as_ref(), self.arbiter.route());
        self.renderer.render(&content);
    }
}

/// Track index as carried on events
fn event_index(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("engine", &self.engine)
            .field("sequencer", &self.sequencer)
            .field("deferred", &self.deferred)
            .field("arbiter", &self.arbiter)
            .field("position_to_restore", &self.position_to_restore)
            .field("play_state", &self.play_state)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{AudioRoute, FocusRequestResult, MockAudioFocus};
    use crate::engine::testing::{Call, RecordingFactory};
    use crate::events::EventSubscription;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        rendered: Arc<Mutex<Vec<NotificationContent>>>,
        dismissed: Arc<Mutex<bool>>,
    }

    impl NotificationRenderer for RecordingRenderer {
        fn render(&mut self, content: &NotificationContent) {
            self.rendered.lock().unwrap().push(content.clone());
        }

        fn dismiss(&mut self) {
            *self.dismissed.lock().unwrap() = true;
        }
    }

    struct Harness {
        controller: PlaybackController,
        engine: RecordingFactory,
        renderer: RecordingRenderer,
        events: EventSubscription,
    }

    fn granting_focus() -> MockAudioFocus {
        let mut focus = MockAudioFocus::new();
        focus
            .expect_request()
            .return_const(FocusRequestResult::Granted);
        focus.expect_abandon().return_const(());
        focus
    }

    fn harness_with(focus: MockAudioFocus) -> Harness {
        let engine = RecordingFactory::default();
        let renderer = RecordingRenderer::default();
        let channel = Arc::new(EventChannel::new(64));
        let events = channel.subscribe();
        let controller = PlaybackController::new(
            PlaybackConfig::default(),
            Collaborators {
                engine_factory: Box::new(engine.clone()),
                focus: Box::new(focus),
                renderer: Box::new(renderer.clone()),
            },
            channel,
            Arc::new(|_| {}),
        );
        Harness {
            controller,
            engine,
            renderer,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(granting_focus())
    }

    fn ids(raw: &[u64]) -> Vec<TrackId> {
        raw.iter().copied().map(TrackId::new).collect()
    }

    fn fire(h: &mut Harness, event: EngineEvent) {
        let token = {
            let shared = h.engine.shared.lock().unwrap();
            match event {
                EngineEvent::SeekComplete => shared.last_seek,
                _ => shared.last_prepare,
            }
        }
        .expect("no request issued");
        h.controller
            .on_engine_callback(EngineCallback { token, event });
    }

    fn playing_harness() -> Harness {
        let mut h = harness();
        h.controller.select(ids(&[1, 2, 3]), 0).unwrap();
        fire(&mut h, EngineEvent::Prepared);
        h.controller.play();
        h.events.drain();
        h.engine.clear_calls();
        h
    }

    #[test]
    fn event_index_fits_in_u32() {
        assert_eq!(event_index(2), 2u32);
        assert_eq!(event_index(usize::MAX), u32::MAX);
    }

    #[test]
    fn commands_before_selection_do_not_crash() {
        let mut h = harness();
        h.controller.play();
        h.controller.pause();
        h.controller.toggle_play_pause();
        h.controller.next();
        h.controller.previous();

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.lifecycle, EngineLifecycle::NotCreated);
        assert_eq!(snapshot.deferred, 3);
        assert!(h.engine.calls().is_empty());
    }

    #[test]
    fn select_prepares_current_track() {
        let mut h = harness();
        h.controller.select(ids(&[10, 11]), 1).unwrap();

        assert_eq!(h.controller.state(), PlaybackState::Preparing);
        let calls = h.engine.calls();
        assert!(calls.contains(&Call::Load(TrackId::new(11))));
        assert!(matches!(calls.last(), Some(Call::Prepare(_))));
    }

    #[test]
    fn invalid_select_is_reported_without_effect() {
        let mut h = harness();
        assert!(h.controller.select(Vec::new(), 0).is_err());
        assert!(h.controller.select(ids(&[1]), 4).is_err());
        assert_eq!(h.controller.state(), PlaybackState::Idle);
        assert!(h.engine.calls().is_empty());
    }

    #[test]
    fn deferred_play_runs_when_prepared() {
        let mut h = harness();
        h.controller.select(ids(&[1, 2]), 0).unwrap();
        h.controller.play();
        assert!(!h.engine.shared.lock().unwrap().playing);

        fire(&mut h, EngineEvent::Prepared);

        assert_eq!(h.controller.state(), PlaybackState::Prepared);
        assert!(h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.controller.snapshot().deferred, 0);
        assert_eq!(
            h.events.drain(),
            vec![
                PlaybackEvent::PlayStateChanged {
                    state: PlayState::Playing,
                    index: 0
                },
                PlaybackEvent::NotificationNeedsMetadata {
                    track_id: TrackId::new(1)
                },
            ]
        );
    }

    #[test]
    fn deferred_toggle_decides_at_execution_time() {
        let mut h = harness();
        h.controller.toggle_play_pause();
        h.controller.select(ids(&[1]), 0).unwrap();

        fire(&mut h, EngineEvent::Prepared);

        assert!(h.engine.shared.lock().unwrap().playing);
    }

    #[test]
    fn stale_prepared_callback_is_ignored() {
        let mut h = harness();
        h.controller.select(ids(&[1, 2]), 0).unwrap();
        let stale = h.engine.shared.lock().unwrap().last_prepare.unwrap();
        h.controller.select(ids(&[1, 2]), 1).unwrap();
        h.controller.play();

        h.controller.on_engine_callback(EngineCallback {
            token: stale,
            event: EngineEvent::Prepared,
        });

        assert_eq!(h.controller.state(), PlaybackState::Preparing);
        assert_eq!(h.controller.snapshot().deferred, 1);
    }

    #[test]
    fn open_failure_is_published_and_state_kept() {
        let mut h = harness();
        h.engine.shared.lock().unwrap().fail_open = Some(TrackId::new(2));
        h.controller.select(ids(&[1, 2]), 0).unwrap();
        fire(&mut h, EngineEvent::Prepared);
        h.events.drain();

        h.controller.next();

        assert_eq!(h.controller.state(), PlaybackState::Prepared);
        let events = h.events.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            PlaybackEvent::Error {
                fault: PlaybackFault::EngineOpenFailure { track_id },
                ..
            } if *track_id == TrackId::new(2)
        )));

        // Nothing is loaded, so play waits instead of reporting Playing
        h.engine.clear_calls();
        h.controller.play();

        assert!(!h.engine.calls().contains(&Call::Play));
        assert!(!h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.controller.snapshot().deferred, 1);
        assert!(h.events.drain().is_empty());
    }

    #[test]
    fn play_after_open_failure_starts_once_a_track_loads() {
        let mut h = harness();
        h.engine.shared.lock().unwrap().fail_open = Some(TrackId::new(2));
        h.controller.select(ids(&[1, 2, 3]), 0).unwrap();
        fire(&mut h, EngineEvent::Prepared);
        h.controller.next();
        h.controller.play();

        h.controller.next();
        fire(&mut h, EngineEvent::Prepared);

        assert!(h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.controller.snapshot().index, Some(2));
    }

    #[test]
    fn pause_releases_focus_and_renders_cached_info() {
        let mut h = playing_harness();
        let mut info = TrackMetadata::empty(TrackId::new(1));
        info.title = Some("One".into());
        h.controller.on_metadata(MetadataReply { info });

        h.controller.pause();

        assert!(!h.engine.shared.lock().unwrap().playing);
        let rendered = h.renderer.rendered.lock().unwrap();
        let last = rendered.last().unwrap();
        assert_eq!(last.play_state, PlayState::Paused);
        assert_eq!(last.title.as_deref(), Some("One"));
    }

    #[test]
    fn metadata_for_other_track_is_dropped() {
        let mut h = playing_harness();
        h.controller.on_metadata(MetadataReply {
            info: TrackMetadata::empty(TrackId::new(99)),
        });

        assert!(h.controller.snapshot().track_info.is_none());
        assert!(h.renderer.rendered.lock().unwrap().is_empty());
    }

    #[test]
    fn next_while_playing_resumes_on_new_track() {
        let mut h = playing_harness();
        h.controller.next();

        assert_eq!(h.controller.snapshot().index, Some(1));
        assert_eq!(h.events.drain(), vec![PlaybackEvent::TrackChanged { index: 1 }]);

        fire(&mut h, EngineEvent::Prepared);
        assert!(h.engine.shared.lock().unwrap().playing);
    }

    #[test]
    fn previous_near_start_goes_back() {
        let mut h = playing_harness();
        h.engine.shared.lock().unwrap().position_ms = 1200;

        h.controller.previous();

        assert_eq!(h.controller.snapshot().index, Some(2));
        assert_eq!(h.controller.state(), PlaybackState::Preparing);
    }

    #[test]
    fn previous_past_threshold_restarts_current() {
        let mut h = playing_harness();
        h.engine.shared.lock().unwrap().position_ms = 45_000;

        h.controller.previous();

        assert_eq!(h.controller.snapshot().index, Some(0));
        assert_eq!(h.controller.state(), PlaybackState::Prepared);
        assert!(matches!(h.engine.calls().as_slice(), [Call::Seek(0, _)]));
        fire(&mut h, EngineEvent::SeekComplete);
        assert_eq!(h.controller.state(), PlaybackState::Prepared);
    }

    #[test]
    fn engine_error_keeps_selection() {
        let mut h = playing_harness();
        fire(&mut h, EngineEvent::Error { code: 1, extra: -1004 });

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert_eq!(snapshot.index, Some(0));
        assert_eq!(snapshot.track_ids, ids(&[1, 2, 3]));
        assert_eq!(snapshot.play_state, Some(PlayState::Paused));
        assert!(h.events.drain().iter().any(|e| matches!(
            e,
            PlaybackEvent::Error {
                fault: PlaybackFault::EngineRuntime { code: 1, extra: -1004 },
                ..
            }
        )));
    }

    #[test]
    fn transient_loss_pauses_and_keeps_engine() {
        let mut h = playing_harness();
        h.controller.on_focus_change(FocusChange::LossTransient);

        assert!(!h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.controller.snapshot().lifecycle, EngineLifecycle::Present);

        h.controller.on_focus_change(FocusChange::Gain);
        assert!(h.engine.shared.lock().unwrap().playing);
    }

    #[test]
    fn duck_lowers_volume_without_pausing() {
        let mut h = playing_harness();
        h.controller.on_focus_change(FocusChange::LossTransientCanDuck);
        h.controller.on_focus_change(FocusChange::GainTransientMayDuck);

        assert!(h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.engine.calls(), vec![Call::Volume(0.3), Call::Volume(1.0)]);
    }

    #[test]
    fn permanent_loss_then_gain_restores_position() {
        let mut h = playing_harness();
        h.engine.shared.lock().unwrap().position_ms = 42_000;

        h.controller.on_focus_change(FocusChange::Loss);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.lifecycle, EngineLifecycle::Released);
        assert_eq!(snapshot.position_to_restore, Some(42_000));
        assert_eq!(snapshot.state, PlaybackState::Idle);

        h.controller.on_focus_change(FocusChange::Gain);
        assert_eq!(*h.engine.created.lock().unwrap(), 2);
        fire(&mut h, EngineEvent::Prepared);
        assert_eq!(h.controller.state(), PlaybackState::Seeking);
        assert!(!h.engine.shared.lock().unwrap().playing);

        fire(&mut h, EngineEvent::SeekComplete);
        assert_eq!(h.controller.state(), PlaybackState::Prepared);
        assert!(h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.controller.snapshot().position_to_restore, None);
    }

    #[test]
    fn play_after_permanent_loss_rebuilds_and_resumes() {
        let mut h = playing_harness();
        h.engine.shared.lock().unwrap().position_ms = 42_000;
        h.controller.on_focus_change(FocusChange::Loss);
        h.engine.clear_calls();

        h.controller.play();
        h.controller.play();

        let snapshot = h.controller.snapshot();
        assert_eq!(*h.engine.created.lock().unwrap(), 2);
        assert_eq!(snapshot.lifecycle, EngineLifecycle::Present);
        assert_eq!(snapshot.state, PlaybackState::Preparing);
        assert!(h.engine.calls().contains(&Call::Load(TrackId::new(1))));

        fire(&mut h, EngineEvent::Prepared);
        assert_eq!(h.controller.state(), PlaybackState::Seeking);
        assert!(h.engine.calls().iter().any(|c| matches!(c, Call::Seek(42_000, _))));

        fire(&mut h, EngineEvent::SeekComplete);
        assert_eq!(h.controller.state(), PlaybackState::Prepared);
        assert!(h.engine.shared.lock().unwrap().playing);
        assert_eq!(h.controller.snapshot().deferred, 0);
        assert_eq!(
            h.events.drain().last(),
            Some(&PlaybackEvent::NotificationNeedsMetadata {
                track_id: TrackId::new(1)
            })
        );
    }

    #[test]
    fn toggle_after_permanent_loss_resumes() {
        let mut h = playing_harness();
        h.controller.on_focus_change(FocusChange::Loss);

        h.controller.toggle_play_pause();
        fire(&mut h, EngineEvent::Prepared);
        fire(&mut h, EngineEvent::SeekComplete);

        assert!(h.engine.shared.lock().unwrap().playing);
    }

    #[test]
    fn becoming_noisy_pauses_and_route_change_rerenders() {
        let mut h = playing_harness();
        h.controller.on_route_change(RouteChange::HeadsetPlugged);
        assert_eq!(
            h.renderer.rendered.lock().unwrap().last().unwrap().route,
            AudioRoute::WiredHeadset
        );
        assert_eq!(h.controller.state(), PlaybackState::Prepared);

        h.controller.on_route_change(RouteChange::BecomingNoisy);
        assert!(!h.engine.shared.lock().unwrap().playing);
    }

    #[test]
    fn stop_releases_everything() {
        let mut h = playing_harness();
        h.controller.stop();

        assert!(h.controller.is_stopped());
        assert!(*h.renderer.dismissed.lock().unwrap());
        assert_eq!(h.controller.snapshot().lifecycle, EngineLifecycle::Released);
        assert_eq!(
            h.events.drain(),
            vec![PlaybackEvent::PlayStateChanged {
                state: PlayState::Stopped,
                index: 0
            }]
        );
        assert!(h.engine.calls().contains(&Call::Release));
    }
}
