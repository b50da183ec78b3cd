//! Shared test doubles for playback integration tests

#![allow(dead_code)]

use cadence_core::TrackId;
use cadence_playback::{
    AudioFocus, CallbackSink, EngineCallback, EngineEvent, EngineFactory, FocusRequestResult,
    MediaEngine, NotificationContent, NotificationRenderer, PlaybackError, RequestToken,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Observable state of every engine a `FakeFactory` built
#[derive(Debug, Default)]
pub struct EngineState {
    pub loaded: Vec<TrackId>,
    pub playing: bool,
    pub position_ms: u64,
    pub volume: f32,
    pub released: usize,
    pub created: usize,
    pub last_prepare: Option<RequestToken>,
    pub last_seek: Option<(u64, RequestToken)>,
    pub unreadable: HashSet<TrackId>,
}

/// Engine that fires its callbacks straight into the sink
///
/// With `auto_callbacks` off, prepare and seek complete only when the test
/// calls `FakeFactory::fire`.
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
    sink: CallbackSink,
    auto_callbacks: bool,
}

impl MediaEngine for FakeEngine {
    fn reset(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn load(&mut self, track_id: TrackId) -> cadence_playback::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unreadable.contains(&track_id) {
            return Err(PlaybackError::open_failure(track_id, "unreadable"));
        }
        state.loaded.push(track_id);
        state.position_ms = 0;
        Ok(())
    }

    fn prepare_async(&mut self, token: RequestToken) {
        self.state.lock().unwrap().last_prepare = Some(token);
        if self.auto_callbacks {
            (self.sink)(EngineCallback {
                token,
                event: EngineEvent::Prepared,
            });
        }
    }

    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn seek(&mut self, position_ms: u64, token: RequestToken) {
        {
            let mut state = self.state.lock().unwrap();
            state.position_ms = position_ms;
            state.last_seek = Some((position_ms, token));
        }
        if self.auto_callbacks {
            (self.sink)(EngineCallback {
                token,
                event: EngineEvent::SeekComplete,
            });
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn current_position(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    fn duration(&self) -> Option<u64> {
        Some(200_000)
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn release(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.released += 1;
    }
}

/// Builds `FakeEngine`s sharing one `EngineState`
#[derive(Clone, Default)]
pub struct FakeFactory {
    pub state: Arc<Mutex<EngineState>>,
    sink: Arc<Mutex<Option<CallbackSink>>>,
    pub auto_callbacks: bool,
}

impl FakeFactory {
    pub fn automatic() -> Self {
        Self {
            auto_callbacks: true,
            ..Self::default()
        }
    }

    pub fn manual() -> Self {
        Self::default()
    }

    pub fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    pub fn make_unreadable(&self, track_id: u64) {
        self.state
            .lock()
            .unwrap()
            .unreadable
            .insert(TrackId::new(track_id));
    }

    pub fn last_loaded(&self) -> Option<TrackId> {
        self.state.lock().unwrap().loaded.last().copied()
    }

    /// Post `event` through the most recent engine's sink
    pub fn fire(&self, event: EngineEvent) {
        let token = {
            let state = self.state.lock().unwrap();
            match event {
                EngineEvent::SeekComplete => state.last_seek.map(|(_, token)| token),
                _ => state.last_prepare,
            }
        }
        .expect("no outstanding request");

        let sink = self.sink.lock().unwrap().clone().expect("no engine built");
        sink(EngineCallback { token, event });
    }
}

impl EngineFactory for FakeFactory {
    fn create(&mut self, callbacks: CallbackSink) -> Box<dyn MediaEngine> {
        self.state.lock().unwrap().created += 1;
        *self.sink.lock().unwrap() = Some(Arc::clone(&callbacks));
        Box::new(FakeEngine {
            state: Arc::clone(&self.state),
            sink: callbacks,
            auto_callbacks: self.auto_callbacks,
        })
    }
}

/// Focus service that always grants
pub struct GrantingFocus;

impl AudioFocus for GrantingFocus {
    fn request(&mut self) -> FocusRequestResult {
        FocusRequestResult::Granted
    }

    fn abandon(&mut self) {}
}

/// Renderer recording everything it was asked to draw
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub rendered: Arc<Mutex<Vec<NotificationContent>>>,
    pub dismissed: Arc<Mutex<bool>>,
}

impl RecordingRenderer {
    pub fn last(&self) -> Option<NotificationContent> {
        self.rendered.lock().unwrap().last().cloned()
    }
}

impl NotificationRenderer for RecordingRenderer {
    fn render(&mut self, content: &NotificationContent) {
        self.rendered.lock().unwrap().push(content.clone());
    }

    fn dismiss(&mut self) {
        *self.dismissed.lock().unwrap() = true;
    }
}

pub fn ids(raw: &[u64]) -> Vec<TrackId> {
    raw.iter().copied().map(TrackId::new).collect()
}
