//! Timer-driven media engine
//!
//! Stands in for a platform decoder: every catalogued track is silent audio
//! of a fixed length. Prepare, seek and completion callbacks fire from tokio
//! timers so the controller sees the same asynchronous shape a real engine
//! produces.

use crate::config::EngineSettings;
use cadence_core::TrackId;
use cadence_playback::{
    CallbackSink, EngineCallback, EngineEvent, EngineFactory, MediaEngine, PlaybackError,
    RequestToken,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Builds `SimulatedEngine`s over a shared catalog
pub struct SimulatedEngineFactory {
    catalog: Arc<HashMap<TrackId, PathBuf>>,
    settings: EngineSettings,
}

impl SimulatedEngineFactory {
    pub fn new(
        catalog: impl IntoIterator<Item = (TrackId, PathBuf)>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog.into_iter().collect()),
            settings,
        }
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(&mut self, callbacks: CallbackSink) -> Box<dyn MediaEngine> {
        debug!("Creating simulated engine");
        Box::new(SimulatedEngine::new(
            Arc::clone(&self.catalog),
            self.settings.clone(),
            callbacks,
        ))
    }
}

pub struct SimulatedEngine {
    catalog: Arc<HashMap<TrackId, PathBuf>>,
    settings: EngineSettings,
    callbacks: CallbackSink,

    loaded: Option<TrackId>,
    prepare_token: Option<RequestToken>,

    /// Position when the clock last stopped or jumped
    base_position_ms: u64,
    /// Set while playing
    started_at: Option<Instant>,

    prepare_task: Option<JoinHandle<()>>,
    seek_task: Option<JoinHandle<()>>,
    completion_task: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    fn new(
        catalog: Arc<HashMap<TrackId, PathBuf>>,
        settings: EngineSettings,
        callbacks: CallbackSink,
    ) -> Self {
        Self {
            catalog,
            settings,
            callbacks,
            loaded: None,
            prepare_token: None,
            base_position_ms: 0,
            started_at: None,
            prepare_task: None,
            seek_task: None,
            completion_task: None,
        }
    }

    fn fire_after(&self, delay_ms: u64, callback: EngineCallback) -> JoinHandle<()> {
        let sink = Arc::clone(&self.callbacks);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            trace!(?callback, "Simulated engine callback");
            sink(callback);
        })
    }

    fn schedule_completion(&mut self) {
        abort(&mut self.completion_task);
        let Some(token) = self.prepare_token else {
            return;
        };
        let remaining = self
            .settings
            .track_length_ms
            .saturating_sub(self.base_position_ms);
        self.completion_task = Some(self.fire_after(
            remaining,
            EngineCallback {
                token,
                event: EngineEvent::Completion,
            },
        ));
    }

    fn stop_clock(&mut self) {
        self.base_position_ms = self.current_position();
        self.started_at = None;
        abort(&mut self.completion_task);
    }
}

fn abort(task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = task.take() {
        task.abort();
    }
}

impl MediaEngine for SimulatedEngine {
    fn reset(&mut self) {
        abort(&mut self.prepare_task);
        abort(&mut self.seek_task);
        abort(&mut self.completion_task);
        self.loaded = None;
        self.prepare_token = None;
        self.base_position_ms = 0;
        self.started_at = None;
    }

    fn load(&mut self, track_id: TrackId) -> cadence_playback::Result<()> {
        let path = self
            .catalog
            .get(&track_id)
            .ok_or_else(|| PlaybackError::open_failure(track_id, "not in library"))?;

        if !path.exists() {
            return Err(PlaybackError::open_failure(
                track_id,
                format!("{} does not exist", path.display()),
            ));
        }

        debug!(track = %track_id, path = %path.display(), "Loaded source");
        self.loaded = Some(track_id);
        Ok(())
    }

    fn prepare_async(&mut self, token: RequestToken) {
        if self.loaded.is_none() {
            return;
        }
        abort(&mut self.prepare_task);
        self.prepare_token = Some(token);
        self.prepare_task = Some(self.fire_after(
            self.settings.prepare_delay_ms,
            EngineCallback {
                token,
                event: EngineEvent::Prepared,
            },
        ));
    }

    fn play(&mut self) {
        if self.loaded.is_none() || self.is_playing() {
            return;
        }
        if self.base_position_ms >= self.settings.track_length_ms {
            self.base_position_ms = 0;
        }
        self.started_at = Some(Instant::now());
        self.schedule_completion();
    }

    fn pause(&mut self) {
        if self.started_at.is_some() {
            self.stop_clock();
        }
    }

    fn seek(&mut self, position_ms: u64, token: RequestToken) {
        let playing = self.is_playing();
        self.base_position_ms = position_ms.min(self.settings.track_length_ms);
        if playing {
            self.started_at = Some(Instant::now());
            self.schedule_completion();
        }

        abort(&mut self.seek_task);
        self.seek_task = Some(self.fire_after(
            self.settings.seek_delay_ms,
            EngineCallback {
                token,
                event: EngineEvent::SeekComplete,
            },
        ));
    }

    fn set_volume(&mut self, volume: f32) {
        debug!(volume, "Simulated engine volume");
    }

    fn current_position(&self) -> u64 {
        let elapsed = self.started_at.map_or(0, |started| {
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
        });
        self.base_position_ms
            .saturating_add(elapsed)
            .min(self.settings.track_length_ms)
    }

    fn duration(&self) -> Option<u64> {
        self.loaded.map(|_| self.settings.track_length_ms)
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some() && self.current_position() < self.settings.track_length_ms
    }

    fn release(&mut self) {
        self.reset();
        debug!("Simulated engine released");
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        abort(&mut self.prepare_task);
        abort(&mut self.seek_task);
        abort(&mut self.completion_task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Harness {
        engine: Box<dyn MediaEngine>,
        received: Arc<Mutex<Vec<EngineCallback>>>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.wav");
        std::fs::write(&path, b"").unwrap();

        let mut factory = SimulatedEngineFactory::new(
            [
                (TrackId::new(1), path),
                (TrackId::new(2), dir.path().join("missing.wav")),
            ],
            EngineSettings {
                prepare_delay_ms: 100,
                seek_delay_ms: 20,
                track_length_ms: 10_000,
            },
        );

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&received);
        let engine = factory.create(Arc::new(move |callback| {
            sink_log.lock().unwrap().push(callback);
        }));

        Harness {
            engine,
            received,
            _dir: dir,
        }
    }

    fn events(h: &Harness) -> Vec<EngineEvent> {
        h.received.lock().unwrap().iter().map(|c| c.event).collect()
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_and_missing_tracks_fail_to_open() {
        let mut h = harness();

        let err = h.engine.load(TrackId::new(9)).unwrap_err();
        assert!(matches!(err, PlaybackError::EngineOpenFailure { .. }));

        let err = h.engine.load(TrackId::new(2)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test(start_paused = true)]
    async fn prepare_answers_with_its_token_after_the_delay() {
        let mut h = harness();
        h.engine.load(TrackId::new(1)).unwrap();
        h.engine.prepare_async(RequestToken::new(7));

        advance(50).await;
        assert!(events(&h).is_empty());

        advance(60).await;
        let received = h.received.lock().unwrap().clone();
        assert_eq!(
            received,
            vec![EngineCallback {
                token: RequestToken::new(7),
                event: EngineEvent::Prepared,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_a_pending_prepare() {
        let mut h = harness();
        h.engine.load(TrackId::new(1)).unwrap();
        h.engine.prepare_async(RequestToken::new(1));
        h.engine.reset();

        advance(500).await;
        assert!(events(&h).is_empty());
        assert_eq!(h.engine.duration(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_position() {
        let mut h = harness();
        h.engine.load(TrackId::new(1)).unwrap();
        h.engine.prepare_async(RequestToken::new(1));
        advance(100).await;

        h.engine.play();
        assert!(h.engine.is_playing());
        advance(1000).await;
        h.engine.pause();
        assert!(!h.engine.is_playing());

        advance(5000).await;
        assert_eq!(h.engine.current_position(), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn playing_to_the_end_fires_completion() {
        let mut h = harness();
        h.engine.load(TrackId::new(1)).unwrap();
        h.engine.prepare_async(RequestToken::new(3));
        advance(100).await;

        h.engine.play();
        advance(10_050).await;

        let received = h.received.lock().unwrap().clone();
        assert_eq!(
            received.last(),
            Some(&EngineCallback {
                token: RequestToken::new(3),
                event: EngineEvent::Completion,
            })
        );
        assert!(!h.engine.is_playing());
        assert_eq!(h.engine.current_position(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_moves_position_and_answers_with_seek_token() {
        let mut h = harness();
        h.engine.load(TrackId::new(1)).unwrap();
        h.engine.prepare_async(RequestToken::new(1));
        advance(100).await;

        h.engine.seek(4000, RequestToken::new(2));
        assert_eq!(h.engine.current_position(), 4000);

        advance(30).await;
        let received = h.received.lock().unwrap().clone();
        assert_eq!(
            received.last(),
            Some(&EngineCallback {
                token: RequestToken::new(2),
                event: EngineEvent::SeekComplete,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn seek_past_the_end_clamps() {
        let mut h = harness();
        h.engine.load(TrackId::new(1)).unwrap();
        h.engine.seek(99_000, RequestToken::new(1));
        assert_eq!(h.engine.current_position(), 10_000);
    }
}
