/// Daemon configuration
use crate::error::{DaemonError, Result};
use cadence_core::TrackId;
use cadence_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub focus: FocusSettings,

    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default)]
    pub metadata: MetadataSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Timings of the simulated engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    #[serde(default = "default_prepare_delay_ms")]
    pub prepare_delay_ms: u64,

    #[serde(default = "default_seek_delay_ms")]
    pub seek_delay_ms: u64,

    #[serde(default = "default_track_length_ms")]
    pub track_length_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FocusSettings {
    /// Deny every focus request
    #[serde(default)]
    pub deny_requests: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibrarySettings {
    #[serde(default)]
    pub tracks: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataSettings {
    #[serde(default = "default_artwork_cache_size")]
    pub artwork_cache_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl DaemonConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `cadence.toml` is read if
    /// present. Environment variables override both, e.g.
    /// `CADENCE_PLAYBACK__DUCK_VOLUME=0.2`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("cadence.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with CADENCE_)
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if playback.full_volume <= 0.0 {
            return Err(DaemonError::Config(format!(
                "playback.full_volume must be positive, got {}",
                playback.full_volume
            )));
        }

        if !(0.0..=playback.full_volume).contains(&playback.duck_volume) {
            return Err(DaemonError::Config(format!(
                "playback.duck_volume must be within [0, {}], got {}",
                playback.full_volume, playback.duck_volume
            )));
        }

        if playback.event_capacity == 0 {
            return Err(DaemonError::Config(
                "playback.event_capacity must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.library.tracks {
            if !seen.insert(entry.id) {
                return Err(DaemonError::Config(format!(
                    "Duplicate track id {} in library.tracks",
                    entry.id
                )));
            }
        }

        Ok(())
    }

    /// Catalog as typed pairs
    pub fn catalog(&self) -> Vec<(TrackId, PathBuf)> {
        self.library
            .tracks
            .iter()
            .map(|entry| (TrackId::new(entry.id), entry.path.clone()))
            .collect()
    }
}

// Default values
fn default_prepare_delay_ms() -> u64 {
    150
}

fn default_seek_delay_ms() -> u64 {
    50
}

fn default_track_length_ms() -> u64 {
    30_000
}

fn default_artwork_cache_size() -> usize {
    32
}

fn default_log_filter() -> String {
    "cadence_daemon=info,cadence_playback=debug".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            prepare_delay_ms: default_prepare_delay_ms(),
            seek_delay_ms: default_seek_delay_ms(),
            track_length_ms: default_track_length_ms(),
        }
    }
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            artwork_cache_size: default_artwork_cache_size(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}
