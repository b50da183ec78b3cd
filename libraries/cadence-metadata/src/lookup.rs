use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use cadence_core::{ArtworkData, CoreError, MetadataLookup, TrackId, TrackMetadata};
use lofty::{PictureType, TaggedFileExt};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Maximum artwork size (5MB)
const MAX_ARTWORK_SIZE: usize = 5 * 1024 * 1024;

type ArtworkCache = Arc<Mutex<LruCache<PathBuf, Arc<ArtworkData>>>>;

/// Looks up display metadata from tags in catalogued audio files
///
/// Track ids resolve to paths through a fixed catalog. Tags are read on a
/// blocking task; front-cover artwork is kept in an LRU cache keyed by path.
pub struct LoftyMetadataLookup {
    catalog: HashMap<TrackId, PathBuf>,
    artwork: ArtworkCache,
}

impl LoftyMetadataLookup {
    /// Create a lookup over `catalog`
    ///
    /// # Arguments
    /// * `catalog` - Track id to file path
    /// * `artwork_cache_size` - Images kept in memory (0 keeps one)
    pub fn new(
        catalog: impl IntoIterator<Item = (TrackId, PathBuf)>,
        artwork_cache_size: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(artwork_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            catalog: catalog.into_iter().collect(),
            artwork: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Path catalogued for `track_id`
    pub fn path_for(&self, track_id: TrackId) -> Option<&Path> {
        self.catalog.get(&track_id).map(PathBuf::as_path)
    }

    /// Number of images currently cached
    pub fn cached_artwork(&self) -> usize {
        self.artwork
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Read metadata for `track_id` on the current thread
    pub fn read(&self, track_id: TrackId) -> Result<TrackMetadata> {
        let path = self
            .path_for(track_id)
            .ok_or(MetadataError::UnknownTrack(track_id))?;
        read_from_path(track_id, path, &self.artwork)
    }
}

fn read_from_path(track_id: TrackId, path: &Path, cache: &ArtworkCache) -> Result<TrackMetadata> {
    if !path.exists() {
        return Err(MetadataError::FileNotFound(path.to_path_buf()));
    }

    let tagged_file = lofty::read_from_path(path)?;
    let mut metadata = TrackMetadata::empty(track_id);

    // Primary tag or first available tag
    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        debug!(path = %path.display(), "No tags");
        return Ok(metadata);
    };

    for item in tag.items() {
        let text = || item.value().text().map(ToString::to_string);
        match item.key() {
            lofty::ItemKey::TrackTitle => metadata.title = text(),
            lofty::ItemKey::TrackArtist => metadata.artist = text(),
            lofty::ItemKey::AlbumTitle => metadata.album = text(),
            _ => {}
        }
    }

    metadata.artwork = match cached_artwork(path, cache) {
        Some(artwork) => Some(artwork),
        None => match front_cover(tag) {
            Ok(Some(artwork)) => {
                let artwork = Arc::new(artwork);
                cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .put(path.to_path_buf(), Arc::clone(&artwork));
                Some(artwork)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping artwork");
                None
            }
        },
    };

    Ok(metadata)
}

fn cached_artwork(path: &Path, cache: &ArtworkCache) -> Option<Arc<ArtworkData>> {
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(path)
        .cloned()
}

/// Front cover, otherwise the first picture
fn front_cover(tag: &lofty::Tag) -> Result<Option<ArtworkData>> {
    let pictures = tag.pictures();
    let Some(picture) = pictures
        .iter()
        .find(|p| matches!(p.pic_type(), PictureType::CoverFront))
        .or_else(|| pictures.first())
    else {
        return Ok(None);
    };

    let data = picture.data();
    if data.len() > MAX_ARTWORK_SIZE {
        return Err(MetadataError::ArtworkTooLarge(data.len(), MAX_ARTWORK_SIZE));
    }

    // Default to "image/jpeg" if not specified
    let mime_type = picture
        .mime_type()
        .map_or_else(|| "image/jpeg".to_string(), |m| m.as_str().to_string());

    Ok(Some(ArtworkData::new(data.to_vec(), mime_type)))
}

#[async_trait]
impl MetadataLookup for LoftyMetadataLookup {
    async fn lookup(&self, track_id: TrackId) -> cadence_core::Result<TrackMetadata> {
        let path = self
            .path_for(track_id)
            .ok_or(CoreError::TrackNotFound(track_id))?
            .to_path_buf();
        let cache = Arc::clone(&self.artwork);

        let metadata = tokio::task::spawn_blocking(move || read_from_path(track_id, &path, &cache))
            .await
            .map_err(|e| MetadataError::Task(e.to_string()))??;
        Ok(metadata)
    }
}

impl std::fmt::Debug for LoftyMetadataLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoftyMetadataLookup")
            .field("catalog", &self.catalog.len())
            .field("cached_artwork", &self.cached_artwork())
            .finish()
    }
}
