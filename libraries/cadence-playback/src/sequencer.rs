//! Track sequencing
//!
//! Owns the selected track list and the current index. All index arithmetic
//! wraps, so "next" from the last track returns to the first and "previous"
//! from the first goes to the last.

use crate::error::{PlaybackError, Result};
use cadence_core::TrackId;

/// What the caller must do after a sequencer step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The current track changed; the engine must load and prepare it
    RePrepare,

    /// Same track re-selected; only bookkeeping changed
    Unchanged,

    /// Seek the current track back to 0; the index did not move
    RestartCurrent,
}

/// Ordered track list with a wrapping cursor
///
/// ```text
/// track_ids: [100, 101, 102]
///                        ^ current (index 2)
/// advance()  -> index 0
/// retreat(0) -> index 1
/// ```
#[derive(Debug, Clone)]
pub struct TrackSequencer {
    /// Selected tracks, never empty once set
    track_ids: Vec<TrackId>,

    /// Cursor into `track_ids`; `None` before the first selection
    current: Option<usize>,

    /// Position at or beyond which retreat restarts the current track
    restart_threshold_ms: u64,
}

impl TrackSequencer {
    /// Create an empty sequencer
    pub fn new(restart_threshold_ms: u64) -> Self {
        Self {
            track_ids: Vec::new(),
            current: None,
            restart_threshold_ms,
        }
    }

    /// Replace the track list and cursor
    ///
    /// Fails without touching any state if the list is empty or the index is
    /// out of bounds. When the newly selected track is the one already
    /// current, the list and index are updated but `Step::Unchanged` is
    /// returned so the caller skips the re-prepare.
    pub fn select(&mut self, track_ids: Vec<TrackId>, index: usize) -> Result<Step> {
        if track_ids.is_empty() {
            return Err(PlaybackError::EmptyList);
        }
        if index >= track_ids.len() {
            return Err(PlaybackError::InvalidIndex {
                index,
                len: track_ids.len(),
            });
        }

        let same_track = self.current_track() == Some(track_ids[index]);

        self.track_ids = track_ids;
        self.current = Some(index);

        if same_track {
            Ok(Step::Unchanged)
        } else {
            Ok(Step::RePrepare)
        }
    }

    /// Move to the next track, wrapping to the start
    ///
    /// Returns `None` when nothing has been selected yet.
    pub fn advance(&mut self) -> Option<Step> {
        let current = self.current?;
        self.current = Some((current + 1) % self.track_ids.len());
        Some(Step::RePrepare)
    }

    /// Move to the previous track, or restart the current one
    ///
    /// At or past the restart threshold the index stays put and the caller
    /// seeks to 0. Below it the cursor steps back, wrapping to the end.
    /// Returns `None` when nothing has been selected yet.
    pub fn retreat(&mut self, position_ms: u64) -> Option<Step> {
        let current = self.current?;
        if position_ms >= self.restart_threshold_ms {
            return Some(Step::RestartCurrent);
        }

        let len = self.track_ids.len();
        self.current = Some((current + len - 1) % len);
        Some(Step::RePrepare)
    }

    /// Current index, if a selection exists
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Track at the current index
    pub fn current_track(&self) -> Option<TrackId> {
        self.current.map(|index| self.track_ids[index])
    }

    /// The selected track list
    pub fn track_ids(&self) -> &[TrackId] {
        &self.track_ids
    }

    /// Number of selected tracks
    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    /// True before the first selection
    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }
}
