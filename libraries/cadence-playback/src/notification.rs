//! Notification rendering seam

use crate::arbiter::AudioRoute;
use crate::types::PlayState;
use cadence_core::{ArtworkData, TrackMetadata};
use std::sync::Arc;

/// Transport action exposed on the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    /// Toggle play/pause
    PlayPause,
    /// Stop the service
    Stop,
    /// Previous track (or restart)
    Previous,
    /// Next track
    Next,
}

/// Everything a renderer needs to draw the persistent notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContent {
    /// Playing or paused
    pub play_state: PlayState,
    /// Track title
    pub title: Option<String>,
    /// Track artist
    pub artist: Option<String>,
    /// Album title
    pub album: Option<String>,
    /// Cover art
    pub artwork: Option<Arc<ArtworkData>>,
    /// Active output route
    pub route: AudioRoute,
    /// Actions shown, in display order
    pub actions: Vec<TransportAction>,
}

impl NotificationContent {
    /// Build content from cached track info
    pub fn new(play_state: PlayState, info: Option<&TrackMetadata>, route: AudioRoute) -> Self {
        Self {
            play_state,
            title: info.and_then(|i| i.title.clone()),
            artist: info.and_then(|i| i.artist.clone()),
            album: info.and_then(|i| i.album.clone()),
            artwork: info.and_then(|i| i.artwork.clone()),
            route,
            actions: vec![
                TransportAction::Previous,
                TransportAction::PlayPause,
                TransportAction::Next,
                TransportAction::Stop,
            ],
        }
    }
}

/// Draws the foreground notification
///
/// Activating an action must re-enter the controller through a
/// `PlaybackHandle`; renderers never touch playback state directly.
pub trait NotificationRenderer: Send {
    /// Draw or update the notification
    fn render(&mut self, content: &NotificationContent);

    /// Remove the notification
    fn dismiss(&mut self);
}
