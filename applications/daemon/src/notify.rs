/// Notification renderer that writes to the log
use cadence_playback::{NotificationContent, NotificationRenderer, TransportAction};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogNotificationRenderer {
    visible: bool,
}

impl LogNotificationRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

fn action_label(action: TransportAction) -> &'static str {
    match action {
        TransportAction::PlayPause => "play/pause",
        TransportAction::Stop => "stop",
        TransportAction::Previous => "prev",
        TransportAction::Next => "next",
    }
}

impl NotificationRenderer for LogNotificationRenderer {
    fn render(&mut self, content: &NotificationContent) {
        self.visible = true;
        let actions: Vec<&str> = content.actions.iter().copied().map(action_label).collect();
        info!(
            state = ?content.play_state,
            title = content.title.as_deref().unwrap_or("-"),
            artist = content.artist.as_deref().unwrap_or("-"),
            album = content.album.as_deref().unwrap_or("-"),
            artwork_bytes = content.artwork.as_ref().map_or(0, |a| a.data.len()),
            route = ?content.route,
            actions = %actions.join(" | "),
            "Notification"
        );
    }

    fn dismiss(&mut self) {
        if self.visible {
            info!("Notification dismissed");
        }
        self.visible = false;
    }
}
