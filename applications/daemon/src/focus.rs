/// Audio focus for a headless host
use cadence_playback::{AudioFocus, FocusRequestResult};
use tracing::{info, warn};

/// Focus service with no competing owners
///
/// Grants every request unless configured to deny. Platform interruptions
/// are injected through the console's `focus` command.
#[derive(Debug, Default)]
pub struct SimulatedFocus {
    deny_requests: bool,
}

impl SimulatedFocus {
    pub fn new(deny_requests: bool) -> Self {
        Self { deny_requests }
    }
}

impl AudioFocus for SimulatedFocus {
    fn request(&mut self) -> FocusRequestResult {
        if self.deny_requests {
            warn!("Audio focus request denied");
            FocusRequestResult::Denied
        } else {
            info!("Audio focus granted");
            FocusRequestResult::Granted
        }
    }

    fn abandon(&mut self) {
        info!("Audio focus abandoned");
    }
}
