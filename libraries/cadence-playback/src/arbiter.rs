//! Audio resource arbitration
//!
//! Tracks whether this process holds the shared audio output ("focus") and
//! which output route is active, and maps external interruption signals to
//! the action the controller must take.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of a focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequestResult {
    /// Focus is now held
    Granted,
    /// Another owner keeps focus
    Denied,
}

/// Platform audio focus service
#[cfg_attr(test, mockall::automock)]
pub trait AudioFocus: Send {
    /// Ask for exclusive audible output
    fn request(&mut self) -> FocusRequestResult;

    /// Give focus back
    fn abandon(&mut self);
}

/// Focus signals delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusChange {
    /// Focus (re)gained
    Gain,
    /// Focus gained; other apps may keep playing ducked
    GainTransientMayDuck,
    /// Focus lost for an unbounded time
    Loss,
    /// Focus lost briefly (e.g. a phone call)
    LossTransient,
    /// Focus lost briefly; playing quietly is acceptable
    LossTransientCanDuck,
}

/// What the controller must do for a focus signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusAction {
    /// Rebuild the engine if needed, restore volume, resume playback
    Resume,
    /// Restore full volume only
    RestoreVolume,
    /// Pause, save the position and release the engine
    TearDown,
    /// Pause, keep the engine
    Pause,
    /// Lower the volume without pausing
    Duck,
}

/// Physical output path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioRoute {
    /// Built-in speaker
    #[default]
    Speaker,
    /// Wired headphones or headset
    WiredHeadset,
    /// Wireless (Bluetooth) output
    Wireless,
}

/// Route signals delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteChange {
    /// Output is about to switch to the speaker unexpectedly
    BecomingNoisy,
    /// Wired headset plugged in
    HeadsetPlugged,
    /// Wired headset removed
    HeadsetUnplugged,
    /// Wireless output connected
    WirelessConnected,
    /// Wireless output disconnected
    WirelessDisconnected,
}

/// What the controller must do for a route signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Pause playback
    Pause,
    /// Re-render the notification for the new route
    Refresh,
}

/// Focus and route bookkeeping
///
/// Requests are only issued when focus is not already held, so at most one
/// grant is ever outstanding.
pub struct AudioResourceArbiter {
    focus: Box<dyn AudioFocus>,
    held: bool,
    route: AudioRoute,
}

impl AudioResourceArbiter {
    /// Create an arbiter that does not hold focus
    pub fn new(focus: Box<dyn AudioFocus>) -> Self {
        Self {
            focus,
            held: false,
            route: AudioRoute::default(),
        }
    }

    /// Make sure focus is held, requesting it if necessary
    ///
    /// Returns `false` when the platform denied the request.
    pub fn acquire(&mut self) -> bool {
        if self.held {
            return true;
        }

        match self.focus.request() {
            FocusRequestResult::Granted => {
                debug!("Audio focus granted");
                self.held = true;
                true
            }
            FocusRequestResult::Denied => {
                warn!("Audio focus denied");
                false
            }
        }
    }

    /// Give focus back if it is held
    pub fn release(&mut self) {
        if self.held {
            self.focus.abandon();
            self.held = false;
            debug!("Audio focus abandoned");
        }
    }

    /// Whether focus is currently held
    pub fn has_focus(&self) -> bool {
        self.held
    }

    /// Map a focus signal to an action and update the held flag
    pub fn on_focus_change(&mut self, change: FocusChange) -> FocusAction {
        debug!(?change, "Focus change");
        match change {
            FocusChange::Gain => {
                self.held = true;
                FocusAction::Resume
            }
            FocusChange::GainTransientMayDuck => {
                self.held = true;
                FocusAction::RestoreVolume
            }
            FocusChange::Loss => {
                self.held = false;
                FocusAction::TearDown
            }
            FocusChange::LossTransient => FocusAction::Pause,
            FocusChange::LossTransientCanDuck => FocusAction::Duck,
        }
    }

    /// Map a route signal to an action and update the active route
    pub fn on_route_change(&mut self, change: RouteChange) -> RouteAction {
        debug!(?change, "Route change");
        match change {
            RouteChange::BecomingNoisy => return RouteAction::Pause,
            RouteChange::HeadsetPlugged => self.route = AudioRoute::WiredHeadset,
            RouteChange::WirelessConnected => self.route = AudioRoute::Wireless,
            RouteChange::HeadsetUnplugged | RouteChange::WirelessDisconnected => {
                self.route = AudioRoute::Speaker;
            }
        }
        RouteAction::Refresh
    }

    /// Active output route
    pub fn route(&self) -> AudioRoute {
        self.route
    }
}

impl std::fmt::Debug for AudioResourceArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioResourceArbiter")
            .field("held", &self.held)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}
