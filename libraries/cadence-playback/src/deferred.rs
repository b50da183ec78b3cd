//! Deferred command queue
//!
//! Holds commands accepted while the engine is not ready. The controller
//! drains the queue at the moment the engine becomes `Prepared` and runs the
//! batch in enqueue order.

use std::collections::VecDeque;

/// A command waiting for the engine to become ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredCommand {
    /// Start playback
    Play,

    /// Pause playback
    Pause,

    /// Toggle, deciding play vs. pause from the engine state at execution time
    TogglePlayPause,

    /// Start playback and announce the new track index (auto-advance)
    AutoPlayAndAnnounce(usize),
}

/// FIFO of deferred commands
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    pending: VecDeque<DeferredCommand>,
}

impl DeferredQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command
    pub fn enqueue(&mut self, command: DeferredCommand) {
        self.pending.push_back(command);
    }

    /// Take every pending command, leaving a fresh empty queue behind
    ///
    /// Commands enqueued while the returned batch is being executed land in
    /// the fresh queue and wait for the next drain.
    pub fn take_batch(&mut self) -> VecDeque<DeferredCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Drop every pending command
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Pending commands, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DeferredCommand> {
        self.pending.iter()
    }

    /// Number of pending commands
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
