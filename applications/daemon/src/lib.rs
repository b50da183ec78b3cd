//! Cadence Daemon
//!
//! Headless host for the playback core: loads configuration, wires the
//! simulated engine, focus and notification collaborators, and drives the
//! service from a line-oriented console.

pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod focus;
pub mod notify;
pub mod sim_engine;

pub use app::Daemon;
pub use config::DaemonConfig;
pub use error::{DaemonError, Result};
