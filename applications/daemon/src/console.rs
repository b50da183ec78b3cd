//! Line-oriented control console
//!
//! Each stdin line is one command. Transport commands map onto
//! `PlaybackHandle`; `focus` and `route` inject the platform signals a real
//! host would receive from the OS.

use crate::error::{DaemonError, Result};
use cadence_core::TrackId;
use cadence_playback::{FocusChange, PlaybackHandle, PlaybackSnapshot, RouteChange};
use std::fmt::Write as _;
use std::str::FromStr;

/// Usage text printed by `help`
pub const HELP: &str = "\
commands:
  select <id>[,<id>...] [index]   replace the track list
  play | pause | toggle | stop    transport
  next | prev                     move through the list
  focus <gain|gain-duck|loss|loss-transient|loss-duck>
  route <noisy|headset-on|headset-off|wireless-on|wireless-off>
  status                          print the controller state
  help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Select {
        track_ids: Vec<TrackId>,
        start_index: usize,
    },
    Play,
    Pause,
    Toggle,
    Stop,
    Next,
    Previous,
    Focus(FocusChange),
    Route(RouteChange),
    Status,
    Help,
}

impl FromStr for ConsoleCommand {
    type Err = DaemonError;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            [] => return Err(DaemonError::command("empty line")),
            ["select", ids] => Self::Select {
                track_ids: parse_ids(ids)?,
                start_index: 0,
            },
            ["select", ids, index] => Self::Select {
                track_ids: parse_ids(ids)?,
                start_index: index
                    .parse()
                    .map_err(|_| DaemonError::command(format!("invalid index '{index}'")))?,
            },
            ["play"] => Self::Play,
            ["pause"] => Self::Pause,
            ["toggle"] => Self::Toggle,
            ["stop"] => Self::Stop,
            ["next"] => Self::Next,
            ["prev" | "previous"] => Self::Previous,
            ["focus", change] => Self::Focus(parse_focus(change)?),
            ["route", change] => Self::Route(parse_route(change)?),
            ["status"] => Self::Status,
            ["help"] => Self::Help,
            [verb @ ("select" | "focus" | "route")] => {
                return Err(DaemonError::command(format!("{verb} needs an argument")))
            }
            [verb, ..] if is_known(verb) => {
                return Err(DaemonError::command(format!(
                    "wrong arguments for '{verb}'"
                )))
            }
            [verb, ..] => return Err(DaemonError::command(format!("unknown command '{verb}'"))),
        };
        Ok(command)
    }
}

fn is_known(verb: &str) -> bool {
    matches!(
        verb,
        "select"
            | "play"
            | "pause"
            | "toggle"
            | "stop"
            | "next"
            | "prev"
            | "previous"
            | "focus"
            | "route"
            | "status"
            | "help"
    )
}

fn parse_ids(list: &str) -> Result<Vec<TrackId>> {
    list.split(',')
        .map(|id| {
            id.trim()
                .parse::<u64>()
                .map(TrackId::new)
                .map_err(|_| DaemonError::command(format!("invalid track id '{id}'")))
        })
        .collect()
}

fn parse_focus(value: &str) -> Result<FocusChange> {
    Ok(match value {
        "gain" => FocusChange::Gain,
        "gain-duck" => FocusChange::GainTransientMayDuck,
        "loss" => FocusChange::Loss,
        "loss-transient" => FocusChange::LossTransient,
        "loss-duck" => FocusChange::LossTransientCanDuck,
        other => return Err(DaemonError::command(format!("unknown focus change '{other}'"))),
    })
}

fn parse_route(value: &str) -> Result<RouteChange> {
    Ok(match value {
        "noisy" => RouteChange::BecomingNoisy,
        "headset-on" => RouteChange::HeadsetPlugged,
        "headset-off" => RouteChange::HeadsetUnplugged,
        "wireless-on" => RouteChange::WirelessConnected,
        "wireless-off" => RouteChange::WirelessDisconnected,
        other => return Err(DaemonError::command(format!("unknown route change '{other}'"))),
    })
}

impl ConsoleCommand {
    /// Run the command against the playback service
    ///
    /// # Returns
    /// Text to print, if the command produces any
    pub async fn execute(self, handle: &PlaybackHandle) -> Result<Option<String>> {
        match self {
            Self::Select {
                track_ids,
                start_index,
            } => handle.select(track_ids, start_index).await?,
            Self::Play => handle.play()?,
            Self::Pause => handle.pause()?,
            Self::Toggle => handle.toggle_play_pause()?,
            Self::Stop => handle.stop()?,
            Self::Next => handle.next()?,
            Self::Previous => handle.previous()?,
            Self::Focus(change) => handle.focus_changed(change)?,
            Self::Route(change) => handle.route_changed(change)?,
            Self::Status => return Ok(Some(format_status(&handle.snapshot().await?))),
            Self::Help => return Ok(Some(HELP.to_string())),
        }
        Ok(None)
    }

    /// True for commands that end the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Render a snapshot as a short multi-line report
pub fn format_status(snapshot: &PlaybackSnapshot) -> String {
    let mut out = String::new();
    let ids: Vec<String> = snapshot.track_ids.iter().map(ToString::to_string).collect();

    let _ = writeln!(out, "engine:   {:?}", snapshot.lifecycle);
    let _ = writeln!(out, "state:    {:?}", snapshot.state);
    let _ = writeln!(
        out,
        "playing:  {}",
        snapshot
            .play_state
            .map_or_else(|| "-".to_string(), |s| format!("{s:?}"))
    );
    let _ = writeln!(out, "tracks:   [{}]", ids.join(", "));
    let _ = writeln!(
        out,
        "index:    {}",
        snapshot.index.map_or_else(|| "-".to_string(), |i| i.to_string())
    );
    if let Some(info) = &snapshot.track_info {
        let _ = writeln!(
            out,
            "title:    {}",
            info.title.as_deref().unwrap_or("(unknown)")
        );
    }
    if let Some(position) = snapshot.position_to_restore {
        let _ = writeln!(out, "restore:  {position} ms");
    }
    let _ = write!(out, "deferred: {}", snapshot.deferred);
    out
}
