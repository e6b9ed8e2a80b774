use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A station given either by catalog position or by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationRef {
    Index(usize),
    Name(String),
}

impl From<&str> for StationRef {
    fn from(s: &str) -> Self {
        match s.trim().parse::<usize>() {
            Ok(index) => StationRef::Index(index),
            Err(_) => StationRef::Name(s.trim().to_string()),
        }
    }
}

/// Requests from the front end to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    List,
    /// Play the selected station, or the given one.
    Play { station: Option<StationRef> },
    Stop,
    Toggle,
    /// Change selection; restarts playback when playing.
    Select { station: StationRef },
    Next,
    Prev,
    Random,
    Volume { level: i64 },
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  list                 show stations
  play [N|name]        play selected station, or station N / by name
  stop                 stop playback
  toggle               play/stop
  select N|name        change station (restarts if playing)
  next | prev | random change station
  volume N             set volume 0-100
  status               show state as JSON
  quit                 stop and exit";

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "play" => Command::Play {
                station: (!rest.is_empty()).then(|| StationRef::from(rest)),
            },
            "stop" => Command::Stop,
            "toggle" | "t" => Command::Toggle,
            "select" | "station" | "s" => {
                if rest.is_empty() {
                    return Err(Error::Parse(format!("'{}' needs a station", word)));
                }
                Command::Select {
                    station: StationRef::from(rest),
                }
            }
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "random" | "r" => Command::Random,
            "volume" | "vol" | "v" => {
                let level = rest
                    .trim_end_matches('%')
                    .parse::<i64>()
                    .map_err(|_| Error::Parse(format!("bad volume '{}'", rest)))?;
                Command::Volume { level }
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "" => return Err(Error::Parse("empty command".to_string())),
            other => return Err(Error::Parse(format!("unknown command '{}'", other))),
        };
        Ok(cmd)
    }
}

/// Snapshot of the core for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub station_index: usize,
    pub station: String,
    pub playing: bool,
    pub volume: u8,
    /// When the current player was started.
    pub since: Option<DateTime<Local>>,
    pub pid: Option<u32>,
}
