//! Session domain types.

use std::fmt;

/// Supported simulator targets. A closed set: anything else is rejected at
/// the command boundary as a domain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Game {
    /// Euro Truck Simulator 2.
    Ets2,
    /// American Truck Simulator.
    Ats,
}

impl Game {
    /// Parse a wire identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "ets2" => Some(Game::Ets2),
            "ats" => Some(Game::Ats),
            _ => None,
        }
    }

    /// Wire identifier used in commands and status messages.
    pub fn id(self) -> &'static str {
        match self {
            Game::Ets2 => "ets2",
            Game::Ats => "ats",
        }
    }

    /// Executable name of the simulator process.
    pub fn process_name(self) -> &'static str {
        match self {
            Game::Ets2 => "eurotrucks2",
            Game::Ats => "amtrucks",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Parameters of one `show` command, defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRequest {
    pub station: String,
    pub signal: String,
    pub logo: Option<String>,
    pub now_playing: String,
    pub rtl: bool,
}

/// Snapshot answering a `status` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub attached: bool,
    pub game: Option<Game>,
}
