//! Wire messages exchanged with the UI client.
//!
//! One JSON object per WebSocket text message in both directions. Field
//! names and defaults are part of the contract: `game` defaults to `"ets2"`,
//! `signal` to `"5"`, `nowPlaying` to `"Now playing:"`, `rtl` to `false`.

use serde::{Deserialize, Serialize};

/// Parameters of an `attach` command.
#[derive(Debug, Deserialize)]
pub struct AttachParams {
    #[serde(default = "default_game")]
    pub game: String,
}

/// Parameters of a `show` command.
#[derive(Debug, Deserialize)]
pub struct ShowParams {
    #[serde(default)]
    pub station: String,
    #[serde(default = "default_signal")]
    pub signal: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(rename = "nowPlaying", default = "default_now_playing")]
    pub now_playing: String,
    #[serde(default)]
    pub rtl: bool,
}

fn default_game() -> String {
    "ets2".to_string()
}

fn default_signal() -> String {
    "5".to_string()
}

fn default_now_playing() -> String {
    "Now playing:".to_string()
}

/// Outbound messages, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent unsolicited on connect and as the reply to `status`.
    Status {
        attached: bool,
        game: Option<String>,
    },
    AttachResult {
        success: bool,
        game: String,
    },
    DetachResult {
        success: bool,
    },
    ShowResult {
        success: bool,
    },
    HideResult {
        success: bool,
    },
    Error {
        message: String,
    },
}
