//! Overlay session: the one shared record of which game (if any) the bridge
//! is attached to, with the auto-hide timer that clears stale overlays.

mod manager;
mod types;

pub use manager::{SessionManager, DEFAULT_HIDE_DELAY};
pub use types::{Game, SessionStatus, ShowRequest};
