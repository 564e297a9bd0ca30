//! Local control-plane for the in-game radio overlay.
//!
//! A UI client in another process connects over a loopback WebSocket and
//! commands the overlay: attach to a running simulator, push a composed
//! station image into it, detach again. The crate owns the transport (a
//! from-scratch RFC 6455 subset), the JSON command protocol, the session
//! state machine and the image composer; the DirectX capture runtime that
//! does the actual in-game drawing is an external collaborator behind the
//! [`capability`] traits.
//!
//! # Architecture
//!
//! - **Listener** (`server`): accepts loopback TCP connections, one task per
//!   client.
//! - **Connection loop** (`server`): upgrade handshake once, then
//!   read → dispatch → write with responses in command order.
//! - **Frame codec / handshake** (`ws`): the RFC 6455 subset the bridge
//!   needs, nothing more.
//! - **Dispatcher** (`server::dispatch`): JSON envelope in, typed session
//!   call, JSON reply out.
//! - **Session** (`session`): the one shared record of what the bridge is
//!   attached to, serialized behind a single mutex, with the 4-second
//!   auto-hide timer.
//! - **Composer** (`overlay`): background template + station text + signal
//!   icon + optional logo → one bitmap and a placement point.

pub mod capability;
pub mod error;
pub mod overlay;
pub mod server;
pub mod session;
pub mod ws;

pub use error::ProtocolError;
pub use server::{BridgeServer, ServerMessage, DEFAULT_PORT};
pub use session::{Game, SessionManager, SessionStatus, ShowRequest};
