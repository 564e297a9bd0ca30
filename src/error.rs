//! Error types for the overlay bridge.
//!
//! Transport failures are fatal to one connection only; bad commands are
//! answered in-band with an `error` message and the connection stays open;
//! missing assets and render failures are logged and absorbed where the
//! operation can degrade.

use thiserror::Error;

/// Connection-fatal WebSocket transport errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),

    #[error("unsupported {0} frame")]
    UnsupportedFrame(&'static str),

    #[error("frame payload of {0} bytes exceeds the limit")]
    OversizedPayload(u64),

    #[error("text payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("message serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
