//! From-scratch WebSocket transport (RFC 6455 subset).
//!
//! Covers exactly what the bridge needs: the one-shot upgrade handshake,
//! unfragmented text frames, client-side masking, and ping/pong. There is no
//! permessage-deflate, no multi-frame message reassembly, and no subprotocol
//! negotiation; a continuation opcode fails the connection instead of being
//! misparsed.
//!
//! Mask policy: RFC 6455 obliges clients to mask every frame and forbids the
//! server from masking. Outbound frames are never masked. Inbound frames are
//! unmasked when the mask bit is set but also accepted bare; the transport is
//! loopback-only and the lenience is a deliberate compatibility choice.

pub mod frame;
pub mod handshake;
