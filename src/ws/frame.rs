//! WebSocket frame codec.
//!
//! Decoding reads one frame at a time from any [`AsyncRead`]; encoding is a
//! pure function on byte buffers. Server-to-client frames always carry FIN
//! and are never masked.

use crate::error::ProtocolError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame payload. A hostile 64-bit length field must
/// not turn into an allocation.
pub const MAX_PAYLOAD_LEN: u64 = 16 * 1024 * 1024;

/// Frame opcodes (RFC 6455 §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    fn from_bits(byte: u8) -> Result<Self, ProtocolError> {
        match byte & 0x0F {
            0x0 => Ok(Opcode::Continuation),
            0x1 => Ok(Opcode::Text),
            0x2 => Ok(Opcode::Binary),
            0x8 => Ok(Opcode::Close),
            0x9 => Ok(Opcode::Ping),
            0xA => Ok(Opcode::Pong),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Opcode::Continuation => "continuation",
            Opcode::Text => "text",
            Opcode::Binary => "binary",
            Opcode::Close => "close",
            Opcode::Ping => "ping",
            Opcode::Pong => "pong",
        }
    }
}

/// One decoded frame. Ephemeral; produced per read.
#[derive(Debug)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub masked: bool,
    pub payload: Vec<u8>,
}

/// Read exactly one frame, unmasking the payload when the mask bit is set.
///
/// A stream that closes mid-frame is a connection failure, not end-of-input.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let fin = header[0] & 0x80 != 0;
    let opcode = Opcode::from_bits(header[0])?;
    let masked = header[1] & 0x80 != 0;

    let mut len = u64::from(header[1] & 0x7F);
    if len == 126 {
        let mut ext = [0u8; 2];
        reader.read_exact(&mut ext).await?;
        len = u64::from(u16::from_be_bytes(ext));
    } else if len == 127 {
        let mut ext = [0u8; 8];
        reader.read_exact(&mut ext).await?;
        len = u64::from_be_bytes(ext);
    }
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::OversizedPayload(len));
    }

    let mask = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    if let Some(key) = mask {
        apply_mask(&mut payload, key);
    }

    Ok(Frame {
        fin,
        opcode,
        masked,
        payload,
    })
}

/// XOR the payload with the 4-byte key, cycling. Self-inverse: masking and
/// unmasking are the same operation.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Encode a server-to-client text frame: FIN set, opcode 1, never masked.
pub fn encode_text(payload: &str) -> Vec<u8> {
    encode(0x1, payload.as_bytes())
}

/// The zero-length pong answering any ping.
pub fn encode_pong() -> Vec<u8> {
    vec![0x8A, 0x00]
}

fn encode(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 10);
    frame.push(0x80 | opcode);
    match payload.len() {
        len if len < 126 => frame.push(len as u8),
        len if len <= 65_535 => {
            frame.push(126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            frame.push(127);
            frame.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    frame.extend_from_slice(payload);
    frame
}

/// Read text messages until the peer closes.
///
/// Pings are answered with a pong and skipped inside the loop (deliberately a
/// loop, not recursion: a ping flood must not grow the stack); unsolicited
/// pongs are dropped. A close frame yields `Ok(None)`. Continuation and
/// binary frames are unsupported and fail the connection.
pub async fn read_message<S>(stream: &mut S) -> Result<Option<String>, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = read_frame(stream).await?;
        match frame.opcode {
            Opcode::Close => return Ok(None),
            Opcode::Ping => stream.write_all(&encode_pong()).await?,
            Opcode::Pong => {}
            Opcode::Text => return Ok(Some(String::from_utf8(frame.payload)?)),
            Opcode::Continuation | Opcode::Binary => {
                return Err(ProtocolError::UnsupportedFrame(frame.opcode.name()))
            }
        }
    }
}
