//! HTTP Upgrade handshake (RFC 6455 §4).
//!
//! Happens exactly once per connection, synchronously, before any frame
//! traffic. The request head is consumed byte-by-byte up to the blank line so
//! no frame bytes are ever swallowed.

use crate::error::ProtocolError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Fixed GUID appended to the client key before hashing (RFC 6455 §1.3).
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Upper bound on the request head we are willing to buffer.
const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// Compute the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Perform the server side of the upgrade exchange.
///
/// Rejects any request without an `Upgrade: websocket` header. On success the
/// stream is ready for frame traffic.
pub async fn upgrade<S>(stream: &mut S) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = read_request_head(stream).await?;
    if !is_websocket_upgrade(&request) {
        return Err(ProtocolError::HandshakeRejected(
            "missing Upgrade: websocket header".into(),
        ));
    }
    let key = header_value(&request, "sec-websocket-key").ok_or_else(|| {
        ProtocolError::HandshakeRejected("missing Sec-WebSocket-Key header".into())
    })?;

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept_key(key)
    );
    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

/// Read up to and including the `\r\n\r\n` terminating the request head.
async fn read_request_head<R>(stream: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_REQUEST_BYTES {
            return Err(ProtocolError::HandshakeRejected(
                "request head too large".into(),
            ));
        }
        let read = stream.read(&mut byte).await?;
        if read == 0 {
            return Err(ProtocolError::HandshakeRejected(
                "connection closed during handshake".into(),
            ));
        }
        head.push(byte[0]);
    }
    Ok(String::from_utf8(head)?)
}

fn is_websocket_upgrade(request: &str) -> bool {
    header_value(request, "upgrade").is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

/// Case-insensitive header lookup over the raw request head.
fn header_value<'a>(request: &'a str, name: &str) -> Option<&'a str> {
    request.lines().find_map(|line| {
        let (header, value) = line.split_once(':')?;
        header
            .trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}
