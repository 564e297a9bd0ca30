//! Loopback WebSocket server: listener and per-connection loop.
//!
//! One acceptor task; one task per connection running handshake once, then a
//! blocking read → dispatch → write cycle. Responses go out in the order the
//! commands arrived on that connection. A protocol error or shutdown signal
//! ends only the affected connection; the shared session lives on.

mod dispatch;
mod messages;

pub use dispatch::dispatch;
pub use messages::{AttachParams, ServerMessage, ShowParams};

use crate::error::ProtocolError;
use crate::session::SessionManager;
use crate::ws::{frame, handshake};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default control port.
pub const DEFAULT_PORT: u16 = 8332;

/// Accepts UI connections and serves the overlay control protocol.
pub struct BridgeServer {
    listener: TcpListener,
    session: Arc<SessionManager>,
}

impl BridgeServer {
    /// Bind the loopback listener. Port 0 picks an ephemeral port.
    pub async fn bind(port: u16, session: Arc<SessionManager>) -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        Ok(Self { listener, session })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the shutdown signal flips.
    ///
    /// Established connections observe the same signal and unwind on their
    /// own; dropping the listener never tears them down mid-command.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(peer = %peer, "client connected");
                            let session = Arc::clone(&self.session);
                            let conn_shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                match serve_connection(stream, session, conn_shutdown).await {
                                    Ok(()) => debug!(peer = %peer, "client disconnected"),
                                    Err(err) => {
                                        debug!(peer = %peer, error = %err, "connection failed");
                                    }
                                }
                            });
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    }
                }
            }
        }
        info!("listener stopped");
    }
}

/// Per-connection loop: one handshake, an unsolicited status greeting, then
/// read → dispatch → write until the peer closes or the server shuts down.
async fn serve_connection(
    mut stream: TcpStream,
    session: Arc<SessionManager>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ProtocolError> {
    handshake::upgrade(&mut stream).await?;

    let greeting = dispatch::status_message(&session).await;
    send(&mut stream, &greeting).await?;

    loop {
        let message = tokio::select! {
            _ = shutdown.changed() => break,
            message = frame::read_message(&mut stream) => message?,
        };
        let Some(text) = message else {
            break; // peer sent a close frame or went away
        };
        let response = dispatch::dispatch(&session, &text).await;
        send(&mut stream, &response).await?;
    }
    Ok(())
}

async fn send(stream: &mut TcpStream, message: &ServerMessage) -> Result<(), ProtocolError> {
    let json = serde_json::to_string(message)?;
    stream.write_all(&frame::encode_text(&json)).await?;
    Ok(())
}
