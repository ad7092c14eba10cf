//! WebSocket transport for the realtime session.
//!
//! Provides [`Transport`], a thin layer that pumps text frames between the
//! socket and a channel pair. Protocol logic stays in the sans-IO
//! [`Connection`](crate::connection::Connection); this module only encodes,
//! decodes, and moves frames.
//!
//! A frame that fails to decode is logged and dropped without disturbing the
//! pump: one bad frame must not cost the subscription. Heartbeat frames
//! (bare EOL) are skipped silently.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::{trace, warn};

use parley_proto::{Frame, ProtocolError};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Handle to a live WebSocket session.
///
/// Frames are sent and received via the channels; an internal task handles
/// the socket I/O. Dropping the outbound sender closes the socket cleanly.
pub struct Transport {
    /// Send frames to the server.
    pub to_server: mpsc::Sender<Frame>,
    /// Receive frames from the server. Ends when the socket closes.
    pub from_server: mpsc::Receiver<Frame>,
    /// Abort handle to stop the pump task.
    abort_handle: tokio::task::AbortHandle,
}

impl Transport {
    /// Stop the pump without a close handshake.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Open a WebSocket to the server.
///
/// Returns a [`Transport`] with channels for frame exchange.
///
/// # Errors
///
/// - [`TransportError::Connection`] if the URL is invalid or the socket
///   cannot be established
pub async fn connect(url: &str) -> Result<Transport, TransportError> {
    let (socket, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(format!("websocket connect failed: {e}")))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Frame>(32);

    let handle = tokio::spawn(run_connection(socket, to_server_rx, from_server_tx));

    Ok(Transport {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the pump, bridging between channels and the socket.
async fn run_connection(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<Frame>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = to_server.recv() => {
                let Some(frame) = outbound else {
                    // Session owner dropped the sender: close cleanly.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = sink.send(Message::Text(frame.encode())).await {
                    warn!(error = %e, "websocket send failed");
                    break;
                }
            },
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                        Ok(frame) => {
                            if from_server.send(frame).await.is_err() {
                                break;
                            }
                        },
                        Err(ProtocolError::EmptyFrame) => trace!("heartbeat"),
                        Err(e) => warn!(error = %e, "dropping malformed frame"),
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {},
                    Some(Ok(Message::Binary(_) | Message::Frame(_))) => {
                        warn!("dropping non-text websocket message");
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive failed");
                        break;
                    },
                }
            },
        }
    }
}
