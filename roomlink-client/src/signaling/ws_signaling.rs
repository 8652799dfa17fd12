use crate::error::{Error, Result};
use crate::orchestrator::MeshHandle;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use roomlink_core::{SignalMessage, encode};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection to a relay.
///
/// Writes go through an unbounded queue drained by a writer task, so
/// [`SignalingOutput::send_signal`] never waits on the socket.
#[derive(Clone)]
pub struct WsSignaling {
    tx: mpsc::UnboundedSender<Message>,
}

/// Inbound half of a [`WsSignaling`] connection, not yet attached to a mesh.
pub struct WsInbound {
    stream: SplitStream<WsStream>,
}

impl WsSignaling {
    pub async fn connect(url: &str) -> Result<(Self, WsInbound)> {
        let (socket, _response) = connect_async(url).await?;
        info!("Connected to relay at {}", url);

        let (mut sink, stream) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("Relay write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Relay writer finished");
        });

        Ok((Self { tx }, WsInbound { stream }))
    }
}

#[async_trait]
impl SignalingOutput for WsSignaling {
    async fn send_signal(&self, msg: SignalMessage) -> Result<()> {
        let json = encode(&msg)?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| Error::TransportClosed)
    }
}

impl WsInbound {
    /// Feed every text frame into `handle` until the socket ends, then
    /// report the transport as closed.
    pub fn spawn_forwarding(self, handle: MeshHandle) -> JoinHandle<()> {
        let mut stream = self.stream;

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if handle.submit_inbound_message(text.as_str()).await.is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay read failed: {}", e);
                        break;
                    }
                }
            }

            info!("Relay connection closed");
            let _ = handle.transport_closed().await;
        })
    }
}
