//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Incoming, PendingConnection, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Pending = PendingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        tracing::trace!(%addr, "accepted TCP connection");
        Ok(PendingWebSocket { stream, addr })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A TCP connection waiting for its WebSocket upgrade request.
pub struct PendingWebSocket {
    stream: TcpStream,
    addr: SocketAddr,
}

impl PendingConnection for PendingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    async fn handshake(self) -> Result<Self::Connection, Self::Error> {
        let addr = self.addr;
        let ws = tokio_tungstenite::accept_async(self.stream)
            .await
            .map_err(|e| TransportError::Handshake(format!("{addr}: {e}")))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "WebSocket handshake complete");

        // Split so that outbound fan-out never queues behind a pending read.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    async fn send_message(&self, msg: Message) -> Result<(), TransportError> {
        self.sink.lock().await.send(msg).await.map_err(send_failed)
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// JSON frames go out as text; anything that isn't UTF-8 goes as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::text(text),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };
        self.send_message(msg).await
    }

    async fn recv(&self) -> Result<Option<Incoming>, Self::Error> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(Incoming::Data(data.into())));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Incoming::Data(text.as_bytes().to_vec())));
                }
                Some(Ok(Message::Pong(_))) => return Ok(Some(Incoming::Pong)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Pings are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
            }
        }
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        self.send_message(Message::Ping(Default::default())).await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(send_failed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn send_failed(e: tokio_tungstenite::tungstenite::Error) -> TransportError {
    TransportError::Send(e.to_string())
}
