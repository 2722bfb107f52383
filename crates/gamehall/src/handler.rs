//! Per-connection handler and message router.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the client and start its writer task
//!   2. Send `connected`, then `roomsList`
//!   3. Loop: receive frames and route them, until the peer closes or
//!      the liveness supervisor reaps the connection
//!   4. Leave the room and close the transport (drop guard)
//!
//! Request errors are reported to the sender only, as an `error` frame;
//! the connection stays open.

use std::sync::Arc;

use gamehall_protocol::{ClientFrame, ClientId, Codec, JsonCodec, RoomMessage, ServerFrame};
use gamehall_room::Member;
use gamehall_transport::{Connection, Incoming, TransportError};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ServerError;
use crate::client::{Client, ClientSet};
use crate::server::ServerState;

/// Drop guard that closes the client when the handler exits.
///
/// Runs even if the handler panics. Since `Drop` is synchronous, the
/// async cleanup is spawned as a fire-and-forget task.
struct ClientGuard<C: Connection> {
    client: Arc<Client<C>>,
    clients: Arc<ClientSet<C>>,
}

impl<C: Connection> Drop for ClientGuard<C> {
    fn drop(&mut self) {
        let client = Arc::clone(&self.client);
        let clients = Arc::clone(&self.clients);
        tokio::spawn(async move {
            clients.remove(client.id());
            client.close().await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: C,
    state: Arc<ServerState<C>>,
) -> Result<(), ServerError>
where
    C: Connection<Error = TransportError>,
{
    let conn = Arc::new(conn);
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let client = Arc::new(Client::new(Arc::clone(&conn), outbound_tx));
    let client_id = client.id().clone();
    tracing::info!(%client_id, conn_id = %conn.id(), "client connected");

    state.clients.insert(Arc::clone(&client));
    let _guard = ClientGuard {
        client: Arc::clone(&client),
        clients: Arc::clone(&state.clients),
    };
    tokio::spawn(write_frames(conn, outbound_rx, state.codec, client_id.clone()));

    client.send(ServerFrame::Connected {
        client_id: client_id.clone(),
    });
    client.send(ServerFrame::RoomsList {
        rooms: state.rooms.list_all().await,
    });

    loop {
        let incoming = tokio::select! {
            _ = client.reaped() => {
                tracing::info!(%client_id, "connection reaped");
                break;
            }
            incoming = client.connection().recv() => incoming?,
        };

        match incoming {
            Some(Incoming::Pong) => client.mark_alive(),
            Some(Incoming::Data(data)) => {
                client.mark_alive();
                route_frame(&state, &client, &data).await;
            }
            None => {
                tracing::info!(%client_id, "connection closed by peer");
                break;
            }
        }
    }

    // _guard drops here → leave room, close transport.
    Ok(())
}

/// Drains a client's outbound queue onto its connection.
///
/// Ends when every sender is gone (the client and its room seat) or the
/// transport stops accepting frames.
async fn write_frames<C: Connection>(
    conn: Arc<C>,
    mut outbound: mpsc::UnboundedReceiver<ServerFrame>,
    codec: JsonCodec,
    client_id: ClientId,
) {
    while let Some(frame) = outbound.recv().await {
        let bytes = match codec.encode(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%client_id, error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%client_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Decodes one inbound frame and dispatches it.
async fn route_frame<C: Connection>(state: &ServerState<C>, client: &Client<C>, data: &[u8]) {
    let frame: ClientFrame = match state.codec.decode(data) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(client_id = %client.id(), error = %e, "undecodable frame");
            client.send(ServerFrame::error(ServerError::from(e).to_string()));
            return;
        }
    };

    let result = match frame {
        ClientFrame::JoinRoom {
            room_name,
            client_name,
        } => join_room(state, client, &room_name, client_name).await,
        ClientFrame::Message { message } => relay_message(client, message).await,
        ClientFrame::GameAction { game_type, action } => {
            game_action(client, &game_type, action).await
        }
        ClientFrame::ListRooms => {
            client.send(ServerFrame::RoomsList {
                rooms: state.rooms.list_all().await,
            });
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(client_id = %client.id(), error = %e, "request failed");
        client.send(ServerFrame::error(e.to_string()));
    }
}

async fn join_room<C: Connection>(
    state: &ServerState<C>,
    client: &Client<C>,
    room_name: &str,
    client_name: Option<String>,
) -> Result<(), ServerError> {
    // Resolve the target before touching membership, so an unknown room
    // leaves the client where it was.
    let room = state.rooms.get(room_name)?.clone();

    // Leave first: a client is never a member of two rooms, even briefly.
    if let Some(previous) = client.current_room() {
        if previous.name() != room.name() {
            previous.leave(client.id()).await?;
            client.set_room(None);
        }
    }

    let label = client_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default_label(client.id()));
    room.join(Member::new(client.id().clone(), label, client.outbound()))
        .await?;
    client.set_room(Some(room));
    Ok(())
}

async fn relay_message<C: Connection>(
    client: &Client<C>,
    message: RoomMessage,
) -> Result<(), ServerError> {
    let room = client.current_room().ok_or(ServerError::NotInRoom)?;
    room.relay(client.id(), message).await?;
    Ok(())
}

async fn game_action<C: Connection>(
    client: &Client<C>,
    game_type: &str,
    action: Value,
) -> Result<(), ServerError> {
    let room = client.current_room().ok_or(ServerError::NotInRoom)?;
    match GameCommand::from_action(action) {
        GameCommand::Start => room.start_session(client.id(), game_type).await?,
        GameCommand::End => room.stop_session(client.id(), game_type).await?,
        GameCommand::Engine(action) => room.apply_action(client.id(), game_type, action).await?,
    }
    Ok(())
}

/// Label for clients that join without a name.
fn default_label(id: &ClientId) -> String {
    format!("Guest-{}", id.short())
}

/// How the router reads a `gameAction.action`.
#[derive(Debug, PartialEq)]
enum GameCommand {
    /// `{"type":"start"}`: start a session.
    Start,
    /// `{"type":"end"}`: stop the session.
    End,
    /// Anything else goes to the engine untouched.
    Engine(Value),
}

impl GameCommand {
    fn from_action(action: Value) -> Self {
        match action.get("type").and_then(Value::as_str) {
            Some("start") => Self::Start,
            Some("end") => Self::End,
            _ => Self::Engine(action),
        }
    }
}
