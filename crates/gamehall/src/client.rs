//! Connected clients and the set of open connections.
//!
//! A [`Client`] is the server's record of one connection: its generated
//! identity, liveness flag, outbound frame queue, and the room it's in.
//! Outbound frames are queued on an unbounded channel and written by a
//! dedicated task, so fan-out from a room never waits on a slow peer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use gamehall_protocol::{ClientId, ServerFrame};
use gamehall_room::{FrameSender, RoomHandle};
use gamehall_transport::Connection;
use tokio::sync::Notify;

/// One open connection.
pub struct Client<C: Connection> {
    id: ClientId,
    conn: Arc<C>,
    outbound: FrameSender,
    alive: AtomicBool,
    closed: AtomicBool,
    /// Signalled when the liveness supervisor gives up on this client.
    reaped: Notify,
    room: Mutex<Option<RoomHandle>>,
}

impl<C: Connection> Client<C> {
    /// Wraps a freshly accepted connection. The client starts out alive.
    pub fn new(conn: Arc<C>, outbound: FrameSender) -> Self {
        Self {
            id: ClientId::generate(),
            conn,
            outbound,
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            reaped: Notify::new(),
            room: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// A sender for this client's outbound queue.
    pub fn outbound(&self) -> FrameSender {
        self.outbound.clone()
    }

    /// Queues a frame for this client (fire-and-forget).
    pub fn send(&self, frame: ServerFrame) {
        if self.outbound.send(frame).is_err() {
            tracing::debug!(client_id = %self.id, "outbound queue closed, dropping frame");
        }
    }

    /// Records proof of life: a data frame or a pong.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clears the liveness flag and returns its previous value.
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Sends a transport-level liveness probe.
    pub async fn probe(&self) -> Result<(), C::Error> {
        self.conn.ping().await
    }

    /// Tells this client's connection task to shut down.
    pub fn reap(&self) {
        self.reaped.notify_one();
    }

    /// Resolves once [`reap`](Self::reap) has been called.
    pub async fn reaped(&self) {
        self.reaped.notified().await;
    }

    /// The room this client is currently in.
    pub fn current_room(&self) -> Option<RoomHandle> {
        self.room_slot().clone()
    }

    pub fn set_room(&self, room: Option<RoomHandle>) {
        *self.room_slot() = room;
    }

    /// Leaves the current room (its members receive `clientLeft`) and
    /// closes the transport. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let room = self.room_slot().take();
        if let Some(room) = room {
            if let Err(e) = room.leave(&self.id).await {
                tracing::warn!(client_id = %self.id, room = room.name(), error = %e, "leave on close failed");
            }
        }
        if let Err(e) = self.conn.close().await {
            tracing::debug!(client_id = %self.id, error = %e, "transport close failed");
        }
        tracing::info!(client_id = %self.id, conn_id = %self.conn.id(), "client closed");
    }

    fn room_slot(&self) -> MutexGuard<'_, Option<RoomHandle>> {
        // The slot holds no invariants a panic could break.
        self.room.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Every open connection, keyed by client id.
pub struct ClientSet<C: Connection> {
    clients: Mutex<HashMap<ClientId, Arc<Client<C>>>>,
}

impl<C: Connection> ClientSet<C> {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, client: Arc<Client<C>>) {
        self.lock().insert(client.id().clone(), client);
    }

    pub fn remove(&self, id: &ClientId) -> Option<Arc<Client<C>>> {
        self.lock().remove(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clones out the current clients so callers can await without
    /// holding the lock.
    pub fn snapshot(&self) -> Vec<Arc<Client<C>>> {
        self.lock().values().cloned().collect()
    }

    /// Queues `frame` for every open connection.
    pub fn broadcast(&self, frame: &ServerFrame) {
        for client in self.lock().values() {
            client.send(frame.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, Arc<Client<C>>>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C: Connection> Default for ClientSet<C> {
    fn default() -> Self {
        Self::new()
    }
}
