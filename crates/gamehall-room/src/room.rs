//! Room actor: an isolated Tokio task that owns one room.
//!
//! The actor holds the member list, the room's game session (if any), and
//! the session's expiry timer. The outside world talks to it only through
//! a [`RoomHandle`]; each command runs to completion before the next is
//! received, so membership changes and game transitions are never
//! interleaved.
//!
//! Outbound frames go straight onto each member's [`FrameSender`]. Sends
//! never wait: state is committed before fan-out, and a member whose
//! connection is gone is simply skipped.

use std::sync::Arc;

use gamehall_protocol::{
    ClientId, GameEndReason, MemberSummary, RoomMessage, RoomSummary, ServerFrame,
};
use gamehall_session::{ActionOutcome, Session, SessionManager};
use gamehall_timer::ExpiryTimer;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomError};

/// Channel for delivering outbound frames to one connection.
pub type FrameSender = mpsc::UnboundedSender<ServerFrame>;

/// One connection's seat in a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ClientId,
    /// Display label shown to other members.
    pub name: String,
    pub sender: FrameSender,
}

impl Member {
    pub fn new(id: ClientId, name: impl Into<String>, sender: FrameSender) -> Self {
        Self {
            id,
            name: name.into(),
            sender,
        }
    }

    pub fn summary(&self) -> MemberSummary {
        MemberSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// A read-only view of a room's game session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub game_type: String,
    pub state: Value,
    /// `false` once the session was stopped; its state is then only
    /// retained until the expiry deadline.
    pub active: bool,
}

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        member: Member,
        reply: Reply<Vec<MemberSummary>>,
    },
    Leave {
        client_id: ClientId,
        reply: Reply<bool>,
    },
    Relay {
        from: ClientId,
        message: RoomMessage,
    },
    StartSession {
        actor: ClientId,
        game_type: String,
        reply: Reply<Result<(), RoomError>>,
    },
    ApplyAction {
        actor: ClientId,
        game_type: String,
        action: Value,
        reply: Reply<Result<(), RoomError>>,
    },
    StopSession {
        actor: ClientId,
        game_type: String,
        reply: Reply<Result<(), RoomError>>,
    },
    ClearSession {
        reply: Reply<()>,
    },
    Summary {
        reply: Reply<RoomSummary>,
    },
    Snapshot {
        reply: Reply<Option<SessionSnapshot>>,
    },
    /// Sent by the room's own expiry timer.
    Expire {
        generation: u64,
    },
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone; the registry holds one per room and connections keep a
/// clone as their current-room back-reference.
#[derive(Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds `member` to the room and returns the full membership.
    ///
    /// The joiner receives `joinedRoom` (and the current game state, if
    /// there is one); everyone else receives `newClient`. Joining a room
    /// you're already in only repeats the joiner's frames.
    pub async fn join(&self, member: Member) -> Result<Vec<MemberSummary>, RoomError> {
        self.request(|reply| RoomCommand::Join { member, reply }).await
    }

    /// Removes a member. Returns `false` if they weren't in the room.
    ///
    /// Remaining members receive `clientLeft`. The game session, if any,
    /// is left alone.
    pub async fn leave(&self, client_id: &ClientId) -> Result<bool, RoomError> {
        let client_id = client_id.clone();
        self.request(|reply| RoomCommand::Leave { client_id, reply })
            .await
    }

    /// Relays a message to every member except the sender (fire-and-forget).
    pub async fn relay(&self, from: &ClientId, message: RoomMessage) -> Result<(), RoomError> {
        self.send(RoomCommand::Relay {
            from: from.clone(),
            message,
        })
        .await
    }

    /// Starts a `game_type` session for the current members.
    ///
    /// # Errors
    /// - [`RoomError::SessionConflict`] if a session is already active
    /// - [`RoomError::Session`] for unknown game types or a player count
    ///   the engine doesn't support
    pub async fn start_session(&self, actor: &ClientId, game_type: &str) -> Result<(), RoomError> {
        let (actor, game_type) = (actor.clone(), game_type.to_string());
        self.request(|reply| RoomCommand::StartSession {
            actor,
            game_type,
            reply,
        })
        .await?
    }

    /// Forwards an engine action to the active session.
    ///
    /// Accepted and rejected actions are both broadcast to every member as
    /// `gameStateUpdate`, so both return `Ok`.
    pub async fn apply_action(
        &self,
        actor: &ClientId,
        game_type: &str,
        action: Value,
    ) -> Result<(), RoomError> {
        let (actor, game_type) = (actor.clone(), game_type.to_string());
        self.request(|reply| RoomCommand::ApplyAction {
            actor,
            game_type,
            action,
            reply,
        })
        .await?
    }

    /// Stops the active session. Its last state stays visible until the
    /// expiry deadline clears it.
    pub async fn stop_session(&self, actor: &ClientId, game_type: &str) -> Result<(), RoomError> {
        let (actor, game_type) = (actor.clone(), game_type.to_string());
        self.request(|reply| RoomCommand::StopSession {
            actor,
            game_type,
            reply,
        })
        .await?
    }

    /// Drops any session and cancels its expiry. A no-op on an idle room.
    pub async fn clear_session(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ClearSession { reply })
            .await
    }

    /// The room's name and members, in join order.
    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        self.request(|reply| RoomCommand::Summary { reply }).await
    }

    /// The room's game session, active or stopped, if it holds one.
    pub async fn session_snapshot(&self) -> Result<Option<SessionSnapshot>, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.name.to_string()))
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.name.to_string()))
    }
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle").field("name", &self.name).finish()
    }
}

/// A session plus whether it was stopped.
struct GameSlot {
    session: Session,
    stopped: bool,
}

/// The internal room actor state. Runs inside a Tokio task.
struct Room {
    name: String,
    config: RoomConfig,
    sessions: Arc<SessionManager>,
    /// Join order; the engine sees players in this order.
    members: Vec<Member>,
    slot: Option<GameSlot>,
    expiry: ExpiryTimer,
    /// Lets the expiry timer reach this actor without keeping it alive.
    commands: mpsc::WeakSender<RoomCommand>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl Room {
    /// Runs the actor loop until every handle is dropped.
    async fn run(mut self) {
        tracing::debug!(room = %self.name, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd);
        }

        tracing::debug!(room = %self.name, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { member, reply } => {
                let _ = reply.send(self.add_member(member));
            }
            RoomCommand::Leave { client_id, reply } => {
                let _ = reply.send(self.remove_member(&client_id));
            }
            RoomCommand::Relay { from, message } => self.relay(&from, message),
            RoomCommand::StartSession {
                actor,
                game_type,
                reply,
            } => {
                let _ = reply.send(self.start_session(&actor, &game_type));
            }
            RoomCommand::ApplyAction {
                actor,
                game_type,
                action,
                reply,
            } => {
                let _ = reply.send(self.apply_action(&actor, &game_type, action));
            }
            RoomCommand::StopSession {
                actor,
                game_type,
                reply,
            } => {
                let _ = reply.send(self.stop_session(&actor, &game_type));
            }
            RoomCommand::ClearSession { reply } => {
                self.clear_session();
                let _ = reply.send(());
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(RoomSummary {
                    name: self.name.clone(),
                    clients: self.member_summaries(),
                });
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Expire { generation } => self.expire(generation),
        }
    }

    // -- membership ------------------------------------------------------

    fn add_member(&mut self, member: Member) -> Vec<MemberSummary> {
        let joiner = member.id.clone();
        let sender = member.sender.clone();
        let is_new = !self.is_member(&joiner);
        if is_new {
            self.members.push(member);
        }

        let clients = self.member_summaries();
        let _ = sender.send(ServerFrame::JoinedRoom {
            room: self.name.clone(),
            clients: clients.clone(),
        });

        if is_new {
            tracing::info!(
                room = %self.name,
                client_id = %joiner,
                members = self.members.len(),
                "client joined"
            );
            self.broadcast_except(
                &joiner,
                &ServerFrame::NewClient {
                    client_id: joiner.clone(),
                },
            );
            self.extend_on_membership();
        }

        // Late joiners catch up on the game in progress.
        if let Some(frame) = self.state_frame(None) {
            let _ = sender.send(frame);
        }
        clients
    }

    fn remove_member(&mut self, client_id: &ClientId) -> bool {
        let Some(pos) = self.members.iter().position(|m| m.id == *client_id) else {
            return false;
        };
        self.members.remove(pos);
        tracing::info!(
            room = %self.name,
            %client_id,
            members = self.members.len(),
            "client left"
        );

        self.broadcast(&ServerFrame::ClientLeft {
            client_id: client_id.clone(),
        });
        self.extend_on_membership();
        true
    }

    fn relay(&self, from: &ClientId, message: RoomMessage) {
        if !self.is_member(from) {
            tracing::warn!(room = %self.name, %from, "message from non-member, ignoring");
            return;
        }
        tracing::debug!(room = %self.name, %from, event = %message.event, "relaying message");
        self.broadcast_except(
            from,
            &ServerFrame::Message {
                client_id: from.clone(),
                message,
            },
        );
    }

    fn is_member(&self, client_id: &ClientId) -> bool {
        self.members.iter().any(|m| m.id == *client_id)
    }

    fn require_member(&self, client_id: &ClientId) -> Result<(), RoomError> {
        if self.is_member(client_id) {
            Ok(())
        } else {
            Err(RoomError::NotMember(client_id.clone()))
        }
    }

    fn member_summaries(&self) -> Vec<MemberSummary> {
        self.members.iter().map(Member::summary).collect()
    }

    // -- game session ----------------------------------------------------

    fn start_session(&mut self, actor: &ClientId, game_type: &str) -> Result<(), RoomError> {
        self.require_member(actor)?;
        if let Some(active) = self.active_slot() {
            return Err(RoomError::SessionConflict(
                active.session.game_type().to_string(),
            ));
        }

        let players: Vec<ClientId> = self.members.iter().map(|m| m.id.clone()).collect();
        let session = self.sessions.start(game_type, &players)?;

        // Supersedes a stopped session still waiting out its expiry.
        self.clear_session();
        self.slot = Some(GameSlot {
            session,
            stopped: false,
        });
        self.set_expiry();

        tracing::info!(room = %self.name, game_type, %actor, "game session started");
        self.broadcast_state(None);
        Ok(())
    }

    fn apply_action(
        &mut self,
        actor: &ClientId,
        game_type: &str,
        action: Value,
    ) -> Result<(), RoomError> {
        self.require_member(actor)?;
        let slot = self.active_slot_for(game_type)?;

        match slot.session.act(actor, action)? {
            ActionOutcome::Applied => {
                if slot.session.is_terminal() {
                    let winner = slot.session.winner();
                    tracing::info!(
                        room = %self.name,
                        game_type,
                        winner = winner.as_ref().map(ClientId::as_str),
                        "game reached a terminal state"
                    );
                }
                self.set_expiry();
                self.broadcast_state(None);
            }
            ActionOutcome::Rejected(reason) => self.broadcast_state(Some(reason)),
        }
        Ok(())
    }

    fn stop_session(&mut self, actor: &ClientId, game_type: &str) -> Result<(), RoomError> {
        self.require_member(actor)?;
        let slot = self.active_slot_for(game_type)?;
        slot.stopped = true;

        tracing::info!(room = %self.name, game_type, %actor, "game session stopped");
        self.broadcast(&ServerFrame::GameEnded {
            game_type: game_type.to_string(),
            reason: GameEndReason::Stopped,
        });
        Ok(())
    }

    fn clear_session(&mut self) {
        self.expiry.cancel();
        if let Some(slot) = self.slot.take() {
            tracing::debug!(
                room = %self.name,
                game_type = slot.session.game_type(),
                "game session cleared"
            );
        }
    }

    /// Arms the expiry for the current session, replacing any pending one.
    fn set_expiry(&mut self) {
        let commands = self.commands.clone();
        let generation = self.expiry.arm(self.config.session_ttl, move |generation| async move {
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(RoomCommand::Expire { generation }).await;
            }
        });
        tracing::debug!(room = %self.name, generation, "session expiry armed");
    }

    fn extend_on_membership(&mut self) {
        if self.config.expiry_policy.extends_on_membership() && self.active_slot().is_some() {
            self.set_expiry();
        }
    }

    fn expire(&mut self, generation: u64) {
        if !self.expiry.complete(generation) {
            tracing::debug!(room = %self.name, generation, "stale expiry ignored");
            return;
        }
        if let Some(slot) = self.slot.take() {
            let game_type = slot.session.game_type().to_string();
            tracing::info!(room = %self.name, %game_type, "game session expired");
            self.broadcast(&ServerFrame::GameEnded {
                game_type,
                reason: GameEndReason::Expired,
            });
        }
    }

    fn active_slot(&self) -> Option<&GameSlot> {
        self.slot.as_ref().filter(|slot| !slot.stopped)
    }

    fn active_slot_for(&mut self, game_type: &str) -> Result<&mut GameSlot, RoomError> {
        let slot = self
            .slot
            .as_mut()
            .filter(|slot| !slot.stopped)
            .ok_or(RoomError::NoActiveSession)?;
        if slot.session.game_type() != game_type {
            return Err(RoomError::GameTypeMismatch {
                active: slot.session.game_type().to_string(),
                requested: game_type.to_string(),
            });
        }
        Ok(slot)
    }

    fn snapshot(&self) -> Option<SessionSnapshot> {
        let slot = self.slot.as_ref()?;
        let state = self.encode_state(&slot.session)?;
        Some(SessionSnapshot {
            game_type: slot.session.game_type().to_string(),
            state,
            active: !slot.stopped,
        })
    }

    // -- fan-out ---------------------------------------------------------

    /// The current game state as a `gameStateUpdate`, if there is one.
    fn state_frame(&self, validation_error: Option<String>) -> Option<ServerFrame> {
        let session = &self.slot.as_ref()?.session;
        Some(ServerFrame::GameStateUpdate {
            game_type: session.game_type().to_string(),
            state: self.encode_state(session)?,
            validation_error,
        })
    }

    fn encode_state(&self, session: &Session) -> Option<Value> {
        session
            .state_json()
            .inspect_err(|e| tracing::warn!(room = %self.name, error = %e, "game state not encodable"))
            .ok()
    }

    fn broadcast_state(&self, validation_error: Option<String>) {
        if let Some(frame) = self.state_frame(validation_error) {
            self.broadcast(&frame);
        }
    }

    fn broadcast(&self, frame: &ServerFrame) {
        for member in &self.members {
            let _ = member.sender.send(frame.clone());
        }
    }

    fn broadcast_except(&self, excluded: &ClientId, frame: &ServerFrame) {
        for member in self.members.iter().filter(|m| m.id != *excluded) {
            let _ = member.sender.send(frame.clone());
        }
    }
}

/// Spawns a room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(
    name: String,
    config: RoomConfig,
    sessions: Arc<SessionManager>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let room = Room {
        name: name.clone(),
        config,
        sessions,
        members: Vec::new(),
        slot: None,
        expiry: ExpiryTimer::new(),
        commands: tx.downgrade(),
        receiver: rx,
    };

    tokio::spawn(room.run());

    RoomHandle {
        name: name.into(),
        sender: tx,
    }
}
