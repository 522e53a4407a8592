//! Registry actor: the room table, the connection table, and the lobby.
//!
//! One registry runs per server. It is the only task that creates rooms,
//! links connections to them, and decides which rooms the lobby lists.

use std::collections::HashMap;

use gomoku_game::Point;
use gomoku_protocol::{ClientMessage, RoomId, RoomSummary, ServerMessage};
use gomoku_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::room::{MAX_PLAYERS, spawn_room};
use crate::{Outbox, RoomConfig, RoomError, RoomHandle, RoomState};

/// Longest accepted room name, in characters.
pub const MAX_ROOM_NAME_LEN: usize = 64;

/// Everything the registry reacts to: connection events from the pumps and
/// status notices from rooms.
pub(crate) enum RegistryCommand {
    Connect {
        outbox: Outbox,
    },
    Dispatch {
        conn: ConnectionId,
        msg: ClientMessage,
    },
    Disconnect {
        conn: ConnectionId,
    },
    Lobby {
        reply: oneshot::Sender<Vec<RoomSummary>>,
    },
    RoomStatus {
        room_id: RoomId,
        player_count: usize,
        state: RoomState,
    },
    RoomClosed {
        room_id: RoomId,
        members: Vec<ConnectionId>,
    },
}

/// Handle to the registry actor. Cheap to clone.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::UnboundedSender<RegistryCommand>,
}

impl RegistryHandle {
    /// Registers a new connection. It is sent the lobby straight away.
    pub fn connect(&self, outbox: Outbox) -> Result<(), RoomError> {
        self.send(RegistryCommand::Connect { outbox })
    }

    /// Routes a decoded client message.
    pub fn dispatch(&self, conn: ConnectionId, msg: ClientMessage) -> Result<(), RoomError> {
        self.send(RegistryCommand::Dispatch { conn, msg })
    }

    pub fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.send(RegistryCommand::Disconnect { conn })
    }

    /// The rooms the lobby currently lists.
    pub async fn lobby(&self) -> Result<Vec<RoomSummary>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RegistryCommand::Lobby { reply: reply_tx })?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    fn send(&self, cmd: RegistryCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).map_err(|_| RoomError::Unavailable)
    }
}

struct RoomEntry {
    handle: RoomHandle,
    player_count: usize,
    state: RoomState,
}

impl RoomEntry {
    /// Listed rooms have a free seat and a game still to play.
    fn is_listed(&self) -> bool {
        self.player_count < MAX_PLAYERS && self.state.is_joinable() && !self.handle.is_closing()
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.handle.room_id().clone(),
            name: self.handle.name().to_owned(),
            player_count: self.player_count,
        }
    }
}

struct Client {
    outbox: Outbox,
    /// Non-owning link; cleared when the room closes.
    room: Option<RoomId>,
}

/// The registry actor state.
pub struct Registry {
    config: RoomConfig,
    rooms: HashMap<RoomId, RoomEntry>,
    clients: HashMap<ConnectionId, Client>,
    receiver: mpsc::UnboundedReceiver<RegistryCommand>,
    /// Given to every room so it can report back.
    sender: mpsc::UnboundedSender<RegistryCommand>,
}

impl Registry {
    /// Spawns the registry task and returns a handle to it.
    ///
    /// The task lives as long as the runtime.
    pub fn spawn(config: RoomConfig) -> RegistryHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Registry {
            config,
            rooms: HashMap::new(),
            clients: HashMap::new(),
            receiver: rx,
            sender: tx.clone(),
        };
        tokio::spawn(registry.run());
        RegistryHandle { sender: tx }
    }

    async fn run(mut self) {
        tracing::info!("registry started");
        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd).await;
        }
    }

    async fn handle(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Connect { outbox } => self.handle_connect(outbox),
            RegistryCommand::Dispatch { conn, msg } => self.handle_dispatch(conn, msg).await,
            RegistryCommand::Disconnect { conn } => self.handle_disconnect(conn).await,
            RegistryCommand::Lobby { reply } => {
                let _ = reply.send(self.lobby());
            }
            RegistryCommand::RoomStatus {
                room_id,
                player_count,
                state,
            } => {
                if let Some(entry) = self.rooms.get_mut(&room_id) {
                    entry.player_count = player_count;
                    entry.state = state;
                    self.broadcast_lobby();
                }
            }
            RegistryCommand::RoomClosed { room_id, members } => {
                self.handle_room_closed(room_id, members)
            }
        }
    }

    fn handle_connect(&mut self, outbox: Outbox) {
        let conn = outbox.id();
        tracing::debug!(%conn, clients = self.clients.len() + 1, "client connected");
        let lobby = ServerMessage::RoomListUpdate {
            rooms: self.lobby(),
        };
        if let Err(e) = outbox.push(lobby) {
            tracing::warn!(%conn, error = %e, "could not deliver lobby");
        }
        self.clients.insert(conn, Client { outbox, room: None });
    }

    async fn handle_dispatch(&mut self, conn: ConnectionId, msg: ClientMessage) {
        if !self.clients.contains_key(&conn) {
            tracing::debug!(%conn, "message from unknown connection, ignoring");
            return;
        }
        let result = match msg {
            ClientMessage::CreateRoom { name } => self.create_room(conn, &name).await,
            ClientMessage::JoinRoom { id } => self.join_room(conn, id).await,
            ClientMessage::MakeMove { x, y } => self.make_move(conn, Point::new(x, y)).await,
        };
        if let Err(e) = result {
            tracing::debug!(%conn, error = %e, "request rejected");
            self.send_error(conn, &e);
        }
    }

    async fn create_room(&mut self, conn: ConnectionId, name: &str) -> Result<(), RoomError> {
        let outbox = self.unlinked_outbox(conn)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidName("Room name cannot be empty.".into()));
        }
        if name.chars().count() > MAX_ROOM_NAME_LEN {
            return Err(RoomError::InvalidName(format!(
                "Room name cannot be longer than {MAX_ROOM_NAME_LEN} characters."
            )));
        }
        let lowered = name.to_lowercase();
        if self
            .rooms
            .values()
            .any(|e| e.is_listed() && e.handle.name().to_lowercase() == lowered)
        {
            return Err(RoomError::NameTaken(name.to_owned()));
        }

        let mut room_id = RoomId::generate();
        while self.rooms.contains_key(&room_id) {
            room_id = RoomId::generate();
        }
        let handle = spawn_room(
            room_id.clone(),
            name,
            self.config.clone(),
            self.sender.clone(),
        );
        self.rooms.insert(
            room_id.clone(),
            RoomEntry {
                handle: handle.clone(),
                player_count: 0,
                state: RoomState::WaitingForPlayers,
            },
        );
        tracing::info!(%room_id, name, creator = %conn, "room created");

        match handle.join(outbox).await {
            Ok(slot) => {
                self.link(conn, room_id);
                tracing::debug!(%conn, player = %slot, "creator seated");
                Ok(())
            }
            Err(e) => {
                let _ = handle.shutdown().await;
                Err(e)
            }
        }
    }

    async fn join_room(&mut self, conn: ConnectionId, room_id: RoomId) -> Result<(), RoomError> {
        let outbox = self.unlinked_outbox(conn)?;
        let entry = self.rooms.get(&room_id).ok_or(RoomError::NotFound)?;
        if entry.handle.is_closing() {
            return Err(RoomError::Closed);
        }
        let handle = entry.handle.clone();

        let slot = handle.join(outbox).await?;
        self.link(conn, room_id);
        tracing::debug!(%conn, player = %slot, "joined room");
        Ok(())
    }

    async fn make_move(&mut self, conn: ConnectionId, point: Point) -> Result<(), RoomError> {
        let room_id = self
            .clients
            .get(&conn)
            .and_then(|c| c.room.as_ref())
            .ok_or(RoomError::NotInRoom)?;
        let entry = self.rooms.get(room_id).ok_or(RoomError::Closed)?;
        if entry.handle.is_closing() {
            return Err(RoomError::Closed);
        }
        entry.handle.make_move(conn, point).await
    }

    async fn handle_disconnect(&mut self, conn: ConnectionId) {
        let Some(client) = self.clients.remove(&conn) else {
            return;
        };
        client.outbox.close();
        tracing::debug!(%conn, clients = self.clients.len(), "client disconnected");

        let Some(room_id) = client.room else {
            return;
        };
        if let Some(entry) = self.rooms.get(&room_id) {
            if !entry.handle.is_closing() {
                let _ = entry.handle.unregister(conn).await;
            }
        }
    }

    fn handle_room_closed(&mut self, room_id: RoomId, members: Vec<ConnectionId>) {
        self.rooms.remove(&room_id);
        for conn in &members {
            if let Some(client) = self.clients.get_mut(conn) {
                if client.room.as_ref() == Some(&room_id) {
                    client.room = None;
                }
            }
        }
        tracing::info!(
            %room_id,
            released = members.len(),
            rooms = self.rooms.len(),
            "room removed"
        );
        self.broadcast_lobby();
    }

    /// The caller's outbox, provided it is not in a room yet.
    fn unlinked_outbox(&self, conn: ConnectionId) -> Result<Outbox, RoomError> {
        match self.clients.get(&conn) {
            Some(client) if client.room.is_some() => Err(RoomError::AlreadyInRoom),
            Some(client) => Ok(client.outbox.clone()),
            None => Err(RoomError::Unavailable),
        }
    }

    fn link(&mut self, conn: ConnectionId, room_id: RoomId) {
        if let Some(client) = self.clients.get_mut(&conn) {
            client.room = Some(room_id);
        }
    }

    /// Joinable rooms, sorted by name.
    fn lobby(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .values()
            .filter(|e| e.is_listed())
            .map(RoomEntry::summary)
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        rooms
    }

    /// Pushes the lobby to every connection that is not in a room.
    fn broadcast_lobby(&self) {
        let rooms = self.lobby();
        for (conn, client) in &self.clients {
            if client.room.is_some() {
                continue;
            }
            let update = ServerMessage::RoomListUpdate {
                rooms: rooms.clone(),
            };
            if let Err(e) = client.outbox.push(update) {
                tracing::warn!(%conn, error = %e, "dropping slow lobby client");
            }
        }
    }

    fn send_error(&self, conn: ConnectionId, err: &RoomError) {
        if let Some(client) = self.clients.get(&conn) {
            let _ = client.outbox.push(ServerMessage::error(err));
        }
    }
}
