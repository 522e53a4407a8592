//! Room actor: an isolated Tokio task that owns one game.
//!
//! Each room runs in its own task and is reached only through its command
//! queue, so the members, the game and the lifecycle state are touched by
//! exactly one task. Status changes flow back to the registry over its
//! unbounded queue so a room never waits on the registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gomoku_game::{Game, MoveOutcome, Point};
use gomoku_protocol::{PlayerSlot, RoomId, ServerMessage};
use gomoku_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::registry::RegistryCommand;
use crate::{Outbox, RoomConfig, RoomError, RoomState};

/// Seats per room.
pub const MAX_PLAYERS: usize = 2;

/// Commands sent to a room actor through its channel.
///
/// `Join` carries a reply channel; the rest are fire-and-forget.
pub(crate) enum RoomCommand {
    /// Seat a connection.
    Join {
        outbox: Outbox,
        reply: oneshot::Sender<Result<PlayerSlot, RoomError>>,
    },

    /// Place a stone for the member on `conn`.
    Move { conn: ConnectionId, point: Point },

    /// The connection went away.
    Unregister { conn: ConnectionId },

    /// Close right now, whatever the state.
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. Once the room has closed every call fails with
/// [`RoomError::Closed`].
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    name: Arc<str>,
    sender: mpsc::Sender<RoomCommand>,
    closing: Arc<AtomicBool>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the room has started tearing down.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Asks the room for a seat and waits for the answer.
    pub async fn join(&self, outbox: Outbox) -> Result<PlayerSlot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                outbox,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Closed)?;
        reply_rx.await.map_err(|_| RoomError::Closed)?
    }

    /// Forwards a move. Rule violations are reported to the mover by the
    /// room itself.
    pub async fn make_move(&self, conn: ConnectionId, point: Point) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Move { conn, point })
            .await
            .map_err(|_| RoomError::Closed)
    }

    pub async fn unregister(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Unregister { conn })
            .await
            .map_err(|_| RoomError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Closed)
    }
}

struct Member {
    slot: PlayerSlot,
    outbox: Outbox,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    name: Arc<str>,
    config: RoomConfig,
    state: RoomState,
    /// Ordered so broadcasts go out in a stable order.
    members: BTreeMap<ConnectionId, Member>,
    game: Game,
    closing: Arc<AtomicBool>,
    /// Set once the game is over. Never pushed back.
    close_at: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
    registry: mpsc::UnboundedSender<RegistryCommand>,
}

impl RoomActor {
    /// Runs the actor loop until the room closes.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, name = %self.name, "room actor started");

        while self.state != RoomState::Closed {
            let deadline = self.close_at;
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => self.close("all handles dropped"),
                },
                () = grace_elapsed(deadline) => self.close("grace period elapsed"),
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { outbox, reply } => {
                let result = self.handle_join(outbox);
                let _ = reply.send(result);
            }
            RoomCommand::Move { conn, point } => self.handle_move(conn, point),
            RoomCommand::Unregister { conn } => self.handle_unregister(conn),
            RoomCommand::Shutdown => self.close("shutdown requested"),
        }
    }

    fn handle_join(&mut self, outbox: Outbox) -> Result<PlayerSlot, RoomError> {
        if self.state.is_terminal() || self.game.is_over() {
            return Err(RoomError::Closed);
        }
        let conn = outbox.id();
        if self.members.contains_key(&conn) {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.members.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }

        let slot = if self.members.values().any(|m| m.slot == PlayerSlot::One) {
            PlayerSlot::Two
        } else {
            PlayerSlot::One
        };
        self.members.insert(conn, Member { slot, outbox });
        self.game.add_player(slot);
        tracing::info!(
            room_id = %self.room_id,
            %conn,
            player = %slot,
            players = self.members.len(),
            "player joined"
        );

        if self.members.len() == MAX_PLAYERS {
            self.transition(RoomState::InProgress);
        }
        self.notify_status();
        self.broadcast_state();
        Ok(slot)
    }

    fn handle_move(&mut self, conn: ConnectionId, point: Point) {
        let Some(slot) = self.members.get(&conn).map(|m| m.slot) else {
            tracing::warn!(room_id = %self.room_id, %conn, "move from non-member, ignoring");
            return;
        };

        match self.game.apply_move(slot, point) {
            Err(e) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    player = %slot,
                    x = point.x,
                    y = point.y,
                    reason = %e,
                    "move rejected"
                );
                self.send_to(conn, ServerMessage::error(RoomError::from(e)));
            }
            Ok(outcome) => {
                tracing::debug!(room_id = %self.room_id, player = %slot, x = point.x, y = point.y, "move applied");
                self.broadcast_state();
                if let MoveOutcome::Won(winner) = outcome {
                    tracing::info!(room_id = %self.room_id, winner = %winner, "game won");
                    self.finish();
                }
            }
        }
    }

    fn handle_unregister(&mut self, conn: ConnectionId) {
        if self.state == RoomState::Closed {
            return;
        }
        let Some(member) = self.members.remove(&conn) else {
            return;
        };
        member.outbox.close();
        self.game.remove_player(member.slot);
        tracing::info!(
            room_id = %self.room_id,
            %conn,
            player = %member.slot,
            players = self.members.len(),
            "player left"
        );

        if self.members.is_empty() {
            self.close("room is empty");
            return;
        }

        if self.state == RoomState::InProgress && !self.game.is_over() {
            self.game.forfeit(member.slot);
            tracing::info!(
                room_id = %self.room_id,
                winner = %member.slot.opponent(),
                "game forfeited"
            );
            self.broadcast_state();
            // Reports the new status itself.
            self.finish();
            return;
        }
        self.notify_status();
    }

    /// Moves to `Finished` and arms the close timer.
    fn finish(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(RoomState::Finished);
        self.close_at = Some(Instant::now() + self.config.close_grace);
        tracing::info!(
            room_id = %self.room_id,
            grace = ?self.config.close_grace,
            "game finished, closing after grace period"
        );
        self.notify_status();
    }

    /// Releases every member and tells the registry the room is gone.
    ///
    /// Runs at most once however many triggers race for it.
    fn close(&mut self, reason: &'static str) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transition(RoomState::Closed);
        self.close_at = None;
        let members: Vec<ConnectionId> = std::mem::take(&mut self.members).into_keys().collect();
        tracing::info!(room_id = %self.room_id, reason, released = members.len(), "room closed");
        let _ = self.registry.send(RegistryCommand::RoomClosed {
            room_id: self.room_id.clone(),
            members,
        });
    }

    fn transition(&mut self, target: RoomState) {
        if self.state.can_transition_to(target) {
            tracing::debug!(room_id = %self.room_id, from = %self.state, to = %target, "room state change");
            self.state = target;
        }
    }

    fn notify_status(&self) {
        let _ = self.registry.send(RegistryCommand::RoomStatus {
            room_id: self.room_id.clone(),
            player_count: self.members.len(),
            state: self.state,
        });
    }

    /// Sends every member its own snapshot. Members whose queue is full or
    /// gone are unregistered.
    fn broadcast_state(&mut self) {
        let stalled: Vec<ConnectionId> = self
            .members
            .iter()
            .filter_map(|(conn, member)| {
                let snapshot = self.game.snapshot(&self.name, member.slot);
                match member.outbox.push(ServerMessage::GameStateUpdate(snapshot)) {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::warn!(room_id = %self.room_id, %conn, error = %e, "dropping slow member");
                        Some(*conn)
                    }
                }
            })
            .collect();
        for conn in stalled {
            self.handle_unregister(conn);
        }
    }

    fn send_to(&mut self, conn: ConnectionId, msg: ServerMessage) {
        let Some(member) = self.members.get(&conn) else {
            return;
        };
        if let Err(e) = member.outbox.push(msg) {
            tracing::warn!(room_id = %self.room_id, %conn, error = %e, "dropping slow member");
            self.handle_unregister(conn);
        }
    }
}

/// Completes at `deadline`, or never if there is none.
async fn grace_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(
    room_id: RoomId,
    name: &str,
    config: RoomConfig,
    registry: mpsc::UnboundedSender<RegistryCommand>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let name: Arc<str> = Arc::from(name);
    let closing = Arc::new(AtomicBool::new(false));

    let actor = RoomActor {
        room_id: room_id.clone(),
        name: Arc::clone(&name),
        config,
        state: RoomState::WaitingForPlayers,
        members: BTreeMap::new(),
        game: Game::new(),
        closing: Arc::clone(&closing),
        close_at: None,
        receiver: rx,
        registry,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        name,
        sender: tx,
        closing,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::outbox;
    use crate::OutboxReceiver;

    struct Harness {
        handle: RoomHandle,
        registry: mpsc::UnboundedReceiver<RegistryCommand>,
    }

    fn spawn(grace: Duration) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = RoomConfig::default().with_close_grace(grace);
        let handle = spawn_room(RoomId::from("r1"), "alpha", config, tx);
        Harness {
            handle,
            registry: rx,
        }
    }

    fn player(id: u64) -> (ConnectionId, Outbox, OutboxReceiver) {
        let conn = ConnectionId::new(id);
        let (tx, rx) = outbox(conn, 16);
        (conn, tx, rx)
    }

    /// Latest snapshot queued for a player, skipping older ones.
    async fn last_snapshot(rx: &mut OutboxReceiver) -> gomoku_protocol::GameSnapshot {
        let mut last = None;
        while let Ok(Some(msg)) =
            tokio::time::timeout(Duration::from_millis(10), rx.recv()).await
        {
            if let ServerMessage::GameStateUpdate(s) = msg {
                last = Some(s);
            }
        }
        last.expect("expected at least one snapshot")
    }

    async fn closed_members(registry: &mut mpsc::UnboundedReceiver<RegistryCommand>) -> Vec<ConnectionId> {
        while let Some(cmd) = registry.recv().await {
            if let RegistryCommand::RoomClosed { members, .. } = cmd {
                return members;
            }
        }
        panic!("registry channel closed without RoomClosed");
    }

    #[tokio::test]
    async fn test_join_assigns_lowest_free_slot() {
        let h = spawn(Duration::from_secs(1));
        let (_, a, _ra) = player(1);
        let (_, b, _rb) = player(2);
        let (_, c, _rc) = player(3);

        assert_eq!(h.handle.join(a).await, Ok(PlayerSlot::One));
        assert_eq!(h.handle.join(b).await, Ok(PlayerSlot::Two));
        assert_eq!(h.handle.join(c).await, Err(RoomError::RoomFull));
    }

    #[tokio::test]
    async fn test_concurrent_joins_fill_both_seats_once() {
        let h = spawn(Duration::from_secs(1));
        let (_, a, _ra) = player(1);
        let (_, b, _rb) = player(2);
        let (_, c, _rc) = player(3);

        let (ra, rb, rc) = tokio::join!(
            h.handle.join(a),
            h.handle.join(b),
            h.handle.join(c)
        );

        let results = [ra, rb, rc];
        let mut seats: Vec<_> = results.iter().filter_map(|r| r.clone().ok()).collect();
        seats.sort();
        assert_eq!(seats, vec![PlayerSlot::One, PlayerSlot::Two]);
        let refused: Vec<_> = results.iter().filter_map(|r| r.clone().err()).collect();
        assert_eq!(refused, vec![RoomError::RoomFull]);
    }

    #[tokio::test]
    async fn test_same_connection_cannot_join_twice() {
        let h = spawn(Duration::from_secs(1));
        let (_, a, _ra) = player(1);

        h.handle.join(a.clone()).await.unwrap();

        assert_eq!(h.handle.join(a).await, Err(RoomError::AlreadyInRoom));
    }

    #[tokio::test]
    async fn test_rejected_move_goes_to_mover_only() {
        let h = spawn(Duration::from_secs(1));
        let (c1, a, mut ra) = player(1);
        let (_, b, mut rb) = player(2);
        h.handle.join(a).await.unwrap();
        h.handle.join(b).await.unwrap();
        last_snapshot(&mut ra).await;
        last_snapshot(&mut rb).await;

        h.handle.make_move(c1, Point::new(0, 0)).await.unwrap();
        h.handle.make_move(c1, Point::new(1, 0)).await.unwrap();

        let snap = last_snapshot(&mut ra).await;
        assert_eq!(snap.pieces.len(), 1);
        assert_eq!(snap.current_player, PlayerSlot::Two);

        // The error reached player one, who tried to move twice.
        h.handle.make_move(c1, Point::new(2, 0)).await.unwrap();
        let msg = tokio::time::timeout(Duration::from_millis(50), ra.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg, ServerMessage::error("not your turn"));

        // Player two saw only the one snapshot.
        let snap = last_snapshot(&mut rb).await;
        assert_eq!(snap.pieces.len(), 1);
        assert!(
            tokio::time::timeout(Duration::from_millis(10), rb.recv()).await.is_err(),
            "player two must not see player one's errors"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_player_leaving_closes_immediately() {
        let mut h = spawn(Duration::from_secs(1));
        let (c1, a, _ra) = player(1);
        h.handle.join(a).await.unwrap();

        h.handle.unregister(c1).await.unwrap();

        assert!(closed_members(&mut h.registry).await.is_empty());
        assert!(h.handle.is_closing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_forfeits_then_closes_after_grace() {
        let mut h = spawn(Duration::from_secs(1));
        let (c1, a, _ra) = player(1);
        let (c2, b, mut rb) = player(2);
        h.handle.join(a).await.unwrap();
        h.handle.join(b).await.unwrap();

        h.handle.unregister(c1).await.unwrap();

        let snap = last_snapshot(&mut rb).await;
        assert!(snap.is_game_over);
        assert_eq!(snap.winner, Some(PlayerSlot::Two));
        assert!(!h.handle.is_closing(), "grace period not over yet");

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(closed_members(&mut h.registry).await, vec![c2]);
        assert!(h.handle.is_closing());
        assert_eq!(
            h.handle.make_move(c2, Point::new(0, 0)).await,
            Err(RoomError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_runs_once_when_timer_races_last_disconnect() {
        let mut h = spawn(Duration::from_secs(1));
        let (c1, a, _ra) = player(1);
        let (c2, b, _rb) = player(2);
        h.handle.join(a).await.unwrap();
        h.handle.join(b).await.unwrap();
        h.handle.unregister(c1).await.unwrap();

        // The survivor leaves right as the grace timer fires.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let _ = h.handle.unregister(c2).await;
        let _ = h.handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut closes = 0;
        while let Ok(cmd) = h.registry.try_recv() {
            if matches!(cmd, RegistryCommand::RoomClosed { .. }) {
                closes += 1;
            }
        }
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_full_outbox_forfeits_like_a_disconnect() {
        let mut h = spawn(Duration::from_secs(60));
        let (c1, a, mut ra) = player(1);
        // Player two never drains and only has room for one message.
        let c2 = ConnectionId::new(2);
        let (b, _rb) = outbox(c2, 1);
        h.handle.join(a).await.unwrap();
        h.handle.join(b.clone()).await.unwrap();

        h.handle.make_move(c1, Point::new(0, 0)).await.unwrap();

        let snap = last_snapshot(&mut ra).await;
        assert!(b.is_closed(), "slow member's outbox should be closed");
        assert!(snap.is_game_over);
        assert_eq!(snap.winner, Some(PlayerSlot::One));
        assert_eq!(snap.pieces.len(), 1);

        let mut last_status = None;
        while let Ok(cmd) = h.registry.try_recv() {
            if let RegistryCommand::RoomStatus {
                player_count,
                state,
                ..
            } = cmd
            {
                last_status = Some((player_count, state));
            }
        }
        assert_eq!(last_status, Some((1, RoomState::Finished)));
    }

    #[tokio::test]
    async fn test_forfeit_reports_status_once() {
        let mut h = spawn(Duration::from_secs(60));
        let (c1, a, mut ra) = player(1);
        let (_, b, mut rb) = player(2);
        h.handle.join(a).await.unwrap();
        h.handle.join(b).await.unwrap();
        last_snapshot(&mut ra).await;
        while h.registry.try_recv().is_ok() {}

        h.handle.unregister(c1).await.unwrap();
        assert!(last_snapshot(&mut rb).await.is_game_over);

        let mut statuses = Vec::new();
        while let Ok(cmd) = h.registry.try_recv() {
            if let RegistryCommand::RoomStatus {
                player_count,
                state,
                ..
            } = cmd
            {
                statuses.push((player_count, state));
            }
        }
        assert_eq!(statuses, vec![(1, RoomState::Finished)]);
    }

    #[tokio::test]
    async fn test_join_after_game_over_is_closed() {
        let h = spawn(Duration::from_secs(60));
        let (c1, a, _ra) = player(1);
        let (_, b, _rb) = player(2);
        h.handle.join(a).await.unwrap();
        h.handle.join(b).await.unwrap();
        h.handle.unregister(c1).await.unwrap();

        let (_, late, _rl) = player(3);
        assert_eq!(h.handle.join(late).await, Err(RoomError::Closed));
    }
}
