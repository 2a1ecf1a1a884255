//! Room and connection lifecycle coordinator.
//!
//! One task owns every room. Connection tasks and timers feed it [`Event`]s
//! over a single channel and it handles them strictly one at a time, so room
//! and session state need no locks. Outbound messages go through the shared
//! [`ConnectionManager`] in the order they are produced.

use hexisle_core::{Board, GameEvent, PlayerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::connection::{ConnectionId, ConnectionManager};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{CountdownChange, Departure, PlayerColor, Room, RoomError, RoomId};
use crate::timer::{Scheduler, TimerFired, TimerHandle, TimerKind};

/// Everything the coordinator reacts to
#[derive(Debug)]
pub enum Event {
    Connected { connection_id: ConnectionId },
    Client { connection_id: ConnectionId, message: ClientMessage },
    Disconnected { connection_id: ConnectionId },
    Timer(TimerFired),
}

/// Where a connection sits
#[derive(Debug, Clone, Copy)]
struct Membership {
    room_id: RoomId,
    player_id: PlayerId,
}

/// A room plus the timers armed for it
struct RoomEntry {
    room: Room,
    countdown: Option<TimerHandle>,
    empty_timer: Option<TimerHandle>,
    /// Keyed by nickname
    reconnect_timers: HashMap<String, TimerHandle>,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        Self {
            room,
            countdown: None,
            empty_timer: None,
            reconnect_timers: HashMap::new(),
        }
    }

    fn cancel_countdown(&mut self) {
        if let Some(timer) = self.countdown.take() {
            timer.cancel();
        }
    }

    fn cancel_empty_timer(&mut self) {
        if let Some(timer) = self.empty_timer.take() {
            timer.cancel();
        }
    }

    fn cancel_reconnect(&mut self, nickname: &str) {
        if let Some(timer) = self.reconnect_timers.remove(nickname) {
            timer.cancel();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel_countdown();
        self.cancel_empty_timer();
        for (_, timer) in self.reconnect_timers.drain() {
            timer.cancel();
        }
    }
}

pub struct Coordinator {
    config: Arc<ServerConfig>,
    connections: Arc<ConnectionManager>,
    scheduler: Scheduler,
    rooms: HashMap<RoomId, RoomEntry>,
    memberships: HashMap<ConnectionId, Membership>,
}

impl Coordinator {
    pub fn new(
        config: Arc<ServerConfig>,
        connections: Arc<ConnectionManager>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            config,
            connections,
            scheduler: Scheduler::new(events),
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    /// Process events until every sender is gone
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!("Coordinator stopped");
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Connected { connection_id } => {
                debug!(connection = %connection_id, "connection registered");
            }
            Event::Client {
                connection_id,
                message,
            } => self.handle_message(connection_id, message),
            Event::Disconnected { connection_id } => self.handle_disconnect(connection_id),
            Event::Timer(fired) => self.handle_timer(fired),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // ==================== Client messages ====================

    fn handle_message(&mut self, connection_id: ConnectionId, message: ClientMessage) {
        if let Some(action) = message.game_action() {
            self.handle_game_action(connection_id, action);
            return;
        }

        let result = match message {
            ClientMessage::CreateRoom { nickname } => self.create_room(connection_id, &nickname),
            ClientMessage::JoinRoom { room_id, nickname } => {
                self.join_room(connection_id, room_id, &nickname)
            }
            ClientMessage::LeaveRoom => self.leave_room(connection_id),
            ClientMessage::ToggleReady => self.toggle_ready(connection_id),
            ClientMessage::ChangeColor { color } => self.change_color(connection_id, color),
            // Game intents were dispatched above; pings are answered by the
            // connection task.
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.connections.send(
                connection_id,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            );
        }
    }

    fn create_room(&mut self, connection_id: ConnectionId, nickname: &str) -> Result<(), RoomError> {
        if self.memberships.contains_key(&connection_id) {
            return Err(RoomError::AlreadyInRoom);
        }

        let room_id = Uuid::new_v4();
        let mut room = Room::new(room_id, self.config.min_players, self.config.max_players);
        let outcome = room.join(nickname, connection_id)?;

        self.rooms.insert(room_id, RoomEntry::new(room));
        self.memberships.insert(
            connection_id,
            Membership {
                room_id,
                player_id: outcome.player_id,
            },
        );
        info!(room = %room_id, nickname, "Room created");

        self.connections.send(connection_id, ServerMessage::RoomCreated { room_id });
        self.connections.send(
            connection_id,
            ServerMessage::Joined {
                room_id,
                player_id: outcome.player_id,
                reconnected: false,
            },
        );
        self.broadcast_room_state(room_id);
        Ok(())
    }

    fn join_room(
        &mut self,
        connection_id: ConnectionId,
        room_id: RoomId,
        nickname: &str,
    ) -> Result<(), RoomError> {
        if self.memberships.contains_key(&connection_id) {
            return Err(RoomError::AlreadyInRoom);
        }
        let entry = self.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;
        let outcome = entry.room.join(nickname, connection_id)?;

        entry.cancel_empty_timer();
        if outcome.reconnected {
            entry.cancel_reconnect(nickname.trim());
        }
        if outcome.countdown_cancelled {
            entry.cancel_countdown();
        }

        self.memberships.insert(
            connection_id,
            Membership {
                room_id,
                player_id: outcome.player_id,
            },
        );
        self.connections.send(
            connection_id,
            ServerMessage::Joined {
                room_id,
                player_id: outcome.player_id,
                reconnected: outcome.reconnected,
            },
        );

        if outcome.reconnected {
            info!(room = %room_id, nickname, "Player reconnected");
            self.send_game_snapshot(room_id, connection_id);
        } else {
            info!(room = %room_id, nickname, "Player joined");
            if let Some(player) = self.room(room_id).and_then(|room| room.player(outcome.player_id)) {
                let msg = ServerMessage::PlayerJoined {
                    player: player.to_info(),
                };
                self.broadcast(room_id, msg);
            }
        }

        if outcome.countdown_cancelled {
            self.broadcast(room_id, ServerMessage::CountdownCancelled);
        }
        self.broadcast_room_state(room_id);
        if outcome.resumed {
            info!(room = %room_id, "Game resumed");
            self.broadcast(
                room_id,
                ServerMessage::GameResumed {
                    nickname: nickname.trim().to_string(),
                },
            );
        }
        Ok(())
    }

    fn leave_room(&mut self, connection_id: ConnectionId) -> Result<(), RoomError> {
        let membership = self
            .memberships
            .remove(&connection_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        self.connections.send(connection_id, ServerMessage::LeftRoom);
        self.depart(membership);
        Ok(())
    }

    fn toggle_ready(&mut self, connection_id: ConnectionId) -> Result<(), RoomError> {
        let membership = self.membership(connection_id)?;
        let entry = self
            .rooms
            .get_mut(&membership.room_id)
            .ok_or(RoomError::RoomNotFound)?;
        let (ready, change) = entry.room.toggle_ready(membership.player_id)?;

        let seconds = self.config.countdown_seconds;
        match change {
            CountdownChange::Started => {
                entry.cancel_countdown();
                entry.countdown = Some(self.scheduler.countdown(membership.room_id, seconds));
            }
            CountdownChange::Cancelled => entry.cancel_countdown(),
            CountdownChange::Unchanged => {}
        }

        self.broadcast(
            membership.room_id,
            ServerMessage::PlayerReady {
                player_id: membership.player_id,
                ready,
            },
        );
        match change {
            CountdownChange::Started => {
                info!(room = %membership.room_id, seconds, "Countdown started");
                self.broadcast(membership.room_id, ServerMessage::CountdownTick { remaining: seconds });
            }
            CountdownChange::Cancelled => {
                info!(room = %membership.room_id, "Countdown cancelled");
                self.broadcast(membership.room_id, ServerMessage::CountdownCancelled);
            }
            CountdownChange::Unchanged => {}
        }
        Ok(())
    }

    fn change_color(&mut self, connection_id: ConnectionId, color: PlayerColor) -> Result<(), RoomError> {
        let membership = self.membership(connection_id)?;
        let room = self.room_mut(membership.room_id)?;
        room.change_color(membership.player_id, color)?;

        self.broadcast(
            membership.room_id,
            ServerMessage::PlayerColorChanged {
                player_id: membership.player_id,
                color,
            },
        );
        Ok(())
    }

    fn handle_game_action(&mut self, connection_id: ConnectionId, action: hexisle_core::GameAction) {
        let result = self
            .membership(connection_id)
            .and_then(|membership| {
                let room = self.room_mut(membership.room_id)?;
                let events = room.apply_action(membership.player_id, action)?;
                Ok((membership, events))
            });

        match result {
            Ok((membership, events)) => {
                for event in events {
                    if let GameEvent::Victory(result) = &event {
                        info!(room = %membership.room_id, winner = ?result.winner, "Game won");
                    }
                    self.broadcast(membership.room_id, ServerMessage::GameEvent { event });
                }
            }
            Err(RoomError::Game(error)) => {
                debug!(connection = %connection_id, %error, "Action rejected");
                self.connections.send(
                    connection_id,
                    ServerMessage::ActionRejected {
                        message: error.to_string(),
                        error,
                    },
                );
            }
            Err(e) => self.connections.send(
                connection_id,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            ),
        }
    }

    // ==================== Departures ====================

    fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        if let Some(membership) = self.memberships.remove(&connection_id) {
            self.depart(membership);
        }
        debug!(connection = %connection_id, "connection closed");
    }

    /// A member left the room, either on purpose or by losing the connection.
    fn depart(&mut self, membership: Membership) {
        let Membership { room_id, player_id } = membership;
        let reconnect_grace = self.config.reconnect_grace;
        let empty_room_grace = self.config.empty_room_grace;

        let Some(entry) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let Some(departure) = entry.room.depart(player_id) else {
            return;
        };

        match &departure {
            Departure::Removed {
                countdown_cancelled: true,
                ..
            } => entry.cancel_countdown(),
            Departure::Suspended { nickname, .. } => {
                entry.cancel_reconnect(nickname);
                let timer = self.scheduler.once(
                    room_id,
                    reconnect_grace,
                    TimerKind::Reconnect {
                        nickname: nickname.clone(),
                    },
                );
                entry.reconnect_timers.insert(nickname.clone(), timer);
            }
            Departure::Removed { .. } => {}
        }

        let empty = entry.room.active_count() == 0;
        if empty && entry.empty_timer.is_none() {
            entry.empty_timer = Some(self.scheduler.once(room_id, empty_room_grace, TimerKind::EmptyRoom));
        }

        match departure {
            Departure::Removed {
                player_id,
                nickname,
                countdown_cancelled,
            } => {
                info!(room = %room_id, nickname = %nickname, "Player left");
                self.broadcast(room_id, ServerMessage::PlayerLeft { player_id, nickname });
                if countdown_cancelled {
                    self.broadcast(room_id, ServerMessage::CountdownCancelled);
                }
            }
            Departure::Suspended { nickname, paused, .. } => {
                info!(room = %room_id, nickname = %nickname, "Player disconnected mid-game");
                if paused {
                    self.broadcast(room_id, ServerMessage::GamePaused { nickname });
                }
            }
        }
        self.broadcast_room_state(room_id);
    }

    // ==================== Timers ====================

    fn handle_timer(&mut self, fired: TimerFired) {
        let Some(entry) = self.rooms.get_mut(&fired.room_id) else {
            debug!(timer = fired.id, "timer for a destroyed room");
            return;
        };

        let armed = match &fired.kind {
            TimerKind::Countdown { .. } => entry.countdown.as_ref(),
            TimerKind::EmptyRoom => entry.empty_timer.as_ref(),
            TimerKind::Reconnect { nickname } => entry.reconnect_timers.get(nickname),
        };
        if armed.map(TimerHandle::id) != Some(fired.id) {
            debug!(timer = fired.id, "ignoring stale timer");
            return;
        }

        match fired.kind {
            TimerKind::Countdown { remaining: 0 } => {
                entry.countdown = None;
                self.start_game(fired.room_id);
            }
            TimerKind::Countdown { remaining } => {
                self.broadcast(fired.room_id, ServerMessage::CountdownTick { remaining });
            }
            TimerKind::EmptyRoom => {
                entry.empty_timer = None;
                if entry.room.active_count() == 0 {
                    entry.cancel_all();
                    self.rooms.remove(&fired.room_id);
                    info!(room = %fired.room_id, rooms = self.room_count(), "Room destroyed after sitting empty");
                }
            }
            TimerKind::Reconnect { nickname } => {
                entry.reconnect_timers.remove(&nickname);
                if let Some(player_id) = entry.room.evict(&nickname) {
                    info!(room = %fired.room_id, nickname = %nickname, "Reconnect window expired");
                    self.broadcast(fired.room_id, ServerMessage::PlayerLeft { player_id, nickname });
                    self.broadcast_room_state(fired.room_id);
                }
            }
        }
    }

    fn start_game(&mut self, room_id: RoomId) {
        let generation = Board::generate(&mut rand::thread_rng(), self.config.board_generation_attempts);
        if !generation.fair {
            warn!(
                room = %room_id,
                attempts = generation.attempts,
                "Board generation exhausted its retries; using an unchecked layout"
            );
        }

        let Some(room) = self.room_mut(room_id).ok() else {
            return;
        };
        if let Err(e) = room.start_game(generation.board) {
            warn!(room = %room_id, error = %e, "Countdown finished but the game could not start");
            return;
        }
        info!(room = %room_id, attempts = generation.attempts, "Game started");

        self.broadcast_room_state(room_id);
        for connection_id in self.room_connections(room_id) {
            self.send_game_snapshot(room_id, connection_id);
        }
    }

    // ==================== Helpers ====================

    fn membership(&self, connection_id: ConnectionId) -> Result<Membership, RoomError> {
        self.memberships
            .get(&connection_id)
            .copied()
            .ok_or(RoomError::PlayerNotInRoom)
    }

    fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id).map(|entry| &entry.room)
    }

    fn room_mut(&mut self, room_id: RoomId) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(&room_id)
            .map(|entry| &mut entry.room)
            .ok_or(RoomError::RoomNotFound)
    }

    fn room_connections(&self, room_id: RoomId) -> Vec<ConnectionId> {
        self.room(room_id)
            .map(|room| room.connections().collect())
            .unwrap_or_default()
    }

    /// Broadcast a message to every connected member of a room.
    fn broadcast(&self, room_id: RoomId, msg: ServerMessage) {
        self.connections.broadcast(self.room_connections(room_id), &msg);
    }

    fn broadcast_room_state(&self, room_id: RoomId) {
        if let Some(room) = self.room(room_id) {
            let msg = ServerMessage::RoomState { room: room.to_info() };
            self.broadcast(room_id, msg);
        }
    }

    /// Board, seating and the current setup turn, for a connection that
    /// needs to catch up on a running game
    fn send_game_snapshot(&self, room_id: RoomId, connection_id: ConnectionId) {
        let Some(room) = self.room(room_id) else {
            return;
        };
        let Some(session) = room.session() else {
            return;
        };

        let mut vertices: Vec<_> = session.topology().vertices().collect();
        vertices.sort();
        let mut edges: Vec<_> = session.topology().edges().collect();
        edges.sort();
        let seating = session
            .player_ids()
            .iter()
            .filter_map(|id| room.player(*id).map(|p| p.to_info()))
            .collect();

        self.connections.send(
            connection_id,
            ServerMessage::GameStarted {
                board: session.board().clone(),
                vertices,
                edges,
                seating,
            },
        );
        if let Some(event) = session.placement_turn_event() {
            self.connections.send(connection_id, ServerMessage::GameEvent { event });
        }
    }
}
