//! Game room management.
//!
//! A [`Room`] is plain synchronous state: membership, colours, readiness,
//! the pause flag and the attached [`GameSession`]. It never touches sockets
//! or timers; the coordinator acts on the outcomes it returns.

use hexisle_core::{Board, GameAction, GameError, GameEvent, GameSession, PlayerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::connection::ConnectionId;
use crate::protocol::{PlayerInfo, RoomInfo};

pub type RoomId = Uuid;

const MAX_NICKNAME_LEN: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Nickname {0:?} is already taken")]
    NicknameTaken(String),

    #[error("Nickname must be 1-20 characters")]
    InvalidNickname,

    #[error("Colour is already taken")]
    ColorTaken,

    #[error("Already in a room")]
    AlreadyInRoom,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Game is paused until everyone reconnects")]
    Paused,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    Countdown,
    Active,
    Ended,
}

/// Player colours, allocated in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    White,
    Orange,
    Green,
    Brown,
}

impl PlayerColor {
    pub const PALETTE: [PlayerColor; 6] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::White,
        PlayerColor::Orange,
        PlayerColor::Green,
        PlayerColor::Brown,
    ];
}

/// A member of a room. `connection` is `None` while they are disconnected
/// and their seat is being held.
#[derive(Debug, Clone)]
pub struct ManagedPlayer {
    pub id: PlayerId,
    pub nickname: String,
    pub color: PlayerColor,
    pub ready: bool,
    pub connection: Option<ConnectionId>,
}

impl ManagedPlayer {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            nickname: self.nickname.clone(),
            color: self.color,
            ready: self.ready,
            connected: self.is_connected(),
        }
    }
}

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub player_id: PlayerId,
    /// The nickname matched a held seat
    pub reconnected: bool,
    /// The rejoin cleared the pause
    pub resumed: bool,
    /// A new, unready member interrupted the countdown
    pub countdown_cancelled: bool,
}

/// What a ready toggle did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownChange {
    Unchanged,
    Started,
    Cancelled,
}

/// What happened when a member went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Gone for good (no game running)
    Removed {
        player_id: PlayerId,
        nickname: String,
        countdown_cancelled: bool,
    },
    /// Seat held for reconnection
    Suspended {
        player_id: PlayerId,
        nickname: String,
        /// This departure is what paused the room
        paused: bool,
    },
}

/// A game room that can hold multiple players.
pub struct Room {
    pub id: RoomId,
    status: RoomStatus,
    paused: bool,
    /// Join order, which becomes seating order
    players: Vec<ManagedPlayer>,
    min_players: usize,
    max_players: usize,
    session: Option<GameSession>,
}

impl Room {
    pub fn new(id: RoomId, min_players: usize, max_players: usize) -> Self {
        Self {
            id,
            status: RoomStatus::Waiting,
            paused: false,
            players: Vec::new(),
            min_players,
            max_players,
            session: None,
        }
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn players(&self) -> &[ManagedPlayer] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&ManagedPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Members currently connected
    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_connected()).count()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Connections to broadcast to
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().filter_map(|p| p.connection)
    }

    /// Admit `nickname` on `connection`, or restore their held seat.
    pub fn join(&mut self, nickname: &str, connection: ConnectionId) -> Result<JoinOutcome, RoomError> {
        let nickname = nickname.trim();
        if nickname.is_empty() || nickname.chars().count() > MAX_NICKNAME_LEN {
            return Err(RoomError::InvalidNickname);
        }

        if let Some(existing) = self.players.iter_mut().find(|p| p.nickname == nickname) {
            if existing.is_connected() {
                return Err(RoomError::NicknameTaken(nickname.to_string()));
            }
            existing.connection = Some(connection);
            let player_id = existing.id;

            let resumed = self.paused && self.every_seat_connected();
            if resumed {
                self.paused = false;
            }
            return Ok(JoinOutcome {
                player_id,
                reconnected: true,
                resumed,
                countdown_cancelled: false,
            });
        }

        if matches!(self.status, RoomStatus::Active | RoomStatus::Ended) {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }

        let color = PlayerColor::PALETTE
            .into_iter()
            .find(|c| self.players.iter().all(|p| p.color != *c))
            .ok_or(RoomError::RoomFull)?;

        let player_id = Uuid::new_v4();
        self.players.push(ManagedPlayer {
            id: player_id,
            nickname: nickname.to_string(),
            color,
            ready: false,
            connection: Some(connection),
        });

        let countdown_cancelled = self.status == RoomStatus::Countdown;
        if countdown_cancelled {
            self.status = RoomStatus::Waiting;
        }

        Ok(JoinOutcome {
            player_id,
            reconnected: false,
            resumed: false,
            countdown_cancelled,
        })
    }

    /// Every seat in the running game has a live member behind it. An
    /// evicted seat never does, so it keeps the room paused.
    fn every_seat_connected(&self) -> bool {
        match &self.session {
            Some(session) => session
                .player_ids()
                .iter()
                .all(|id| self.player(*id).map_or(false, ManagedPlayer::is_connected)),
            None => self.players.iter().all(ManagedPlayer::is_connected),
        }
    }

    /// Flip a member's ready flag, starting or cancelling the countdown
    pub fn toggle_ready(&mut self, player_id: PlayerId) -> Result<(bool, CountdownChange), RoomError> {
        if !matches!(self.status, RoomStatus::Waiting | RoomStatus::Countdown) {
            return Err(RoomError::GameAlreadyStarted);
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        player.ready = !player.ready;
        let ready = player.ready;

        let change = if !ready && self.status == RoomStatus::Countdown {
            self.status = RoomStatus::Waiting;
            CountdownChange::Cancelled
        } else if self.status == RoomStatus::Waiting && self.ready_to_start() {
            self.status = RoomStatus::Countdown;
            CountdownChange::Started
        } else {
            CountdownChange::Unchanged
        };

        Ok((ready, change))
    }

    fn ready_to_start(&self) -> bool {
        let count = self.players.len();
        self.session.is_none()
            && (self.min_players..=self.max_players).contains(&count)
            && self.players.iter().all(|p| p.ready)
    }

    /// Switch to a palette colour nobody else in the room is using
    pub fn change_color(&mut self, player_id: PlayerId, color: PlayerColor) -> Result<(), RoomError> {
        if self.players.iter().any(|p| p.id != player_id && p.color == color) {
            return Err(RoomError::ColorTaken);
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        player.color = color;
        Ok(())
    }

    /// A member's connection dropped, or they asked to leave. Before the game
    /// they are removed; during it their seat is held and the room pauses.
    pub fn depart(&mut self, player_id: PlayerId) -> Option<Departure> {
        let index = self.players.iter().position(|p| p.id == player_id)?;

        if self.status == RoomStatus::Active {
            let player = &mut self.players[index];
            player.connection = None;
            let nickname = player.nickname.clone();
            let paused = !self.paused;
            self.paused = true;
            return Some(Departure::Suspended {
                player_id,
                nickname,
                paused,
            });
        }

        let player = self.players.remove(index);
        let countdown_cancelled = self.status == RoomStatus::Countdown;
        if countdown_cancelled {
            self.status = RoomStatus::Waiting;
        }
        Some(Departure::Removed {
            player_id,
            nickname: player.nickname,
            countdown_cancelled,
        })
    }

    /// Drop a held seat whose reconnect window ran out. The seat stays in the
    /// game, so the room stays paused.
    pub fn evict(&mut self, nickname: &str) -> Option<PlayerId> {
        let index = self
            .players
            .iter()
            .position(|p| p.nickname == nickname && !p.is_connected())?;
        Some(self.players.remove(index).id)
    }

    /// Countdown finished: seat everyone and attach a session on `board`.
    pub fn start_game(&mut self, board: Board) -> Result<&GameSession, RoomError> {
        if self.status != RoomStatus::Countdown {
            return Err(RoomError::GameNotStarted);
        }
        let seating = self.players.iter().map(|p| p.id).collect();
        self.status = RoomStatus::Active;
        Ok(self.session.insert(GameSession::new(seating, board)))
    }

    pub fn apply_action(&mut self, player_id: PlayerId, action: GameAction) -> Result<Vec<GameEvent>, RoomError> {
        if self.player(player_id).is_none() {
            return Err(RoomError::PlayerNotInRoom);
        }
        let session = self.session.as_mut().ok_or(RoomError::GameNotStarted)?;
        if self.paused {
            return Err(RoomError::Paused);
        }

        let events = session.apply_action(player_id, action)?;

        if session.is_over() {
            self.status = RoomStatus::Ended;
        }
        Ok(events)
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            status: self.status,
            paused: self.paused,
            players: self.players.iter().map(ManagedPlayer::to_info).collect(),
            min_players: self.min_players,
            max_players: self.max_players,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexisle_core::SessionPhase;

    fn conn() -> ConnectionId {
        Uuid::new_v4()
    }

    fn room_with(names: &[&str]) -> (Room, Vec<PlayerId>) {
        let mut room = Room::new(Uuid::new_v4(), 2, 4);
        let ids = names
            .iter()
            .map(|name| room.join(name, conn()).unwrap().player_id)
            .collect();
        (room, ids)
    }

    fn started_room() -> (Room, Vec<PlayerId>) {
        let (mut room, ids) = room_with(&["ana", "bo"]);
        for id in &ids {
            room.toggle_ready(*id).unwrap();
        }
        room.start_game(Board::standard()).unwrap();
        (room, ids)
    }

    #[test]
    fn test_create_room() {
        let (room, ids) = room_with(&["host"]);
        assert_eq!(room.players().len(), 1);
        assert!(!room.is_full());
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(room.player(ids[0]).unwrap().color, PlayerColor::Red);
    }

    #[test]
    fn test_capacity_and_nicknames() {
        let (mut room, _) = room_with(&["a", "b", "c", "d"]);
        assert!(room.is_full());
        assert_eq!(room.join("e", conn()), Err(RoomError::RoomFull));

        let (mut room, _) = room_with(&["a"]);
        assert_eq!(
            room.join("a", conn()),
            Err(RoomError::NicknameTaken("a".into()))
        );
        assert_eq!(room.join("   ", conn()), Err(RoomError::InvalidNickname));
    }

    #[test]
    fn test_colours_allocated_in_palette_order() {
        let (mut room, ids) = room_with(&["a", "b"]);
        assert_eq!(room.player(ids[1]).unwrap().color, PlayerColor::Blue);

        assert_eq!(room.change_color(ids[1], PlayerColor::Red), Err(RoomError::ColorTaken));
        room.change_color(ids[0], PlayerColor::Green).unwrap();

        // Red is free again, so the next member gets it.
        let third = room.join("c", conn()).unwrap().player_id;
        assert_eq!(room.player(third).unwrap().color, PlayerColor::Red);
    }

    #[test]
    fn test_all_ready_starts_and_unready_cancels() {
        let (mut room, ids) = room_with(&["a", "b"]);
        assert_eq!(room.toggle_ready(ids[0]), Ok((true, CountdownChange::Unchanged)));
        assert_eq!(room.toggle_ready(ids[1]), Ok((true, CountdownChange::Started)));
        assert_eq!(room.status(), RoomStatus::Countdown);

        assert_eq!(room.toggle_ready(ids[0]), Ok((false, CountdownChange::Cancelled)));
        assert_eq!(room.status(), RoomStatus::Waiting);
    }

    #[test]
    fn test_lone_player_cannot_start() {
        let (mut room, ids) = room_with(&["a"]);
        assert_eq!(room.toggle_ready(ids[0]), Ok((true, CountdownChange::Unchanged)));
        assert_eq!(room.status(), RoomStatus::Waiting);
    }

    #[test]
    fn test_join_during_countdown_cancels_it() {
        let (mut room, ids) = room_with(&["a", "b"]);
        room.toggle_ready(ids[0]).unwrap();
        room.toggle_ready(ids[1]).unwrap();

        let outcome = room.join("c", conn()).unwrap();
        assert!(outcome.countdown_cancelled);
        assert_eq!(room.status(), RoomStatus::Waiting);
    }

    #[test]
    fn test_leaving_before_game_removes() {
        let (mut room, ids) = room_with(&["a", "b"]);
        let departure = room.depart(ids[1]).unwrap();
        assert!(matches!(departure, Departure::Removed { countdown_cancelled: false, .. }));
        assert_eq!(room.players().len(), 1);
    }

    #[test]
    fn test_start_game_seats_in_join_order() {
        let (mut room, ids) = started_room();
        assert_eq!(room.status(), RoomStatus::Active);
        let session = room.session().unwrap();
        assert_eq!(session.player_ids(), ids);
        assert!(matches!(session.phase(), SessionPhase::Setup(_)));

        assert_eq!(room.join("newcomer", conn()), Err(RoomError::GameAlreadyStarted));
    }

    #[test]
    fn test_disconnect_pauses_and_reconnect_resumes() {
        let (mut room, ids) = started_room();

        let departure = room.depart(ids[1]).unwrap();
        assert_eq!(
            departure,
            Departure::Suspended {
                player_id: ids[1],
                nickname: "bo".into(),
                paused: true
            }
        );
        assert!(room.is_paused());
        assert_eq!(room.active_count(), 1);

        let action = GameAction::RollDice;
        assert_eq!(room.apply_action(ids[0], action), Err(RoomError::Paused));

        let outcome = room.join("bo", conn()).unwrap();
        assert_eq!(outcome.player_id, ids[1]);
        assert!(outcome.reconnected);
        assert!(outcome.resumed);
        assert!(!room.is_paused());
    }

    #[test]
    fn test_pause_holds_until_last_player_returns() {
        let (mut room, ids) = started_room();
        room.depart(ids[0]).unwrap();
        let second = room.depart(ids[1]).unwrap();
        assert!(matches!(second, Departure::Suspended { paused: false, .. }));

        let first_back = room.join("ana", conn()).unwrap();
        assert!(!first_back.resumed);
        assert!(room.is_paused());

        let second_back = room.join("bo", conn()).unwrap();
        assert!(second_back.resumed);
        assert!(!room.is_paused());
    }

    #[test]
    fn test_evicted_seat_cannot_be_reclaimed() {
        let (mut room, ids) = started_room();
        room.depart(ids[1]).unwrap();

        assert_eq!(room.evict("bo"), Some(ids[1]));
        assert!(room.is_paused());
        assert_eq!(room.join("bo", conn()), Err(RoomError::GameAlreadyStarted));
    }

    #[test]
    fn test_evicted_seat_keeps_room_paused() {
        let (mut room, ids) = room_with(&["ana", "bo", "cy"]);
        for id in &ids {
            room.toggle_ready(*id).unwrap();
        }
        room.start_game(Board::standard()).unwrap();

        room.depart(ids[1]).unwrap();
        room.evict("bo").unwrap();
        room.depart(ids[2]).unwrap();

        let outcome = room.join("cy", conn()).unwrap();
        assert!(outcome.reconnected);
        assert!(!outcome.resumed);
        assert!(room.is_paused());
        assert_eq!(room.session().unwrap().player_count(), 3);
        assert_eq!(
            room.apply_action(ids[0], GameAction::RollDice),
            Err(RoomError::Paused)
        );
    }

    #[test]
    fn test_game_errors_pass_through() {
        let (mut room, ids) = started_room();
        assert_eq!(
            room.apply_action(ids[1], GameAction::RollDice),
            Err(RoomError::Game(GameError::NotYourTurn))
        );
    }
}
