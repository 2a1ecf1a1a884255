//! WebSocket protocol messages for Hexisle multiplayer.

use hexisle_core::{Board, EdgeId, GameAction, GameError, GameEvent, PlayerId, VertexId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::{PlayerColor, RoomStatus};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new room and join it
    CreateRoom { nickname: String },

    /// Join an existing room, or rejoin one with a held nickname
    JoinRoom { room_id: Uuid, nickname: String },

    /// Leave current room
    LeaveRoom,

    ToggleReady,

    ChangeColor { color: PlayerColor },

    // Game intents
    PlaceSettlement { vertex: VertexId },
    PlaceRoad { edge: EdgeId },
    RollDice,
    BuildRoad { edge: EdgeId },
    BuildSettlement { vertex: VertexId },
    BuildCity { vertex: VertexId },
    BuyDevelopmentCard,
    PlayKnight,
    EndTurn,

    /// Ping for keepalive
    Ping,
}

impl ClientMessage {
    /// The session action this message asks for, if it is a game intent
    pub fn game_action(&self) -> Option<GameAction> {
        let action = match self {
            ClientMessage::PlaceSettlement { vertex } => GameAction::PlaceSettlement(*vertex),
            ClientMessage::PlaceRoad { edge } => GameAction::PlaceRoad(*edge),
            ClientMessage::RollDice => GameAction::RollDice,
            ClientMessage::BuildRoad { edge } => GameAction::BuildRoad(*edge),
            ClientMessage::BuildSettlement { vertex } => GameAction::BuildSettlement(*vertex),
            ClientMessage::BuildCity { vertex } => GameAction::BuildCity(*vertex),
            ClientMessage::BuyDevelopmentCard => GameAction::BuyDevelopmentCard,
            ClientMessage::PlayKnight => GameAction::PlayKnight,
            ClientMessage::EndTurn => GameAction::EndTurn,
            _ => return None,
        };
        Some(action)
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// First message on every connection
    Welcome { connection_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// You are in the room as `player_id`
    Joined {
        room_id: Uuid,
        player_id: PlayerId,
        reconnected: bool,
    },

    /// You left the room
    LeftRoom,

    /// Full room snapshot
    RoomState { room: RoomInfo },

    PlayerJoined { player: PlayerInfo },

    PlayerLeft { player_id: PlayerId, nickname: String },

    PlayerReady { player_id: PlayerId, ready: bool },

    PlayerColorChanged { player_id: PlayerId, color: PlayerColor },

    /// Seconds left before the game starts
    CountdownTick { remaining: u32 },

    CountdownCancelled,

    /// The board and the seating order. Also sent to a player who reconnects
    /// into a running game.
    GameStarted {
        board: Board,
        vertices: Vec<VertexId>,
        edges: Vec<EdgeId>,
        seating: Vec<PlayerInfo>,
    },

    /// Something happened in the game
    GameEvent { event: GameEvent },

    /// A player dropped mid-game; actions are refused until they return
    GamePaused { nickname: String },

    GameResumed { nickname: String },

    /// Your game action was refused
    ActionRejected { error: GameError, message: String },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub status: RoomStatus,
    pub paused: bool,
    pub players: Vec<PlayerInfo>,
    pub min_players: usize,
    pub max_players: usize,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub nickname: String,
    pub color: PlayerColor,
    pub ready: bool,
    pub connected: bool,
}
