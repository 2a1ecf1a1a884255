//! Game actions that players can take.
//!
//! This module defines every action a seated player can submit to a
//! [`GameSession`](crate::session::GameSession) and the events that result.

use crate::awards::AwardOutcome;
use crate::draft::SetupPhase;
use crate::geometry::{EdgeId, VertexId};
use crate::player::{PlayerId, ResourceGrant};
use crate::victory::VictoryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GameAction {
    // ==================== Setup Phase ====================
    /// Place a settlement during the snake draft
    PlaceSettlement(VertexId),
    /// Place a road touching the settlement just placed
    PlaceRoad(EdgeId),

    // ==================== Turn Actions ====================
    RollDice,
    BuildRoad(EdgeId),
    BuildSettlement(VertexId),
    /// Upgrade one of your settlements
    BuildCity(VertexId),
    BuyDevelopmentCard,
    /// Playable before or after rolling, once per turn
    PlayKnight,
    EndTurn,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GameEvent {
    /// Whose setup turn it is now
    PlacementTurn {
        turn_number: u32,
        player_index: usize,
        player: PlayerId,
        phase: SetupPhase,
        round: u8,
    },

    /// A settlement went down; `granted` is only non-empty for the second
    /// setup settlement
    SettlementPlaced {
        player: PlayerId,
        vertex: VertexId,
        granted: Vec<ResourceGrant>,
    },

    RoadPlaced {
        player: PlayerId,
        edge: EdgeId,
    },

    /// The draft finished and the main game begins
    SetupComplete {
        starting_player: PlayerId,
    },

    TurnStarted {
        player: PlayerId,
        turn_number: u32,
    },

    /// Dice were rolled; `produced` is empty on a 7
    DiceRolled {
        player: PlayerId,
        dice: [u8; 2],
        total: u8,
        produced: BTreeMap<PlayerId, Vec<ResourceGrant>>,
    },

    CityBuilt {
        player: PlayerId,
        vertex: VertexId,
    },

    /// The card itself stays private to the buyer
    DevelopmentCardBought {
        player: PlayerId,
        remaining: usize,
    },

    KnightPlayed {
        player: PlayerId,
        knights: u32,
    },

    LongestRoadUpdated(AwardOutcome),

    LargestArmyUpdated(AwardOutcome),

    /// Somebody reached the target score
    Victory(VictoryResult),
}
