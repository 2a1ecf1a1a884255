//! Pieces on the board and the rules for placing them.
//!
//! Validators are pure: they look at the topology and the current pieces and
//! return the first rule a placement breaks, or `None` when it is legal.

use crate::geometry::{EdgeId, Topology, VertexId};
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A settlement, possibly upgraded to a city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub owner: PlayerId,
    pub city: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
}

/// Why a settlement can't go on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementRejection {
    #[error("That spot is not on the board")]
    UnknownVertex,

    #[error("That spot is already occupied")]
    Occupied,

    #[error("Too close to another settlement")]
    TooClose,

    #[error("Settlement must connect to one of your roads")]
    NotConnected,
}

/// Why a road can't go on an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadRejection {
    #[error("That edge is not on the board")]
    UnknownEdge,

    #[error("That edge already has a road")]
    Occupied,

    #[error("Place a settlement first")]
    NoSettlementThisTurn,

    #[error("Road must touch the settlement you just placed")]
    NotAdjacentToSettlement,

    #[error("Road must connect to your roads or buildings")]
    NotConnected,
}

/// Everything placed so far. A vertex or edge, once taken, stays taken.
#[derive(Debug, Clone, Default)]
pub struct Pieces {
    settlements: HashMap<VertexId, Settlement>,
    roads: HashMap<EdgeId, Road>,
}

impl Pieces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settlements(&self) -> &HashMap<VertexId, Settlement> {
        &self.settlements
    }

    pub fn roads(&self) -> &HashMap<EdgeId, Road> {
        &self.roads
    }

    pub fn settlement_at(&self, vertex: VertexId) -> Option<&Settlement> {
        self.settlements.get(&vertex)
    }

    pub fn road_at(&self, edge: EdgeId) -> Option<&Road> {
        self.roads.get(&edge)
    }

    /// Owner of the building at `vertex`, if any
    pub fn owner_at(&self, vertex: VertexId) -> Option<PlayerId> {
        self.settlements.get(&vertex).map(|s| s.owner)
    }

    /// Record a settlement (assumes validation already done)
    pub fn place_settlement(&mut self, vertex: VertexId, owner: PlayerId) {
        self.settlements.insert(vertex, Settlement { owner, city: false });
    }

    /// Flip the city flag on an existing settlement
    pub fn upgrade_to_city(&mut self, vertex: VertexId) -> bool {
        match self.settlements.get_mut(&vertex) {
            Some(settlement) if !settlement.city => {
                settlement.city = true;
                true
            }
            _ => false,
        }
    }

    /// Record a road (assumes validation already done)
    pub fn place_road(&mut self, edge: EdgeId, owner: PlayerId) {
        self.roads.insert(edge, Road { owner });
    }

    /// Edges holding `player`'s roads
    pub fn roads_of(&self, player: PlayerId) -> impl Iterator<Item = EdgeId> + '_ {
        self.roads
            .iter()
            .filter(move |(_, road)| road.owner == player)
            .map(|(edge, _)| *edge)
    }

    fn has_road_at(&self, topology: &Topology, vertex: VertexId, player: PlayerId) -> bool {
        topology
            .edges_at(vertex)
            .iter()
            .any(|edge| self.road_at(*edge).is_some_and(|road| road.owner == player))
    }
}

/// Settlement rules shared by setup and the main game: the vertex exists,
/// is free, and no neighbouring vertex holds a settlement.
pub fn settlement_rejection(
    vertex: VertexId,
    topology: &Topology,
    pieces: &Pieces,
) -> Option<SettlementRejection> {
    if !topology.contains_vertex(vertex) {
        return Some(SettlementRejection::UnknownVertex);
    }
    if pieces.settlement_at(vertex).is_some() {
        return Some(SettlementRejection::Occupied);
    }
    if topology
        .neighbors(vertex)
        .iter()
        .any(|adj| pieces.settlement_at(*adj).is_some())
    {
        return Some(SettlementRejection::TooClose);
    }
    None
}

/// Main-game settlement: the shared rules plus a road of the player's own
/// leading to the vertex.
pub fn connected_settlement_rejection(
    player: PlayerId,
    vertex: VertexId,
    topology: &Topology,
    pieces: &Pieces,
) -> Option<SettlementRejection> {
    settlement_rejection(vertex, topology, pieces).or_else(|| {
        (!pieces.has_road_at(topology, vertex, player)).then_some(SettlementRejection::NotConnected)
    })
}

/// Setup road: must touch the settlement placed earlier this turn.
pub fn setup_road_rejection(
    edge: EdgeId,
    topology: &Topology,
    pieces: &Pieces,
    placed_settlement: Option<VertexId>,
) -> Option<RoadRejection> {
    if !topology.contains_edge(edge) {
        return Some(RoadRejection::UnknownEdge);
    }
    if pieces.road_at(edge).is_some() {
        return Some(RoadRejection::Occupied);
    }
    let Some(settlement) = placed_settlement else {
        return Some(RoadRejection::NoSettlementThisTurn);
    };
    if !edge.touches(settlement) {
        return Some(RoadRejection::NotAdjacentToSettlement);
    }
    None
}

/// Main-game road: must touch one of the player's buildings, or extend one
/// of their roads through a vertex no opponent has built on.
pub fn road_rejection(
    player: PlayerId,
    edge: EdgeId,
    topology: &Topology,
    pieces: &Pieces,
) -> Option<RoadRejection> {
    if !topology.contains_edge(edge) {
        return Some(RoadRejection::UnknownEdge);
    }
    if pieces.road_at(edge).is_some() {
        return Some(RoadRejection::Occupied);
    }

    let connected = edge.endpoints().into_iter().any(|endpoint| match pieces.owner_at(endpoint) {
        Some(owner) => owner == player,
        None => pieces.has_road_at(topology, endpoint, player),
    });

    if connected {
        None
    } else {
        Some(RoadRejection::NotConnected)
    }
}
