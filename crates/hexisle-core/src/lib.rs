//! Hexisle - rules engine for a hex-island settlement game
//!
//! This crate provides the core game logic, with no I/O:
//! - Hex coordinates and position-derived vertex/edge identities
//! - Randomised island generation under a fairness constraint
//! - Placement validation and the snake-order setup draft
//! - Longest Road / Largest Army trackers and victory scoring
//! - The per-game session state machine
//!
//! # Architecture
//!
//! Everything here is synchronous and deterministic given an RNG. The
//! `hexisle-server` crate owns rooms, connections and timers and drives a
//! [`GameSession`] per active room.
//!
//! # Modules
//!
//! - [`hex`]: Axial hex coordinates
//! - [`geometry`]: Vertex and edge identities, board topology
//! - [`board`]: Terrain, tokens, ports and board generation
//! - [`fairness`]: The no-adjacent-6/8 rule
//! - [`placement`]: Pieces and placement rules
//! - [`draft`]: Setup turn order
//! - [`player`]: Hands, costs and development cards
//! - [`awards`]: Longest Road and Largest Army
//! - [`victory`]: Scoring
//! - [`session`]: Game state machine
//! - [`actions`]: Actions in, events out

pub mod actions;
pub mod awards;
pub mod board;
pub mod draft;
pub mod fairness;
pub mod geometry;
pub mod hex;
pub mod placement;
pub mod player;
pub mod session;
pub mod victory;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use awards::{AwardKind, AwardOutcome, AwardState};
pub use board::{Board, BoardGeneration, Hex, Port, PortKind, Resource, Terrain};
pub use draft::{DraftTurn, SetupPhase};
pub use geometry::{EdgeId, Topology, VertexId};
pub use hex::{HexCoord, HexDirection};
pub use placement::{Pieces, RoadRejection, SettlementRejection};
pub use player::{DevelopmentCard, PlayerId, PlayerState, ResourceGrant, ResourceHand};
pub use session::{GameError, GameSession, MainTurn, SessionPhase, TurnPhase};
pub use victory::{PointBreakdown, VictoryResult};
