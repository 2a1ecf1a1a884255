//! Board representation and procedural generation.
//!
//! This module contains:
//! - Resource and terrain types
//! - Ports on the coastline
//! - The 19-hex island and its generator (rejection sampling against
//!   [`crate::fairness::is_fair`])

use crate::fairness;
use crate::geometry::{shared_edge, EdgeId, Topology};
use crate::hex::{HexCoord, HexDirection, BOARD_RADIUS};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry budget used when the caller has no configured value
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Terrain multiset for the standard island
const TERRAIN_DISTRIBUTION: [(Terrain, usize); 6] = [
    (Terrain::Forest, 4),
    (Terrain::Fields, 4),
    (Terrain::Pasture, 4),
    (Terrain::Hills, 3),
    (Terrain::Mountains, 3),
    (Terrain::Desert, 1),
];

/// Number tokens, one per non-desert hex
const NUMBER_TOKENS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];
}

/// Terrain of a land hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Forest,
    Hills,
    Pasture,
    Fields,
    Mountains,
    /// No production, never carries a number
    Desert,
}

impl Terrain {
    /// The resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Forest => Some(Resource::Wood),
            Terrain::Hills => Some(Resource::Brick),
            Terrain::Pasture => Some(Resource::Sheep),
            Terrain::Fields => Some(Resource::Wheat),
            Terrain::Mountains => Some(Resource::Ore),
            Terrain::Desert => None,
        }
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex {
    /// Position on the hex grid
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production (2-12, None for desert)
    pub token: Option<u8>,
}

impl Hex {
    /// Get the resource this hex produces, if any
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.resource()
    }
}

/// Port types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortKind {
    /// 4 generic ports plus one per resource
    fn standard_set() -> Vec<PortKind> {
        let mut kinds = vec![PortKind::Generic; 4];
        kinds.extend(Resource::ALL.map(PortKind::Specific));
        kinds
    }
}

/// A port on the outward-facing side of a coastal hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub hex: HexCoord,
    /// Which side of `hex` faces the sea
    pub direction: HexDirection,
    pub edge: EdgeId,
    pub kind: PortKind,
}

/// Result of [`Board::generate`]
#[derive(Debug, Clone)]
pub struct BoardGeneration {
    pub board: Board,
    /// Layouts drawn, including the fallback draw when the budget ran out
    pub attempts: u32,
    /// False only when the retry budget was exhausted and the fallback
    /// layout happens to break the fairness rule
    pub fair: bool,
}

/// The generated island: 19 land hexes and 9 ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    hexes: Vec<Hex>,
    ports: Vec<Port>,
}

impl Board {
    /// Assemble a board from explicit parts
    pub fn from_parts(hexes: Vec<Hex>, ports: Vec<Port>) -> Self {
        Self { hexes, ports }
    }

    /// Create a standard board with the thread RNG and the default retry budget
    pub fn standard() -> Self {
        let mut rng = rand::thread_rng();
        Self::generate(&mut rng, DEFAULT_MAX_ATTEMPTS).board
    }

    /// Generate a board whose 6s and 8s are not adjacent.
    ///
    /// Draws whole layouts (terrain and tokens) until one is fair or
    /// `max_attempts` layouts were rejected; then one more layout is drawn and
    /// returned without retrying. Never fails.
    pub fn generate<R: Rng>(rng: &mut R, max_attempts: u32) -> BoardGeneration {
        let mut attempts = 0;
        let hexes = loop {
            attempts += 1;
            let hexes = Self::draw_layout(rng);
            if fairness::is_fair(&hexes) {
                break hexes;
            }
            if attempts >= max_attempts {
                attempts += 1;
                break Self::draw_layout(rng);
            }
        };

        let fair = fairness::is_fair(&hexes);
        let ports = Self::draw_ports(rng);

        BoardGeneration {
            board: Self { hexes, ports },
            attempts,
            fair,
        }
    }

    /// Shuffle terrain onto the canonical hex order, then tokens onto the
    /// non-desert hexes in the same order
    fn draw_layout<R: Rng>(rng: &mut R) -> Vec<Hex> {
        let mut terrains: Vec<Terrain> = TERRAIN_DISTRIBUTION
            .iter()
            .flat_map(|&(terrain, count)| std::iter::repeat(terrain).take(count))
            .collect();
        terrains.shuffle(rng);

        let mut tokens = NUMBER_TOKENS.to_vec();
        tokens.shuffle(rng);
        let mut tokens = tokens.into_iter();

        HexCoord::default()
            .spiral(BOARD_RADIUS)
            .into_iter()
            .zip(terrains)
            .map(|(coord, terrain)| Hex {
                coord,
                terrain,
                token: match terrain {
                    Terrain::Desert => None,
                    _ => tokens.next(),
                },
            })
            .collect()
    }

    /// Place the 9 ports on 9 of the 12 outer hexes, leaving every fourth
    /// position (by angle) empty
    fn draw_ports<R: Rng>(rng: &mut R) -> Vec<Port> {
        let center = HexCoord::default();
        let mut coast = center.ring(BOARD_RADIUS);
        coast.sort_by(|a, b| a.angle().total_cmp(&b.angle()));

        let mut kinds = PortKind::standard_set();
        kinds.shuffle(rng);

        coast
            .into_iter()
            .enumerate()
            .filter(|(i, _)| i % 4 != 3)
            .map(|(_, hex)| hex)
            .zip(kinds)
            .filter_map(|(hex, kind)| {
                let direction = Self::seaward_direction(hex)?;
                let edge = shared_edge(hex, hex.neighbor(direction))?;
                Some(Port {
                    hex,
                    direction,
                    edge,
                    kind,
                })
            })
            .collect()
    }

    /// Off-board direction best aligned with the hex's position vector
    fn seaward_direction(hex: HexCoord) -> Option<HexDirection> {
        let center = HexCoord::default();
        let (hx, hy) = hex.to_pixel(1.0);

        HexDirection::ALL
            .into_iter()
            .filter(|&dir| hex.neighbor(dir).distance_to(&center) > BOARD_RADIUS)
            .map(|dir| {
                let (nx, ny) = hex.neighbor(dir).to_pixel(1.0);
                let dot = (nx - hx) * hx + (ny - hy) * hy;
                (dir, dot)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(dir, _)| dir)
    }

    // ==================== Query Methods ====================

    /// Hexes in canonical order (center, ring 1, ring 2)
    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Get a hex by coordinate
    pub fn hex(&self, coord: &HexCoord) -> Option<&Hex> {
        self.hexes.iter().find(|hex| hex.coord == *coord)
    }

    /// Hexes carrying a given number token
    pub fn hexes_with_token(&self, token: u8) -> impl Iterator<Item = &Hex> {
        self.hexes.iter().filter(move |hex| hex.token == Some(token))
    }

    /// Derive the vertex/edge sets for this board
    pub fn topology(&self) -> Topology {
        Topology::from_hexes(self.hexes.iter().map(|hex| hex.coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn terrain_counts(board: &Board) -> HashMap<Terrain, usize> {
        let mut counts = HashMap::new();
        for hex in board.hexes() {
            *counts.entry(hex.terrain).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_standard_board_has_19_hexes_and_9_ports() {
        let board = Board::standard();
        assert_eq!(board.hexes().len(), 19);
        assert_eq!(board.ports().len(), 9);
    }

    #[test]
    fn test_standard_board_has_correct_terrain_counts() {
        for seed in 0..20 {
            let board = Board::generate(&mut StdRng::seed_from_u64(seed), 100).board;
            let counts = terrain_counts(&board);
            assert_eq!(counts[&Terrain::Forest], 4);
            assert_eq!(counts[&Terrain::Fields], 4);
            assert_eq!(counts[&Terrain::Pasture], 4);
            assert_eq!(counts[&Terrain::Hills], 3);
            assert_eq!(counts[&Terrain::Mountains], 3);
            assert_eq!(counts[&Terrain::Desert], 1);
        }
    }

    #[test]
    fn test_standard_board_has_correct_number_distribution() {
        for seed in 0..20 {
            let board = Board::generate(&mut StdRng::seed_from_u64(seed), 100).board;
            let mut tokens: Vec<u8> = board.hexes().iter().filter_map(|h| h.token).collect();
            tokens.sort_unstable();
            assert_eq!(tokens, NUMBER_TOKENS.to_vec());
        }
    }

    #[test]
    fn test_desert_has_no_number() {
        let board = Board::standard();
        for hex in board.hexes() {
            assert_eq!(
                hex.token.is_none(),
                hex.terrain == Terrain::Desert,
                "only the desert is numberless"
            );
        }
    }

    #[test]
    fn test_generated_boards_are_fair() {
        for seed in 0..50 {
            let generation = Board::generate(&mut StdRng::seed_from_u64(seed), 100);
            assert!(generation.fair);
            assert!(fairness::is_fair(generation.board.hexes()));
            assert!(generation.attempts <= 100);
        }
    }

    #[test]
    fn test_exhausted_budget_still_returns_a_complete_board() {
        let mut rng = StdRng::seed_from_u64(7);
        let generation = Board::generate(&mut rng, 0);
        assert_eq!(generation.board.hexes().len(), 19);
        assert_eq!(generation.board.hexes().iter().filter(|h| h.token.is_some()).count(), 18);
        assert_eq!(generation.board.ports().len(), 9);
    }

    #[test]
    fn test_hexes_follow_canonical_order() {
        let board = Board::standard();
        let coords: Vec<HexCoord> = board.hexes().iter().map(|h| h.coord).collect();
        assert_eq!(coords, HexCoord::default().spiral(BOARD_RADIUS));
    }

    #[test]
    fn test_ports_have_correct_distribution() {
        let board = Board::standard();

        let generic = board
            .ports()
            .iter()
            .filter(|p| p.kind == PortKind::Generic)
            .count();
        assert_eq!(generic, 4, "Should have 4 generic (3:1) ports");

        for resource in Resource::ALL {
            let count = board
                .ports()
                .iter()
                .filter(|p| p.kind == PortKind::Specific(resource))
                .count();
            assert_eq!(count, 1, "Should have one 2:1 port for {:?}", resource);
        }
    }

    #[test]
    fn test_ports_face_the_sea() {
        let board = Board::standard();
        let topology = board.topology();
        let center = HexCoord::default();

        for port in board.ports() {
            assert_eq!(port.hex.distance_to(&center), BOARD_RADIUS);
            assert!(port.hex.neighbor(port.direction).distance_to(&center) > BOARD_RADIUS);
            assert!(topology.contains_edge(port.edge));
            // A coastal side touches only one board hex.
            let [a, b] = port.edge.endpoints();
            let both: Vec<_> = topology
                .hexes_at(a)
                .iter()
                .filter(|h| topology.hexes_at(b).contains(h))
                .collect();
            assert_eq!(both, vec![&port.hex]);
        }
    }

    #[test]
    fn test_ports_sit_on_distinct_hexes() {
        let board = Board::standard();
        let mut hexes: Vec<_> = board.ports().iter().map(|p| p.hex).collect();
        hexes.sort();
        hexes.dedup();
        assert_eq!(hexes.len(), 9);
    }

    #[test]
    fn test_corner_hex_port_points_straight_out() {
        assert_eq!(
            Board::seaward_direction(HexCoord::new(2, 0)),
            Some(HexDirection::East)
        );
        assert_eq!(
            Board::seaward_direction(HexCoord::new(-2, 0)),
            Some(HexDirection::West)
        );
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = Board::generate(&mut StdRng::seed_from_u64(42), 100).board;
        let b = Board::generate(&mut StdRng::seed_from_u64(42), 100).board;
        assert_eq!(a, b);
    }
}
