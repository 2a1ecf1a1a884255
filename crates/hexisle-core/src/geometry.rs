//! Position-derived vertex and edge identities, and the per-board topology.
//!
//! A vertex is identified by where it sits, not by which hex describes it:
//! corner positions are computed in pixel space and snapped onto an integer
//! lattice (x in units of √3/2, y in units of 1/2 for a unit hex). Any hex
//! touching the corner therefore produces the same [`VertexId`]. An edge is
//! the sorted pair of its endpoint ids.

use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

const LATTICE_X: f64 = 0.866_025_403_784_438_6; // √3 / 2
const LATTICE_Y: f64 = 0.5;

/// A corner shared by up to three hexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId {
    pub x: i32,
    pub y: i32,
}

impl VertexId {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Snap a unit-hex pixel position onto the vertex lattice
    pub fn from_pixel(x: f64, y: f64) -> Self {
        Self {
            x: (x / LATTICE_X).round() as i32,
            y: (y / LATTICE_Y).round() as i32,
        }
    }

    /// Unit-hex pixel position of this vertex
    pub fn to_pixel(&self) -> (f64, f64) {
        (self.x as f64 * LATTICE_X, self.y as f64 * LATTICE_Y)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A side shared by up to two hexes, stored as its sorted endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[VertexId; 2]", into = "[VertexId; 2]")]
pub struct EdgeId {
    a: VertexId,
    b: VertexId,
}

impl EdgeId {
    /// Build an edge from its endpoints in either order
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    pub fn endpoints(&self) -> [VertexId; 2] {
        [self.a, self.b]
    }

    /// Whether `vertex` is one of the two endpoints
    pub fn touches(&self, vertex: VertexId) -> bool {
        self.a == vertex || self.b == vertex
    }

    /// The endpoint that isn't `vertex`
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        if self.a == vertex {
            Some(self.b)
        } else if self.b == vertex {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

impl From<EdgeId> for [VertexId; 2] {
    fn from(edge: EdgeId) -> Self {
        edge.endpoints()
    }
}

impl TryFrom<[VertexId; 2]> for EdgeId {
    type Error = &'static str;

    fn try_from([a, b]: [VertexId; 2]) -> Result<Self, Self::Error> {
        if a == b {
            return Err("edge endpoints must differ");
        }
        Ok(EdgeId::new(a, b))
    }
}

/// The six corner ids of a hex, clockwise from the top corner
pub fn hex_corners(hex: HexCoord) -> [VertexId; 6] {
    hex.corner_pixels(1.0).map(|(x, y)| VertexId::from_pixel(x, y))
}

/// The six side ids of a hex, side `i` joining corners `i` and `i + 1`
pub fn hex_sides(hex: HexCoord) -> [EdgeId; 6] {
    let corners = hex_corners(hex);
    std::array::from_fn(|i| EdgeId::new(corners[i], corners[(i + 1) % 6]))
}

/// The side two hexes share, if they are adjacent
pub fn shared_edge(a: HexCoord, b: HexCoord) -> Option<EdgeId> {
    if !a.is_adjacent(&b) {
        return None;
    }
    let theirs = hex_sides(b);
    hex_sides(a).into_iter().find(|side| theirs.contains(side))
}

/// Canonical vertex/edge sets and adjacency for one board.
///
/// Built once from the board's hexes and cached by the session; every
/// placement query goes through it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    vertices: BTreeSet<VertexId>,
    edges: BTreeSet<EdgeId>,
    vertex_hexes: HashMap<VertexId, Vec<HexCoord>>,
    vertex_neighbors: HashMap<VertexId, Vec<VertexId>>,
    vertex_edges: HashMap<VertexId, Vec<EdgeId>>,
}

impl Topology {
    pub fn from_hexes<I>(hexes: I) -> Self
    where
        I: IntoIterator<Item = HexCoord>,
    {
        let mut topology = Topology::default();

        for hex in hexes {
            for corner in hex_corners(hex) {
                topology.vertices.insert(corner);
                topology.vertex_hexes.entry(corner).or_default().push(hex);
            }
            for side in hex_sides(hex) {
                if !topology.edges.insert(side) {
                    continue;
                }
                let [a, b] = side.endpoints();
                topology.vertex_neighbors.entry(a).or_default().push(b);
                topology.vertex_neighbors.entry(b).or_default().push(a);
                topology.vertex_edges.entry(a).or_default().push(side);
                topology.vertex_edges.entry(b).or_default().push(side);
            }
        }

        topology
    }

    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        self.edges.contains(&edge)
    }

    /// All vertices, in lattice order
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().copied()
    }

    /// All edges, in lattice order
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().copied()
    }

    /// Board hexes touching a vertex (1 to 3)
    pub fn hexes_at(&self, vertex: VertexId) -> &[HexCoord] {
        self.vertex_hexes.get(&vertex).map_or(&[], Vec::as_slice)
    }

    /// Vertices one edge away (2 or 3)
    pub fn neighbors(&self, vertex: VertexId) -> &[VertexId] {
        self.vertex_neighbors.get(&vertex).map_or(&[], Vec::as_slice)
    }

    /// Edges ending at a vertex (2 or 3)
    pub fn edges_at(&self, vertex: VertexId) -> &[EdgeId] {
        self.vertex_edges.get(&vertex).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{HexDirection, BOARD_RADIUS};

    fn island() -> Topology {
        Topology::from_hexes(HexCoord::default().spiral(BOARD_RADIUS))
    }

    #[test]
    fn test_standard_island_counts() {
        let topology = island();
        assert_eq!(topology.vertices().count(), 54);
        assert_eq!(topology.edges().count(), 72);
    }

    #[test]
    fn test_neighbouring_hexes_agree_on_corner_ids() {
        let a = HexCoord::new(0, 0);
        let b = a.neighbor(HexDirection::East);
        let shared: Vec<_> = hex_corners(a)
            .into_iter()
            .filter(|c| hex_corners(b).contains(c))
            .collect();
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn test_shared_edge_is_symmetric() {
        let a = HexCoord::new(1, -1);
        let b = HexCoord::new(1, 0);
        let edge = shared_edge(a, b).expect("adjacent hexes share a side");
        assert_eq!(Some(edge), shared_edge(b, a));
        assert_eq!(shared_edge(a, HexCoord::new(-1, 1)), None);
    }

    #[test]
    fn test_edge_id_is_order_independent() {
        let a = VertexId::new(0, -2);
        let b = VertexId::new(1, -1);
        assert_eq!(EdgeId::new(a, b), EdgeId::new(b, a));
        assert_eq!(EdgeId::new(a, b).other_end(a), Some(b));
        assert_eq!(EdgeId::new(a, b).other_end(VertexId::new(9, 9)), None);
    }

    #[test]
    fn test_center_vertex_touches_three_hexes() {
        let topology = island();
        let top_of_center = hex_corners(HexCoord::default())[0];
        assert_eq!(topology.hexes_at(top_of_center).len(), 3);
        assert_eq!(topology.neighbors(top_of_center).len(), 3);
        assert_eq!(topology.edges_at(top_of_center).len(), 3);
    }

    #[test]
    fn test_vertex_edges_contain_vertex() {
        let topology = island();
        for vertex in topology.vertices() {
            for edge in topology.edges_at(vertex) {
                assert!(edge.touches(vertex));
            }
        }
    }

    #[test]
    fn test_edge_id_json_shape() {
        let edge = EdgeId::new(VertexId::new(1, -1), VertexId::new(0, -2));
        let json = serde_json::to_string(&edge).unwrap();
        assert_eq!(json, r#"[{"x":0,"y":-2},{"x":1,"y":-1}]"#);
        let back: EdgeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edge);
    }
}
