//! Hex coordinate system using axial coordinates (q, r).
//!
//! Hexes are laid out pointy-top. Corners and sides are not addressed through
//! a hex's local indexing here; see [`crate::geometry`] for the position-derived
//! vertex and edge identities.

use serde::{Deserialize, Serialize};

/// Radius of the standard island (center + 2 rings)
pub const BOARD_RADIUS: u32 = 2;

/// Direction from a hex to one of its six neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HexDirection {
    /// Northeast (top-right)
    NorthEast,
    /// East (right)
    East,
    /// Southeast (bottom-right)
    SouthEast,
    /// Southwest (bottom-left)
    SouthWest,
    /// West (left)
    West,
    /// Northwest (top-left)
    NorthWest,
}

impl HexDirection {
    /// All directions in clockwise order starting from NorthEast
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NorthEast,
        HexDirection::East,
        HexDirection::SouthEast,
        HexDirection::SouthWest,
        HexDirection::West,
        HexDirection::NorthWest,
    ];

    /// Axial offset (dq, dr) of the neighbour in this direction
    pub const fn offset(self) -> (i32, i32) {
        match self {
            HexDirection::East => (1, 0),
            HexDirection::NorthEast => (1, -1),
            HexDirection::NorthWest => (0, -1),
            HexDirection::West => (-1, 0),
            HexDirection::SouthWest => (-1, 1),
            HexDirection::SouthEast => (0, 1),
        }
    }
}

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighbouring hexes in [`HexDirection::ALL`] order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        HexDirection::ALL.map(|dir| self.neighbor(dir))
    }

    /// Get the neighbour in a specific direction
    pub fn neighbor(&self, direction: HexDirection) -> HexCoord {
        let (dq, dr) = direction.offset();
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Whether two hexes share a side
    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        self.distance_to(other) == 1
    }

    /// Convert to pixel coordinates (center of hex).
    /// Uses pointy-top orientation with the given hex size (radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }

    /// Pixel positions of the six corners, clockwise from the top corner
    pub fn corner_pixels(&self, hex_size: f64) -> [(f64, f64); 6] {
        let (cx, cy) = self.to_pixel(hex_size);
        // Pointy-top corners sit at -90°, -30°, 30°, 90°, 150°, 210°.
        std::array::from_fn(|i| {
            let angle = (60.0 * i as f64 - 90.0).to_radians();
            (cx + hex_size * angle.cos(), cy + hex_size * angle.sin())
        })
    }

    /// Angle of the hex center around the origin, in radians
    pub fn angle(&self) -> f64 {
        let (x, y) = self.to_pixel(1.0);
        y.atan2(x)
    }

    /// Hexes at exactly `radius` steps from `self`, starting due east and
    /// walking the ring counter-clockwise (as drawn, with y pointing down).
    pub fn ring(&self, radius: u32) -> Vec<HexCoord> {
        if radius == 0 {
            return vec![*self];
        }
        let mut results = Vec::with_capacity(6 * radius as usize);
        // Start `radius` steps east, then walk the six sides.
        let mut hex = *self;
        for _ in 0..radius {
            hex = hex.neighbor(HexDirection::East);
        }
        let walk = [
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
            HexDirection::East,
            HexDirection::NorthEast,
        ];
        for dir in walk {
            for _ in 0..radius {
                results.push(hex);
                hex = hex.neighbor(dir);
            }
        }
        results
    }

    /// Center first, then each ring outward up to `radius`
    pub fn spiral(&self, radius: u32) -> Vec<HexCoord> {
        (0..=radius).flat_map(|r| self.ring(r)).collect()
    }
}
