//! The no-adjacent-red-numbers rule for generated boards.

use crate::board::Hex;
use crate::hex::HexCoord;
use std::collections::HashMap;

/// 6 and 8 are the most likely rolls after 7
pub fn is_high_probability(token: u8) -> bool {
    token == 6 || token == 8
}

/// True when no two hexes carrying a 6 or 8 are neighbours.
pub fn is_fair(hexes: &[Hex]) -> bool {
    let tokens: HashMap<HexCoord, u8> = hexes
        .iter()
        .filter_map(|hex| hex.token.map(|token| (hex.coord, token)))
        .collect();

    tokens
        .iter()
        .filter(|&(_, &token)| is_high_probability(token))
        .all(|(coord, _)| {
            coord.neighbors().iter().all(|neighbor| {
                tokens
                    .get(neighbor)
                    .map_or(true, |&token| !is_high_probability(token))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Resource, Terrain};

    fn hex(q: i32, r: i32, token: Option<u8>) -> Hex {
        Hex {
            coord: HexCoord::new(q, r),
            terrain: if token.is_some() {
                Terrain::Fields
            } else {
                Terrain::Desert
            },
            token,
        }
    }

    #[test]
    fn test_adjacent_six_and_eight_is_unfair() {
        let hexes = vec![hex(0, 0, Some(6)), hex(1, 0, Some(8))];
        assert!(!is_fair(&hexes));
    }

    #[test]
    fn test_adjacent_pair_of_sixes_is_unfair() {
        let hexes = vec![hex(0, 0, Some(6)), hex(0, 1, Some(6))];
        assert!(!is_fair(&hexes));
    }

    #[test]
    fn test_separated_red_numbers_are_fair() {
        let hexes = vec![
            hex(0, 0, Some(6)),
            hex(1, 0, Some(5)),
            hex(2, 0, Some(8)),
            hex(-1, 0, None),
        ];
        assert!(is_fair(&hexes));
    }

    #[test]
    fn test_terrain_does_not_matter() {
        let mut hexes = vec![hex(0, 0, Some(8)), hex(-1, 1, Some(9))];
        hexes[1].terrain = Terrain::Mountains;
        assert!(is_fair(&hexes));
        assert_eq!(hexes[1].terrain.resource(), Some(Resource::Ore));
    }
}
