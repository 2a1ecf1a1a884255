//! Victory point scoring and win detection.

use crate::geometry::VertexId;
use crate::placement::Settlement;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const VICTORY_POINTS_TO_WIN: u32 = 10;

const LONGEST_ROAD_POINTS: u32 = 2;
const LARGEST_ARMY_POINTS: u32 = 2;

/// Where a player's points come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointBreakdown {
    pub settlements: u32,
    pub cities: u32,
    pub longest_road: u32,
    pub largest_army: u32,
    pub victory_cards: u32,
    pub total: u32,
}

/// Outcome of one victory check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VictoryResult {
    pub winner: Option<PlayerId>,
    pub breakdowns: BTreeMap<PlayerId, PointBreakdown>,
    /// Hidden victory cards per player, filled in only once someone has won
    pub revealed: BTreeMap<PlayerId, u32>,
}

impl VictoryResult {
    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }
}

pub fn calculate_points(
    player: PlayerId,
    settlements: &HashMap<VertexId, Settlement>,
    longest_road_holder: Option<PlayerId>,
    largest_army_holder: Option<PlayerId>,
    victory_cards: u32,
) -> PointBreakdown {
    let (cities, plain): (Vec<&Settlement>, Vec<&Settlement>) = settlements
        .values()
        .filter(|s| s.owner == player)
        .partition(|s| s.city);

    let settlements = plain.len() as u32;
    let cities = 2 * cities.len() as u32;
    let longest_road = if longest_road_holder == Some(player) {
        LONGEST_ROAD_POINTS
    } else {
        0
    };
    let largest_army = if largest_army_holder == Some(player) {
        LARGEST_ARMY_POINTS
    } else {
        0
    };

    PointBreakdown {
        settlements,
        cities,
        longest_road,
        largest_army,
        victory_cards,
        total: settlements + cities + longest_road + largest_army + victory_cards,
    }
}

/// Score every player and pick the winner.
///
/// Players are checked in seating order and the first to reach the target
/// wins, even if someone later in the order scores higher.
pub fn check_for_victory<F>(
    players: &[PlayerId],
    settlements: &HashMap<VertexId, Settlement>,
    longest_road_holder: Option<PlayerId>,
    largest_army_holder: Option<PlayerId>,
    victory_cards: F,
) -> VictoryResult
where
    F: Fn(&PlayerId) -> u32,
{
    let mut result = VictoryResult::default();

    for player in players {
        let breakdown = calculate_points(
            *player,
            settlements,
            longest_road_holder,
            largest_army_holder,
            victory_cards(player),
        );
        if result.winner.is_none() && breakdown.total >= VICTORY_POINTS_TO_WIN {
            result.winner = Some(*player);
        }
        result.breakdowns.insert(*player, breakdown);
    }

    if result.has_winner() {
        result.revealed = result
            .breakdowns
            .iter()
            .filter(|(_, b)| b.victory_cards > 0)
            .map(|(player, b)| (*player, b.victory_cards))
            .collect();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn build(map: &mut HashMap<VertexId, Settlement>, owner: PlayerId, count: usize, city: bool) {
        for _ in 0..count {
            let x = map.len() as i32;
            map.insert(VertexId::new(x, 0), Settlement { owner, city });
        }
    }

    #[test]
    fn test_point_sources() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let mut settlements = HashMap::new();
        build(&mut settlements, p1, 2, false);
        build(&mut settlements, p1, 1, true);
        build(&mut settlements, p2, 3, false);

        let breakdown = calculate_points(p1, &settlements, Some(p1), Some(p2), 1);
        assert_eq!(
            breakdown,
            PointBreakdown {
                settlements: 2,
                cities: 2,
                longest_road: 2,
                largest_army: 0,
                victory_cards: 1,
                total: 7,
            }
        );
    }

    #[test]
    fn test_no_winner_below_target() {
        let p1 = Uuid::new_v4();
        let mut settlements = HashMap::new();
        build(&mut settlements, p1, 4, true);

        let result = check_for_victory(&[p1], &settlements, None, None, |_| 1);
        assert_eq!(result.winner, None);
        assert_eq!(result.breakdowns[&p1].total, 9);
        assert!(result.revealed.is_empty());
    }

    #[test]
    fn test_seating_order_breaks_simultaneous_wins() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let mut settlements = HashMap::new();
        build(&mut settlements, p1, 4, true);
        build(&mut settlements, p1, 2, false);
        build(&mut settlements, p2, 4, true);
        build(&mut settlements, p2, 1, false);

        // p2 has 11, p1 has 10, but p1 sits first.
        let result = check_for_victory(&[p1, p2], &settlements, None, None, |p| {
            if *p == p2 {
                2
            } else {
                0
            }
        });
        assert_eq!(result.winner, Some(p1));
        assert_eq!(result.breakdowns[&p2].total, 11);
    }

    #[test]
    fn test_win_reveals_victory_cards() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let p3 = Uuid::new_v4();
        let mut settlements = HashMap::new();
        build(&mut settlements, p1, 4, true);

        let cards = |p: &PlayerId| {
            if *p == p1 {
                2
            } else if *p == p3 {
                1
            } else {
                0
            }
        };
        let result = check_for_victory(&[p1, p2, p3], &settlements, None, None, cards);
        assert_eq!(result.winner, Some(p1));

        let expected: BTreeMap<PlayerId, u32> = [(p1, 2), (p3, 1)].into_iter().collect();
        assert_eq!(result.revealed, expected);
    }
}
