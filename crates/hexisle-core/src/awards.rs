//! Longest Road and Largest Army.
//!
//! Both awards share one recalculation rule set; they differ only in the
//! qualifying threshold. Callers recompute from the full per-player metric
//! map after every action that can move it.

use crate::geometry::{EdgeId, Topology, VertexId};
use crate::placement::Pieces;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Minimum road length for Longest Road
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
pub const MIN_LARGEST_ARMY: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardKind {
    LongestRoad,
    LargestArmy,
}

impl AwardKind {
    pub fn threshold(&self) -> u32 {
        match self {
            AwardKind::LongestRoad => MIN_LONGEST_ROAD,
            AwardKind::LargestArmy => MIN_LARGEST_ARMY,
        }
    }
}

/// Who holds an award and the metric they held it with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AwardState {
    pub holder: Option<PlayerId>,
    pub value: u32,
}

impl AwardState {
    pub fn held_by(holder: PlayerId, value: u32) -> Self {
        Self {
            holder: Some(holder),
            value,
        }
    }
}

/// Result of one recalculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardOutcome {
    pub kind: AwardKind,
    pub state: AwardState,
    /// The holder changed (including being vacated)
    pub transferred: bool,
    pub from: Option<PlayerId>,
    pub to: Option<PlayerId>,
    /// Every player's current metric
    pub metrics: BTreeMap<PlayerId, u32>,
}

/// Recompute an award's holder from the current metrics.
///
/// Ties favour the incumbent. A challenger alone at the top takes the award
/// from a sitting holder only by strictly exceeding the holder's recorded
/// value; otherwise the holder keeps it unchanged.
pub fn recalculate(
    kind: AwardKind,
    metrics: BTreeMap<PlayerId, u32>,
    current: &AwardState,
) -> AwardOutcome {
    let keep = |state: AwardState, metrics: BTreeMap<PlayerId, u32>| AwardOutcome {
        kind,
        state,
        transferred: false,
        from: None,
        to: None,
        metrics,
    };

    let max = metrics.values().copied().max().unwrap_or(0);

    if max < kind.threshold() {
        return match current.holder {
            Some(holder) => AwardOutcome {
                kind,
                state: AwardState::default(),
                transferred: true,
                from: Some(holder),
                to: None,
                metrics,
            },
            None => keep(*current, metrics),
        };
    }

    let leaders: Vec<PlayerId> = metrics
        .iter()
        .filter(|(_, &value)| value == max)
        .map(|(player, _)| *player)
        .collect();

    if let [winner] = *leaders.as_slice() {
        return match current.holder {
            Some(holder) if holder == winner => keep(AwardState::held_by(holder, max), metrics),
            // The incumbent is no longer at the top yet the winner hasn't
            // beaten the recorded value: nothing moves.
            Some(_) if max <= current.value => keep(*current, metrics),
            previous => AwardOutcome {
                kind,
                state: AwardState::held_by(winner, max),
                transferred: true,
                from: previous,
                to: Some(winner),
                metrics,
            },
        };
    }

    match current.holder {
        Some(holder) if leaders.contains(&holder) => keep(AwardState::held_by(holder, max), metrics),
        Some(holder) => AwardOutcome {
            kind,
            state: AwardState::default(),
            transferred: true,
            from: Some(holder),
            to: None,
            metrics,
        },
        None => keep(*current, metrics),
    }
}

/// Longest trail through `player`'s roads. A trail never reuses a road and
/// cannot pass through a vertex where an opponent has built.
pub fn longest_road(player: PlayerId, topology: &Topology, pieces: &Pieces) -> u32 {
    let roads: HashSet<EdgeId> = pieces.roads_of(player).collect();
    let mut visited = HashSet::new();

    roads
        .iter()
        .flat_map(|edge| edge.endpoints())
        .map(|start| trail_from(player, start, topology, pieces, &roads, &mut visited))
        .max()
        .unwrap_or(0)
}

fn trail_from(
    player: PlayerId,
    vertex: VertexId,
    topology: &Topology,
    pieces: &Pieces,
    roads: &HashSet<EdgeId>,
    visited: &mut HashSet<EdgeId>,
) -> u32 {
    let mut best = 0;
    for edge in topology.edges_at(vertex) {
        if !roads.contains(edge) || visited.contains(edge) {
            continue;
        }
        let Some(next) = edge.other_end(vertex) else {
            continue;
        };

        visited.insert(*edge);
        let blocked = pieces.owner_at(next).is_some_and(|owner| owner != player);
        let onward = if blocked {
            0
        } else {
            trail_from(player, next, topology, pieces, roads, visited)
        };
        visited.remove(edge);

        best = best.max(1 + onward);
    }
    best
}

/// Road length of every seat, for the Longest Road recalculation
pub fn road_lengths(players: &[PlayerId], topology: &Topology, pieces: &Pieces) -> BTreeMap<PlayerId, u32> {
    players
        .iter()
        .map(|&player| (player, longest_road(player, topology, pieces)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::hex_corners;
    use crate::hex::{HexCoord, BOARD_RADIUS};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn two_players() -> (PlayerId, PlayerId) {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        (ids[0], ids[1])
    }

    fn metrics(pairs: &[(PlayerId, u32)]) -> BTreeMap<PlayerId, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_tie_without_incumbent_awards_nobody() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LargestArmy,
            metrics(&[(p1, 3), (p2, 3)]),
            &AwardState::default(),
        );
        assert_eq!(outcome.state.holder, None);
        assert!(!outcome.transferred);
    }

    #[test]
    fn test_strictly_exceeding_challenger_takes_award() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LargestArmy,
            metrics(&[(p1, 4), (p2, 5)]),
            &AwardState::held_by(p1, 4),
        );
        assert!(outcome.transferred);
        assert_eq!(outcome.from, Some(p1));
        assert_eq!(outcome.to, Some(p2));
        assert_eq!(outcome.state, AwardState::held_by(p2, 5));
    }

    #[test]
    fn test_matching_challenger_never_transfers() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LongestRoad,
            metrics(&[(p1, 6), (p2, 6)]),
            &AwardState::held_by(p1, 6),
        );
        assert!(!outcome.transferred);
        assert_eq!(outcome.state.holder, Some(p1));
    }

    #[test]
    fn test_sole_winner_not_beating_recorded_value_keeps_incumbent() {
        let (p1, p2) = two_players();
        // p1 dropped to 4 after a road break, p2 sits alone at 6, but p1's
        // recorded value is 7.
        let current = AwardState::held_by(p1, 7);
        let outcome = recalculate(AwardKind::LongestRoad, metrics(&[(p1, 4), (p2, 6)]), &current);
        assert!(!outcome.transferred);
        assert_eq!(outcome.state, current);
    }

    #[test]
    fn test_first_qualifier_takes_unheld_award() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LongestRoad,
            metrics(&[(p1, 5), (p2, 2)]),
            &AwardState::default(),
        );
        assert!(outcome.transferred);
        assert_eq!(outcome.from, None);
        assert_eq!(outcome.to, Some(p1));
        assert_eq!(outcome.state, AwardState::held_by(p1, 5));
    }

    #[test]
    fn test_dropping_below_threshold_vacates() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LongestRoad,
            metrics(&[(p1, 4), (p2, 3)]),
            &AwardState::held_by(p1, 5),
        );
        assert!(outcome.transferred);
        assert_eq!(outcome.from, Some(p1));
        assert_eq!(outcome.to, None);
        assert_eq!(outcome.state.holder, None);
    }

    #[test]
    fn test_below_threshold_and_unheld_is_noop() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LargestArmy,
            metrics(&[(p1, 2), (p2, 1)]),
            &AwardState::default(),
        );
        assert!(!outcome.transferred);
        assert_eq!(outcome.state, AwardState::default());
    }

    #[test]
    fn test_tie_excluding_incumbent_vacates() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let [p1, p2, p3] = ids;
        let outcome = recalculate(
            AwardKind::LongestRoad,
            metrics(&[(p1, 5), (p2, 7), (p3, 7)]),
            &AwardState::held_by(p1, 6),
        );
        assert!(outcome.transferred);
        assert_eq!(outcome.from, Some(p1));
        assert_eq!(outcome.to, None);
        assert_eq!(outcome.state.holder, None);
    }

    #[test]
    fn test_holder_growing_refreshes_value() {
        let (p1, p2) = two_players();
        let outcome = recalculate(
            AwardKind::LargestArmy,
            metrics(&[(p1, 4), (p2, 1)]),
            &AwardState::held_by(p1, 3),
        );
        assert!(!outcome.transferred);
        assert_eq!(outcome.state, AwardState::held_by(p1, 4));
    }

    #[test]
    fn test_outcome_always_carries_metrics() {
        let (p1, p2) = two_players();
        let input = metrics(&[(p1, 1), (p2, 0)]);
        let outcome = recalculate(AwardKind::LargestArmy, input.clone(), &AwardState::default());
        assert_eq!(outcome.metrics, input);
    }

    /// Walk `length` roads outward from the top corner of the center hex,
    /// never revisiting a vertex.
    fn lay_chain(pieces: &mut Pieces, topology: &Topology, owner: PlayerId, length: usize) -> Vec<VertexId> {
        let mut path = vec![hex_corners(HexCoord::default())[0]];
        for _ in 0..length {
            let here = *path.last().unwrap();
            let edge = *topology
                .edges_at(here)
                .iter()
                .find(|e| {
                    let next = e.other_end(here).unwrap();
                    !path.contains(&next) && pieces.road_at(**e).is_none()
                })
                .unwrap();
            pieces.place_road(edge, owner);
            path.push(edge.other_end(here).unwrap());
        }
        path
    }

    #[test]
    fn test_longest_road_counts_chain() {
        let topology = Topology::from_hexes(HexCoord::default().spiral(BOARD_RADIUS));
        let mut pieces = Pieces::new();
        let (p1, _) = two_players();

        lay_chain(&mut pieces, &topology, p1, 5);
        assert_eq!(longest_road(p1, &topology, &pieces), 5);
    }

    #[test]
    fn test_opponent_settlement_breaks_road() {
        let topology = Topology::from_hexes(HexCoord::default().spiral(BOARD_RADIUS));
        let mut pieces = Pieces::new();
        let (p1, p2) = two_players();

        let path = lay_chain(&mut pieces, &topology, p1, 5);
        pieces.place_settlement(path[2], p2);
        assert_eq!(longest_road(p1, &topology, &pieces), 3);

        let lengths = road_lengths(&[p1, p2], &topology, &pieces);
        assert_eq!(lengths[&p1], 3);
        assert_eq!(lengths[&p2], 0);
    }

    #[test]
    fn test_own_settlement_does_not_break_road() {
        let topology = Topology::from_hexes(HexCoord::default().spiral(BOARD_RADIUS));
        let mut pieces = Pieces::new();
        let (p1, _) = two_players();

        let path = lay_chain(&mut pieces, &topology, p1, 4);
        pieces.place_settlement(path[2], p1);
        assert_eq!(longest_road(p1, &topology, &pieces), 4);
    }
}
