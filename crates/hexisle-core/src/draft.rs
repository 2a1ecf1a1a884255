//! Snake-order initial placement.
//!
//! Setup is 4×N elementary turns: every player places a settlement then a
//! road going forward (round 1), then again going backward (round 2), so the
//! visiting order is 1, 2, …, N, N, …, 2, 1. Everything here is a pure
//! function of the turn counter and the player count.

use serde::{Deserialize, Serialize};

/// What the acting player is placing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupPhase {
    Settlement,
    Road,
}

/// One elementary setup turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTurn {
    /// Seat index of the acting player
    pub player_index: usize,
    /// 1 going forward, 2 coming back
    pub round: u8,
    pub phase: SetupPhase,
}

/// Total elementary turns in setup
pub fn setup_turns(player_count: usize) -> u32 {
    4 * player_count as u32
}

pub fn is_setup_complete(turn: u32, player_count: usize) -> bool {
    turn >= setup_turns(player_count)
}

/// The turn at position `turn`, or `None` once setup is over
pub fn draft_turn(turn: u32, player_count: usize) -> Option<DraftTurn> {
    if player_count == 0 || is_setup_complete(turn, player_count) {
        return None;
    }

    let n = player_count as u32;
    let phase = if turn % 2 == 0 {
        SetupPhase::Settlement
    } else {
        SetupPhase::Road
    };

    let (player_index, round) = if turn < 2 * n {
        (turn / 2, 1)
    } else {
        (n - 1 - (turn - 2 * n) / 2, 2)
    };

    Some(DraftTurn {
        player_index: player_index as usize,
        round,
        phase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn turn(player_index: usize, round: u8, phase: SetupPhase) -> Option<DraftTurn> {
        Some(DraftTurn {
            player_index,
            round,
            phase,
        })
    }

    #[test]
    fn test_three_player_examples() {
        assert_eq!(draft_turn(0, 3), turn(0, 1, SetupPhase::Settlement));
        assert_eq!(draft_turn(5, 3), turn(2, 1, SetupPhase::Road));
        assert_eq!(draft_turn(6, 3), turn(2, 2, SetupPhase::Settlement));
        assert_eq!(draft_turn(11, 3), turn(0, 2, SetupPhase::Road));
        assert_eq!(draft_turn(12, 3), None);
        assert!(is_setup_complete(12, 3));
        assert!(!is_setup_complete(11, 3));
    }

    #[test]
    fn test_snake_order_for_all_player_counts() {
        for n in 2..=4usize {
            let visits: Vec<usize> = (0..setup_turns(n))
                .step_by(2)
                .map(|t| draft_turn(t, n).unwrap().player_index)
                .collect();

            let mut expected: Vec<usize> = (0..n).collect();
            expected.extend((0..n).rev());
            assert_eq!(visits, expected, "visiting order for {} players", n);
        }
    }

    #[test]
    fn test_each_visit_is_settlement_then_road() {
        for n in 2..=4usize {
            for t in 0..setup_turns(n) {
                let current = draft_turn(t, n).unwrap();
                if t % 2 == 1 {
                    let previous = draft_turn(t - 1, n).unwrap();
                    assert_eq!(current.phase, SetupPhase::Road);
                    assert_eq!(current.player_index, previous.player_index);
                    assert_eq!(current.round, previous.round);
                } else {
                    assert_eq!(current.phase, SetupPhase::Settlement);
                }
            }
        }
    }

    #[test]
    fn test_complete_exactly_at_four_n() {
        for n in 2..=4usize {
            let end = 4 * n as u32;
            assert!(draft_turn(end - 1, n).is_some());
            assert!(draft_turn(end, n).is_none());
            assert!(is_setup_complete(end + 3, n));
        }
    }
}
