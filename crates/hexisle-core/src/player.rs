//! Per-player state: resources, action cards and remaining pieces.
//!
//! This module contains:
//! - ResourceHand for managing resource counts
//! - Development card types and the standard deck
//! - Building costs
//! - PlayerState, the session's per-seat bookkeeping

use crate::board::Resource;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable player identity; survives reconnects
pub type PlayerId = Uuid;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentCard {
    /// Counts toward Largest Army
    Knight,
    /// Worth 1 VP, hidden until someone wins
    VictoryPoint,
    RoadBuilding,
    YearOfPlenty,
    Monopoly,
}

impl DevelopmentCard {
    /// Create the standard development card deck (25 cards)
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(25);
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(14));
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(5));
        deck.extend(std::iter::repeat(DevelopmentCard::RoadBuilding).take(2));
        deck.extend(std::iter::repeat(DevelopmentCard::YearOfPlenty).take(2));
        deck.extend(std::iter::repeat(DevelopmentCard::Monopoly).take(2));
        deck
    }

    /// Standard deck, shuffled
    pub fn shuffled_deck<R: Rng>(rng: &mut R) -> Vec<DevelopmentCard> {
        let mut deck = Self::standard_deck();
        deck.shuffle(rng);
        deck
    }
}

/// One entry of a resource grant: `count` units of `resource`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGrant {
    pub resource: Resource,
    pub count: u32,
}

/// A hand of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.wood + self.brick + self.sheep + self.wheat + self.ore
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Brick => &mut self.brick,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Ore => &mut self.ore,
        }
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        *self.slot(resource) += amount;
    }

    /// Add every entry of a grant
    pub fn add_grants(&mut self, grants: &[ResourceGrant]) {
        for grant in grants {
            self.add(grant.resource, grant.count);
        }
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL
            .iter()
            .all(|&resource| self.get(resource) >= cost.get(resource))
    }

    /// Try to subtract, returning false (and leaving the hand untouched) if
    /// insufficient
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            *self.slot(resource) -= cost.get(resource);
        }
        true
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// 1 wood, 1 brick, 1 sheep, 1 wheat
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// 2 wheat, 3 ore
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 0, 2, 3)
    }

    /// 1 sheep, 1 wheat, 1 ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// A single seat's state inside a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub resources: ResourceHand,
    /// Development cards in hand (playable)
    pub dev_cards: Vec<DevelopmentCard>,
    /// Development cards bought this turn (can't be played same turn)
    pub dev_cards_bought_this_turn: Vec<DevelopmentCard>,
    /// Number of knights played (for Largest Army)
    pub played_knights: u32,
    pub settlements_remaining: u32,
    pub cities_remaining: u32,
    pub roads_remaining: u32,
}

impl PlayerState {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            resources: ResourceHand::new(),
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            played_knights: 0,
            settlements_remaining: 5,
            cities_remaining: 4,
            roads_remaining: 15,
        }
    }

    /// Victory point cards held, bought this turn or earlier
    pub fn victory_cards(&self) -> u32 {
        self.dev_cards
            .iter()
            .chain(&self.dev_cards_bought_this_turn)
            .filter(|c| matches!(c, DevelopmentCard::VictoryPoint))
            .count() as u32
    }

    /// Called at end of turn - move bought cards to playable pile
    pub fn end_turn(&mut self) {
        self.dev_cards.append(&mut self.dev_cards_bought_this_turn);
    }

    /// Check if player has a playable development card of given type
    pub fn has_playable_dev_card(&self, card_type: DevelopmentCard) -> bool {
        self.dev_cards.contains(&card_type)
    }

    /// Play a development card (removes it from hand)
    pub fn play_dev_card(&mut self, card_type: DevelopmentCard) -> bool {
        match self.dev_cards.iter().position(|c| *c == card_type) {
            Some(pos) => {
                self.dev_cards.remove(pos);
                if card_type == DevelopmentCard::Knight {
                    self.played_knights += 1;
                }
                true
            }
            None => false,
        }
    }
}
