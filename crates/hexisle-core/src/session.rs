//! Game session state machine.
//!
//! A session owns everything about one game in progress: the board and its
//! topology, the pieces, each seat's hand, the award holders and the card
//! deck. It moves `Setup` → `Main` → `Ended`.
//!
//! Every mutating operation has the same shape: check the caller is the
//! acting player, check the phase, run the pure validator, and only then
//! mutate, recompute affected awards and check for a winner. On any error
//! nothing has changed.

use crate::actions::{GameAction, GameEvent};
use crate::awards::{self, AwardKind, AwardState};
use crate::board::{Board, Resource};
use crate::draft::{self, DraftTurn, SetupPhase};
use crate::geometry::{hex_corners, EdgeId, Topology, VertexId};
use crate::placement::{self, Pieces, RoadRejection, SettlementRejection};
use crate::player::{costs, DevelopmentCard, PlayerId, PlayerState, ResourceGrant};
use crate::victory::{self, PointBreakdown, VictoryResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    WrongPhase,

    #[error("{0}")]
    Settlement(#[from] SettlementRejection),

    #[error("{0}")]
    Road(#[from] RoadRejection),

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Already played a card this turn")]
    CardAlreadyPlayed,

    #[error("You don't have a settlement there")]
    NotYourSettlement,

    #[error("Game is over")]
    GameOver,

    #[error("Not a player in this game")]
    UnknownPlayer,
}

/// Where the snake draft stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementState {
    /// Elementary setup turns completed so far
    pub turn: u32,
    /// Settlement placed this visit, awaiting its road
    pub placed_settlement: Option<VertexId>,
}

/// Roll first, then build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Roll,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainTurn {
    /// Seat index of the acting player
    pub current: usize,
    pub phase: TurnPhase,
    /// Starts at 1
    pub turn_number: u32,
    pub dice: Option<[u8; 2]>,
    pub card_played: bool,
}

impl MainTurn {
    fn starting(current: usize, turn_number: u32) -> Self {
        Self {
            current,
            phase: TurnPhase::Roll,
            turn_number,
            dice: None,
            card_played: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Setup(PlacementState),
    Main(MainTurn),
    Ended { winner: PlayerId },
}

/// The complete state of one game
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Seats in turn order
    seats: Vec<PlayerState>,
    board: Board,
    topology: Topology,
    pieces: Pieces,
    phase: SessionPhase,
    longest_road: AwardState,
    largest_army: AwardState,
    deck: Vec<DevelopmentCard>,
    rng: StdRng,
}

impl GameSession {
    /// Seat `players` in the given order on `board`
    pub fn new(players: Vec<PlayerId>, board: Board) -> Self {
        Self::with_rng(players, board, StdRng::from_entropy())
    }

    /// Same as [`GameSession::new`] with a caller-supplied RNG for dice and
    /// the deck shuffle
    pub fn with_rng(players: Vec<PlayerId>, board: Board, mut rng: StdRng) -> Self {
        let deck = DevelopmentCard::shuffled_deck(&mut rng);
        let topology = board.topology();

        Self {
            seats: players.into_iter().map(PlayerState::new).collect(),
            board,
            topology,
            pieces: Pieces::new(),
            phase: SessionPhase::Setup(PlacementState::default()),
            longest_road: AwardState::default(),
            largest_army: AwardState::default(),
            deck,
            rng,
        }
    }

    // ==================== Queries ====================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn pieces(&self) -> &Pieces {
        &self.pieces
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    /// Player ids in seating order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|seat| seat.id).collect()
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.seats.iter().find(|seat| seat.id == id)
    }

    pub fn seat_of(&self, id: PlayerId) -> Option<usize> {
        self.seats.iter().position(|seat| seat.id == id)
    }

    pub fn longest_road(&self) -> &AwardState {
        &self.longest_road
    }

    pub fn largest_army(&self) -> &AwardState {
        &self.largest_army
    }

    pub fn deck_size(&self) -> usize {
        self.deck.len()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, SessionPhase::Ended { .. })
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            SessionPhase::Ended { winner } => Some(winner),
            _ => None,
        }
    }

    /// The setup turn in progress, if still drafting
    pub fn draft_turn(&self) -> Option<DraftTurn> {
        match self.phase {
            SessionPhase::Setup(state) => draft::draft_turn(state.turn, self.seats.len()),
            _ => None,
        }
    }

    /// Who is expected to act next
    pub fn current_player(&self) -> Option<PlayerId> {
        match self.phase {
            SessionPhase::Setup(_) => self
                .draft_turn()
                .map(|turn| self.seats[turn.player_index].id),
            SessionPhase::Main(turn) => Some(self.seats[turn.current].id),
            SessionPhase::Ended { .. } => None,
        }
    }

    /// The event announcing the current setup turn, for broadcasting when
    /// the game starts or a client catches up
    pub fn placement_turn_event(&self) -> Option<GameEvent> {
        let SessionPhase::Setup(state) = self.phase else {
            return None;
        };
        let turn = self.draft_turn()?;
        Some(GameEvent::PlacementTurn {
            turn_number: state.turn,
            player_index: turn.player_index,
            player: self.seats[turn.player_index].id,
            phase: turn.phase,
            round: turn.round,
        })
    }

    /// Current score of every seat
    pub fn scores(&self) -> BTreeMap<PlayerId, PointBreakdown> {
        self.evaluate_victory().breakdowns
    }

    // ==================== Actions ====================

    /// Dispatch any action to its operation
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::PlaceSettlement(vertex) => self.place_settlement(player, vertex),
            GameAction::PlaceRoad(edge) => self.place_road(player, edge),
            GameAction::RollDice => self.roll_dice(player),
            GameAction::BuildRoad(edge) => self.build_road(player, edge),
            GameAction::BuildSettlement(vertex) => self.build_settlement(player, vertex),
            GameAction::BuildCity(vertex) => self.build_city(player, vertex),
            GameAction::BuyDevelopmentCard => self.buy_development_card(player),
            GameAction::PlayKnight => self.play_knight(player),
            GameAction::EndTurn => self.end_turn(player),
        }
    }

    /// Setup settlement. The second one earns a resource per adjacent
    /// producing hex.
    pub fn place_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let (seat, mut state, turn) = self.authorize_setup(player, SetupPhase::Settlement)?;

        if let Some(rejection) = placement::settlement_rejection(vertex, &self.topology, &self.pieces) {
            return Err(rejection.into());
        }

        let granted = if turn.round == 2 {
            self.hex_resources_at(vertex)
        } else {
            Vec::new()
        };

        self.pieces.place_settlement(vertex, player);
        let hand = &mut self.seats[seat];
        hand.settlements_remaining -= 1;
        hand.resources.add_grants(&granted);

        state.turn += 1;
        state.placed_settlement = Some(vertex);
        self.phase = SessionPhase::Setup(state);

        let mut events = vec![GameEvent::SettlementPlaced {
            player,
            vertex,
            granted,
        }];
        self.refresh_longest_road(&mut events);
        self.check_victory(&mut events);
        events.extend(self.placement_turn_event());

        Ok(events)
    }

    /// Setup road, touching the settlement placed this visit. The last one
    /// ends the draft.
    pub fn place_road(&mut self, player: PlayerId, edge: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        let (seat, mut state, _) = self.authorize_setup(player, SetupPhase::Road)?;

        if let Some(rejection) =
            placement::setup_road_rejection(edge, &self.topology, &self.pieces, state.placed_settlement)
        {
            return Err(rejection.into());
        }

        self.pieces.place_road(edge, player);
        self.seats[seat].roads_remaining -= 1;

        state.turn += 1;
        state.placed_settlement = None;
        self.phase = SessionPhase::Setup(state);

        let mut events = vec![GameEvent::RoadPlaced { player, edge }];
        self.refresh_longest_road(&mut events);
        self.check_victory(&mut events);

        if draft::is_setup_complete(state.turn, self.seats.len()) && !self.is_over() {
            let turn = MainTurn::starting(0, 1);
            let starting_player = self.seats[turn.current].id;
            self.phase = SessionPhase::Main(turn);

            events.push(GameEvent::SetupComplete { starting_player });
            events.push(GameEvent::TurnStarted {
                player: starting_player,
                turn_number: turn.turn_number,
            });
        } else {
            events.extend(self.placement_turn_event());
        }

        Ok(events)
    }

    /// Roll two dice. Every settlement on a hex with the rolled number
    /// collects one of its resource, every city two; a 7 produces nothing.
    pub fn roll_dice(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let mut turn = self.authorize_main(player)?;
        if turn.phase != TurnPhase::Roll {
            return Err(GameError::WrongPhase);
        }

        let dice = [self.rng.gen_range(1..=6), self.rng.gen_range(1..=6)];
        let total = dice[0] + dice[1];

        let produced = if total == 7 {
            BTreeMap::new()
        } else {
            self.production_for(total)
        };
        for (owner, grants) in &produced {
            if let Some(seat) = self.seat_of(*owner) {
                self.seats[seat].resources.add_grants(grants);
            }
        }

        turn.phase = TurnPhase::Main;
        turn.dice = Some(dice);
        self.phase = SessionPhase::Main(turn);

        Ok(vec![GameEvent::DiceRolled {
            player,
            dice,
            total,
            produced,
        }])
    }

    pub fn build_road(&mut self, player: PlayerId, edge: EdgeId) -> Result<Vec<GameEvent>, GameError> {
        let turn = self.authorize_main(player)?;
        if turn.phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }

        if let Some(rejection) = placement::road_rejection(player, edge, &self.topology, &self.pieces) {
            return Err(rejection.into());
        }

        let hand = &mut self.seats[turn.current];
        if hand.roads_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !hand.resources.try_subtract(&costs::road()) {
            return Err(GameError::CannotAfford);
        }
        hand.roads_remaining -= 1;
        self.pieces.place_road(edge, player);

        let mut events = vec![GameEvent::RoadPlaced { player, edge }];
        self.refresh_longest_road(&mut events);
        self.check_victory(&mut events);

        Ok(events)
    }

    pub fn build_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let turn = self.authorize_main(player)?;
        if turn.phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }

        if let Some(rejection) =
            placement::connected_settlement_rejection(player, vertex, &self.topology, &self.pieces)
        {
            return Err(rejection.into());
        }

        let hand = &mut self.seats[turn.current];
        if hand.settlements_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !hand.resources.try_subtract(&costs::settlement()) {
            return Err(GameError::CannotAfford);
        }
        hand.settlements_remaining -= 1;
        self.pieces.place_settlement(vertex, player);

        let mut events = vec![GameEvent::SettlementPlaced {
            player,
            vertex,
            granted: Vec::new(),
        }];
        // A new settlement can cut an opponent's road.
        self.refresh_longest_road(&mut events);
        self.check_victory(&mut events);

        Ok(events)
    }

    /// Upgrade a settlement; the settlement piece goes back to the supply.
    pub fn build_city(&mut self, player: PlayerId, vertex: VertexId) -> Result<Vec<GameEvent>, GameError> {
        let turn = self.authorize_main(player)?;
        if turn.phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }

        match self.pieces.settlement_at(vertex) {
            Some(settlement) if settlement.owner == player && !settlement.city => {}
            _ => return Err(GameError::NotYourSettlement),
        }

        let hand = &mut self.seats[turn.current];
        if hand.cities_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !hand.resources.try_subtract(&costs::city()) {
            return Err(GameError::CannotAfford);
        }
        hand.cities_remaining -= 1;
        hand.settlements_remaining += 1;
        self.pieces.upgrade_to_city(vertex);

        let mut events = vec![GameEvent::CityBuilt { player, vertex }];
        self.check_victory(&mut events);

        Ok(events)
    }

    pub fn buy_development_card(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let turn = self.authorize_main(player)?;
        if turn.phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }

        if self.deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }
        let hand = &mut self.seats[turn.current];
        if !hand.resources.try_subtract(&costs::development_card()) {
            return Err(GameError::CannotAfford);
        }
        let Some(card) = self.deck.pop() else {
            return Err(GameError::EmptyDeck);
        };
        hand.dev_cards_bought_this_turn.push(card);

        let mut events = vec![GameEvent::DevelopmentCardBought {
            player,
            remaining: self.deck.len(),
        }];
        // Victory point cards count as soon as they're bought.
        self.check_victory(&mut events);

        Ok(events)
    }

    /// Play a knight from hand, before or after rolling
    pub fn play_knight(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let mut turn = self.authorize_main(player)?;
        if turn.card_played {
            return Err(GameError::CardAlreadyPlayed);
        }

        let hand = &mut self.seats[turn.current];
        if !hand.play_dev_card(DevelopmentCard::Knight) {
            return Err(GameError::NoSuchCard);
        }
        let knights = hand.played_knights;

        turn.card_played = true;
        self.phase = SessionPhase::Main(turn);

        let mut events = vec![GameEvent::KnightPlayed { player, knights }];
        self.refresh_largest_army(&mut events);
        self.check_victory(&mut events);

        Ok(events)
    }

    /// Pass the turn to the next seat
    pub fn end_turn(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let turn = self.authorize_main(player)?;
        if turn.phase != TurnPhase::Main {
            return Err(GameError::WrongPhase);
        }

        self.seats[turn.current].end_turn();

        let next = MainTurn::starting((turn.current + 1) % self.seats.len(), turn.turn_number + 1);
        self.phase = SessionPhase::Main(next);

        Ok(vec![GameEvent::TurnStarted {
            player: self.seats[next.current].id,
            turn_number: next.turn_number,
        }])
    }

    // ==================== Helper Methods ====================

    fn seat_index(&self, player: PlayerId) -> Result<usize, GameError> {
        self.seat_of(player).ok_or(GameError::UnknownPlayer)
    }

    fn authorize_setup(
        &self,
        player: PlayerId,
        expected: SetupPhase,
    ) -> Result<(usize, PlacementState, DraftTurn), GameError> {
        let seat = self.seat_index(player)?;
        match self.phase {
            SessionPhase::Ended { .. } => Err(GameError::GameOver),
            SessionPhase::Main(turn) if turn.current != seat => Err(GameError::NotYourTurn),
            SessionPhase::Main(_) => Err(GameError::WrongPhase),
            SessionPhase::Setup(state) => {
                let turn = draft::draft_turn(state.turn, self.seats.len()).ok_or(GameError::WrongPhase)?;
                if turn.player_index != seat {
                    return Err(GameError::NotYourTurn);
                }
                if turn.phase != expected {
                    return Err(GameError::WrongPhase);
                }
                Ok((seat, state, turn))
            }
        }
    }

    fn authorize_main(&self, player: PlayerId) -> Result<MainTurn, GameError> {
        let seat = self.seat_index(player)?;
        match self.phase {
            SessionPhase::Ended { .. } => Err(GameError::GameOver),
            SessionPhase::Setup(_) if self.current_player() != Some(player) => Err(GameError::NotYourTurn),
            SessionPhase::Setup(_) => Err(GameError::WrongPhase),
            SessionPhase::Main(turn) if turn.current != seat => Err(GameError::NotYourTurn),
            SessionPhase::Main(turn) => Ok(turn),
        }
    }

    /// One unit per adjacent producing hex, aggregated by resource
    fn hex_resources_at(&self, vertex: VertexId) -> Vec<ResourceGrant> {
        let mut counts: BTreeMap<Resource, u32> = BTreeMap::new();
        for resource in self
            .topology
            .hexes_at(vertex)
            .iter()
            .filter_map(|coord| self.board.hex(coord))
            .filter_map(|hex| hex.resource())
        {
            *counts.entry(resource).or_insert(0) += 1;
        }
        into_grants(counts)
    }

    fn production_for(&self, total: u8) -> BTreeMap<PlayerId, Vec<ResourceGrant>> {
        let mut counts: BTreeMap<PlayerId, BTreeMap<Resource, u32>> = BTreeMap::new();
        for hex in self.board.hexes_with_token(total) {
            let Some(resource) = hex.resource() else {
                continue;
            };
            for vertex in hex_corners(hex.coord) {
                if let Some(settlement) = self.pieces.settlement_at(vertex) {
                    let amount = if settlement.city { 2 } else { 1 };
                    *counts
                        .entry(settlement.owner)
                        .or_default()
                        .entry(resource)
                        .or_insert(0) += amount;
                }
            }
        }
        counts
            .into_iter()
            .map(|(owner, resources)| (owner, into_grants(resources)))
            .collect()
    }

    fn refresh_longest_road(&mut self, events: &mut Vec<GameEvent>) {
        let lengths = awards::road_lengths(&self.player_ids(), &self.topology, &self.pieces);
        let outcome = awards::recalculate(AwardKind::LongestRoad, lengths, &self.longest_road);
        self.longest_road = outcome.state;
        events.push(GameEvent::LongestRoadUpdated(outcome));
    }

    fn refresh_largest_army(&mut self, events: &mut Vec<GameEvent>) {
        let knights = self
            .seats
            .iter()
            .map(|seat| (seat.id, seat.played_knights))
            .collect();
        let outcome = awards::recalculate(AwardKind::LargestArmy, knights, &self.largest_army);
        self.largest_army = outcome.state;
        events.push(GameEvent::LargestArmyUpdated(outcome));
    }

    fn evaluate_victory(&self) -> VictoryResult {
        victory::check_for_victory(
            &self.player_ids(),
            self.pieces.settlements(),
            self.longest_road.holder,
            self.largest_army.holder,
            |id| self.player(*id).map_or(0, PlayerState::victory_cards),
        )
    }

    fn check_victory(&mut self, events: &mut Vec<GameEvent>) {
        let result = self.evaluate_victory();
        if let Some(winner) = result.winner {
            self.phase = SessionPhase::Ended { winner };
            events.push(GameEvent::Victory(result));
        }
    }
}

fn into_grants(counts: BTreeMap<Resource, u32>) -> Vec<ResourceGrant> {
    counts
        .into_iter()
        .map(|(resource, count)| ResourceGrant { resource, count })
        .collect()
}
