//! The authoritative state of one game, and its rules.
//!
//! [`GameState`] enumerates the actions the current player can take, applies them, and
//! scores the game. Applying an action is all or nothing: when it returns an `Err`, the
//! state is exactly as it was before the call.

use crate::action::{Action, CardSource, LegalActions, PlayerAction};
use crate::card::{
    CardDealer, CardDealerState, FaceUpRow, TrainColor, NUM_DRAWN_DESTINATION_CARDS,
    NUM_DRAWN_INITIAL_TRAIN_CARDS,
};
use crate::city::CityId;
use crate::distance::DistanceOracle;
use crate::error::{GameError, SetupError};
use crate::map::{Map, RouteId, MAX_PLAYERS};
use crate::player::{Player, PlayerColor, PlayerSummary, NUM_OF_CARS};
use crate::topology::Topology;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use smallvec::{smallvec, SmallVec};
use std::cmp::{max, min};
use std::iter::repeat;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Once a player has this many cars or fewer, the game is over.
pub const END_GAME_CARS: u8 = 2;
/// Number of cards revealed from the close deck when claiming a tunnel.
pub const NUM_TUNNEL_CARDS: usize = 3;

/// How a game is set up.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub num_players: usize,
    /// Seeds every shuffle of the game.
    pub seed: u64,
    pub cars_per_player: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_players: 2,
            seed: 0,
            cars_per_player: NUM_OF_CARS,
        }
    }
}

impl GameConfig {
    pub fn with_players(mut self, num_players: usize) -> Self {
        self.num_players = num_players;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fewer cars make for shorter games.
    pub fn with_cars(mut self, cars_per_player: u8) -> Self {
        self.cars_per_player = cars_per_player;
        self
    }
}

/// Read-only view of a game, handed to the display layer after each turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub turn: usize,
    pub current_player: usize,
    pub card_dealer_state: CardDealerState,
    pub players: SmallVec<[PlayerSummary; MAX_PLAYERS]>,
    pub last_action: Option<PlayerAction>,
    pub is_over: bool,
}

/// In charge of holding all the state of a game, and the transitions amongst players.
///
/// Cloning a `GameState` is a deep copy: the copy can be played on without affecting the
/// original. Only the [`DistanceOracle`], which never changes once built, is shared.
#[derive(Clone, Debug)]
pub struct GameState {
    map: Map,
    card_dealer: CardDealer,
    players: SmallVec<[Player; MAX_PLAYERS]>,
    current_player: usize,
    /// Incremented every time a player finishes their turn.
    turn: usize,
    /// Claim actions per player, dropped whenever a route is claimed or the player's hand changes.
    claim_cache: SmallVec<[Option<Vec<Action>>; MAX_PLAYERS]>,
    distance_oracle: Arc<DistanceOracle>,
    rng: StdRng,
}

impl GameState {
    /// Sets up a game on the given map: cards are shuffled, and every player is dealt their
    /// train cards and destination cards.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::game_state::GameState;
    /// use ticket_to_ride_planner::topology::Topology;
    ///
    /// let game_state = GameState::new(&Topology::usa(), 3, 42).unwrap();
    /// assert_eq!(game_state.players().len(), 3);
    /// assert_eq!(game_state.player(0).train_cards().len(), 4);
    /// assert_eq!(game_state.player(0).destination_cards().len(), 3);
    /// ```
    pub fn new(topology: &Topology, num_players: usize, seed: u64) -> Result<Self, SetupError> {
        Self::with_config(
            topology,
            &GameConfig::default()
                .with_players(num_players)
                .with_seed(seed),
        )
    }

    pub fn with_config(topology: &Topology, config: &GameConfig) -> Result<Self, SetupError> {
        let map = Map::new(topology, config.num_players)?;
        let distance_oracle = Arc::new(DistanceOracle::new(map.num_cities(), map.edges()));
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut card_dealer = CardDealer::new(topology.destination_cards()?, &mut rng);

        let mut players = SmallVec::new();
        for (id, color) in PlayerColor::iter().take(config.num_players).enumerate() {
            let mut player = Player::with_cars(id, color, map.num_cities(), config.cars_per_player);

            for _ in 0..NUM_DRAWN_INITIAL_TRAIN_CARDS {
                player.add_train_card(card_dealer.draw_from_close_train_card_deck(&mut rng)?);
            }
            // All initial destination cards are kept.
            if card_dealer.destination_cards_available() > 0 {
                player.add_destination_cards(card_dealer.draw_from_destination_card_deck(&mut rng)?);
            }

            players.push(player);
        }

        debug!(
            "Starting a game with {} players on a map of {} cities and {} routes.",
            config.num_players,
            map.num_cities(),
            map.routes().len()
        );

        Ok(Self {
            map,
            card_dealer,
            players,
            current_player: 0,
            turn: 0,
            claim_cache: smallvec![None; config.num_players],
            distance_oracle,
            rng,
        })
    }

    #[inline]
    pub fn map(&self) -> &Map {
        &self.map
    }

    #[inline]
    pub fn card_dealer(&self) -> &CardDealer {
        &self.card_dealer
    }

    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// # Panics
    /// If `player_id` is not part of the game.
    #[inline]
    pub fn player(&self, player_id: usize) -> &Player {
        &self.players[player_id]
    }

    #[inline]
    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    /// The player whose turn it is.
    #[inline]
    pub fn current_player(&self) -> usize {
        self.current_player
    }

    #[inline]
    pub fn turn(&self) -> usize {
        self.turn
    }

    #[inline]
    pub fn distance_oracle(&self) -> &Arc<DistanceOracle> {
        &self.distance_oracle
    }

    /// Whether a player has [`END_GAME_CARS`] cars or fewer left.
    pub fn is_terminal(&self) -> bool {
        self.players
            .iter()
            .any(|player| player.cars() <= END_GAME_CARS)
    }

    /// How many cards of the given color exist in the game, in decks and hands alike.
    pub fn count_train_cards(&self, color: TrainColor) -> usize {
        self.card_dealer.count_train_cards(color)
            + self
                .players
                .iter()
                .map(|player| player.train_cards().get(color) as usize)
                .sum::<usize>()
    }

    /// Replaces the RNG driving every shuffle and reveal from now on.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Shuffles the cards hidden to the players, so that a search cannot rely on the actual
    /// order of the decks.
    pub fn determinize(&mut self) {
        self.card_dealer.shuffle_hidden_cards(&mut self.rng);
    }

    pub fn snapshot(&self, last_action: Option<PlayerAction>) -> Snapshot {
        Snapshot {
            turn: self.turn,
            current_player: self.current_player,
            card_dealer_state: self.card_dealer.get_state(),
            players: self.players.iter().map(Player::summary).collect(),
            last_action,
            is_over: self.is_terminal(),
        }
    }

    // Legal actions.

    /// All the actions the current player can take, grouped per family.
    ///
    /// Empty once the game is over.
    pub fn legal_actions(&mut self) -> LegalActions {
        if self.is_terminal() {
            return LegalActions::default();
        }

        LegalActions {
            claims: self.claim_actions(self.current_player),
            card_draws: self.card_draw_actions(),
            destination_draws: self.destination_draw_actions(),
        }
    }

    /// Claim actions affordable by `player_id`, served from the cache when still valid.
    pub fn claim_actions(&mut self, player_id: usize) -> Vec<Action> {
        if let Some(claim_actions) = &self.claim_cache[player_id] {
            return claim_actions.clone();
        }

        let claim_actions = self.enumerate_claim_actions(player_id);
        self.claim_cache[player_id] = Some(claim_actions.clone());
        claim_actions
    }

    fn enumerate_claim_actions(&self, player_id: usize) -> Vec<Action> {
        let player = &self.players[player_id];
        let train_cards = player.train_cards();
        let wilds = train_cards.get(TrainColor::Wild);

        let mut claim_actions = Vec::new();
        for route in self.map.claimable_routes(player_id) {
            if player.cars() <= route.length || wilds < route.locomotives {
                continue;
            }

            let colors: SmallVec<[TrainColor; 8]> = if route.color.is_wild() {
                TrainColor::non_wild().collect()
            } else {
                smallvec![route.color]
            };

            // Paying with wild cards only is the same claim whatever the color.
            let mut all_wilds_offered = false;
            for color in colors {
                let matching = train_cards.get(color);
                if matching + wilds < route.length {
                    continue;
                }

                let min_wilds = max(route.locomotives, route.length.saturating_sub(matching));
                let max_wilds = min(wilds, route.length);
                for wilds_used in min_wilds..=max_wilds {
                    if wilds_used == route.length {
                        if all_wilds_offered {
                            continue;
                        }
                        all_wilds_offered = true;
                    }

                    claim_actions.push(Action::ClaimRoute {
                        route: route.id,
                        city1: route.start,
                        city2: route.end,
                        color,
                        wilds_used,
                    });
                }
            }
        }

        claim_actions
    }

    /// The face-up row and the number of hidden cards left once `source` is drawn.
    fn predict_after_draw(&self, source: CardSource) -> (FaceUpRow, usize) {
        let hidden = self.card_dealer.hidden_train_card_count().saturating_sub(1);
        match source {
            CardSource::FaceUp { slot, .. } => (self.card_dealer.face_up_after_taking(slot), hidden),
            CardSource::Deck => (self.card_dealer.face_up().clone(), hidden),
        }
    }

    fn card_sources(
        face_up: &FaceUpRow,
        hidden: usize,
        allow_wild: bool,
    ) -> SmallVec<[CardSource; 6]> {
        let mut sources: SmallVec<[CardSource; 6]> = face_up
            .iter()
            .enumerate()
            .filter_map(|(slot, card)| card.map(|card| CardSource::FaceUp { slot, card }))
            .filter(|source| {
                allow_wild || !matches!(source, CardSource::FaceUp { card, .. } if card.is_wild())
            })
            .collect();
        if hidden > 0 {
            sources.push(CardSource::Deck);
        }
        sources
    }

    fn card_draw_actions(&self) -> Vec<Action> {
        let first_sources = Self::card_sources(
            self.card_dealer.face_up(),
            self.card_dealer.hidden_train_card_count(),
            true,
        );

        let mut card_draw_actions = Vec::new();
        for first in first_sources {
            if matches!(first, CardSource::FaceUp { card, .. } if card.is_wild()) {
                card_draw_actions.push(Action::DrawTrainCards {
                    first,
                    second: None,
                });
                continue;
            }

            let (face_up, hidden) = self.predict_after_draw(first);
            // The refill of a slot just taken is still hidden: it is not offered, though taking
            // it is accepted once applied.
            let mut second_sources = Self::card_sources(&face_up, hidden, false);
            if let CardSource::FaceUp { slot: taken, .. } = first {
                second_sources.retain(
                    |source| !matches!(source, CardSource::FaceUp { slot, .. } if *slot == taken),
                );
            }
            if second_sources.is_empty() {
                card_draw_actions.push(Action::DrawTrainCards {
                    first,
                    second: None,
                });
            }
            for second in second_sources {
                card_draw_actions.push(Action::DrawTrainCards {
                    first,
                    second: Some(second),
                });
            }
        }

        card_draw_actions
    }

    fn destination_draw_actions(&self) -> Vec<Action> {
        let drawn = self.card_dealer.destination_cards_available();

        (1u8..(1 << drawn))
            .map(|mask| Action::DrawDestinations {
                keep: array_init::array_init(|index| mask & (1 << index) != 0),
            })
            .collect()
    }

    // Transitions.

    /// Applies an action for the current player, then passes the turn to the next player.
    ///
    /// Returns an `Err`, leaving the game untouched, if the action is not allowed.
    pub fn apply(&mut self, action: &Action) -> Result<(), GameError> {
        if self.is_terminal() {
            return Err(GameError::GameOver);
        }

        match *action {
            Action::ClaimRoute {
                route,
                city1,
                city2,
                color,
                wilds_used,
            } => self.claim_route(route, city1, city2, color, wilds_used)?,
            Action::DrawTrainCards { first, second } => self.draw_train_cards(first, second)?,
            Action::DrawDestinations { keep } => self.draw_destination_cards(keep)?,
        }

        self.end_turn();
        Ok(())
    }

    /// Same as [`GameState::apply`], after checking that it is indeed this player's turn.
    pub fn apply_player_action(&mut self, player_action: &PlayerAction) -> Result<(), GameError> {
        if player_action.player != self.current_player {
            return Err(GameError::NotYourTurn {
                player: player_action.player,
                current: self.current_player,
            });
        }

        self.apply(&player_action.action)
    }

    /// Passes the turn of a player that has no action left to take.
    pub fn skip_turn(&mut self) {
        debug!(
            "Player {} has no action left, skipping turn {}.",
            self.current_player, self.turn
        );
        self.end_turn();
    }

    #[inline]
    fn end_turn(&mut self) {
        self.current_player = (self.current_player + 1) % self.players.len();
        self.turn += 1;
    }

    fn invalidate_claim_cache(&mut self) {
        for claim_actions in self.claim_cache.iter_mut() {
            *claim_actions = None;
        }
    }

    fn claim_route(
        &mut self,
        route_id: RouteId,
        city1: CityId,
        city2: CityId,
        color: TrainColor,
        wilds_used: u8,
    ) -> Result<(), GameError> {
        let player_id = self.current_player;

        if !self.map.route(route_id)?.connects(city1, city2) {
            return Err(GameError::RouteMismatch {
                route: route_id,
                start: city1,
                end: city2,
            });
        }

        // The named lane might be taken, in which case its paired lane is tried instead.
        let lane = self.map.resolve_lane(route_id)?;
        let route = self
            .map
            .can_route_be_claimed_by_player(lane, player_id)?
            .clone();

        let player = &self.players[player_id];
        if route.length > player.cars() {
            return Err(GameError::NotEnoughTrains {
                length: route.length,
                left: player.cars(),
            });
        }
        if !route.accepts(color) {
            return Err(GameError::WrongColor {
                route_color: route.color,
                color,
            });
        }
        if wilds_used > route.length {
            return Err(GameError::TooManyWilds {
                wilds: wilds_used,
                length: route.length,
            });
        }
        if wilds_used < route.locomotives {
            return Err(GameError::LocomotivesRequired {
                required: route.locomotives,
                provided: wilds_used,
            });
        }

        let train_cards = player.train_cards();
        let colored = route.length - wilds_used;
        for (card, needed) in [(TrainColor::Wild, wilds_used), (color, colored)] {
            if train_cards.get(card) < needed {
                return Err(GameError::NotEnoughCards {
                    color: card,
                    needed,
                    left: train_cards.get(card),
                });
            }
        }

        // Extra cards owed for a tunnel, paid with the claim's color first, then wild cards.
        // The reveal may reshuffle the discarded deck: it happens on copies, kept only once the
        // claim goes through.
        let (extra_colored, extra_wilds, revealed) = if route.tunnel {
            let mut card_dealer = self.card_dealer.clone();
            let mut rng = self.rng.clone();
            card_dealer.top_up_close_train_card_deck(NUM_TUNNEL_CARDS, &mut rng);

            let extra = card_dealer
                .peek_close_train_cards(NUM_TUNNEL_CARDS)
                .filter(|card| *card == color || card.is_wild())
                .count() as u8;
            let spare_colored = train_cards.get(color) - colored;
            let spare_wilds = train_cards.get(TrainColor::Wild) - wilds_used;
            if spare_colored + spare_wilds < extra {
                return Err(GameError::TunnelTooExpensive { extra });
            }

            let extra_colored = min(extra, spare_colored);
            (extra_colored, extra - extra_colored, Some((card_dealer, rng)))
        } else {
            (0, 0, None)
        };

        // Due diligence is done, nothing below can fail.
        let claimed_route = self.map.claim_route_for_player(lane, player_id)?;
        if let Some((card_dealer, rng)) = revealed {
            self.card_dealer = card_dealer;
            self.rng = rng;
            self.card_dealer
                .discard_top_close_train_cards(NUM_TUNNEL_CARDS, &mut self.rng);
        }

        let num_wild_cards = wilds_used + extra_wilds;
        let num_non_wild_cards = colored + extra_colored;
        let player = &mut self.players[player_id];
        player.remove_train_cards(TrainColor::Wild, num_wild_cards)?;
        player.remove_train_cards(color, num_non_wild_cards)?;
        self.card_dealer.discard_train_cards(
            repeat(TrainColor::Wild)
                .take(num_wild_cards as usize)
                .chain(repeat(color).take(num_non_wild_cards as usize)),
            &mut self.rng,
        );

        let points = self.map.calculate_points_for_claimed_route(route.length);
        self.players[player_id].record_claimed_route(claimed_route, points);
        self.invalidate_claim_cache();

        debug!(
            "Player {} claimed the route between {} and {} of length {} ({} points), using {} wild cards and {} {} cards.",
            player_id, route.start, route.end, route.length, points, num_wild_cards, num_non_wild_cards, color
        );
        Ok(())
    }

    fn check_face_up(face_up: &FaceUpRow, slot: usize, card: TrainColor) -> Result<(), GameError> {
        match face_up.get(slot) {
            None => Err(GameError::FaceUpSlotOutOfBounds(slot)),
            Some(None) => Err(GameError::EmptyFaceUpSlot(slot)),
            Some(Some(found)) if *found != card => Err(GameError::FaceUpCardMismatch {
                slot,
                expected: card,
                found: *found,
            }),
            Some(Some(_)) => Ok(()),
        }
    }

    fn draw_train_cards(
        &mut self,
        first: CardSource,
        second: Option<CardSource>,
    ) -> Result<(), GameError> {
        // Both draws are validated against the row as it will be, before anything is drawn.
        match first {
            CardSource::FaceUp { slot, card } => {
                Self::check_face_up(self.card_dealer.face_up(), slot, card)?;
                if card.is_wild() && second.is_some() {
                    return Err(GameError::DrawAfterWild);
                }
            }
            CardSource::Deck if self.card_dealer.hidden_train_card_count() == 0 => {
                warn!(
                    "Player {} tried to draw from an empty deck: no train card left.",
                    self.current_player
                );
                return Err(GameError::NoCardsLeft);
            }
            CardSource::Deck => {}
        }

        if let Some(second) = second {
            let (face_up, hidden) = self.predict_after_draw(first);
            match second {
                CardSource::FaceUp { slot, card } => {
                    Self::check_face_up(&face_up, slot, card)?;
                    if card.is_wild() {
                        return Err(GameError::SecondDrawWild);
                    }
                }
                CardSource::Deck if hidden == 0 => {
                    warn!(
                        "Player {} tried to draw a second card from an empty deck.",
                        self.current_player
                    );
                    return Err(GameError::NoCardsLeft);
                }
                CardSource::Deck => {}
            }
        }

        for source in std::iter::once(first).chain(second) {
            let card = match source {
                CardSource::FaceUp { slot, .. } => self
                    .card_dealer
                    .draw_from_open_train_card_deck(slot, &mut self.rng)?,
                CardSource::Deck => self
                    .card_dealer
                    .draw_from_close_train_card_deck(&mut self.rng)?,
            };
            self.players[self.current_player].add_train_card(card);
        }
        self.claim_cache[self.current_player] = None;

        Ok(())
    }

    fn draw_destination_cards(
        &mut self,
        keep: [bool; NUM_DRAWN_DESTINATION_CARDS],
    ) -> Result<(), GameError> {
        let drawn = self.card_dealer.destination_cards_available();
        if drawn == 0 {
            return Err(GameError::NoDestinationsLeft);
        }

        let selected = keep.iter().filter(|kept| **kept).count();
        if selected == 0 || keep.iter().skip(drawn).any(|kept| *kept) {
            return Err(GameError::InvalidDestinationSelection { selected, drawn });
        }

        let destination_cards = self
            .card_dealer
            .draw_from_destination_card_deck(&mut self.rng)?;
        let (kept, discarded): (Vec<_>, Vec<_>) = destination_cards
            .into_iter()
            .zip(keep)
            .partition(|(_, kept)| *kept);

        self.players[self.current_player]
            .add_destination_cards(kept.into_iter().map(|(destination_card, _)| destination_card));
        self.card_dealer
            .discard_destination_cards(discarded.into_iter().map(|(destination_card, _)| destination_card));

        Ok(())
    }

    // Scoring.

    /// Length of each player's longest simple path.
    pub fn longest_routes(&self) -> SmallVec<[u16; MAX_PLAYERS]> {
        self.players
            .iter()
            .map(|player| Map::get_longest_route(self.map.num_cities(), player.claimed_routes()))
            .collect()
    }

    /// The score of every player: points from claimed routes, plus or minus destination cards,
    /// plus a share of the longest route bonus.
    ///
    /// The bonus is split evenly, rounding down, amongst the players tied for the longest
    /// route. Nobody gets it if no route was claimed.
    pub fn final_scores(&self) -> Vec<i32> {
        let longest_routes = self.longest_routes();
        let longest_route = longest_routes.iter().max().copied().unwrap_or(0);
        let num_leaders = longest_routes
            .iter()
            .filter(|length| **length == longest_route)
            .count() as i32;
        let bonus = self.map.kind().longest_path_bonus() / max(num_leaders, 1);

        self.players
            .iter()
            .zip(&longest_routes)
            .map(|(player, length)| {
                let bonus = if longest_route > 0 && *length == longest_route {
                    bonus
                } else {
                    0
                };
                player.points() as i32 + player.destination_points() + bonus
            })
            .collect()
    }

    /// The score of one player, were the game to end now.
    pub fn evaluate(&self, player_id: usize) -> i32 {
        self.final_scores()[player_id]
    }
}

#[cfg(test)]
impl GameState {
    /// Replaces a player's hand. The replaced cards leave the game.
    pub(crate) fn give_train_cards(&mut self, player_id: usize, cards: &[(TrainColor, u8)]) {
        let player = &mut self.players[player_id];
        let held: Vec<_> = player.train_cards().iter().collect();
        for (color, count) in held {
            player.remove_train_cards(color, count).unwrap();
        }
        for (color, count) in cards {
            for _ in 0..*count {
                player.add_train_card(*color);
            }
        }
        self.claim_cache[player_id] = None;
    }

    pub(crate) fn replace_card_dealer(&mut self, card_dealer: CardDealer) {
        self.card_dealer = card_dealer;
    }
}
