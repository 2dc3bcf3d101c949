use crate::card::{DestinationCard, TrainColor};
use crate::city::CityId;
use crate::connectivity::ConnectivityTracker;
use crate::error::GameError;
use crate::map::ClaimedRoute;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumIter};

// Every player starts the game with 45 cars.
pub const NUM_OF_CARS: u8 = 45;

/// Every player has their own color.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerColor {
    Black,
    Blue,
    Green,
    Orange,
    Pink,
    Red,
    Yellow,
    White,
}

/// How many cards of each color a player holds, indexed by `TrainColor as usize`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CardHand([u8; TrainColor::COUNT]);

impl CardHand {
    #[inline]
    pub fn get(&self, color: TrainColor) -> u8 {
        self.0[color as usize]
    }

    #[inline]
    pub fn add(&mut self, color: TrainColor) {
        self.0[color as usize] += 1;
    }

    /// Removes `num` cards of the given color, or leaves the hand untouched if there are not
    /// enough of them.
    pub fn remove(&mut self, color: TrainColor, num: u8) -> Result<(), GameError> {
        let left = self.get(color);
        if left < num {
            return Err(GameError::NotEnoughCards {
                color,
                needed: num,
                left,
            });
        }

        self.0[color as usize] -= num;
        Ok(())
    }

    /// Total number of cards in the hand.
    pub fn len(&self) -> usize {
        self.0.iter().map(|count| *count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Colors held, alongside how many cards of each.
    pub fn iter(&self) -> impl Iterator<Item = (TrainColor, u8)> + '_ {
        TrainColor::iter().map(|color| (color, self.get(color)))
    }
}

/// Information about a player that is visible to all players, sent to the display layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub id: usize,
    pub color: PlayerColor,
    /// The number of cars the player has left.
    pub cars: u8,
    /// Points gained from claimed routes so far.
    pub points: u32,
    pub num_train_cards: usize,
    pub num_destination_cards: usize,
    pub claimed_routes: Vec<ClaimedRoute>,
}

/// Encapsulates all the player information.
///
/// A [`Player`] is not aware of other players in this game, nor of the board: validating an
/// action against the map and the decks is the job of [`crate::game_state::GameState`].
///
/// Cloning a player rebuilds its connectivity from the routes it claimed, so that the copy
/// shares nothing with the original.
#[derive(Debug)]
pub struct Player {
    id: usize,
    color: PlayerColor,
    train_cards: CardHand,
    /// Destination cards that a player has selected to fulfill.
    destination_cards: Vec<DestinationCard>,
    claimed_routes: Vec<ClaimedRoute>,
    claimed_cities: BTreeSet<CityId>,
    /// The currency used, alongside train cards, to claim routes.
    cars: u8,
    /// Points gained by claiming routes. Destination cards and the longest route bonus are
    /// only accounted for when scoring.
    points: u32,
    connectivity: ConnectivityTracker,
}

impl Player {
    /// Creates a new player, with no cards and all of their cars.
    pub fn new(id: usize, color: PlayerColor, num_cities: usize) -> Self {
        Self::with_cars(id, color, num_cities, NUM_OF_CARS)
    }

    pub fn with_cars(id: usize, color: PlayerColor, num_cities: usize, cars: u8) -> Self {
        Self {
            id,
            color,
            train_cards: CardHand::default(),
            destination_cards: Vec::new(),
            claimed_routes: Vec::new(),
            claimed_cities: BTreeSet::new(),
            cars,
            points: 0,
            connectivity: ConnectivityTracker::new(num_cities),
        }
    }

    /// Access the player's id.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Access the player's color.
    #[inline]
    pub fn color(&self) -> PlayerColor {
        self.color
    }

    /// Access how many cars a player has left.
    #[inline]
    pub fn cars(&self) -> u8 {
        self.cars
    }

    #[inline]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[inline]
    pub fn train_cards(&self) -> &CardHand {
        &self.train_cards
    }

    #[inline]
    pub fn destination_cards(&self) -> &[DestinationCard] {
        &self.destination_cards
    }

    #[inline]
    pub fn claimed_routes(&self) -> &[ClaimedRoute] {
        &self.claimed_routes
    }

    #[inline]
    pub fn claimed_cities(&self) -> &BTreeSet<CityId> {
        &self.claimed_cities
    }

    /// Whether the player's claimed routes connect both cities.
    #[inline]
    pub fn is_connected(&self, start: CityId, end: CityId) -> bool {
        self.connectivity.is_connected(start, end)
    }

    #[inline]
    pub fn is_destination_fulfilled(&self, destination_card: &DestinationCard) -> bool {
        let (start, end) = destination_card.destination;
        self.is_connected(start, end)
    }

    /// Destination cards that are not fulfilled yet.
    pub fn incomplete_destination_cards(&self) -> impl Iterator<Item = &DestinationCard> {
        self.destination_cards
            .iter()
            .filter(|destination_card| !self.is_destination_fulfilled(destination_card))
    }

    /// Points gained from fulfilled destination cards, minus points of unfulfilled ones.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_planner::card::DestinationCard;
    /// use ticket_to_ride_planner::city::CityId;
    /// use ticket_to_ride_planner::map::ClaimedRoute;
    /// use ticket_to_ride_planner::player::{Player, PlayerColor};
    ///
    /// let mut player = Player::new(0, PlayerColor::Red, 3);
    /// player.add_destination_cards([DestinationCard { destination: (CityId(0), CityId(2)), points: 5 }]);
    /// assert_eq!(player.destination_points(), -5);
    ///
    /// player.record_claimed_route(ClaimedRoute { route: (CityId(0), CityId(1)), route_id: 0, length: 2 }, 2);
    /// player.record_claimed_route(ClaimedRoute { route: (CityId(1), CityId(2)), route_id: 1, length: 3 }, 4);
    /// assert_eq!(player.destination_points(), 5);
    /// ```
    pub fn destination_points(&self) -> i32 {
        self.destination_cards
            .iter()
            .map(|destination_card| {
                if self.is_destination_fulfilled(destination_card) {
                    destination_card.points as i32
                } else {
                    -(destination_card.points as i32)
                }
            })
            .sum()
    }

    #[inline]
    pub fn add_train_card(&mut self, card: TrainColor) {
        self.train_cards.add(card);
    }

    /// Removes cards from the player's hand, failing without any change if there are not enough.
    #[inline]
    pub fn remove_train_cards(&mut self, color: TrainColor, num: u8) -> Result<(), GameError> {
        self.train_cards.remove(color, num)
    }

    pub fn add_destination_cards(
        &mut self,
        destination_cards: impl IntoIterator<Item = DestinationCard>,
    ) {
        self.destination_cards.extend(destination_cards);
    }

    /// Bookkeeping once a route has been claimed on the map: cars, points, and connectivity.
    pub fn record_claimed_route(&mut self, claimed_route: ClaimedRoute, points: u8) {
        let (start, end) = claimed_route.route;

        self.cars = self.cars.saturating_sub(claimed_route.length);
        self.points += points as u32;
        self.claimed_cities.insert(start);
        self.claimed_cities.insert(end);
        self.connectivity.union(start, end);
        self.claimed_routes.push(claimed_route);
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            color: self.color,
            cars: self.cars,
            points: self.points,
            num_train_cards: self.train_cards.len(),
            num_destination_cards: self.destination_cards.len(),
            claimed_routes: self.claimed_routes.clone(),
        }
    }
}

impl Clone for Player {
    fn clone(&self) -> Self {
        let connectivity = ConnectivityTracker::from_connections(
            self.connectivity.num_cities(),
            self.claimed_routes.iter().map(|claimed_route| claimed_route.route),
        );

        Self {
            id: self.id,
            color: self.color,
            train_cards: self.train_cards,
            destination_cards: self.destination_cards.clone(),
            claimed_routes: self.claimed_routes.clone(),
            claimed_cities: self.claimed_cities.clone(),
            cars: self.cars,
            points: self.points,
            connectivity,
        }
    }
}
