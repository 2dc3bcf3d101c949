use crate::card::TrainColor;
use crate::city::CityId;

use thiserror::Error;

/// Reasons an action can be refused by the game.
///
/// Refusing an action never mutates the game: every operation returning a `GameError`
/// leaves the state exactly as it was before the call.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GameError {
    #[error("Cannot create a game with {0} players: one must have at least two, and at most 5 players.")]
    InvalidPlayerCount(usize),

    #[error("It is player {current}'s turn, not player {player}'s.")]
    NotYourTurn { player: usize, current: usize },

    #[error("The game is over: no more actions can be taken.")]
    GameOver,

    #[error("The selected route ({0}) does not exist.")]
    UnknownRoute(usize),

    #[error("The selected route ({route}) does not connect {start} and {end}.")]
    RouteMismatch {
        route: usize,
        start: CityId,
        end: CityId,
    },

    #[error("The selected route between {0} and {1} is already claimed.")]
    RouteAlreadyClaimed(CityId, CityId),

    #[error("Cannot claim more than one route between {0} and {1}.")]
    ParallelRouteOwned(CityId, CityId),

    #[error("Another route is already claimed by someone else between {0} and {1}.")]
    ParallelRouteBlocked(CityId, CityId),

    #[error("Cannot claim a route of length {length}, whilst having only {left} cars left.")]
    NotEnoughTrains { length: u8, left: u8 },

    #[error("Cannot claim a route of color {route_color} with {color} cards.")]
    WrongColor {
        route_color: TrainColor,
        color: TrainColor,
    },

    #[error("Cannot claim a route using {needed} {color} cards, whilst having only {left} left.")]
    NotEnoughCards {
        color: TrainColor,
        needed: u8,
        left: u8,
    },

    #[error("This route requires at least {required} wild cards, but {provided} were declared.")]
    LocomotivesRequired { required: u8, provided: u8 },

    #[error("Cannot use {wilds} wild cards on a route of length {length}.")]
    TooManyWilds { wilds: u8, length: u8 },

    #[error("The tunnel requires {extra} extra cards, which cannot be covered.")]
    TunnelTooExpensive { extra: u8 },

    #[error("Card looked up at index {0} is out of bounds (size 5).")]
    FaceUpSlotOutOfBounds(usize),

    #[error("No cards found at index {0}.")]
    EmptyFaceUpSlot(usize),

    #[error("Expected a {expected} card at index {slot}, but found a {found} card.")]
    FaceUpCardMismatch {
        slot: usize,
        expected: TrainColor,
        found: TrainColor,
    },

    #[error("Cannot draw a wild card after having already drawn a train card this turn.")]
    SecondDrawWild,

    #[error("Cannot draw another train card after having drawn a face-up wild card this turn.")]
    DrawAfterWild,

    #[error("There is no cards left in any train card deck.")]
    NoCardsLeft,

    #[error("Cannot draw from the destination card deck, as it is empty.")]
    NoDestinationsLeft,

    #[error("Cannot select {selected} destination cards out of {drawn}.")]
    InvalidDestinationSelection { selected: usize, drawn: usize },
}

/// Reasons a map topology can be rejected when building a game from it.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("City {0} is not part of the topology.")]
    UnknownCity(String),

    #[error("City {0} is declared more than once.")]
    DuplicateCity(String),

    #[error("A route between {start} and {end} has length {length}, which is not supported by this map.")]
    InvalidLength {
        start: String,
        end: String,
        length: u8,
    },

    #[error("A route cannot start and end at {0}.")]
    SelfLoop(String),

    #[error("There are more than 4 parallel routes between {0} and {1}.")]
    TooManyParallelRoutes(String, String),

    #[error("The topology has no routes.")]
    Empty,

    #[error("Could not read the topology: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse the topology: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a game cannot be set up.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Reasons the planner cannot come up with an action.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("Player {0} has no action left to take.")]
    NoActionAvailable(usize),

    #[error("The game is over: there is nothing left to plan.")]
    GameOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_error_messages() {
        assert_eq!(
            GameError::InvalidPlayerCount(1).to_string(),
            "Cannot create a game with 1 players: one must have at least two, and at most 5 players."
        );
        assert_eq!(
            GameError::RouteAlreadyClaimed(CityId(1), CityId(4)).to_string(),
            "The selected route between #1 and #4 is already claimed."
        );
        assert_eq!(
            GameError::NotEnoughCards {
                color: TrainColor::Red,
                needed: 3,
                left: 1
            }
            .to_string(),
            "Cannot claim a route using 3 red cards, whilst having only 1 left."
        );
    }

    #[test]
    fn topology_error_from_json() {
        let err: TopologyError = serde_json::from_str::<u8>("oops").unwrap_err().into();
        assert!(matches!(err, TopologyError::Json(_)));
    }
}
