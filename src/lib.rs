//! Game engine and Monte Carlo Tree Search planner for a network-building railway board game.
//!
//! A [`game_state::GameState`] holds a whole game and its rules, a [`mcts::Planner`] picks
//! actions for computer players, and a [`manager::Manager`] runs a game between computer
//! and human seats.

pub mod action;
pub mod card;
pub mod city;
pub mod connectivity;
pub mod distance;
pub mod error;
pub mod game_state;
pub mod manager;
pub mod map;
pub mod mcts;
pub mod player;
pub mod topology;

pub use action::{Action, CardSource, PlayerAction};
pub use error::{GameError, SearchError, SetupError, TopologyError};
pub use game_state::{GameConfig, GameState, Snapshot};
pub use manager::{Manager, Seat};
pub use mcts::{MctsConfig, Planner};
pub use topology::Topology;
