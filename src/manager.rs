use crate::action::{Action, LegalActions, PlayerAction};
use crate::error::GameError;
use crate::game_state::{GameState, Snapshot};
use crate::map::MAX_PLAYERS;
use crate::mcts::{MctsConfig, Planner};

use log::{info, warn};
use smallvec::SmallVec;
use std::sync::mpsc::Sender;

/// Where the actions of a player not driven by the planner come from, e.g. an input menu.
pub trait ActionSource {
    /// The action the current player of `game_state` takes, or `None` to pass.
    ///
    /// The action does not have to be one of `legal_actions`: it is validated like any other.
    fn next_action(
        &mut self,
        game_state: &GameState,
        legal_actions: &LegalActions,
    ) -> Option<PlayerAction>;
}

/// Who plays for a player.
pub enum Seat {
    /// The planner, with a fresh search for every decision.
    Computer(MctsConfig),
    Human(Box<dyn ActionSource>),
}

impl Seat {
    #[inline]
    pub fn is_computer(&self) -> bool {
        matches!(self, Seat::Computer(_))
    }
}

/// In charge of running a game: asks each seat for an action in turn, applies it, and reports
/// the new state to the display layer.
///
/// Actions are validated and applied the same way whether they come from the planner or from
/// a human.
pub struct Manager {
    game_state: GameState,
    /// One seat per player, indexed by player id.
    seats: SmallVec<[Seat; MAX_PLAYERS]>,
    /// Receives a [`Snapshot`] after every turn. Sending never blocks the game.
    display: Option<Sender<Snapshot>>,
    last_action: Option<PlayerAction>,
}

impl Manager {
    /// Creates a manager for `game_state`, with exactly one seat per player.
    pub fn new(
        game_state: GameState,
        seats: impl IntoIterator<Item = Seat>,
    ) -> Result<Self, GameError> {
        let seats: SmallVec<[Seat; MAX_PLAYERS]> = seats.into_iter().collect();
        if seats.len() != game_state.num_players() {
            return Err(GameError::InvalidPlayerCount(seats.len()));
        }

        Ok(Self {
            game_state,
            seats,
            display: None,
            last_action: None,
        })
    }

    /// Sends a [`Snapshot`] to `display` after every turn.
    pub fn with_display(mut self, display: Sender<Snapshot>) -> Self {
        self.display = Some(display);
        self
    }

    #[inline]
    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    #[inline]
    pub fn last_action(&self) -> Option<PlayerAction> {
        self.last_action
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.game_state.is_terminal()
    }

    /// Plays the turn of the current player, and returns whether the game is over.
    ///
    /// A player without any action passes. A claim of a tunnel that turns out too expensive
    /// ends the turn, as the rules say. Any other refused action is returned as an `Err`,
    /// and the turn is not played.
    pub fn play_turn(&mut self) -> Result<bool, GameError> {
        if self.game_state.is_terminal() {
            return Ok(true);
        }

        let player = self.game_state.current_player();
        let turn = self.game_state.turn();
        let legal_actions = self.game_state.legal_actions();

        let player_action = match &mut self.seats[player] {
            Seat::Computer(config) => {
                // Searches differ from one turn to the next.
                let config = config
                    .clone()
                    .with_seed(config.seed.wrapping_add(turn as u64));
                match Planner::new(config).search(&self.game_state) {
                    Ok(result) => Some(PlayerAction {
                        player,
                        action: result.action,
                    }),
                    Err(err) => {
                        warn!("Player {} cannot play turn {}: {}", player, turn, err);
                        None
                    }
                }
            }
            Seat::Human(action_source) => action_source.next_action(&self.game_state, &legal_actions),
        };

        match player_action {
            Some(player_action) => match self.game_state.apply_player_action(&player_action) {
                Ok(()) => {
                    info!("Turn {}: player {} chose to {}.", turn, player, player_action.action);
                }
                Err(GameError::TunnelTooExpensive { extra }) => {
                    info!(
                        "Turn {}: player {} could not pay {} more cards for the tunnel, and loses their turn.",
                        turn, player, extra
                    );
                    self.game_state.skip_turn();
                }
                Err(err) => return Err(err),
            },
            None => self.game_state.skip_turn(),
        }

        self.last_action = player_action;
        self.notify_display();

        Ok(self.game_state.is_terminal())
    }

    /// Plays until the game is over, or `max_turns` turns have been played, and returns the
    /// final scores.
    pub fn play_to_end(&mut self, max_turns: usize) -> Result<Vec<i32>, GameError> {
        while !self.game_state.is_terminal() && self.game_state.turn() < max_turns {
            self.play_turn()?;
        }

        if !self.game_state.is_terminal() {
            warn!("Stopping the game after {} turns, before its end.", max_turns);
        }

        let scores = self.game_state.final_scores();
        info!("Final scores: {:?}.", scores);
        Ok(scores)
    }

    fn notify_display(&self) {
        if let Some(display) = &self.display {
            // Nobody watching is fine.
            let _ = display.send(self.game_state.snapshot(self.last_action));
        }
    }
}

/// Plays the same action over and over, e.g. to fill a seat in tests.
#[derive(Clone, Copy, Debug)]
pub struct RepeatedAction(pub Action);

impl ActionSource for RepeatedAction {
    fn next_action(
        &mut self,
        game_state: &GameState,
        legal_actions: &LegalActions,
    ) -> Option<PlayerAction> {
        legal_actions.contains(&self.0).then(|| PlayerAction {
            player: game_state.current_player(),
            action: self.0,
        })
    }
}
