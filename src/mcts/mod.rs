//! Monte Carlo Tree Search planner for computer players.
//!
//! Every simulation goes through four phases:
//!
//! 1. **Selection**: descend from the root along the best UCT scores, as long as nodes may
//!    not grow more children (progressive widening).
//! 2. **Expansion**: try one untried action of the searching player, then let every other
//!    player take one action with the rollout policy.
//! 3. **Rollout**: play the game out from the new node, on a worker thread.
//! 4. **Backpropagation**: add the searching player's score to every node up to the root.
//!
//! Simulations are issued in rounds of `batch_size`: selection and expansion of a whole
//! round happen first, then its rollouts run in parallel, then their rewards are
//! backpropagated in the order the leaves were selected. Within a round, a rollout already
//! issued counts as a visit for selection and widening, which spreads the round over the
//! tree the way sequential simulations would.
//!
//! # Usage
//!
//! ```
//! use ticket_to_ride_planner::game_state::GameState;
//! use ticket_to_ride_planner::mcts::{MctsConfig, Planner};
//! use ticket_to_ride_planner::topology::Topology;
//!
//! let game_state = GameState::new(&Topology::usa(), 2, 42).unwrap();
//! let mut planner = Planner::new(MctsConfig::for_testing().with_simulations(8));
//!
//! let result = planner.search(&game_state).unwrap();
//! assert_eq!(result.simulations, 8);
//! println!("Best action: {}", result.action);
//! ```

pub mod batch;
pub mod config;
pub mod rollout;
pub mod tree;

pub use crate::error::SearchError;
pub use config::{MctsConfig, PolicyKind, SelectionBias};
pub use rollout::{GreedyPolicy, RandomPolicy, RolloutPolicy};

use crate::action::Action;
use crate::game_state::GameState;
use batch::{RolloutBatcher, RolloutJob};
use tree::{selection_bias, NodeId, SearchTree};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Statistics of one child of the root.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildStats {
    pub action: Action,
    pub visits: u32,
    /// Mean score of the rollouts that went through this child.
    pub value: f64,
}

/// Result of a search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Best action to take.
    pub action: Action,

    /// Mean score expected after taking `action`.
    pub value: f64,

    /// Number of rollouts that went through `action`.
    pub visits: u32,

    /// Number of rollouts backpropagated to the root.
    pub simulations: u32,

    /// Mean score over all the rollouts.
    pub root_value: f64,

    /// Every action tried at the root, in the order they were tried.
    pub children: Vec<ChildStats>,
}

/// Seed of the `index`-th rollout of a search.
///
/// Only depends on the search seed and the index, so that rollouts play out the same
/// whatever the worker they land on.
#[inline]
fn rollout_seed(seed: u64, index: u32) -> u64 {
    seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Chooses actions for the player whose turn it is.
///
/// A planner owns its rollout workers, and can be reused for any number of searches.
pub struct Planner {
    config: MctsConfig,
    policy: Arc<dyn RolloutPolicy>,
    batcher: RolloutBatcher,
    /// Drives determinization and expansion.
    rng: StdRng,
}

impl Planner {
    /// A planner using the rollout policy named in `config`.
    pub fn new(config: MctsConfig) -> Self {
        let policy = config.policy.policy();
        Self::with_policy(config, policy)
    }

    /// A planner using a custom rollout policy.
    pub fn with_policy(config: MctsConfig, policy: Arc<dyn RolloutPolicy>) -> Self {
        let batcher = RolloutBatcher::new(
            config.num_workers,
            policy.clone(),
            config.max_rollout_depth,
            config.round_timeout,
        );

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            policy,
            batcher,
        }
    }

    #[inline]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Searches for the best action of the current player of `game_state`.
    ///
    /// The cards hidden to the players are shuffled before searching, so the search never
    /// relies on the actual order of the decks. The action returned is always legal in
    /// `game_state`.
    pub fn search(&mut self, game_state: &GameState) -> Result<SearchResult, SearchError> {
        if game_state.is_terminal() {
            return Err(SearchError::GameOver);
        }

        let acting_player = game_state.current_player();
        let mut root_state = game_state.clone();
        let root_actions = root_state.legal_actions();
        root_state.reseed(self.rng.gen());
        root_state.determinize();
        let mut tree = SearchTree::with_root_actions(root_state, root_actions);

        let num_simulations = self.config.num_simulations;
        let batch_size = self.config.batch_size.max(1) as u32;
        let mut issued = 0;
        while issued < num_simulations {
            let round_size = batch_size.min(num_simulations - issued);
            let mut jobs = Vec::with_capacity(round_size as usize);

            for _ in 0..round_size {
                let leaf = self.select_and_expand(&mut tree);
                // Later selections of the round see this rollout as a visit already.
                tree.add_pending(leaf);
                let seed = rollout_seed(self.config.seed, issued);
                let mut game_state = tree.get(leaf).state.clone();
                game_state.reseed(seed);

                jobs.push(RolloutJob {
                    leaf,
                    game_state,
                    seed,
                });
                issued += 1;
            }

            let leaves: Vec<NodeId> = jobs.iter().map(|job| job.leaf).collect();
            let outcomes = self.batcher.run_round(jobs, acting_player);
            for leaf in leaves {
                tree.release_pending(leaf);
            }

            if let Some(outcomes) = outcomes {
                for outcome in outcomes {
                    trace!(
                        "Rollout from node {} scored {} for player {}.",
                        outcome.leaf.0,
                        outcome.reward,
                        acting_player
                    );
                    tree.backpropagate(outcome.leaf, outcome.reward);
                }
            }
        }

        let root = tree.get(tree.root());
        // Without any visit, e.g. when every round timed out, the first action tried is taken.
        let best = tree
            .best_child()
            .or_else(|| root.children.first().copied())
            .ok_or(SearchError::NoActionAvailable(acting_player))?;
        let best = tree.get(best);
        let action = best
            .action
            .ok_or(SearchError::NoActionAvailable(acting_player))?;

        let children = root
            .children
            .iter()
            .filter_map(|child| {
                let child = tree.get(*child);
                Some(ChildStats {
                    action: child.action?,
                    visits: child.visits,
                    value: child.mean_value(),
                })
            })
            .collect();

        debug!(
            "Player {} will {} (mean score {:.2} over {} rollouts, {} simulations, {} actions tried).",
            acting_player,
            action,
            best.mean_value(),
            best.visits,
            root.visits,
            root.children.len()
        );

        Ok(SearchResult {
            action,
            value: best.mean_value(),
            visits: best.visits,
            simulations: root.visits,
            root_value: root.mean_value(),
            children,
        })
    }

    /// Descends to the node to roll out from, expanding a new one on the way when allowed.
    fn select_and_expand(&mut self, tree: &mut SearchTree) -> NodeId {
        let mut current = tree.root();

        loop {
            let node = tree.get(current);
            if node.state.is_terminal() {
                return current;
            }

            if !node.is_fully_expanded(self.config.widening) {
                if let Some(child) = self.expand(tree, current) {
                    return child;
                }
            }

            match tree.select_child(current, self.config.exploration) {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// Adds a child for one of the untried actions of `parent`.
    ///
    /// Actions refused once applied (tunnels turning out too expensive) are dropped for good.
    /// Returns `None` if every untried action is refused.
    fn expand(&mut self, tree: &mut SearchTree, parent: NodeId) -> Option<NodeId> {
        let acting_player = tree.acting_player();

        loop {
            let action = tree.get_mut(parent).take_untried(&mut self.rng)?;

            let parent_state = &tree.get(parent).state;
            let bias = selection_bias(parent_state, &action, &self.config.bias);
            let mut game_state = parent_state.clone();
            if let Err(err) = game_state.apply(&action) {
                trace!("Dropping untried action ({}): {}.", action, err);
                continue;
            }

            // The other players move until it is the searching player's turn again.
            while !game_state.is_terminal() && game_state.current_player() != acting_player {
                rollout::play_turn(&mut game_state, self.policy.as_ref(), &mut self.rng);
            }

            return Some(tree.add_child(parent, action, game_state, bias));
        }
    }
}
