//! Planner configuration parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Which policy plays the searching player's turns during rollouts.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PolicyKind {
    /// Uniformly random family, then uniformly random action.
    Random,
    /// Claims what serves destination cards, draws cards otherwise.
    #[default]
    Greedy,
}

/// Static adjustments added to the selection score of a child, depending on the action that
/// led to it. Weights are in points, like rewards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionBias {
    /// Claiming a route that fulfills a destination card.
    pub claim_completes_destination: f64,
    /// Claiming a route on the shortest path of an unfulfilled destination card.
    pub claim_on_shortest_path: f64,
    /// Claiming a route ending one route away from a destination city.
    pub claim_near_destination: f64,
    /// Drawing destination cards, per unfulfilled destination card held.
    pub destination_draw_penalty: f64,
    /// Drawing destination cards with plenty of cars and few destination cards.
    pub destination_draw_bonus: f64,
    /// Cars from which a player is considered to have plenty.
    pub plentiful_cars: u8,
    /// Destination cards up to which a player is considered to have few.
    pub few_destinations: usize,
    /// Drawing train cards with a large hand.
    pub card_draw_penalty: f64,
    /// Hand size from which a hand is considered large.
    pub large_hand: usize,
}

impl Default for SelectionBias {
    fn default() -> Self {
        Self {
            claim_completes_destination: 6.0,
            claim_on_shortest_path: 3.0,
            claim_near_destination: 1.0,
            destination_draw_penalty: 4.0,
            destination_draw_bonus: 2.0,
            plentiful_cars: 20,
            few_destinations: 2,
            card_draw_penalty: 3.0,
            large_hand: 12,
        }
    }
}

impl SelectionBias {
    /// No bias at all: plain UCT.
    pub fn none() -> Self {
        Self {
            claim_completes_destination: 0.0,
            claim_on_shortest_path: 0.0,
            claim_near_destination: 0.0,
            destination_draw_penalty: 0.0,
            destination_draw_bonus: 0.0,
            card_draw_penalty: 0.0,
            ..Self::default()
        }
    }
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Clone, Debug, PartialEq)]
pub struct MctsConfig {
    /// Number of simulations to run per decision.
    pub num_simulations: u32,

    /// Exploration constant `c` of the UCT formula.
    /// Rewards are raw scores, hence a much larger value than for win/loss rewards.
    pub exploration: f64,

    /// Progressive widening constant `k`: a node with `n` visits may have up to
    /// `ceil(k * sqrt(n))` children.
    pub widening: f64,

    /// Maximum number of turns of the searching player played out by a rollout.
    pub max_rollout_depth: usize,

    /// Number of leaves selected, then rolled out in parallel, per round.
    /// Set to 1 to disable batching.
    pub batch_size: usize,

    /// Number of threads of the rollout pool.
    pub num_workers: usize,

    /// How long a round may wait for its rollouts before being abandoned.
    pub round_timeout: Duration,

    /// Seeds the tree expansion, and every rollout.
    pub seed: u64,

    pub policy: PolicyKind,

    pub bias: SelectionBias,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 400,
            exploration: 8.0,
            widening: 2.0,
            max_rollout_depth: 30,
            batch_size: 16,
            num_workers: std::thread::available_parallelism()
                .map(|workers| workers.get())
                .unwrap_or(4),
            round_timeout: Duration::from_secs(5),
            seed: 0,
            policy: PolicyKind::default(),
            bias: SelectionBias::default(),
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            num_simulations: 32,
            max_rollout_depth: 8,
            batch_size: 4,
            num_workers: 2,
            ..Self::default()
        }
    }

    /// Builder pattern: set number of simulations.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: set the UCT exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: set the progressive widening constant.
    pub fn with_widening(mut self, k: f64) -> Self {
        self.widening = k;
        self
    }

    pub fn with_rollout_depth(mut self, depth: usize) -> Self {
        self.max_rollout_depth = depth;
        self
    }

    /// Builder pattern: set batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }

    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_bias(mut self, bias: SelectionBias) -> Self {
        self.bias = bias;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.num_simulations, 400);
        assert!(config.num_workers >= 1);
        assert_eq!(config.policy, PolicyKind::Greedy);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MctsConfig::for_testing()
            .with_simulations(100)
            .with_batch_size(0)
            .with_policy(PolicyKind::Random);

        assert_eq!(config.num_simulations, 100);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.policy, PolicyKind::Random);
    }

    #[test]
    fn test_policy_kind_from_str() {
        assert_eq!("random".parse::<PolicyKind>(), Ok(PolicyKind::Random));
        assert_eq!(PolicyKind::Greedy.to_string(), "greedy");
        assert!("smart".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn test_no_bias() {
        let bias = SelectionBias::none();
        assert!(bias.claim_completes_destination.abs() < 1e-9);
        assert_eq!(bias.large_hand, SelectionBias::default().large_hand);
    }
}
