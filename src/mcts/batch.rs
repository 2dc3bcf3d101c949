//! Runs the rollouts of a round on a pool of worker threads.
//!
//! The tree never leaves the thread running the search: workers are handed their own copy of
//! a leaf's state, and only send back a reward.

use crate::game_state::GameState;
use crate::mcts::rollout::{rollout, RolloutPolicy};
use crate::mcts::tree::NodeId;

use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use threadpool::ThreadPool;

/// A leaf to roll out.
#[derive(Debug)]
pub struct RolloutJob {
    pub leaf: NodeId,
    pub game_state: GameState,
    /// Seeds the rollout, so that it plays out the same on any worker.
    pub seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RolloutOutcome {
    pub leaf: NodeId,
    pub reward: f64,
}

/// Owns the worker pool of a planner.
pub struct RolloutBatcher {
    pool: ThreadPool,
    policy: Arc<dyn RolloutPolicy>,
    max_depth: usize,
    round_timeout: Duration,
}

impl RolloutBatcher {
    pub fn new(
        num_workers: usize,
        policy: Arc<dyn RolloutPolicy>,
        max_depth: usize,
        round_timeout: Duration,
    ) -> Self {
        Self {
            pool: ThreadPool::new(num_workers.max(1)),
            policy,
            max_depth,
            round_timeout,
        }
    }

    /// Rolls out every job, and returns their outcomes in the order the jobs were given.
    ///
    /// A rollout that panics is left out of the outcomes. If the round does not complete
    /// within the round timeout, it is abandoned altogether and `None` is returned: rollouts
    /// still running finish in the background, and their results are discarded.
    pub fn run_round(
        &self,
        jobs: Vec<RolloutJob>,
        acting_player: usize,
    ) -> Option<Vec<RolloutOutcome>> {
        let num_jobs = jobs.len();
        let (tx, rx) = mpsc::channel();

        for (index, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            let policy = self.policy.clone();
            let max_depth = self.max_depth;

            self.pool.execute(move || {
                let RolloutJob {
                    leaf,
                    game_state,
                    seed,
                } = job;
                let reward = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    rollout(game_state, acting_player, policy.as_ref(), max_depth, &mut rng)
                }));

                // Nobody listens anymore once the round has timed out.
                let _ = tx.send((index, leaf, reward.ok()));
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.round_timeout;
        let mut outcomes: Vec<Option<RolloutOutcome>> = vec![None; num_jobs];
        for _ in 0..num_jobs {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(timeout) {
                Ok((index, leaf, Some(reward))) => {
                    outcomes[index] = Some(RolloutOutcome { leaf, reward });
                }
                Ok((index, _, None)) => {
                    warn!("Rollout {} of the round panicked, its result is dropped.", index);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "Abandoning a round of {} rollouts, not done after {:?}.",
                        num_jobs, self.round_timeout
                    );
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Some(outcomes.into_iter().flatten().collect())
    }
}
