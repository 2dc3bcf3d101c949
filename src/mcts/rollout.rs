//! Rollout policies, and playing a game out from a leaf.

use crate::action::{Action, CardSource, LegalActions};
use crate::card::DestinationCard;
use crate::game_state::GameState;
use crate::mcts::config::PolicyKind;

use log::trace;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smallvec::SmallVec;
use std::sync::Arc;

/// Cars from which the greedy policy is willing to take on more destination cards.
const GREEDY_DESTINATION_CARS: u8 = 15;

/// Picks the action of the current player during rollouts.
///
/// Policies are shared by every rollout worker, hence `Send + Sync`. Randomness must come from
/// `rng` only, so that a rollout is reproducible from its seed.
pub trait RolloutPolicy: Send + Sync {
    /// One of `legal_actions`, or `None` if there is none.
    fn choose(
        &self,
        game_state: &GameState,
        legal_actions: &LegalActions,
        rng: &mut StdRng,
    ) -> Option<Action>;
}

impl PolicyKind {
    pub fn policy(self) -> Arc<dyn RolloutPolicy> {
        match self {
            PolicyKind::Random => Arc::new(RandomPolicy),
            PolicyKind::Greedy => Arc::new(GreedyPolicy),
        }
    }
}

/// Uniformly random family, then uniformly random action within it.
///
/// Picking the family first keeps the hundreds of claims and card draws from drowning out
/// the handful of destination draws.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPolicy;

impl RolloutPolicy for RandomPolicy {
    fn choose(
        &self,
        _game_state: &GameState,
        legal_actions: &LegalActions,
        rng: &mut StdRng,
    ) -> Option<Action> {
        let kind = *legal_actions.non_empty_families().choose(rng)?;
        legal_actions.family(kind).choose(rng).copied()
    }
}

/// Plays towards the destination cards of the current player.
///
/// In order of preference:
/// 1. the claim fulfilling a destination card, or lying on the shortest path of one;
/// 2. new destination cards, once all held ones are fulfilled and cars are plentiful;
/// 3. two cards from the close deck;
/// 4. any claim, then anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyPolicy;

impl GreedyPolicy {
    /// How desirable a claim is. `None` if it serves no destination card while some are pending.
    fn score_claim(
        game_state: &GameState,
        incomplete: &[DestinationCard],
        action: &Action,
    ) -> Option<i32> {
        let Action::ClaimRoute {
            route,
            city1,
            city2,
            wilds_used,
            ..
        } = *action
        else {
            return None;
        };

        let length = game_state.map().route(route).ok()?.length;
        let points = game_state.map().calculate_points_for_claimed_route(length) as i32;
        let player = game_state.player(game_state.current_player());
        let distance_oracle = game_state.distance_oracle();

        let score = if incomplete.is_empty() {
            points
        } else {
            incomplete
                .iter()
                .map(|destination_card| {
                    let (start, end) = destination_card.destination;
                    if (player.is_connected(start, city1) && player.is_connected(city2, end))
                        || (player.is_connected(start, city2) && player.is_connected(city1, end))
                    {
                        100 + points
                    } else if distance_oracle.is_on_shortest_path(start, end, city1, city2) {
                        10 + length as i32
                    } else {
                        0
                    }
                })
                .max()
                .filter(|score| *score > 0)?
        };

        // Wild cards are worth keeping.
        Some(score - wilds_used as i32)
    }
}

impl RolloutPolicy for GreedyPolicy {
    fn choose(
        &self,
        game_state: &GameState,
        legal_actions: &LegalActions,
        _rng: &mut StdRng,
    ) -> Option<Action> {
        let player = game_state.player(game_state.current_player());
        let incomplete: SmallVec<[DestinationCard; 8]> =
            player.incomplete_destination_cards().cloned().collect();

        // First maximum wins, for determinism.
        let mut best_claim: Option<(i32, Action)> = None;
        for action in &legal_actions.claims {
            if let Some(score) = Self::score_claim(game_state, &incomplete, action) {
                if best_claim.map_or(true, |(best_score, _)| score > best_score) {
                    best_claim = Some((score, *action));
                }
            }
        }
        if let Some((_, action)) = best_claim {
            return Some(action);
        }

        if incomplete.is_empty() && player.cars() >= GREEDY_DESTINATION_CARS {
            if let Some(action) = legal_actions.destination_draws.first() {
                return Some(*action);
            }
        }

        let from_deck = Action::DrawTrainCards {
            first: CardSource::Deck,
            second: Some(CardSource::Deck),
        };
        if legal_actions.card_draws.contains(&from_deck) {
            return Some(from_deck);
        }

        legal_actions
            .card_draws
            .first()
            .or_else(|| legal_actions.claims.first())
            .or_else(|| legal_actions.iter().next())
            .copied()
    }
}

/// Plays one turn of the current player with `policy`.
///
/// A claim may still be refused when it is applied, if it turns out to be a tunnel too
/// expensive to pay for: the player then draws instead, or passes if nothing can be drawn.
pub fn play_turn(game_state: &mut GameState, policy: &dyn RolloutPolicy, rng: &mut StdRng) {
    let legal_actions = game_state.legal_actions();

    if let Some(action) = policy.choose(game_state, &legal_actions, rng) {
        match game_state.apply(&action) {
            Ok(()) => return,
            Err(err) => trace!("Rollout action refused ({}): {}.", action, err),
        }
    }

    let fallback = legal_actions
        .card_draws
        .choose(rng)
        .or_else(|| legal_actions.destination_draws.choose(rng));
    if let Some(action) = fallback {
        if game_state.apply(action).is_ok() {
            return;
        }
    }

    game_state.skip_turn();
}

/// Plays the game out from `game_state`, and returns the score `acting_player` would get.
///
/// `policy` plays `acting_player`, everybody else plays at random. The rollout stops when the
/// game ends, or once `acting_player` has played `max_depth` turns.
pub fn rollout(
    mut game_state: GameState,
    acting_player: usize,
    policy: &dyn RolloutPolicy,
    max_depth: usize,
    rng: &mut StdRng,
) -> f64 {
    let mut depth = 0;

    while !game_state.is_terminal() {
        if game_state.current_player() == acting_player {
            if depth >= max_depth {
                break;
            }
            depth += 1;
            play_turn(&mut game_state, policy, rng);
        } else {
            play_turn(&mut game_state, &RandomPolicy, rng);
        }
    }

    game_state.evaluate(acting_player) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::TrainColor::{self, *};
    use crate::city::CityId;
    use crate::game_state::GameConfig;
    use crate::topology::{MapKind, Topology};

    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    const A: CityId = CityId(0);
    const B: CityId = CityId(1);
    const C: CityId = CityId(2);

    fn line_topology() -> Topology {
        Topology::new(MapKind::Usa)
            .with_route("A", "B", 2, Wild)
            .with_route("B", "C", 3, Wild)
            .with_ticket("A", "C", 5)
    }

    fn claim(route: usize, city1: CityId, city2: CityId, color: TrainColor, wilds_used: u8) -> Action {
        Action::ClaimRoute {
            route,
            city1,
            city2,
            color,
            wilds_used,
        }
    }

    fn from_deck() -> Action {
        Action::DrawTrainCards {
            first: CardSource::Deck,
            second: Some(CardSource::Deck),
        }
    }

    // Tests for `RandomPolicy`.

    #[test]
    fn random_policy_picks_a_legal_action() {
        let mut game_state = GameState::new(&Topology::usa(), 2, 4).unwrap();
        let legal_actions = game_state.legal_actions();
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..20 {
            let action = RandomPolicy
                .choose(&game_state, &legal_actions, &mut rng)
                .unwrap();
            assert!(legal_actions.contains(&action));
        }
        assert_eq!(
            RandomPolicy.choose(&game_state, &LegalActions::default(), &mut rng),
            None
        );
    }

    // Tests for `GreedyPolicy`.

    #[test]
    fn greedy_policy_completes_destination() {
        let mut game_state = GameState::new(&line_topology(), 2, 1).unwrap();
        game_state.give_train_cards(0, &[(Red, 5), (Wild, 2)]);
        game_state.apply(&claim(0, A, B, Red, 0)).unwrap();
        game_state.apply(&from_deck()).unwrap();

        let legal_actions = game_state.legal_actions();
        assert!(legal_actions.contains(&claim(1, B, C, Red, 2)));

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            GreedyPolicy.choose(&game_state, &legal_actions, &mut rng),
            Some(claim(1, B, C, Red, 0))
        );
    }

    #[test]
    fn greedy_policy_draws_from_deck() {
        let mut game_state = GameState::new(&line_topology(), 2, 1).unwrap();
        game_state.give_train_cards(0, &[(Red, 1)]);

        let legal_actions = game_state.legal_actions();
        assert!(legal_actions.claims.is_empty());

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            GreedyPolicy.choose(&game_state, &legal_actions, &mut rng),
            Some(from_deck())
        );
    }

    #[test]
    fn greedy_policy_draws_destinations_once_fulfilled() {
        let mut topology = Topology::new(MapKind::Usa).with_route("A", "B", 1, Wild);
        for _ in 0..7 {
            topology = topology.with_ticket("A", "B", 1);
        }
        let mut game_state = GameState::new(&topology, 2, 1).unwrap();
        game_state.give_train_cards(0, &[(Red, 1)]);
        game_state.apply(&claim(0, A, B, Red, 0)).unwrap();
        game_state.skip_turn();

        let legal_actions = game_state.legal_actions();
        assert!(game_state.player(0).incomplete_destination_cards().next().is_none());

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            GreedyPolicy.choose(&game_state, &legal_actions, &mut rng),
            Some(Action::DrawDestinations {
                keep: [true, false, false]
            })
        );
    }

    // Tests for `rollout`.

    #[test]
    fn rollout_at_depth_zero_evaluates_leaf() {
        let game_state = GameState::new(&line_topology(), 2, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        // The destination card of player 0 is not fulfilled.
        assert_eq!(rollout(game_state, 0, &GreedyPolicy, 0, &mut rng), -5.0);
    }

    #[test]
    fn rollout_is_reproducible() {
        let config = GameConfig::default().with_seed(8).with_cars(12);
        let game_state = GameState::with_config(&Topology::usa(), &config).unwrap();

        let first = rollout(
            game_state.clone(),
            0,
            &GreedyPolicy,
            50,
            &mut StdRng::seed_from_u64(3),
        );
        let second = rollout(game_state, 0, &GreedyPolicy, 50, &mut StdRng::seed_from_u64(3));
        assert_eq!(first, second);
    }

    #[test]
    fn play_turn_always_passes_the_turn() {
        let config = GameConfig::default().with_players(3).with_seed(2).with_cars(10);
        let mut game_state = GameState::with_config(&Topology::usa(), &config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let mut turns = 0;
        while !game_state.is_terminal() && turns < 300 {
            assert_eq!(game_state.turn(), turns);
            assert_eq!(game_state.current_player(), turns % 3);
            play_turn(&mut game_state, &GreedyPolicy, &mut rng);
            turns += 1;
        }
        assert_eq!(game_state.turn(), turns);
    }
}
