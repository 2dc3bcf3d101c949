use std::sync::mpsc;

use strum::IntoEnumIterator;
use ticket_to_ride_planner::card::TrainColor;
use ticket_to_ride_planner::game_state::{GameConfig, GameState};
use ticket_to_ride_planner::manager::{Manager, Seat};
use ticket_to_ride_planner::mcts::{MctsConfig, PolicyKind};
use ticket_to_ride_planner::topology::Topology;

const MAX_TURNS: usize = 120;

fn total_train_cards(game_state: &GameState) -> usize {
    TrainColor::iter()
        .map(|color| game_state.count_train_cards(color))
        .sum()
}

#[test]
fn computers_play_a_short_game() {
    let game_config = GameConfig::default().with_players(3).with_seed(17).with_cars(10);
    let game_state = GameState::with_config(&Topology::usa(), &game_config).unwrap();
    assert_eq!(total_train_cards(&game_state), 110);

    let mcts_config = MctsConfig::for_testing()
        .with_simulations(16)
        .with_rollout_depth(4)
        .with_seed(17);
    let seats = [
        Seat::Computer(mcts_config.clone()),
        Seat::Computer(mcts_config.clone().with_policy(PolicyKind::Random)),
        Seat::Computer(mcts_config.with_batch_size(1)),
    ];

    let (tx, rx) = mpsc::channel();
    let mut manager = Manager::new(game_state, seats).unwrap().with_display(tx);

    let scores = manager.play_to_end(MAX_TURNS).unwrap();
    let game_state = manager.game_state();

    assert_eq!(scores.len(), 3);
    assert_eq!(scores, game_state.final_scores());
    assert!(game_state.is_terminal() || game_state.turn() == MAX_TURNS);
    assert_eq!(total_train_cards(game_state), 110);

    let snapshots: Vec<_> = rx.try_iter().collect();
    assert_eq!(snapshots.len(), game_state.turn());
    for (turn, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.turn, turn + 1);
        assert_eq!(snapshot.current_player, (turn + 1) % 3);
    }
    assert_eq!(
        snapshots.last().map(|snapshot| snapshot.is_over),
        Some(game_state.is_terminal())
    );

    for player in game_state.players() {
        let claimed_cars: u8 = player
            .claimed_routes()
            .iter()
            .map(|claimed_route| claimed_route.length)
            .sum();
        assert_eq!(player.cars() + claimed_cars, 10);
    }
}

#[test]
fn same_seeds_same_game() {
    let play = || {
        let game_config = GameConfig::default().with_seed(5).with_cars(8);
        let game_state = GameState::with_config(&Topology::usa(), &game_config).unwrap();
        let mcts_config = MctsConfig::for_testing()
            .with_simulations(8)
            .with_rollout_depth(3)
            .with_seed(5);
        let seats = [
            Seat::Computer(mcts_config.clone()),
            Seat::Computer(mcts_config),
        ];

        let mut manager = Manager::new(game_state, seats).unwrap();
        for _ in 0..12 {
            if manager.play_turn().unwrap() {
                break;
            }
        }
        manager.game_state().snapshot(manager.last_action())
    };

    assert_eq!(play(), play());
}
