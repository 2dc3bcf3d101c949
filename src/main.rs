//! Plays a whole game between computer players, and prints the final scores.
//!
//! ```text
//! ttr-selfplay --players 3 --simulations 200 --seed 7
//! RUST_LOG=debug ttr-selfplay --topology my_map.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use std::path::PathBuf;

use ticket_to_ride_planner::game_state::{GameConfig, GameState};
use ticket_to_ride_planner::manager::{Manager, Seat};
use ticket_to_ride_planner::mcts::{MctsConfig, PolicyKind};
use ticket_to_ride_planner::player::NUM_OF_CARS;
use ticket_to_ride_planner::topology::Topology;

/// Self-play of the planner.
#[derive(Parser, Debug)]
#[command(name = "ttr-selfplay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of players, all computers
    #[arg(short = 'p', long, default_value_t = 2)]
    players: usize,

    /// Seeds the game setup, and every search
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Simulations per decision
    #[arg(short = 's', long, default_value_t = 400)]
    simulations: u32,

    /// Rollouts run in parallel per round
    #[arg(short = 'b', long, default_value_t = 16)]
    batch: usize,

    /// Rollout worker threads (defaults to the number of cores)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Rollout policy of the searching player
    #[arg(long, default_value_t = PolicyKind::Greedy)]
    policy: PolicyKind,

    /// Maximum turns of the searching player per rollout
    #[arg(long, default_value_t = 30)]
    rollout_depth: usize,

    /// Cars per player; fewer make for shorter games
    #[arg(short = 'c', long, default_value_t = NUM_OF_CARS)]
    cars: u8,

    /// JSON topology to play on, instead of the built-in map
    #[arg(short = 't', long)]
    topology: Option<PathBuf>,

    /// Stop the game after this many turns
    #[arg(long, default_value_t = 1000)]
    max_turns: usize,

    /// Log level, unless RUST_LOG is set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _logger = Logger::try_with_env_or_str(&args.log_level)?
        .format(flexi_logger::colored_default_format)
        .start()?;

    let topology = match &args.topology {
        Some(path) => Topology::from_path(path)
            .with_context(|| format!("Cannot load the topology at {}", path.display()))?,
        None => Topology::usa(),
    };

    let game_config = GameConfig::default()
        .with_players(args.players)
        .with_seed(args.seed)
        .with_cars(args.cars);
    let game_state =
        GameState::with_config(&topology, &game_config).context("Cannot set up the game")?;

    let mut mcts_config = MctsConfig::default()
        .with_simulations(args.simulations)
        .with_batch_size(args.batch)
        .with_rollout_depth(args.rollout_depth)
        .with_policy(args.policy)
        .with_seed(args.seed);
    if let Some(workers) = args.workers {
        mcts_config = mcts_config.with_workers(workers);
    }

    let seats = (0..args.players).map(|_| Seat::Computer(mcts_config.clone()));
    let mut manager = Manager::new(game_state, seats)?;
    let scores = manager.play_to_end(args.max_turns)?;

    println!(
        "Game {} after {} turns.",
        if manager.is_over() { "over" } else { "stopped" },
        manager.game_state().turn()
    );
    for (player, score) in scores.iter().enumerate() {
        let summary = manager.game_state().player(player).summary();
        println!(
            "Player {} ({}): {} points, {} routes claimed, {} cars left.",
            player,
            summary.color,
            score,
            summary.claimed_routes.len(),
            summary.cars
        );
    }

    Ok(())
}
