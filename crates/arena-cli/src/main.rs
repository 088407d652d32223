//! Arena CLI
//!
//! Run matches and round-robin tournaments between Prisoner's Dilemma
//! strategy scripts from the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use match_logic::{
    builtin_strategies, find_builtin, Arena, ArenaConfig, MatchResult, Strategy, TournamentResult,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Iterated Prisoner's Dilemma arena for scripted strategies", long_about = None)]
struct Cli {
    /// JSON config file (payoff, limits, rounds, seed)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); otherwise RUST_LOG or warn
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in strategies
    List,

    /// Validate every strategy in a JSON file
    Check {
        /// JSON array of strategies (or a single strategy)
        file: PathBuf,
    },

    /// Play one match
    Match {
        /// Strategy id for player A
        a: String,

        /// Strategy id for player B
        b: String,

        /// Extra strategies to resolve ids against before the built-ins
        #[arg(long)]
        strategies: Option<PathBuf>,

        #[arg(long)]
        rounds: Option<u32>,

        #[arg(long)]
        seed: Option<u64>,

        /// Print the MatchResult as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play every strategy against every strategy
    Tournament {
        /// Strategies to enter (defaults to all built-ins)
        #[arg(long)]
        strategies: Option<PathBuf>,

        #[arg(long)]
        rounds: Option<u32>,

        #[arg(long)]
        seed: Option<u64>,

        /// Print the TournamentResult as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ArenaConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::List => {
            for strategy in builtin_strategies() {
                println!("{:<20} {}", strategy.id, strategy.name);
            }
        }

        Commands::Check { file } => {
            let strategies = load_strategies(&file)?;
            let arena = Arena::from_config(&config);
            let mut failures = 0;
            for strategy in &strategies {
                match arena.sandbox().check(&strategy.code) {
                    Ok(()) => println!("ok    {}", strategy.id),
                    Err(err) => {
                        failures += 1;
                        println!("error {}: {}", strategy.id, err);
                    }
                }
            }
            if failures > 0 {
                bail!("{} of {} strategies failed validation", failures, strategies.len());
            }
        }

        Commands::Match { a, b, strategies, rounds, seed, json } => {
            let custom = match strategies {
                Some(path) => load_strategies(&path)?,
                None => Vec::new(),
            };
            let a = resolve(&a, &custom)?;
            let b = resolve(&b, &custom)?;
            let rounds = rounds.unwrap_or(config.match_rounds);
            let arena = arena(&config, seed);

            info!(a = %a.id, b = %b.id, rounds, "running match");
            let result = arena.run_match(&a, &b, rounds);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_match(&result);
            }
        }

        Commands::Tournament { strategies, rounds, seed, json } => {
            let strategies = match strategies {
                Some(path) => load_strategies(&path)?,
                None => builtin_strategies(),
            };
            let rounds = rounds.unwrap_or(config.tournament_rounds);
            let arena = arena(&config, seed);

            info!(strategies = strategies.len(), rounds, "running tournament");
            let result = arena.run_tournament(&strategies, rounds)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_standings(&result);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn arena(config: &ArenaConfig, seed: Option<u64>) -> Arena {
    Arena::new(config.payoff, config.limits, seed.unwrap_or(config.seed))
}

/// Strategy files hold either an array of strategies or a single one
fn load_strategies(path: &Path) -> Result<Vec<Strategy>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let strategies = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|s: Strategy| vec![s])
    };
    strategies.with_context(|| format!("{} does not contain strategies", path.display()))
}

fn resolve(id: &str, custom: &[Strategy]) -> Result<Strategy> {
    if let Some(strategy) = custom.iter().find(|s| s.id == id) {
        return Ok(strategy.clone());
    }
    match find_builtin(id) {
        Some(strategy) => Ok(strategy),
        None => bail!("Unknown strategy '{}' (try `arena list`)", id),
    }
}

fn print_match(result: &MatchResult) {
    let (moves_a, moves_b) = result.transcript();
    let width = result.strategy_a_id.len().max(result.strategy_b_id.len());
    println!("{} rounds", result.rounds.len());
    println!(
        "{:<width$}  {}  score {:>5}  coop {:>5.1}%",
        result.strategy_a_id,
        moves_a,
        result.total_score_a,
        result.metrics.cooperation_rate_a * 100.0,
        width = width
    );
    println!(
        "{:<width$}  {}  score {:>5}  coop {:>5.1}%",
        result.strategy_b_id,
        moves_b,
        result.total_score_b,
        result.metrics.cooperation_rate_b * 100.0,
        width = width
    );
}

fn print_standings(result: &TournamentResult) {
    println!(
        "{:>4}  {:<20} {:>8} {:>8} {:>7} {:>5} {:>7}",
        "Rank", "Strategy", "Score", "Avg/Rnd", "Coop%", "Wins", "Played"
    );
    for (rank, entry) in result.entries.iter().enumerate() {
        println!(
            "{:>4}  {:<20} {:>8} {:>8.3} {:>6.1}% {:>5} {:>7}",
            rank + 1,
            entry.strategy_id,
            entry.total_score,
            entry.avg_score_per_round,
            entry.cooperation_rate * 100.0,
            entry.wins,
            entry.matches_played
        );
    }
    println!("{} matches", result.matches.len());
}
