//! Match Logic for Prisoner's Arena
//!
//! Core game logic for the Iterated Prisoner's Dilemma arena: user-written
//! strategy scripts run in a restricted interpreter, play each other over a
//! configurable payoff table, and are ranked in a round-robin tournament.
//! This crate is compiled to:
//! - Native (for the `arena` CLI and other hosts)
//! - WASM (for the browser front end)

mod arena;
mod ast;
mod builtin;
mod config;
mod error;
mod game;
mod lexer;
mod pairing;
mod parser;
mod payoff;
mod random;
mod sandbox;
mod strategy;
mod tournament;
mod vm;

#[cfg(feature = "wasm")]
mod wasm;

pub use arena::Arena;
pub use builtin::{builtin_strategies, find_builtin, BOILERPLATE_SOURCE};
pub use config::{ArenaConfig, DEFAULT_MATCH_ROUNDS, DEFAULT_TOURNAMENT_ROUNDS};
pub use error::{ArenaError, ConfigError, ScriptError};
pub use game::{run_match, MatchMetrics, MatchResult, RoundResult};
pub use pairing::{calculate_match_count, generate_all_pairings, get_pairing_for_match};
pub use payoff::PayoffMatrix;
pub use random::SeededRng;
pub use sandbox::{
    check, evaluate, Decision, PreparedStrategy, Sandbox, SandboxLimits, Verdict,
};
pub use strategy::{Move, RoundContext, Strategy};
pub use tournament::{run_tournament, TournamentEntry, TournamentResult};

/// Payoff matrix for the Prisoner's Dilemma
/// Returns (score_a, score_b) from the standard table
pub fn payoff(a: Move, b: Move) -> (i32, i32) {
    PayoffMatrix::STANDARD.score(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Move::Cooperate, Move::Cooperate), (3, 3));
        assert_eq!(payoff(Move::Cooperate, Move::Defect), (0, 5));
        assert_eq!(payoff(Move::Defect, Move::Cooperate), (5, 0));
        assert_eq!(payoff(Move::Defect, Move::Defect), (1, 1));
    }
}
