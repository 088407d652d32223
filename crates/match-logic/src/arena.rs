//! Configured entry point for matches and tournaments

use rayon::prelude::*;
use tracing::debug;

use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::game::{self, MatchResult};
use crate::pairing::generate_all_pairings;
use crate::payoff::PayoffMatrix;
use crate::random::SeededRng;
use crate::sandbox::{Sandbox, SandboxLimits};
use crate::strategy::Strategy;
use crate::tournament::{self, TournamentResult};

/// A payoff table, sandbox limits and a seed. Stateless between calls, so
/// one arena can run any number of matches, concurrently or not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arena {
    payoff: PayoffMatrix,
    sandbox: Sandbox,
    seed: u64,
    parallel: bool,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            payoff: PayoffMatrix::STANDARD,
            sandbox: Sandbox::default(),
            seed: 0,
            parallel: true,
        }
    }
}

impl Arena {
    pub fn new(payoff: PayoffMatrix, limits: SandboxLimits, seed: u64) -> Self {
        Self {
            payoff,
            sandbox: Sandbox::new(limits),
            seed,
            parallel: true,
        }
    }

    pub fn from_config(config: &ArenaConfig) -> Self {
        Self::new(config.payoff, config.limits, config.seed)
    }

    /// Run tournament matches on the calling thread only
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn payoff(&self) -> &PayoffMatrix {
        &self.payoff
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A standalone match, drawing randomness as match 0 of this arena
    pub fn run_match(&self, a: &Strategy, b: &Strategy, round_count: u32) -> MatchResult {
        self.run_match_indexed(a, b, round_count, 0)
    }

    /// Match `match_index` of this arena's seed; the tournament uses the
    /// pairing index, so any tournament match can be replayed on its own.
    pub fn run_match_indexed(
        &self,
        a: &Strategy,
        b: &Strategy,
        round_count: u32,
        match_index: u32,
    ) -> MatchResult {
        let rng = SeededRng::new(self.seed, match_index);
        game::play(a, b, round_count, &self.payoff, &self.sandbox, &rng)
    }

    /// Every strategy against every strategy, itself included
    pub fn run_tournament(
        &self,
        strategies: &[Strategy],
        rounds_per_match: u32,
    ) -> Result<TournamentResult, ArenaError> {
        tournament::validate(strategies, rounds_per_match)?;

        let pairings = generate_all_pairings(strategies.len() as u32);
        debug!(
            strategies = strategies.len(),
            matches = pairings.len(),
            rounds_per_match,
            seed = self.seed,
            "tournament start"
        );

        let play = |(idx, &(i, j)): (usize, &(u32, u32))| {
            self.run_match_indexed(
                &strategies[i as usize],
                &strategies[j as usize],
                rounds_per_match,
                idx as u32,
            )
        };
        // Collecting an indexed iterator keeps pairing order either way
        let matches: Vec<MatchResult> = if self.parallel {
            pairings.par_iter().enumerate().map(play).collect()
        } else {
            pairings.iter().enumerate().map(play).collect()
        };

        let entries = tournament::rank(strategies, &pairings, &matches);
        if let Some(top) = entries.first() {
            debug!(winner = %top.strategy_id, score = top.total_score, "tournament end");
        }

        Ok(TournamentResult {
            timestamp: chrono::Utc::now(),
            entries,
            matches,
        })
    }
}
