//! Match execution engine

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::payoff::PayoffMatrix;
use crate::random::SeededRng;
use crate::sandbox::Sandbox;
use crate::strategy::{Move, RoundContext, Strategy};

/// Result of a single round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round: u32,
    pub move_a: Move,
    pub move_b: Move,
    pub score_a: i32,
    pub score_b: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetrics {
    pub cooperation_rate_a: f64,
    pub cooperation_rate_b: f64,
}

/// Result of a complete match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub strategy_a_id: String,
    pub strategy_b_id: String,
    pub rounds: Vec<RoundResult>,
    pub total_score_a: i64,
    pub total_score_b: i64,
    pub metrics: MatchMetrics,
}

impl MatchResult {
    /// Totals and cooperation rates derived from the rounds
    pub fn from_rounds(
        strategy_a_id: impl Into<String>,
        strategy_b_id: impl Into<String>,
        rounds: Vec<RoundResult>,
    ) -> Self {
        let total_score_a = rounds.iter().map(|r| i64::from(r.score_a)).sum();
        let total_score_b = rounds.iter().map(|r| i64::from(r.score_b)).sum();
        let rate = |cooperations: usize| {
            if rounds.is_empty() {
                0.0
            } else {
                cooperations as f64 / rounds.len() as f64
            }
        };
        let metrics = MatchMetrics {
            cooperation_rate_a: rate(rounds.iter().filter(|r| r.move_a.is_cooperate()).count()),
            cooperation_rate_b: rate(rounds.iter().filter(|r| r.move_b.is_cooperate()).count()),
        };
        Self {
            strategy_a_id: strategy_a_id.into(),
            strategy_b_id: strategy_b_id.into(),
            rounds,
            total_score_a,
            total_score_b,
            metrics,
        }
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn cooperations_a(&self) -> usize {
        self.rounds.iter().filter(|r| r.move_a.is_cooperate()).count()
    }

    pub fn cooperations_b(&self) -> usize {
        self.rounds.iter().filter(|r| r.move_b.is_cooperate()).count()
    }

    /// Moves as a compact string, e.g. `("CDDDD", "DDDDD")`
    pub fn transcript(&self) -> (String, String) {
        self.rounds
            .iter()
            .map(|r| (r.move_a.symbol(), r.move_b.symbol()))
            .unzip()
    }
}

/// Run a match with the standard payoff table, standard sandbox limits and
/// arena seed 0.
pub fn run_match(strategy_a: &Strategy, strategy_b: &Strategy, round_count: u32) -> MatchResult {
    play(
        strategy_a,
        strategy_b,
        round_count,
        &PayoffMatrix::STANDARD,
        &Sandbox::default(),
        &SeededRng::new(0, 0),
    )
}

/// Play `round_count` rounds.
///
/// Each round both strategies see only the histories committed by earlier
/// rounds, and each draws `Math.random()` from its own stream derived from
/// `rng`, the round and its side.
pub(crate) fn play(
    strategy_a: &Strategy,
    strategy_b: &Strategy,
    round_count: u32,
    payoff: &PayoffMatrix,
    sandbox: &Sandbox,
    rng: &SeededRng,
) -> MatchResult {
    debug!(a = %strategy_a.id, b = %strategy_b.id, round_count, "match start");

    let prepared_a = sandbox.prepare(&strategy_a.code);
    let prepared_b = sandbox.prepare(&strategy_b.code);
    for (strategy, prepared) in [(strategy_a, &prepared_a), (strategy_b, &prepared_b)] {
        if let Some(err) = prepared.compile_error() {
            warn!(strategy = %strategy.id, error = %err, "strategy does not compile; it will defect every round");
        }
    }

    let capacity = round_count as usize;
    let mut history_a: Vec<Move> = Vec::with_capacity(capacity);
    let mut history_b: Vec<Move> = Vec::with_capacity(capacity);
    let mut payoffs_a: Vec<i32> = Vec::with_capacity(capacity);
    let mut payoffs_b: Vec<i32> = Vec::with_capacity(capacity);
    let mut rounds: Vec<RoundResult> = Vec::with_capacity(capacity);

    for round in 0..round_count {
        let ctx_a = RoundContext {
            round,
            total_rounds: round_count,
            my_history: &history_a,
            opponent_history: &history_b,
            payoff_history: &payoffs_a,
        };
        let ctx_b = RoundContext {
            round,
            total_rounds: round_count,
            my_history: &history_b,
            opponent_history: &history_a,
            payoff_history: &payoffs_b,
        };

        // Neither side sees the other's move for this round
        let move_a = prepared_a.decide(ctx_a, &mut rng.for_round(round, 0)).choice;
        let move_b = prepared_b.decide(ctx_b, &mut rng.for_round(round, 1)).choice;

        let (score_a, score_b) = payoff.score(move_a, move_b);
        trace!(round, %move_a, %move_b, score_a, score_b, "round");

        history_a.push(move_a);
        history_b.push(move_b);
        payoffs_a.push(score_a);
        payoffs_b.push(score_b);
        rounds.push(RoundResult { round, move_a, move_b, score_a, score_b });
    }

    let result = MatchResult::from_rounds(strategy_a.id.as_str(), strategy_b.id.as_str(), rounds);
    debug!(
        a = %result.strategy_a_id,
        b = %result.strategy_b_id,
        score_a = result.total_score_a,
        score_b = result.total_score_b,
        "match end"
    );
    result
}
