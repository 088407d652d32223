//! Round-robin tournament results and ranking

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::game::MatchResult;
use crate::strategy::Strategy;

/// One strategy's standing after a tournament
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentEntry {
    pub strategy_id: String,
    pub matches_played: u32,
    pub total_score: i64,
    pub avg_score_per_round: f64,
    /// Cooperative moves over rounds played, across all matches
    pub cooperation_rate: f64,
    /// Matches won outright; ties count for nobody
    pub wins: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResult {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Ranked by total score, best first
    pub entries: Vec<TournamentEntry>,
    /// In pairing order
    pub matches: Vec<MatchResult>,
}

impl TournamentResult {
    pub fn entry(&self, strategy_id: &str) -> Option<&TournamentEntry> {
        self.entries.iter().find(|e| e.strategy_id == strategy_id)
    }

    pub fn winner(&self) -> Option<&TournamentEntry> {
        self.entries.first()
    }
}

/// Round-robin tournament with the standard payoff table, standard sandbox
/// limits and arena seed 0.
pub fn run_tournament(
    strategies: &[Strategy],
    rounds_per_match: u32,
) -> Result<TournamentResult, ArenaError> {
    Arena::default().run_tournament(strategies, rounds_per_match)
}

pub(crate) fn validate(strategies: &[Strategy], rounds_per_match: u32) -> Result<(), ArenaError> {
    if strategies.len() < 2 {
        return Err(ArenaError::NotEnoughStrategies(strategies.len()));
    }
    if rounds_per_match == 0 {
        return Err(ArenaError::InvalidRoundCount);
    }
    let mut seen = HashSet::with_capacity(strategies.len());
    for strategy in strategies {
        if !seen.insert(strategy.id.as_str()) {
            return Err(ArenaError::DuplicateStrategy(strategy.id.clone()));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    matches_played: u32,
    total_score: i64,
    wins: u32,
    rounds: u64,
    cooperations: u64,
}

impl Tally {
    fn record(&mut self, own: i64, other: i64, rounds: usize, cooperations: usize) {
        self.matches_played += 1;
        self.total_score += own;
        if own > other {
            self.wins += 1;
        }
        self.rounds += rounds as u64;
        self.cooperations += cooperations as u64;
    }

    fn into_entry(self, strategy_id: &str) -> TournamentEntry {
        let per_round = |x: f64| if self.rounds == 0 { 0.0 } else { x / self.rounds as f64 };
        TournamentEntry {
            strategy_id: strategy_id.to_string(),
            matches_played: self.matches_played,
            total_score: self.total_score,
            avg_score_per_round: per_round(self.total_score as f64),
            cooperation_rate: per_round(self.cooperations as f64),
            wins: self.wins,
        }
    }
}

/// Fold match results into ranked entries.
///
/// `matches[k]` must be the match for `pairings[k]`. The fold runs in
/// pairing order, and a self-play match counts once, from side A.
pub(crate) fn rank(
    strategies: &[Strategy],
    pairings: &[(u32, u32)],
    matches: &[MatchResult],
) -> Vec<TournamentEntry> {
    debug_assert_eq!(pairings.len(), matches.len());

    let mut tallies = vec![Tally::default(); strategies.len()];
    for (&(i, j), result) in pairings.iter().zip(matches) {
        let rounds = result.round_count();
        tallies[i as usize].record(
            result.total_score_a,
            result.total_score_b,
            rounds,
            result.cooperations_a(),
        );
        if i != j {
            tallies[j as usize].record(
                result.total_score_b,
                result.total_score_a,
                rounds,
                result.cooperations_b(),
            );
        }
    }

    let mut entries: Vec<TournamentEntry> = strategies
        .iter()
        .zip(tallies)
        .map(|(strategy, tally)| tally.into_entry(&strategy.id))
        .collect();
    // Stable: equal scores keep input order
    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{builtin_strategies, find_builtin};
    use crate::game::RoundResult;
    use crate::pairing::generate_all_pairings;
    use crate::strategy::Move;

    fn builtins(ids: &[&str]) -> Vec<Strategy> {
        ids.iter().map(|id| find_builtin(id).unwrap()).collect()
    }

    #[test]
    fn test_requires_two_strategies() {
        assert_eq!(
            run_tournament(&builtins(&["tit-for-tat"]), 10).unwrap_err(),
            ArenaError::NotEnoughStrategies(1)
        );
        assert_eq!(run_tournament(&[], 10).unwrap_err(), ArenaError::NotEnoughStrategies(0));
    }

    #[test]
    fn test_rejects_zero_rounds() {
        let strategies = builtins(&["tit-for-tat", "always-defect"]);
        assert_eq!(run_tournament(&strategies, 0).unwrap_err(), ArenaError::InvalidRoundCount);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let strategies = builtins(&["tit-for-tat", "always-defect", "tit-for-tat"]);
        assert_eq!(
            run_tournament(&strategies, 5).unwrap_err(),
            ArenaError::DuplicateStrategy("tit-for-tat".into())
        );
    }

    #[test]
    fn test_match_count_and_order() {
        let strategies = builtins(&["tit-for-tat", "always-defect", "always-cooperate"]);
        let result = run_tournament(&strategies, 5).unwrap();

        assert_eq!(result.matches.len(), 6);
        let ids: Vec<(&str, &str)> = result
            .matches
            .iter()
            .map(|m| (m.strategy_a_id.as_str(), m.strategy_b_id.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("tit-for-tat", "tit-for-tat"),
                ("tit-for-tat", "always-defect"),
                ("tit-for-tat", "always-cooperate"),
                ("always-defect", "always-defect"),
                ("always-defect", "always-cooperate"),
                ("always-cooperate", "always-cooperate"),
            ]
        );
    }

    #[test]
    fn test_self_play_counted_once() {
        let strategies = builtins(&["always-cooperate", "always-defect"]);
        let result = run_tournament(&strategies, 10).unwrap();

        let coop = result.entry("always-cooperate").unwrap();
        // Self-play (30) plus 0 against always-defect
        assert_eq!(coop.matches_played, 2);
        assert_eq!(coop.total_score, 30);
        assert_eq!(coop.avg_score_per_round, 1.5);
        assert_eq!(coop.cooperation_rate, 1.0);
        assert_eq!(coop.wins, 0);

        let defect = result.entry("always-defect").unwrap();
        // 50 against always-cooperate plus self-play (10)
        assert_eq!(defect.matches_played, 2);
        assert_eq!(defect.total_score, 60);
        assert_eq!(defect.cooperation_rate, 0.0);
        assert_eq!(defect.wins, 1);

        assert_eq!(result.winner().unwrap().strategy_id, "always-defect");
    }

    #[test]
    fn test_cooperation_rate_is_rounds_weighted() {
        let strategies = vec![
            Strategy::new("a", "A", "return 'C';"),
            Strategy::new("b", "B", "return 'D';"),
        ];
        let pairings = generate_all_pairings(2);
        let round = |move_a, move_b| RoundResult { round: 0, move_a, move_b, score_a: 0, score_b: 0 };
        // Matches of different lengths: a cooperates 1 of 1, then 0 of 3
        let matches = vec![
            MatchResult::from_rounds("a", "a", vec![round(Move::Cooperate, Move::Cooperate)]),
            MatchResult::from_rounds("a", "b", vec![round(Move::Defect, Move::Defect); 3]),
            MatchResult::from_rounds("b", "b", vec![]),
        ];
        let entries = rank(&strategies, &pairings, &matches);
        let a = entries.iter().find(|e| e.strategy_id == "a").unwrap();
        // 1 / 4, not the unweighted (1.0 + 0.0) / 2
        assert_eq!(a.cooperation_rate, 0.25);
    }

    #[test]
    fn test_ties_award_no_wins() {
        let strategies = builtins(&["tit-for-tat", "always-cooperate"]);
        let result = run_tournament(&strategies, 10).unwrap();
        assert!(result.entries.iter().all(|e| e.wins == 0));
        // Equal scores keep input order
        let order: Vec<_> = result.entries.iter().map(|e| e.strategy_id.as_str()).collect();
        assert_eq!(order, vec!["tit-for-tat", "always-cooperate"]);
    }

    #[test]
    fn test_entries_sorted_by_total_score() {
        let result = run_tournament(&builtin_strategies(), 20).unwrap();
        assert_eq!(result.matches.len(), 190);
        assert_eq!(result.entries.len(), 19);
        assert!(result.entries.windows(2).all(|w| w[0].total_score >= w[1].total_score));
        for entry in &result.entries {
            assert_eq!(entry.matches_played, 19);
            assert!((0.0..=1.0).contains(&entry.cooperation_rate));
        }
    }

    #[test]
    fn test_deterministic_ranking() {
        let strategies = builtins(&["tit-for-tat", "grim-trigger", "pavlov", "bully", "reverse-tft"]);
        let first = run_tournament(&strategies, 30).unwrap();
        let second = run_tournament(&strategies, 30).unwrap();
        assert_eq!(first.entries, second.entries);
        assert_eq!(first.matches, second.matches);
    }

    #[test]
    fn test_serialized_timestamp_is_millis() {
        let strategies = builtins(&["tit-for-tat", "always-defect"]);
        let result = run_tournament(&strategies, 2).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["timestamp"].as_i64(), Some(result.timestamp.timestamp_millis()));
        assert!(json["entries"][0]["avgScorePerRound"].is_number());
    }
}
