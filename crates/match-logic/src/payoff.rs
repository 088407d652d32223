//! Payoff matrix for the Prisoner's Dilemma

use serde::{Deserialize, Serialize};
use crate::strategy::Move;

/// Scores awarded for each outcome, as `[mover, opponent]`. Higher is
/// better; negative scores are allowed.
///
/// The JSON shape (`{"CC": [3, 3], "CD": [0, 5], ...}`) is the one strategy
/// editors already store, so a saved table can be loaded as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffMatrix {
    #[serde(rename = "CC")]
    pub cc: [i32; 2],
    #[serde(rename = "CD")]
    pub cd: [i32; 2],
    #[serde(rename = "DC")]
    pub dc: [i32; 2],
    #[serde(rename = "DD")]
    pub dd: [i32; 2],
}

impl PayoffMatrix {
    /// T = 5 (temptation), R = 3 (reward), P = 1 (punishment), S = 0 (sucker)
    pub const STANDARD: PayoffMatrix = PayoffMatrix {
        cc: [3, 3],
        cd: [0, 5],
        dc: [5, 0],
        dd: [1, 1],
    };

    /// Build a symmetric table from the four classic values
    pub fn from_rtsp(reward: i32, temptation: i32, sucker: i32, punishment: i32) -> Self {
        Self {
            cc: [reward, reward],
            cd: [sucker, temptation],
            dc: [temptation, sucker],
            dd: [punishment, punishment],
        }
    }

    /// Returns (score_a, score_b) for a simultaneous pair of moves
    pub fn score(&self, a: Move, b: Move) -> (i32, i32) {
        let [score_a, score_b] = match (a, b) {
            (Move::Cooperate, Move::Cooperate) => self.cc,
            (Move::Cooperate, Move::Defect) => self.cd,
            (Move::Defect, Move::Cooperate) => self.dc,
            (Move::Defect, Move::Defect) => self.dd,
        };
        (score_a, score_b)
    }

    pub fn reward(&self) -> i32 {
        self.cc[0]
    }

    pub fn temptation(&self) -> i32 {
        self.dc[0]
    }

    pub fn sucker(&self) -> i32 {
        self.cd[0]
    }

    pub fn punishment(&self) -> i32 {
        self.dd[0]
    }

    /// Swapping the moves swaps the scores
    pub fn is_symmetric(&self) -> bool {
        self.cc[0] == self.cc[1]
            && self.dd[0] == self.dd[1]
            && self.cd[0] == self.dc[1]
            && self.cd[1] == self.dc[0]
    }

    /// Whether the table is a true dilemma: T > R > P > S and 2R > T + S.
    ///
    /// Informational only; the engine accepts any table.
    pub fn is_dilemma(&self) -> bool {
        let (r, t, s, p) = (
            self.reward() as i64,
            self.temptation() as i64,
            self.sucker() as i64,
            self.punishment() as i64,
        );
        self.is_symmetric() && t > r && r > p && p > s && 2 * r > t + s
    }
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MOVES: [Move; 2] = [Move::Cooperate, Move::Defect];

    #[test]
    fn test_standard_matrix() {
        let table = PayoffMatrix::STANDARD;
        assert_eq!(table.score(Move::Cooperate, Move::Cooperate), (3, 3));
        assert_eq!(table.score(Move::Cooperate, Move::Defect), (0, 5));
        assert_eq!(table.score(Move::Defect, Move::Cooperate), (5, 0));
        assert_eq!(table.score(Move::Defect, Move::Defect), (1, 1));
    }

    #[test]
    fn test_standard_is_dilemma() {
        assert!(PayoffMatrix::STANDARD.is_dilemma());
        assert_eq!(PayoffMatrix::from_rtsp(3, 5, 0, 1), PayoffMatrix::STANDARD);
    }

    #[test]
    fn test_non_dilemma_table() {
        // Cooperation dominates: no temptation to defect
        let harmony = PayoffMatrix::from_rtsp(5, 3, 1, 0);
        assert!(!harmony.is_dilemma());
        assert!(harmony.is_symmetric());
    }

    #[test]
    fn test_classic_names() {
        let table = PayoffMatrix::from_rtsp(4, 7, 1, 2);
        assert_eq!(table.reward(), 4);
        assert_eq!(table.temptation(), 7);
        assert_eq!(table.sucker(), 1);
        assert_eq!(table.punishment(), 2);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"CC":[3,3],"CD":[0,5],"DC":[5,0],"DD":[1,1]}"#;
        let table: PayoffMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(table, PayoffMatrix::STANDARD);
        assert_eq!(serde_json::to_string(&table).unwrap(), json);
    }

    #[test]
    fn test_negative_scores() {
        let json = r#"{"CC":[2,2],"CD":[-3,4],"DC":[4,-3],"DD":[-1,-1]}"#;
        let table: PayoffMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(table.sucker(), -3);
        assert_eq!(table.score(Move::Defect, Move::Defect), (-1, -1));
        assert!(table.is_dilemma());
    }

    #[test]
    fn test_standard_reversal() {
        let table = PayoffMatrix::STANDARD;
        for a in MOVES {
            for b in MOVES {
                let (x, y) = table.score(a, b);
                assert_eq!(table.score(b, a), (y, x));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_symmetric_tables_reverse(r in -100i32..100, t in -100i32..100, s in -100i32..100, p in -100i32..100) {
            let table = PayoffMatrix::from_rtsp(r, t, s, p);
            prop_assert!(table.is_symmetric());
            for a in MOVES {
                for b in MOVES {
                    let (x, y) = table.score(a, b);
                    prop_assert_eq!(table.score(b, a), (y, x));
                }
            }
        }
    }
}
