//! Strategy definitions and the per-round view handed to them

use core::fmt;
use serde::{Deserialize, Serialize};

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    #[serde(rename = "C")]
    Cooperate,
    #[serde(rename = "D")]
    Defect,
}

impl Move {
    /// Single-letter symbol used by strategy scripts and transcripts
    pub fn symbol(self) -> &'static str {
        match self {
            Move::Cooperate => "C",
            Move::Defect => "D",
        }
    }

    /// Strict decode: only the exact symbols `C` and `D` are moves.
    pub fn from_symbol(symbol: &str) -> Option<Move> {
        match symbol {
            "C" => Some(Move::Cooperate),
            "D" => Some(Move::Defect),
            _ => None,
        }
    }

    pub fn is_cooperate(self) -> bool {
        self == Move::Cooperate
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A user-authored strategy.
///
/// Only `id` and `code` matter to the simulation; `name`, `color` and
/// `is_built_in` are carried through for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    /// Decision logic, the body of a function receiving `context`
    pub code: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub is_built_in: bool,
}

impl Strategy {
    /// Create a user strategy with no display color
    pub fn new(id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: code.into(),
            color: String::new(),
            is_built_in: false,
        }
    }
}

/// Everything a strategy may observe when choosing its move for one round.
///
/// The histories are borrowed from the match engine and cover prior rounds
/// only, so each has length `round`.
#[derive(Clone, Copy, Debug)]
pub struct RoundContext<'a> {
    /// Zero-based index of the round being decided
    pub round: u32,
    /// Rounds scheduled for the whole match
    pub total_rounds: u32,
    pub my_history: &'a [Move],
    pub opponent_history: &'a [Move],
    /// Our own payoff for each prior round
    pub payoff_history: &'a [i32],
}

impl RoundContext<'static> {
    /// Context for the first round of a match, with empty histories
    pub fn opening(total_rounds: u32) -> Self {
        RoundContext {
            round: 0,
            total_rounds,
            my_history: &[],
            opponent_history: &[],
            payoff_history: &[],
        }
    }
}
