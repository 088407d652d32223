//! Built-in strategy library
//!
//! The classic opponents every arena ships with, written in the same script
//! language users write their own strategies in.

use crate::strategy::Strategy;

struct Builtin {
    id: &'static str,
    name: &'static str,
    color: &'static str,
    code: &'static str,
}

static BUILTINS: &[Builtin] = &[
    // Basic
    Builtin {
        id: "tit-for-tat",
        name: "Tit for Tat",
        color: "#3b82f6",
        code: "// Cooperate on the first move, then copy the opponent's last move.
if (context.round === 0) return 'C';
return context.opponentHistory[context.round - 1];",
    },
    Builtin {
        id: "always-cooperate",
        name: "Always Cooperate",
        color: "#10b981",
        code: "return 'C';",
    },
    Builtin {
        id: "always-defect",
        name: "Always Defect",
        color: "#ef4444",
        code: "return 'D';",
    },
    Builtin {
        id: "random",
        name: "Random",
        color: "#8b5cf6",
        code: "return Math.random() > 0.5 ? 'C' : 'D';",
    },
    // Cooperative
    Builtin {
        id: "generous-tft",
        name: "Generous Tit-for-Tat",
        color: "#34d399",
        code: "// Tit for Tat that forgives a defection 10% of the time
if (context.round === 0) return 'C';
if (context.opponentHistory[context.round - 1] === 'C') return 'C';
return Math.random() < 0.1 ? 'C' : 'D';",
    },
    Builtin {
        id: "tit-for-two-tats",
        name: "Tit for Two Tats",
        color: "#6ee7b7",
        code: "// Defect only after two defections in a row
if (context.round < 2) return 'C';
const last1 = context.opponentHistory[context.round - 1];
const last2 = context.opponentHistory[context.round - 2];
if (last1 === 'D' && last2 === 'D') return 'D';
return 'C';",
    },
    Builtin {
        id: "optimistic-starter",
        name: "Optimistic Starter",
        color: "#a7f3d0",
        code: "// Cooperate for the first 5 rounds, then Tit for Tat
if (context.round < 5) return 'C';
return context.opponentHistory[context.round - 1];",
    },
    Builtin {
        id: "trust-builder",
        name: "Trust Builder",
        color: "#059669",
        code: "// Unconditional cooperation for 3 rounds, then Tit for Tat
if (context.round < 3) return 'C';
return context.opponentHistory[context.round - 1];",
    },
    // Aggressive
    Builtin {
        id: "grim-trigger",
        name: "Grim Trigger",
        color: "#b91c1c",
        code: "// Cooperate until the opponent defects once, then defect forever
if (context.opponentHistory.includes('D')) return 'D';
return 'C';",
    },
    Builtin {
        id: "bully",
        name: "Bully",
        color: "#f87171",
        code: "// Defect until the opponent cooperates twice in a row
if (context.round < 2) return 'D';
const last1 = context.opponentHistory[context.round - 1];
const last2 = context.opponentHistory[context.round - 2];
if (last1 === 'C' && last2 === 'C') return 'C';
return 'D';",
    },
    Builtin {
        id: "opportunist",
        name: "Opportunist",
        color: "#991b1b",
        code: "// Exploit opponents that cooperate more than 80% of the time
if (context.round < 5) return 'C';
const oppCs = context.opponentHistory.filter(m => m === 'C').length;
if ((oppCs / context.round) > 0.8) return 'D';
return context.opponentHistory[context.round - 1];",
    },
    Builtin {
        id: "endgame-defector",
        name: "Endgame Defector",
        color: "#7f1d1d",
        code: "// Tit for Tat, but defect in the final 5 rounds
if (context.totalRounds && context.round >= context.totalRounds - 5) return 'D';
if (context.round === 0) return 'C';
return context.opponentHistory[context.round - 1];",
    },
    // Reactive
    Builtin {
        id: "suspicious-tft",
        name: "Suspicious TFT",
        color: "#f59e0b",
        code: "// Open with a defection, then Tit for Tat
if (context.round === 0) return 'D';
return context.opponentHistory[context.round - 1];",
    },
    Builtin {
        id: "reverse-tft",
        name: "Reverse TFT",
        color: "#d97706",
        code: "// Play the opposite of the opponent's last move
if (context.round === 0) return 'C';
return context.opponentHistory[context.round - 1] === 'C' ? 'D' : 'C';",
    },
    Builtin {
        id: "echo-delay",
        name: "Echo with Delay",
        color: "#b45309",
        code: "// Copy the opponent's move from two rounds ago
if (context.round < 2) return 'C';
return context.opponentHistory[context.round - 2];",
    },
    Builtin {
        id: "pavlov",
        name: "Pavlov (Win-Stay Lose-Shift)",
        color: "#ec4899",
        code: "// Repeat the last move after scoring 3 or more, otherwise switch
if (context.round === 0) return 'C';
const lastPayoff = context.payoffHistory[context.round - 1];
const myLast = context.myHistory[context.round - 1];
if (lastPayoff >= 3) return myLast;
return myLast === 'C' ? 'D' : 'C';",
    },
    // Noise resilient
    Builtin {
        id: "majority-rule",
        name: "Majority Rule",
        color: "#6366f1",
        code: "// Cooperate if the opponent cooperated at least half of the last 10 rounds
if (context.round === 0) return 'C';
const window = context.opponentHistory.slice(-10);
const cCount = window.filter(m => m === 'C').length;
return cCount >= window.length / 2 ? 'C' : 'D';",
    },
    Builtin {
        id: "stochastic-tft",
        name: "Stochastic TFT",
        color: "#818cf8",
        code: "// Tit for Tat with 10% noise
if (context.round === 0) return 'C';
if (Math.random() < 0.1) return Math.random() > 0.5 ? 'C' : 'D';
return context.opponentHistory[context.round - 1];",
    },
    Builtin {
        id: "mirror-matcher",
        name: "Mirror Matcher",
        color: "#a855f7",
        code: "// Cooperate with probability equal to the opponent's cooperation rate
if (context.round === 0) return 'C';
const oppCs = context.opponentHistory.filter(m => m === 'C').length;
const rate = oppCs / context.round;
return Math.random() < rate ? 'C' : 'D';",
    },
];

/// Starting point for a new strategy, documenting what `context` holds
pub const BOILERPLATE_SOURCE: &str = "// Available context:
// context.round (number): current round index (0-based)
// context.totalRounds (number): total rounds in the match
// context.myHistory (Array<'C'|'D'>): your previous moves
// context.opponentHistory (Array<'C'|'D'>): opponent's previous moves
// context.payoffHistory (Array<number>): your previous scores

// Return 'C' or 'D'. Any error, timeout or other value counts as 'D'.

if (context.round === 0) {
  return 'C';
}

// Example: copy the opponent
return context.opponentHistory[context.round - 1];
";

impl Builtin {
    fn to_strategy(&self) -> Strategy {
        Strategy {
            id: self.id.to_string(),
            name: self.name.to_string(),
            code: self.code.to_string(),
            color: self.color.to_string(),
            is_built_in: true,
        }
    }
}

/// All built-in strategies, in display order
pub fn builtin_strategies() -> Vec<Strategy> {
    BUILTINS.iter().map(Builtin::to_strategy).collect()
}

pub fn find_builtin(id: &str) -> Option<Strategy> {
    BUILTINS.iter().find(|b| b.id == id).map(Builtin::to_strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{check, evaluate};
    use crate::strategy::{Move, RoundContext};
    use std::collections::HashSet;

    const C: Move = Move::Cooperate;
    const D: Move = Move::Defect;

    fn ctx<'a>(round: u32, total: u32, mine: &'a [Move], theirs: &'a [Move], payoffs: &'a [i32]) -> RoundContext<'a> {
        RoundContext {
            round,
            total_rounds: total,
            my_history: mine,
            opponent_history: theirs,
            payoff_history: payoffs,
        }
    }

    fn code(id: &str) -> String {
        find_builtin(id).unwrap().code
    }

    #[test]
    fn test_library_shape() {
        let all = builtin_strategies();
        assert_eq!(all.len(), 19);
        let ids: HashSet<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), all.len(), "ids must be unique");
        assert!(all.iter().all(|s| s.is_built_in && s.color.starts_with('#')));
    }

    #[test]
    fn test_every_builtin_compiles() {
        for strategy in builtin_strategies() {
            assert!(check(&strategy.code).is_ok(), "{} failed to compile", strategy.id);
        }
        assert!(check(BOILERPLATE_SOURCE).is_ok());
    }

    #[test]
    fn test_every_builtin_opens_with_a_valid_move() {
        // Opening rounds must not fault into a forced defect
        for strategy in builtin_strategies() {
            let prepared = crate::sandbox::Sandbox::default().prepare(&strategy.code);
            let mut rng = crate::random::SeededRng::new(3, 0);
            let decision = prepared.decide(RoundContext::opening(10), &mut rng);
            assert!(decision.verdict.is_accepted(), "{}: {:?}", strategy.id, decision);
        }
    }

    #[test]
    fn test_find_builtin() {
        assert_eq!(find_builtin("pavlov").unwrap().name, "Pavlov (Win-Stay Lose-Shift)");
        assert!(find_builtin("nope").is_none());
    }

    #[test]
    fn test_tit_for_tat() {
        let tft = code("tit-for-tat");
        assert_eq!(evaluate(&tft, RoundContext::opening(5)), C);
        assert_eq!(evaluate(&tft, ctx(2, 5, &[C, C], &[C, D], &[3, 0])), D);
        assert_eq!(evaluate(&tft, ctx(2, 5, &[C, D], &[D, C], &[0, 5])), C);
    }

    #[test]
    fn test_grim_trigger_never_forgives() {
        let grim = code("grim-trigger");
        assert_eq!(evaluate(&grim, ctx(3, 10, &[C, C, D], &[C, D, C], &[3, 0, 5])), D);
        assert_eq!(evaluate(&grim, ctx(2, 10, &[C, C], &[C, C], &[3, 3])), C);
    }

    #[test]
    fn test_pavlov() {
        let pavlov = code("pavlov");
        // Won with D: stay
        assert_eq!(evaluate(&pavlov, ctx(1, 10, &[D], &[C], &[5])), D);
        // Lost with C: shift
        assert_eq!(evaluate(&pavlov, ctx(1, 10, &[C], &[D], &[0])), D);
        // Mutual defection: shift to C
        assert_eq!(evaluate(&pavlov, ctx(1, 10, &[D], &[D], &[1])), C);
    }

    #[test]
    fn test_endgame_defector() {
        let endgame = code("endgame-defector");
        let mine = [C; 5];
        let theirs = [C; 5];
        let payoffs = [3; 5];
        assert_eq!(evaluate(&endgame, ctx(4, 10, &mine[..4], &theirs[..4], &payoffs[..4])), C);
        assert_eq!(evaluate(&endgame, ctx(5, 10, &mine, &theirs, &payoffs)), D);
    }

    #[test]
    fn test_majority_rule_uses_last_ten() {
        let majority = code("majority-rule");
        let mut theirs = vec![C; 12];
        theirs.extend([D; 6]);
        let mine = vec![C; 18];
        let payoffs = vec![3; 18];
        // 4 C vs 6 D in the window
        assert_eq!(evaluate(&majority, ctx(18, 20, &mine, &theirs, &payoffs)), D);
    }

    #[test]
    fn test_opportunist_exploits_pushovers() {
        let opportunist = code("opportunist");
        let theirs = [C; 6];
        let mine = [C; 6];
        let payoffs = [3; 6];
        assert_eq!(evaluate(&opportunist, ctx(6, 10, &mine, &theirs, &payoffs)), D);
    }
}
