//! Strategy sandbox
//!
//! The boundary between untrusted strategy scripts and the match engine.
//! A script is compiled once per match and then asked for a move every
//! round. Whatever goes wrong on the far side of this boundary (syntax
//! errors, runtime errors, exhausted quotas, wrong return values, even an
//! interpreter panic) comes back as a Defect, together with a [`Verdict`]
//! saying why.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Program;
use crate::error::ScriptError;
use crate::parser::parse;
use crate::random::SeededRng;
use crate::strategy::{Move, RoundContext};
use crate::vm;

// ── Limits ───────────────────────────────────────────────────────────

pub const DEFAULT_FUEL: u64 = 100_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 50;
pub const DEFAULT_MEMORY_BYTES: usize = 8 * 1024 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_SOURCE_LEN: usize = 16 * 1024;

/// Per-decision quotas.
///
/// `fuel` is the deterministic bound and is what normally stops a runaway
/// script. The wall-clock deadline is a backstop; `timeout_ms: None`
/// disables it, which is required on targets without a monotonic clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxLimits {
    /// Interpreter steps per decision
    pub fuel: u64,
    pub timeout_ms: Option<u64>,
    /// Bytes of strings and lists a script may create per decision
    pub memory: usize,
    pub max_depth: usize,
    pub max_source_len: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            fuel: DEFAULT_FUEL,
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            memory: DEFAULT_MEMORY_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_source_len: DEFAULT_MAX_SOURCE_LEN,
        }
    }
}

impl SandboxLimits {
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map(|t| t.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn with_memory(mut self, bytes: usize) -> Self {
        self.memory = bytes;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_source_len(mut self, len: usize) -> Self {
        self.max_source_len = len;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

// ── Verdicts ─────────────────────────────────────────────────────────

/// Why a decision came out the way it did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// The script returned `'C'` or `'D'`
    Accepted,
    Compile,
    Runtime,
    /// The script finished but returned something other than `'C'`/`'D'`
    Malformed,
    FuelExhausted,
    Timeout,
    MemoryExceeded,
    Panicked,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

impl From<&ScriptError> for Verdict {
    fn from(err: &ScriptError) -> Self {
        match err {
            ScriptError::SourceTooLong { .. }
            | ScriptError::Syntax { .. }
            | ScriptError::TooDeep { .. } => Verdict::Compile,
            ScriptError::Runtime(_) | ScriptError::Thrown(_) => Verdict::Runtime,
            ScriptError::FuelExhausted(_) => Verdict::FuelExhausted,
            ScriptError::Timeout(_) => Verdict::Timeout,
            ScriptError::MemoryExceeded(_) => Verdict::MemoryExceeded,
            ScriptError::Panicked => Verdict::Panicked,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub choice: Move,
    pub verdict: Verdict,
}

impl Decision {
    fn accepted(choice: Move) -> Self {
        Self { choice, verdict: Verdict::Accepted }
    }

    fn forced(verdict: Verdict) -> Self {
        Self { choice: Move::Defect, verdict }
    }
}

// ── Sandbox ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Parse a script under the source-size and nesting limits
    pub fn compile(&self, source: &str) -> Result<Program, ScriptError> {
        if source.len() > self.limits.max_source_len {
            return Err(ScriptError::SourceTooLong { limit: self.limits.max_source_len });
        }
        let max_depth = self.limits.max_depth;
        panic::catch_unwind(|| parse(source, max_depth)).unwrap_or(Err(ScriptError::Panicked))
    }

    /// Compile once for a whole match. A script that does not compile yields
    /// a strategy that defects every round.
    pub fn prepare(&self, source: &str) -> PreparedStrategy {
        PreparedStrategy {
            program: self.compile(source),
            limits: self.limits,
        }
    }

    /// Validate a script without running it
    pub fn check(&self, source: &str) -> Result<(), ScriptError> {
        self.compile(source).map(|_| ())
    }

    /// One-shot compile and decide
    pub fn evaluate(&self, source: &str, ctx: RoundContext<'_>, rng: &mut SeededRng) -> Decision {
        self.prepare(source).decide(ctx, rng)
    }
}

/// A compiled script, or the reason it failed to compile
#[derive(Clone, Debug)]
pub struct PreparedStrategy {
    program: Result<Program, ScriptError>,
    limits: SandboxLimits,
}

impl PreparedStrategy {
    pub fn compile_error(&self) -> Option<&ScriptError> {
        self.program.as_ref().err()
    }

    /// Ask the script for a move. Never fails: every fault is a Defect.
    pub fn decide(&self, ctx: RoundContext<'_>, rng: &mut SeededRng) -> Decision {
        let program = match &self.program {
            Ok(program) => program,
            Err(err) => return Decision::forced(Verdict::from(err)),
        };
        let limits = &self.limits;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| vm::run(program, ctx, rng, limits)));

        match outcome {
            Ok(Ok(value)) => match value.as_move() {
                Some(choice) => Decision::accepted(choice),
                None => {
                    debug!(round = ctx.round, returned = value.type_name(), "malformed strategy output, defecting");
                    Decision::forced(Verdict::Malformed)
                }
            },
            Ok(Err(err)) => {
                debug!(round = ctx.round, error = %err, "strategy fault, defecting");
                Decision::forced(Verdict::from(&err))
            }
            Err(_) => {
                debug!(round = ctx.round, "interpreter panicked, defecting");
                Decision::forced(Verdict::Panicked)
            }
        }
    }
}

/// Evaluate `source` once with the standard limits.
///
/// `Math.random()` draws from a fixed seed here; use [`Sandbox::evaluate`]
/// with your own [`SeededRng`] for other streams.
pub fn evaluate(source: &str, ctx: RoundContext<'_>) -> Move {
    let mut rng = SeededRng::new(0, 0);
    Sandbox::default().evaluate(source, ctx, &mut rng).choice
}

/// Validate `source` with the standard limits
pub fn check(source: &str) -> Result<(), ScriptError> {
    Sandbox::default().check(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const C: Move = Move::Cooperate;
    const D: Move = Move::Defect;

    fn verdict(source: &str) -> Verdict {
        let mut rng = SeededRng::new(1, 0);
        Sandbox::default().evaluate(source, RoundContext::opening(10), &mut rng).verdict
    }

    #[test]
    fn test_valid_returns() {
        assert_eq!(evaluate("return 'C';", RoundContext::opening(1)), C);
        assert_eq!(evaluate("return 'D';", RoundContext::opening(1)), D);
        assert_eq!(verdict("return 'C';"), Verdict::Accepted);
    }

    #[test]
    fn test_malformed_returns_defect() {
        for source in [
            "return 'c';",
            "return 'cooperate';",
            "return 1;",
            "return true;",
            "return [];",
            "return undefined;",
            "return null;",
            "const x = 'C';",
            "",
        ] {
            assert_eq!(evaluate(source, RoundContext::opening(1)), D, "{}", source);
            assert_eq!(verdict(source), Verdict::Malformed, "{}", source);
        }
    }

    #[test]
    fn test_throw_defects() {
        assert_eq!(evaluate("throw 'nope';", RoundContext::opening(1)), D);
        assert_eq!(verdict("throw 'nope';"), Verdict::Runtime);
    }

    #[test]
    fn test_compile_error_defects() {
        assert_eq!(evaluate("return 'C'", RoundContext::opening(1)), C);
        assert_eq!(evaluate("return (", RoundContext::opening(1)), D);
        assert_eq!(verdict("if {"), Verdict::Compile);
    }

    #[test]
    fn test_infinite_loop_defects() {
        let sandbox = Sandbox::new(SandboxLimits::default().with_timeout(None));
        let mut rng = SeededRng::new(1, 0);
        let decision = sandbox.evaluate("while (true) {}", RoundContext::opening(1), &mut rng);
        assert_eq!(decision, Decision { choice: D, verdict: Verdict::FuelExhausted });
    }

    #[test]
    fn test_deadline_defects() {
        let limits = SandboxLimits::default()
            .with_fuel(u64::MAX)
            .with_timeout(Some(Duration::from_millis(5)));
        let mut rng = SeededRng::new(1, 0);
        let decision = Sandbox::new(limits).evaluate(
            "let i = 0; while (true) { i++; }",
            RoundContext::opening(1),
            &mut rng,
        );
        assert_eq!(decision, Decision { choice: D, verdict: Verdict::Timeout });
    }

    #[test]
    fn test_memory_blowup_defects() {
        assert_eq!(
            verdict("let s = 'CD'; while (true) { s = s + s; }"),
            Verdict::MemoryExceeded
        );
    }

    #[test]
    fn test_unknown_names_defect() {
        for source in [
            "return process.exit();",
            "return require('fs');",
            "return globalThis;",
            "return eval('C');",
        ] {
            assert_eq!(verdict(source), Verdict::Runtime, "{}", source);
        }
    }

    #[test]
    fn test_source_size_limit() {
        let sandbox = Sandbox::new(SandboxLimits::default().with_max_source_len(16));
        assert_eq!(
            sandbox.check("return 'C'; // padding"),
            Err(ScriptError::SourceTooLong { limit: 16 })
        );
        assert!(sandbox.check("return 'C';").is_ok());
    }

    #[test]
    fn test_prepared_compile_failure_defects_every_round() {
        let prepared = Sandbox::default().prepare("return 'C' +;");
        assert!(prepared.compile_error().is_some());
        let mut rng = SeededRng::new(1, 0);
        for round in 0..3 {
            let mut ctx = RoundContext::opening(3);
            ctx.round = round;
            assert_eq!(prepared.decide(ctx, &mut rng).verdict, Verdict::Compile);
        }
    }

    #[test]
    fn test_context_snapshot_is_not_mutated() {
        let theirs = [C, D];
        let mine = [C, C];
        let payoffs = [3, 0];
        let ctx = RoundContext {
            round: 2,
            total_rounds: 5,
            my_history: &mine,
            opponent_history: &theirs,
            payoff_history: &payoffs,
        };
        let source = "const h = context.opponentHistory.map(m => 'C'); return h[1];";
        assert_eq!(evaluate(source, ctx), C);
        assert_eq!(theirs, [C, D]);
        assert_eq!(evaluate("context.opponentHistory[1] = 'C'; return 'C';", ctx), D);
    }

    #[test]
    fn test_check() {
        assert!(check("if (context.round === 0) return 'C'; return 'D';").is_ok());
        assert!(matches!(check("return ;;; )"), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_limits_json_defaults() {
        let limits: SandboxLimits = serde_json::from_str(r#"{"fuel": 10}"#).unwrap();
        assert_eq!(limits, SandboxLimits::default().with_fuel(10));
        let limits: SandboxLimits = serde_json::from_str(r#"{"timeoutMs": null}"#).unwrap();
        assert_eq!(limits.timeout(), None);
    }

    proptest! {
        #[test]
        fn test_evaluate_total_over_arbitrary_text(source in "\\PC{0,200}") {
            let choice = evaluate(&source, RoundContext::opening(3));
            prop_assert!(choice == C || choice == D);
        }

        #[test]
        fn test_evaluate_total_over_script_like_text(
            source in "[a-z(){};'CD=<>!+\\-*/.,\\[\\] 0-9]{0,160}"
        ) {
            let mut rng = SeededRng::new(7, 0);
            let decision = Sandbox::default().evaluate(&source, RoundContext::opening(3), &mut rng);
            prop_assert!(decision.verdict.is_accepted() || decision.choice == D);
        }
    }
}
