//! WASM bindings for the browser arena

#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::pairing::{calculate_match_count, generate_all_pairings, get_pairing_for_match};
use crate::{builtin_strategies, Arena, PayoffMatrix, SandboxLimits, Strategy, BOILERPLATE_SOURCE};

/// Browser builds have no monotonic clock and no thread pool: fuel alone
/// bounds each decision and matches run one after another.
fn browser_arena(seed: u64) -> Arena {
    let limits = SandboxLimits::default().with_timeout(None);
    Arena::new(PayoffMatrix::STANDARD, limits, seed).sequential()
}

fn parse_strategy(json: &str, label: &str) -> Result<Strategy, JsError> {
    serde_json::from_str(json).map_err(|e| JsError::new(&format!("Invalid strategy {}: {}", label, e)))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Replay a match with full round-by-round details
///
/// # Arguments
/// * `strategy_a_json` - JSON serialized Strategy for player A
/// * `strategy_b_json` - JSON serialized Strategy for player B
/// * `rounds` - Number of rounds to play
/// * `seed` - Arena seed for scripted randomness
/// * `match_index` - Index of this match within the arena
///
/// # Returns
/// Serialized MatchResult
#[wasm_bindgen]
pub fn replay_match(
    strategy_a_json: &str,
    strategy_b_json: &str,
    rounds: u32,
    seed: u64,
    match_index: u32,
) -> Result<JsValue, JsError> {
    let a = parse_strategy(strategy_a_json, "A")?;
    let b = parse_strategy(strategy_b_json, "B")?;
    let result = browser_arena(seed).run_match_indexed(&a, &b, rounds, match_index);
    to_js(&result)
}

/// Run a round-robin tournament over a JSON array of strategies
#[wasm_bindgen]
pub fn run_tournament(strategies_json: &str, rounds: u32, seed: u64) -> Result<JsValue, JsError> {
    let strategies: Vec<Strategy> = serde_json::from_str(strategies_json)
        .map_err(|e| JsError::new(&format!("Invalid strategies: {}", e)))?;
    let result = browser_arena(seed)
        .run_tournament(&strategies, rounds)
        .map_err(|e| JsError::new(&e.to_string()))?;
    to_js(&result)
}

/// The built-in strategy library
#[wasm_bindgen]
pub fn get_builtin_strategies() -> Result<JsValue, JsError> {
    to_js(&builtin_strategies())
}

/// Template source for a new strategy
#[wasm_bindgen]
pub fn get_boilerplate() -> String {
    BOILERPLATE_SOURCE.to_string()
}

/// Get all pairings for a tournament of `participant_count` strategies
#[wasm_bindgen]
pub fn get_tournament_pairings(participant_count: u32) -> Result<JsValue, JsError> {
    to_js(&generate_all_pairings(participant_count))
}

/// Get pairing for a specific match
#[wasm_bindgen]
pub fn get_match_pairing(participant_count: u32, match_index: u32) -> Result<JsValue, JsError> {
    let total = calculate_match_count(participant_count);
    let pairing = get_pairing_for_match(participant_count, match_index as u64).ok_or_else(|| {
        JsError::new(&format!("Match index {} out of range (total {})", match_index, total))
    })?;
    to_js(&pairing)
}

#[derive(serde::Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Validate strategy source before saving it
///
/// Returns `{valid: true}` or `{valid: false, error: "..."}`.
/// Never throws: validation errors are returned as structured data.
#[wasm_bindgen]
pub fn validate_strategy(code: &str) -> Result<JsValue, JsError> {
    let result = match browser_arena(0).sandbox().check(code) {
        Ok(()) => ValidationResult { valid: true, error: None },
        Err(e) => ValidationResult { valid: false, error: Some(e.to_string()) },
    };
    to_js(&result)
}
