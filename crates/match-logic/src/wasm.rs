//! WASM bindings for frontend result auditing
//!
//! Once results are published, anyone holding the revealed strategies can
//! replay matches and recompute the prize split in the browser.

#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;
use crate::{allocate_prizes, describe_strategy, run_match, simulate_tournament, Strategy};

fn parse_strategy(json: &str) -> Result<Strategy, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid strategy: {}", e))
}

/// Replay a match with full round-by-round details
///
/// # Arguments
/// * `strategy_a_json` - JSON serialized Strategy for player A
/// * `strategy_b_json` - JSON serialized Strategy for player B
/// * `round_count` - Rounds per match for the tournament
///
/// # Returns
/// JSON serialized MatchResult
#[wasm_bindgen]
pub fn replay_match(
    strategy_a_json: &str,
    strategy_b_json: &str,
    round_count: u32,
) -> Result<JsValue, JsError> {
    let strategy_a = parse_strategy(strategy_a_json)
        .map_err(|e| JsError::new(&format!("Invalid strategy A: {}", e)))?;
    let strategy_b = parse_strategy(strategy_b_json)
        .map_err(|e| JsError::new(&format!("Invalid strategy B: {}", e)))?;

    let result = run_match(&strategy_a, &strategy_b, round_count);

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Replay a whole tournament from a JSON array of strategies in roster order
#[wasm_bindgen]
pub fn replay_tournament(strategies_json: &str, round_count: u32) -> Result<JsValue, JsError> {
    let strategies: Vec<Strategy> = serde_json::from_str(strategies_json)
        .map_err(|e| JsError::new(&format!("Invalid strategies: {}", e)))?;

    let outcome = simulate_tournament(&strategies, round_count)
        .map_err(|e| JsError::new(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&outcome)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Get human-readable description of a strategy
#[wasm_bindgen]
pub fn get_strategy_description(strategy_json: &str) -> Result<String, JsError> {
    let strategy = parse_strategy(strategy_json).map_err(|e| JsError::new(&e))?;
    Ok(describe_strategy(&strategy))
}

/// Create a strategy JSON from a preset name
#[wasm_bindgen]
pub fn create_strategy(preset: &str) -> Result<String, JsError> {
    let strategy = Strategy::preset(preset)
        .ok_or_else(|| JsError::new(&format!("Unknown strategy: {}", preset)))?;

    serde_json::to_string(&strategy)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

#[derive(serde::Serialize)]
struct AllocationView {
    winners: Vec<usize>,
    /// Decimal strings; prize amounts exceed the JS safe integer range
    prizes: Vec<String>,
}

/// Recompute winners and prizes from final scores
///
/// `prize_pool` is a decimal string in the smallest currency unit.
#[wasm_bindgen]
pub fn compute_prizes(scores: &[u64], prize_pool: &str) -> Result<JsValue, JsError> {
    let pool: u128 = prize_pool
        .parse()
        .map_err(|_| JsError::new("Prize pool must be a decimal integer"))?;

    let allocation = allocate_prizes(scores, pool).map_err(|e| JsError::new(&e.to_string()))?;
    let view = AllocationView {
        winners: allocation.winners,
        prizes: allocation.prizes.iter().map(|p| p.to_string()).collect(),
    };

    serde_wasm_bindgen::to_value(&view)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}
