//! Match Logic for the encrypted-strategy tournament
//!
//! Deterministic replay of an Iterated Prisoner's Dilemma tournament from
//! rule-based strategies. This crate is compiled to:
//! - Native (for the computation oracle)
//! - WASM (for frontend result auditing)

mod strategy;
mod packing;
mod game;
mod pairing;
mod tournament;
mod prize;

#[cfg(feature = "wasm")]
mod wasm;

pub use strategy::{
    choose_move, conditions_from_codes, describe_strategy, Condition, Move, Operator, Rule,
    Strategy, StrategyError, Subject, MAX_RULES,
};
pub use packing::{pack_actions, unpack_actions, ACTION_FIELD_BITS};
pub use game::{run_match, MatchResult, RoundResult};
pub use pairing::{calculate_match_count, generate_all_pairings, get_pairing_for_match};
pub use tournament::{simulate_tournament, MatchSummary, TournamentError, TournamentOutcome, MIN_PARTICIPANTS};
pub use prize::{
    allocate_prizes, rank_players, split_prize_pool, winner_count, Allocation, PrizeError,
    WINNER_PERCENTAGE,
};

/// Payoff matrix for the Prisoner's Dilemma
/// Returns (score_a, score_b)
pub fn payoff(a: Move, b: Move) -> (u8, u8) {
    match (a, b) {
        (Move::Cooperate, Move::Cooperate) => (3, 3),
        (Move::Cooperate, Move::Defect) => (0, 5),
        (Move::Defect, Move::Cooperate) => (5, 0),
        (Move::Defect, Move::Defect) => (1, 1),
    }
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
