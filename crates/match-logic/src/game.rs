//! Match execution engine

use serde::{Deserialize, Serialize};
use crate::strategy::{choose_move, Move, Strategy};
use crate::payoff;

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    pub move_a: Move,
    pub move_b: Move,
    pub score_a: u8,
    pub score_b: u8,
    pub cumulative_a: u64,
    pub cumulative_b: u64,
}

/// Result of a complete match
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rounds: Vec<RoundResult>,
    pub total_score_a: u64,
    pub total_score_b: u64,
    pub round_count: u32,
}

/// Run a complete match between two strategies
///
/// # Arguments
/// * `strategy_a` - First player's strategy
/// * `strategy_b` - Second player's strategy
/// * `round_count` - Number of rounds to play
///
/// # Returns
/// Complete match result with round-by-round details. A pure function of
/// its inputs: replaying the same strategies gives the same result.
pub fn run_match(
    strategy_a: &Strategy,
    strategy_b: &Strategy,
    round_count: u32,
) -> MatchResult {
    let capacity = round_count as usize;
    let mut history_a: Vec<Move> = Vec::with_capacity(capacity);
    let mut history_b: Vec<Move> = Vec::with_capacity(capacity);
    let mut rounds: Vec<RoundResult> = Vec::with_capacity(capacity);
    let mut total_a = 0u64;
    let mut total_b = 0u64;

    for round in 0..round_count {
        // Both sides decide before either history is extended
        let move_a = choose_move(strategy_a, round, &history_a, &history_b);
        let move_b = choose_move(strategy_b, round, &history_b, &history_a);

        let (score_a, score_b) = payoff(move_a, move_b);
        total_a += score_a as u64;
        total_b += score_b as u64;

        rounds.push(RoundResult {
            round,
            move_a,
            move_b,
            score_a,
            score_b,
            cumulative_a: total_a,
            cumulative_b: total_b,
        });

        history_a.push(move_a);
        history_b.push(move_b);
    }

    MatchResult {
        rounds,
        total_score_a: total_a,
        total_score_b: total_b,
        round_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Condition, Operator, Rule, Subject};
    use proptest::prelude::{any, prop, prop_assert_eq, proptest};
    use proptest::strategy::Strategy as PropStrategy;

    #[test]
    fn test_match_determinism() {
        let strategy_a = Strategy::tit_for_tat();
        let strategy_b = Strategy::grudger();

        let result1 = run_match(&strategy_a, &strategy_b, 100);
        let result2 = run_match(&strategy_a, &strategy_b, 100);

        assert_eq!(result1, result2);
    }

    #[test]
    fn test_cooperate_vs_cooperate() {
        let strategy = Strategy::always_cooperate();
        let result = run_match(&strategy, &strategy, 50);

        // Both always cooperate, should get 3 points each per round
        for round in &result.rounds {
            assert_eq!(round.move_a, Move::Cooperate);
            assert_eq!(round.move_b, Move::Cooperate);
            assert_eq!(round.score_a, 3);
            assert_eq!(round.score_b, 3);
        }

        assert_eq!(result.total_score_a, 150);
        assert_eq!(result.total_score_b, 150);
    }

    #[test]
    fn test_defect_vs_cooperate() {
        let result = run_match(&Strategy::always_defect(), &Strategy::always_cooperate(), 40);

        for round in &result.rounds {
            assert_eq!(round.move_a, Move::Defect);
            assert_eq!(round.move_b, Move::Cooperate);
            assert_eq!(round.score_a, 5);
            assert_eq!(round.score_b, 0);
        }

        assert_eq!(result.total_score_a, 200);
        assert_eq!(result.total_score_b, 0);
    }

    #[test]
    fn test_tft_vs_always_defect() {
        let result = run_match(&Strategy::tit_for_tat(), &Strategy::always_defect(), 100);

        // Round 0: TFT cooperates, AD defects
        assert_eq!(result.rounds[0].move_a, Move::Cooperate);
        assert_eq!(result.rounds[0].move_b, Move::Defect);

        // Round 1+: TFT retaliates, both defect
        for round in result.rounds.iter().skip(1) {
            assert_eq!(round.move_a, Move::Defect);
            assert_eq!(round.move_b, Move::Defect);
        }

        assert_eq!(result.total_score_a, 99);
        assert_eq!(result.total_score_b, 104);
    }

    #[test]
    fn test_tft_vs_tft() {
        let result = run_match(&Strategy::tit_for_tat(), &Strategy::tit_for_tat(), 30);
        for round in &result.rounds {
            assert_eq!(round.move_a, Move::Cooperate);
            assert_eq!(round.move_b, Move::Cooperate);
        }
    }

    #[test]
    fn test_histories_are_per_side() {
        // A defects in round 0 only; B copies A's last move.
        let strategy_a = Strategy::new(
            vec![Rule::new(Subject::RoundNumber, Operator::Equals, 0, Move::Defect)],
            Move::Cooperate,
        ).unwrap();
        let result = run_match(&strategy_a, &Strategy::tit_for_tat(), 3);

        let moves: Vec<_> = result.rounds.iter().map(|r| (r.move_a, r.move_b)).collect();
        assert_eq!(
            moves,
            vec![
                (Move::Defect, Move::Cooperate),
                (Move::Cooperate, Move::Defect),
                (Move::Cooperate, Move::Cooperate),
            ]
        );
        assert_eq!(result.total_score_a, 5 + 0 + 3);
        assert_eq!(result.total_score_b, 0 + 5 + 3);
    }

    #[test]
    fn test_cumulative_scores() {
        let result = run_match(&Strategy::tit_for_tat(), &Strategy::always_defect(), 20);

        let mut expected_a = 0u64;
        let mut expected_b = 0u64;

        for (i, round) in result.rounds.iter().enumerate() {
            assert_eq!(round.round, i as u32);
            expected_a += round.score_a as u64;
            expected_b += round.score_b as u64;
            assert_eq!(round.cumulative_a, expected_a);
            assert_eq!(round.cumulative_b, expected_b);
        }
        assert_eq!(result.total_score_a, expected_a);
        assert_eq!(result.total_score_b, expected_b);
    }

    #[test]
    fn test_zero_rounds() {
        let result = run_match(&Strategy::tit_for_tat(), &Strategy::always_defect(), 0);
        assert!(result.rounds.is_empty());
        assert_eq!(result.total_score_a, 0);
        assert_eq!(result.total_score_b, 0);
    }

    fn arb_rule() -> impl PropStrategy<Value = Rule> {
        (0u8..6, 0u8..5, 0u32..8, any::<bool>()).prop_map(|(s, o, v, defect)| {
            let condition = Condition::from_codes(s, o, v).unwrap();
            let action = if defect { Move::Defect } else { Move::Cooperate };
            Rule { condition, action }
        })
    }

    fn arb_strategy() -> impl PropStrategy<Value = Strategy> {
        (prop::collection::vec(arb_rule(), 0..=4), any::<bool>()).prop_map(|(rules, defect)| {
            let default_action = if defect { Move::Defect } else { Move::Cooperate };
            Strategy::new(rules, default_action).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_replay_is_identical(a in arb_strategy(), b in arb_strategy(), rounds in 0u32..60) {
            let first = run_match(&a, &b, rounds);
            let second = run_match(&a, &b, rounds);
            prop_assert_eq!(first.rounds.len(), rounds as usize);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_empty_rules_default_defect_is_always_defect(b in arb_strategy(), rounds in 0u32..60) {
            let bare = Strategy::new(Vec::new(), Move::Defect).unwrap();
            prop_assert_eq!(
                run_match(&bare, &b, rounds),
                run_match(&Strategy::always_defect(), &b, rounds)
            );
        }
    }
}
