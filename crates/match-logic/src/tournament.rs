//! Round-robin tournament simulation

use serde::{Deserialize, Serialize};
use crate::game::run_match;
use crate::pairing::generate_all_pairings;
use crate::strategy::Strategy;

/// Minimum number of strategy-bearing players for a tournament
pub const MIN_PARTICIPANTS: usize = 2;

/// Outcome of one match, without the round history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_index: u64,
    pub player_a: u32,
    pub player_b: u32,
    pub score_a: u64,
    pub score_b: u64,
}

/// Cumulative result of a full round-robin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentOutcome {
    /// Total score per player, parallel to the input roster
    pub scores: Vec<u64>,
    pub matches: Vec<MatchSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TournamentError {
    InsufficientParticipants { count: usize },
}

impl core::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TournamentError::InsufficientParticipants { count } => write!(
                f,
                "insufficient participants: {} (need at least {})",
                count, MIN_PARTICIPANTS
            ),
        }
    }
}

impl std::error::Error for TournamentError {}

/// Play every unordered pair once and accumulate scores
///
/// `strategies` is indexed by roster position. Matches run one at a time
/// in pairing order.
pub fn simulate_tournament(
    strategies: &[Strategy],
    round_count: u32,
) -> Result<TournamentOutcome, TournamentError> {
    let n = strategies.len();
    if n < MIN_PARTICIPANTS {
        return Err(TournamentError::InsufficientParticipants { count: n });
    }

    let mut scores = vec![0u64; n];
    let pairings = generate_all_pairings(n as u32);
    let mut matches = Vec::with_capacity(pairings.len());

    for (match_index, (a, b)) in pairings.into_iter().enumerate() {
        let result = run_match(&strategies[a as usize], &strategies[b as usize], round_count);
        scores[a as usize] += result.total_score_a;
        scores[b as usize] += result.total_score_b;
        matches.push(MatchSummary {
            match_index: match_index as u64,
            player_a: a,
            player_b: b,
            score_a: result.total_score_a,
            score_b: result.total_score_b,
        });
    }

    Ok(TournamentOutcome { scores, matches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::calculate_match_count;
    use proptest::prelude::{prop_assert_eq, proptest};

    fn alice_bob_charlie() -> Vec<Strategy> {
        vec![
            Strategy::tit_for_tat(),
            Strategy::always_defect(),
            Strategy::always_cooperate(),
        ]
    }

    #[test]
    fn test_three_player_fixture() {
        let outcome = simulate_tournament(&alice_bob_charlie(), 100).unwrap();

        assert_eq!(outcome.matches.len(), 3);

        let alice_vs_bob = outcome
            .matches
            .iter()
            .find(|m| m.player_a == 0 && m.player_b == 1)
            .unwrap();
        assert_eq!(alice_vs_bob.score_a, 99);
        assert_eq!(alice_vs_bob.score_b, 104);

        // Alice: 99 vs Bob + 300 vs Charlie; Bob: 104 + 500; Charlie: 300 + 0
        assert_eq!(outcome.scores, vec![399, 604, 300]);
        assert!(outcome.scores.iter().all(|s| *s > 0));
    }

    #[test]
    fn test_scores_are_sum_of_match_scores() {
        let strategies = vec![
            Strategy::tit_for_tat(),
            Strategy::grudger(),
            Strategy::always_defect(),
            Strategy::always_cooperate(),
        ];
        let outcome = simulate_tournament(&strategies, 25).unwrap();

        let mut expected = vec![0u64; strategies.len()];
        for m in &outcome.matches {
            expected[m.player_a as usize] += m.score_a;
            expected[m.player_b as usize] += m.score_b;
        }
        assert_eq!(outcome.scores, expected);
    }

    #[test]
    fn test_insufficient_participants() {
        assert_eq!(
            simulate_tournament(&[], 10),
            Err(TournamentError::InsufficientParticipants { count: 0 })
        );
        assert_eq!(
            simulate_tournament(&[Strategy::tit_for_tat()], 10),
            Err(TournamentError::InsufficientParticipants { count: 1 })
        );
    }

    #[test]
    fn test_two_players_single_match() {
        let outcome = simulate_tournament(&[Strategy::always_defect(), Strategy::always_defect()], 10).unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.scores, vec![10, 10]);
    }

    proptest! {
        #[test]
        fn prop_match_count_is_n_choose_2(n in 2usize..24) {
            let strategies: Vec<Strategy> = (0..n)
                .map(|i| if i % 2 == 0 { Strategy::tit_for_tat() } else { Strategy::always_defect() })
                .collect();
            let outcome = simulate_tournament(&strategies, 3).unwrap();
            prop_assert_eq!(outcome.matches.len(), n * (n - 1) / 2);
            prop_assert_eq!(outcome.matches.len() as u64, calculate_match_count(n as u32));
        }
    }
}
