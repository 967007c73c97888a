//! Winner selection and prize split
//!
//! The top 30% of players (at least one) split the pool in proportion to
//! their scores. Integer division leaves dust, which goes to the first
//! winner so the prizes always sum to the pool exactly.

use serde::{Deserialize, Serialize};

/// Share of the roster that wins, in percent
pub const WINNER_PERCENTAGE: usize = 30;

/// Winners and their prizes, both in ranking order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Roster indices of the winners
    pub winners: Vec<usize>,
    /// Prize per winner, parallel to `winners`
    pub prizes: Vec<u128>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrizeError {
    NoPlayers,
    /// `pool * score` does not fit in 128 bits.
    Overflow,
}

impl core::fmt::Display for PrizeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PrizeError::NoPlayers => write!(f, "cannot allocate prizes without players"),
            PrizeError::Overflow => write!(f, "prize arithmetic overflow"),
        }
    }
}

impl std::error::Error for PrizeError {}

/// max(1, ceil(n * 30%))
pub fn winner_count(player_count: usize) -> usize {
    (player_count * WINNER_PERCENTAGE).div_ceil(100).max(1)
}

/// Roster indices sorted by descending score.
///
/// Equal scores keep roster (registration) order.
pub fn rank_players(scores: &[u64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable
    order.sort_by(|a, b| scores[*b].cmp(&scores[*a]));
    order
}

/// Split `prize_pool` across winners proportionally to their scores
///
/// All-zero scores split the pool equally. In both cases the remainder
/// goes to the first winner.
pub fn split_prize_pool(winner_scores: &[u64], prize_pool: u128) -> Result<Vec<u128>, PrizeError> {
    if winner_scores.is_empty() {
        return Err(PrizeError::NoPlayers);
    }

    let total: u128 = winner_scores.iter().map(|s| *s as u128).sum();

    let mut prizes = if total == 0 {
        let share = prize_pool / winner_scores.len() as u128;
        vec![share; winner_scores.len()]
    } else {
        winner_scores
            .iter()
            .map(|score| {
                prize_pool
                    .checked_mul(*score as u128)
                    .map(|scaled| scaled / total)
                    .ok_or(PrizeError::Overflow)
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    let distributed: u128 = prizes.iter().sum();
    // Each share is a floor, so distributed <= prize_pool
    prizes[0] += prize_pool - distributed;

    Ok(prizes)
}

/// Rank players, pick winners and split the pool
///
/// # Arguments
/// * `scores` - Total score per player, in roster order
/// * `prize_pool` - Amount to distribute (smallest currency unit)
pub fn allocate_prizes(scores: &[u64], prize_pool: u128) -> Result<Allocation, PrizeError> {
    if scores.is_empty() {
        return Err(PrizeError::NoPlayers);
    }

    let mut winners = rank_players(scores);
    winners.truncate(winner_count(scores.len()));

    let winner_scores: Vec<u64> = winners.iter().map(|i| scores[*i]).collect();
    let prizes = split_prize_pool(&winner_scores, prize_pool)?;

    Ok(Allocation { winners, prizes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{any, prop, prop_assert_eq, proptest};

    #[test]
    fn test_winner_count() {
        assert_eq!(winner_count(1), 1);
        assert_eq!(winner_count(2), 1);
        assert_eq!(winner_count(3), 1);
        assert_eq!(winner_count(4), 2);
        assert_eq!(winner_count(10), 3);
        assert_eq!(winner_count(11), 4);
        assert_eq!(winner_count(20), 6);
        assert_eq!(winner_count(100), 30);
    }

    #[test]
    fn test_exact_proportional_split_has_no_dust() {
        assert_eq!(split_prize_pool(&[5, 3, 2], 10).unwrap(), vec![5, 3, 2]);
    }

    #[test]
    fn test_all_zero_scores_split_equally() {
        assert_eq!(split_prize_pool(&[0, 0, 0], 10).unwrap(), vec![4, 3, 3]);
    }

    #[test]
    fn test_dust_goes_to_first_winner() {
        // 100 * 1/3 = 33 each, 1 left over
        assert_eq!(split_prize_pool(&[7, 7, 7], 100).unwrap(), vec![34, 33, 33]);
    }

    #[test]
    fn test_zero_pool() {
        assert_eq!(split_prize_pool(&[9, 1], 0).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_overflow_detected() {
        assert_eq!(split_prize_pool(&[u64::MAX, 1], u128::MAX), Err(PrizeError::Overflow));
    }

    #[test]
    fn test_empty_roster() {
        assert_eq!(allocate_prizes(&[], 10), Err(PrizeError::NoPlayers));
        assert_eq!(split_prize_pool(&[], 10), Err(PrizeError::NoPlayers));
    }

    #[test]
    fn test_three_player_fixture_allocation() {
        // Alice 399, Bob 604, Charlie 300 -> one winner, Bob takes it all
        let allocation = allocate_prizes(&[399, 604, 300], 30_000_000_000_000_000).unwrap();
        assert_eq!(allocation.winners, vec![1]);
        assert_eq!(allocation.prizes, vec![30_000_000_000_000_000]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        // Players 1, 2 and 3 tie at 50; four players -> two winners
        let allocation = allocate_prizes(&[10, 50, 50, 50], 100).unwrap();
        assert_eq!(allocation.winners, vec![1, 2]);
        assert_eq!(allocation.prizes, vec![50, 50]);

        assert_eq!(rank_players(&[3, 7, 3, 7, 1]), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_tie_at_cutoff_excludes_later_registrant() {
        // ten players, three winners; players 2, 5 and 8 tie for third place
        let scores = [90, 80, 70, 10, 20, 70, 30, 40, 70, 0];
        let allocation = allocate_prizes(&scores, 240).unwrap();
        assert_eq!(allocation.winners, vec![0, 1, 2]);
        assert_eq!(allocation.prizes, vec![90, 80, 70]);
    }

    proptest! {
        #[test]
        fn prop_prizes_sum_to_pool(
            scores in prop::collection::vec(0u64..1_000_000, 1..40),
            pool in any::<u64>(),
        ) {
            let allocation = allocate_prizes(&scores, pool as u128).unwrap();
            prop_assert_eq!(allocation.winners.len(), winner_count(scores.len()));
            prop_assert_eq!(allocation.prizes.len(), allocation.winners.len());
            prop_assert_eq!(allocation.prizes.iter().sum::<u128>(), pool as u128);
        }

        #[test]
        fn prop_winners_have_top_scores(scores in prop::collection::vec(0u64..1000, 1..40)) {
            let allocation = allocate_prizes(&scores, 1_000).unwrap();
            let cutoff = allocation.winners.iter().map(|i| scores[*i]).min().unwrap();
            let losers_max = (0..scores.len())
                .filter(|i| !allocation.winners.contains(i))
                .map(|i| scores[i])
                .max()
                .unwrap_or(0);
            prop_assert_eq!(losers_max.max(cutoff), cutoff);
        }
    }
}
