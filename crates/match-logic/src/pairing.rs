//! Round-robin pairing for tournament matches
//!
//! Every player meets every other player exactly once. Pairs are indexed
//! in colexicographic order: (0,1), (0,2), (1,2), (0,3), (1,3), ...
//! so a single match can be looked up by index without materialising the
//! whole schedule.

/// Total number of round-robin matches: C(n, 2)
pub fn calculate_match_count(participant_count: u32) -> u64 {
    let n = participant_count as u64;
    if n < 2 {
        return 0;
    }
    n * (n - 1) / 2
}

/// Generate all match pairings for a tournament
///
/// # Returns
/// Vector of (index_a, index_b) pairs, where index_a < index_b, in match
/// index order.
pub fn generate_all_pairings(participant_count: u32) -> Vec<(u32, u32)> {
    let n = participant_count;
    let mut pairings = Vec::with_capacity(calculate_match_count(n) as usize);
    for b in 1..n {
        for a in 0..b {
            pairings.push((a, b));
        }
    }
    pairings
}

/// Get the pairing for a specific match index in O(1) memory
pub fn get_pairing_for_match(participant_count: u32, match_index: u64) -> Option<(u32, u32)> {
    if match_index >= calculate_match_count(participant_count) {
        return None;
    }
    Some(unrank_pair(match_index))
}

/// Colexicographic combination unranking: rank → (a, b) with a < b.
///
/// rank = C(b,2) + a = b*(b−1)/2 + a
fn unrank_pair(rank: u64) -> (u32, u32) {
    // Estimate b via integer floor(sqrt(1 + 8·rank))
    let val = 1u128 + 8 * rank as u128;
    let mut s = val;
    let mut t = (s + 1) / 2;
    while t < s {
        s = t;
        t = (s + val / s) / 2;
    }
    // s = floor(sqrt(val))
    let mut b = ((1 + s) / 2) as u64;

    // Correct estimate
    while b > 0 && b * (b - 1) / 2 > rank {
        b -= 1;
    }
    while (b + 1) * b / 2 <= rank {
        b += 1;
    }

    let a = rank - b * (b - 1) / 2;
    (a as u32, b as u32)
}
