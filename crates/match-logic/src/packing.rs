//! Packed action vector codec
//!
//! Layout (little end first): bits 0..8 hold the default move, bits
//! 8*(i+1)..8*(i+2) hold the move of rule `i`. This integer is the only
//! encrypted part of a strategy.

use crate::strategy::{Move, StrategyError, MAX_RULES};

/// Width of one action field in bits.
pub const ACTION_FIELD_BITS: u32 = 8;

const FIELD_MASK: u128 = 0xFF;

/// Pack a default move and per-rule moves into one integer
pub fn pack_actions(default_action: Move, rule_actions: &[Move]) -> Result<u128, StrategyError> {
    if rule_actions.len() > MAX_RULES {
        return Err(StrategyError::TooManyRules { count: rule_actions.len() });
    }
    let mut packed = default_action.code() as u128;
    for (i, action) in rule_actions.iter().enumerate() {
        packed |= (action.code() as u128) << (ACTION_FIELD_BITS * (i as u32 + 1));
    }
    Ok(packed)
}

/// Unpack the default move and `rule_count` rule moves.
///
/// Every field must decode to a valid move and nothing may be set above
/// the last rule's field.
pub fn unpack_actions(packed: u128, rule_count: usize) -> Result<(Move, Vec<Move>), StrategyError> {
    if rule_count > MAX_RULES {
        return Err(StrategyError::TooManyRules { count: rule_count });
    }

    let default_action = Move::try_from(field(packed, 0))?;
    let actions = (0..rule_count)
        .map(|i| Move::try_from(field(packed, i + 1)))
        .collect::<Result<Vec<_>, _>>()?;

    // rule_count <= 15, so the shift stays below 128
    let used_bits = ACTION_FIELD_BITS * (rule_count as u32 + 1);
    if used_bits < u128::BITS && packed >> used_bits != 0 {
        return Err(StrategyError::TrailingActionBits { rule_count });
    }

    Ok((default_action, actions))
}

fn field(packed: u128, index: usize) -> u8 {
    ((packed >> (ACTION_FIELD_BITS * index as u32)) & FIELD_MASK) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_only() {
        assert_eq!(pack_actions(Move::Defect, &[]).unwrap(), 1);
        assert_eq!(unpack_actions(1, 0).unwrap(), (Move::Defect, vec![]));
        assert_eq!(unpack_actions(0, 0).unwrap(), (Move::Cooperate, vec![]));
    }

    #[test]
    fn test_field_layout() {
        let packed = pack_actions(Move::Cooperate, &[Move::Defect, Move::Cooperate, Move::Defect]).unwrap();
        assert_eq!(packed, 0x01_00_01_00);

        let (default_action, actions) = unpack_actions(packed, 3).unwrap();
        assert_eq!(default_action, Move::Cooperate);
        assert_eq!(actions, vec![Move::Defect, Move::Cooperate, Move::Defect]);
    }

    #[test]
    fn test_full_width_vector() {
        let actions = vec![Move::Defect; MAX_RULES];
        let packed = pack_actions(Move::Defect, &actions).unwrap();
        // 16 fields of 0x01 fill all 128 bits
        assert_eq!(packed, 0x01010101_01010101_01010101_01010101);
        assert_eq!(unpack_actions(packed, MAX_RULES).unwrap(), (Move::Defect, actions));
    }

    #[test]
    fn test_invalid_field_value() {
        // rule 0 field holds 2
        assert_eq!(unpack_actions(0x0200, 1), Err(StrategyError::UnknownAction(2)));
        // default field holds 0xFF
        assert_eq!(unpack_actions(0xFF, 0), Err(StrategyError::UnknownAction(0xFF)));
    }

    #[test]
    fn test_trailing_bits_rejected() {
        // rule 1 is set but only one rule is declared
        assert_eq!(
            unpack_actions(0x01_01_00, 1),
            Err(StrategyError::TrailingActionBits { rule_count: 1 })
        );
    }

    #[test]
    fn test_too_many_rules() {
        let actions = vec![Move::Cooperate; MAX_RULES + 1];
        assert!(matches!(
            pack_actions(Move::Cooperate, &actions),
            Err(StrategyError::TooManyRules { .. })
        ));
        assert!(matches!(
            unpack_actions(0, MAX_RULES + 1),
            Err(StrategyError::TooManyRules { .. })
        ));
    }
}
