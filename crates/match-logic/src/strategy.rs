//! Strategy definitions and rule evaluation
//!
//! A strategy is an ordered list of rules plus a default move. Each rule's
//! condition is public; only the move it produces travels encrypted, packed
//! together with the default move (see `packing`).

use serde::{Deserialize, Serialize};
use crate::packing::{pack_actions, unpack_actions};

/// Maximum number of rules per strategy.
///
/// The packed action vector is 128 bits wide: one byte for the default move
/// and one byte per rule.
pub const MAX_RULES: usize = 15;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    /// Wire code: Cooperate = 0, Defect = 1
    pub fn code(self) -> u8 {
        match self {
            Move::Cooperate => 0,
            Move::Defect => 1,
        }
    }
}

impl TryFrom<u8> for Move {
    type Error = StrategyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Move::Cooperate),
            1 => Ok(Move::Defect),
            other => Err(StrategyError::UnknownAction(other)),
        }
    }
}

impl core::fmt::Display for Move {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Move::Cooperate => write!(f, "Cooperate"),
            Move::Defect => write!(f, "Defect"),
        }
    }
}

/// What a rule condition inspects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// Current round index (0-based).
    RoundNumber,
    /// Our move in the previous round. Undefined in round 0.
    MyLastMove,
    /// Opponent's move in the previous round. Undefined in round 0.
    OpponentLastMove,
    MyTotalDefects,
    OpponentTotalDefects,
    OpponentTotalCooperates,
}

impl Subject {
    pub fn code(self) -> u8 {
        match self {
            Subject::RoundNumber => 0,
            Subject::MyLastMove => 1,
            Subject::OpponentLastMove => 2,
            Subject::MyTotalDefects => 3,
            Subject::OpponentTotalDefects => 4,
            Subject::OpponentTotalCooperates => 5,
        }
    }
}

impl TryFrom<u8> for Subject {
    type Error = StrategyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Subject::RoundNumber),
            1 => Ok(Subject::MyLastMove),
            2 => Ok(Subject::OpponentLastMove),
            3 => Ok(Subject::MyTotalDefects),
            4 => Ok(Subject::OpponentTotalDefects),
            5 => Ok(Subject::OpponentTotalCooperates),
            other => Err(StrategyError::UnknownSubject(other)),
        }
    }
}

/// Comparison applied between a subject's value and the rule's value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Is,
    IsNot,
    GreaterThan,
    LessThan,
    Equals,
}

impl Operator {
    pub fn code(self) -> u8 {
        match self {
            Operator::Is => 0,
            Operator::IsNot => 1,
            Operator::GreaterThan => 2,
            Operator::LessThan => 3,
            Operator::Equals => 4,
        }
    }

    /// `Is` and `Equals` are both strict equality; comparisons are strict.
    pub fn apply(self, lhs: u64, rhs: u32) -> bool {
        let rhs = rhs as u64;
        match self {
            Operator::Is | Operator::Equals => lhs == rhs,
            Operator::IsNot => lhs != rhs,
            Operator::GreaterThan => lhs > rhs,
            Operator::LessThan => lhs < rhs,
        }
    }
}

impl TryFrom<u8> for Operator {
    type Error = StrategyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Operator::Is),
            1 => Ok(Operator::IsNot),
            2 => Ok(Operator::GreaterThan),
            3 => Ok(Operator::LessThan),
            4 => Ok(Operator::Equals),
            other => Err(StrategyError::UnknownOperator(other)),
        }
    }
}

/// Cleartext part of a rule: (Subject, Operator, Value)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub subject: Subject,
    pub operator: Operator,
    pub value: u32,
}

impl Condition {
    pub fn new(subject: Subject, operator: Operator, value: u32) -> Self {
        Self { subject, operator, value }
    }

    /// Decode a condition from raw ledger codes
    pub fn from_codes(subject: u8, operator: u8, value: u32) -> Result<Self, StrategyError> {
        Ok(Self {
            subject: Subject::try_from(subject)?,
            operator: Operator::try_from(operator)?,
            value,
        })
    }

    /// Evaluate against the match history seen from one side.
    ///
    /// Last-move subjects never match in round 0.
    pub fn matches(&self, round: u32, my_history: &[Move], opponent_history: &[Move]) -> bool {
        match subject_value(self.subject, round, my_history, opponent_history) {
            Some(value) => self.operator.apply(value, self.value),
            None => false,
        }
    }
}

/// A condition together with the move it produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub condition: Condition,
    pub action: Move,
}

impl Rule {
    pub fn new(subject: Subject, operator: Operator, value: u32, action: Move) -> Self {
        Self {
            condition: Condition::new(subject, operator, value),
            action,
        }
    }
}

/// Complete strategy: ordered rules plus a default move
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StrategyRepr", into = "StrategyRepr")]
pub struct Strategy {
    rules: Vec<Rule>,
    default_action: Move,
}

#[derive(Clone, Serialize, Deserialize)]
struct StrategyRepr {
    #[serde(default)]
    rules: Vec<Rule>,
    default_action: Move,
}

impl TryFrom<StrategyRepr> for Strategy {
    type Error = StrategyError;

    fn try_from(repr: StrategyRepr) -> Result<Self, Self::Error> {
        Strategy::new(repr.rules, repr.default_action)
    }
}

impl From<Strategy> for StrategyRepr {
    fn from(strategy: Strategy) -> Self {
        Self {
            rules: strategy.rules,
            default_action: strategy.default_action,
        }
    }
}

impl Strategy {
    /// Create a strategy, enforcing the rule limit
    pub fn new(rules: Vec<Rule>, default_action: Move) -> Result<Self, StrategyError> {
        if rules.len() > MAX_RULES {
            return Err(StrategyError::TooManyRules { count: rules.len() });
        }
        Ok(Self { rules, default_action })
    }

    /// Rebuild a strategy from its cleartext conditions and the decrypted
    /// packed action vector.
    pub fn from_parts(conditions: &[Condition], packed: u128) -> Result<Self, StrategyError> {
        if conditions.len() > MAX_RULES {
            return Err(StrategyError::TooManyRules { count: conditions.len() });
        }
        let (default_action, actions) = unpack_actions(packed, conditions.len())?;
        let rules = conditions
            .iter()
            .zip(actions)
            .map(|(condition, action)| Rule { condition: *condition, action })
            .collect();
        Ok(Self { rules, default_action })
    }

    /// Copy opponent's last defection, otherwise cooperate.
    pub fn tit_for_tat() -> Self {
        Self {
            rules: vec![Rule::new(Subject::OpponentLastMove, Operator::Is, 1, Move::Defect)],
            default_action: Move::Cooperate,
        }
    }

    pub fn always_defect() -> Self {
        Self { rules: Vec::new(), default_action: Move::Defect }
    }

    pub fn always_cooperate() -> Self {
        Self { rules: Vec::new(), default_action: Move::Cooperate }
    }

    /// Cooperate until the opponent defects once, then always defect.
    pub fn grudger() -> Self {
        Self {
            rules: vec![Rule::new(Subject::OpponentTotalDefects, Operator::GreaterThan, 0, Move::Defect)],
            default_action: Move::Cooperate,
        }
    }

    /// Look up a preset by its kebab-case name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "tit-for-tat" => Some(Self::tit_for_tat()),
            "always-defect" => Some(Self::always_defect()),
            "always-cooperate" => Some(Self::always_cooperate()),
            "grudger" => Some(Self::grudger()),
            _ => None,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_action(&self) -> Move {
        self.default_action
    }

    /// Cleartext conditions in rule order
    pub fn conditions(&self) -> Vec<Condition> {
        self.rules.iter().map(|r| r.condition).collect()
    }

    /// The value a player encrypts when submitting this strategy
    pub fn packed_actions(&self) -> u128 {
        let actions: Vec<Move> = self.rules.iter().map(|r| r.action).collect();
        // Rule count is bounded by MAX_RULES at construction.
        pack_actions(self.default_action, &actions).unwrap_or_default()
    }
}

/// Errors raised while building or decoding a strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrategyError {
    /// More rules than the packed action vector can carry.
    TooManyRules { count: usize },
    UnknownSubject(u8),
    UnknownOperator(u8),
    UnknownAction(u8),
    /// Subject, operator and value lists disagree in length.
    MetadataLengthMismatch { subjects: usize, operators: usize, values: usize },
    /// Packed vector has non-zero fields beyond the last rule.
    TrailingActionBits { rule_count: usize },
}

impl core::fmt::Display for StrategyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StrategyError::TooManyRules { count } =>
                write!(f, "strategy has {} rules, at most {} allowed", count, MAX_RULES),
            StrategyError::UnknownSubject(code) => write!(f, "unknown subject code {}", code),
            StrategyError::UnknownOperator(code) => write!(f, "unknown operator code {}", code),
            StrategyError::UnknownAction(code) => write!(f, "unknown action code {}", code),
            StrategyError::MetadataLengthMismatch { subjects, operators, values } => write!(
                f,
                "rule metadata lengths disagree: {} subjects, {} operators, {} values",
                subjects, operators, values
            ),
            StrategyError::TrailingActionBits { rule_count } =>
                write!(f, "packed actions carry data beyond {} rules", rule_count),
        }
    }
}

impl std::error::Error for StrategyError {}

/// Decode parallel code lists (as stored on the ledger) into conditions
pub fn conditions_from_codes(
    subjects: &[u8],
    operators: &[u8],
    values: &[u32],
) -> Result<Vec<Condition>, StrategyError> {
    if subjects.len() != operators.len() || subjects.len() != values.len() {
        return Err(StrategyError::MetadataLengthMismatch {
            subjects: subjects.len(),
            operators: operators.len(),
            values: values.len(),
        });
    }
    if subjects.len() > MAX_RULES {
        return Err(StrategyError::TooManyRules { count: subjects.len() });
    }
    subjects
        .iter()
        .zip(operators)
        .zip(values)
        .map(|((s, o), v)| Condition::from_codes(*s, *o, *v))
        .collect()
}

/// Current value of a subject, or `None` when it is undefined
fn subject_value(
    subject: Subject,
    round: u32,
    my_history: &[Move],
    opponent_history: &[Move],
) -> Option<u64> {
    match subject {
        Subject::RoundNumber => Some(round as u64),
        Subject::MyLastMove => last_move(round, my_history),
        Subject::OpponentLastMove => last_move(round, opponent_history),
        Subject::MyTotalDefects => Some(count(my_history, Move::Defect)),
        Subject::OpponentTotalDefects => Some(count(opponent_history, Move::Defect)),
        Subject::OpponentTotalCooperates => Some(count(opponent_history, Move::Cooperate)),
    }
}

fn last_move(round: u32, history: &[Move]) -> Option<u64> {
    if round == 0 {
        return None;
    }
    history.last().map(|m| m.code() as u64)
}

fn count(history: &[Move], needle: Move) -> u64 {
    history.iter().filter(|m| **m == needle).count() as u64
}

/// Choose a move for one round
///
/// # Arguments
/// * `strategy` - The strategy to execute
/// * `round` - Current round number (0-indexed)
/// * `my_history` - Our past moves
/// * `opponent_history` - Opponent's past moves
///
/// Rules are tried in order and the first match wins; the default move
/// applies when none match.
pub fn choose_move(
    strategy: &Strategy,
    round: u32,
    my_history: &[Move],
    opponent_history: &[Move],
) -> Move {
    strategy
        .rules
        .iter()
        .find(|rule| rule.condition.matches(round, my_history, opponent_history))
        .map(|rule| rule.action)
        .unwrap_or(strategy.default_action)
}

impl core::fmt::Display for Subject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Subject::RoundNumber => "round number",
            Subject::MyLastMove => "my last move",
            Subject::OpponentLastMove => "opponent's last move",
            Subject::MyTotalDefects => "my total defects",
            Subject::OpponentTotalDefects => "opponent's total defects",
            Subject::OpponentTotalCooperates => "opponent's total cooperates",
        };
        f.write_str(label)
    }
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Operator::Is => "is",
            Operator::IsNot => "is not",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::Equals => "=",
        };
        f.write_str(label)
    }
}

/// Get a human-readable description of a strategy
pub fn describe_strategy(strategy: &Strategy) -> String {
    let mut desc = String::new();
    for (i, rule) in strategy.rules.iter().enumerate() {
        let value = match rule.condition.subject {
            Subject::MyLastMove | Subject::OpponentLastMove => match Move::try_from(rule.condition.value.min(255) as u8) {
                Ok(m) => m.to_string(),
                Err(_) => rule.condition.value.to_string(),
            },
            _ => rule.condition.value.to_string(),
        };
        desc.push_str(&format!(
            "{}. If {} {} {}, {}. ",
            i + 1,
            rule.condition.subject,
            rule.condition.operator,
            value,
            rule.action
        ));
    }
    if strategy.rules.is_empty() {
        desc.push_str(&format!("Always {}.", strategy.default_action));
    } else {
        desc.push_str(&format!("Otherwise {}.", strategy.default_action));
    }
    desc
}
