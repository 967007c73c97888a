//! Error taxonomy for the oracle and its collaborators

use std::time::Duration;

use match_logic::{PrizeError, StrategyError};
use thiserror::Error;

use crate::ledger::{Address, CiphertextHandle, Phase};

/// Errors reported by the ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("tournament {tournament_id} is in phase {actual}, expected {expected}")]
    InvalidPhase {
        tournament_id: u64,
        expected: Phase,
        actual: Phase,
    },

    #[error("{0} is not authorized to perform this action")]
    NotAuthorized(Address),

    #[error("unknown tournament {0}")]
    UnknownTournament(u64),

    #[error("tournament {tournament_id} is not the current tournament")]
    StaleTournament { tournament_id: u64 },

    #[error("strategy already submitted by {0}")]
    AlreadySubmitted(Address),

    #[error("no strategy submitted by {0}")]
    NoStrategy(Address),

    #[error("too many rules ({count}, max {max})")]
    TooManyRules { count: usize, max: usize },

    #[error("round count {0} outside the allowed range")]
    InvalidRoundCount(u32),

    #[error("length mismatch: {what}")]
    LengthMismatch { what: &'static str },

    #[error("player list does not match the tournament roster")]
    RosterMismatch,

    #[error("winner {0} is not a tournament player")]
    UnknownWinner(Address),

    #[error("prizes sum to {actual}, prize pool is {expected}")]
    PrizeMismatch { expected: u128, actual: u128 },

    #[error("nothing to claim for {0}")]
    NothingToClaim(Address),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Errors reported by the decryption-service collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    #[error("requester {0} is not allowed to decrypt this handle")]
    Unauthorized(Address),

    #[error("authorization signature is invalid")]
    InvalidSignature,

    #[error("authorization expired")]
    Expired,

    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("decryption request timed out after {0:?}")]
    Timeout(Duration),

    #[error("decryption service unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a computation pass ends without publishing
///
/// None of these stop the polling loop; the tournament stays pending and
/// the next poll starts over.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle identity {identity} is not the registered decrypting identity {registered}")]
    Unauthorized {
        identity: Address,
        registered: Address,
    },

    #[error("failed to decrypt strategy of {player}: {source}")]
    Decryption {
        player: Address,
        #[source]
        source: DecryptionError,
    },

    #[error("invalid strategy for {player}: {source}")]
    InvalidStrategy {
        player: Address,
        #[source]
        source: StrategyError,
    },

    #[error("insufficient participants: {count} (need at least 2)")]
    InsufficientParticipants { count: usize },

    #[error("failed to publish results of tournament {tournament_id}: {source}")]
    Publish {
        tournament_id: u64,
        #[source]
        source: LedgerError,
    },

    #[error("ledger read failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("prize allocation failed: {0}")]
    Allocation(#[from] PrizeError),
}

impl OracleError {
    /// Short label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Unauthorized { .. } => "unauthorized",
            OracleError::Decryption { .. } => "decryption",
            OracleError::InvalidStrategy { .. } => "invalid_strategy",
            OracleError::InsufficientParticipants { .. } => "insufficient_participants",
            OracleError::Publish { .. } => "publish",
            OracleError::Ledger(_) => "ledger",
            OracleError::Allocation(_) => "allocation",
        }
    }
}
