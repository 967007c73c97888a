//! Ledger collaborator interface
//!
//! The ledger owns tournament state. The oracle reads phases, rosters and
//! encrypted strategies from it and performs exactly one write: publishing
//! results for a tournament pending computation.

mod memory;

pub use memory::{InMemoryLedger, DEFAULT_ENTRY_FEE, DEFAULT_ROUNDS, MAX_ROUNDS, MIN_ROUNDS};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Account address, normalised to lowercase
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First characters of the address, for log lines
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to an encrypted value held by the ledger
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CiphertextHandle(pub String);

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tournament state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Registration,
    PendingComputation,
    ResultsPublished,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Registration => "Registration",
            Phase::PendingComputation => "PendingComputation",
            Phase::ResultsPublished => "ResultsPublished",
            Phase::Finished => "Finished",
        };
        f.write_str(label)
    }
}

/// Snapshot of the current tournament
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentInfo {
    pub id: u64,
    pub phase: Phase,
    pub round_count: u32,
    pub prize_pool: u128,
    pub player_count: usize,
}

/// A player's strategy as stored on the ledger: cleartext rule metadata
/// plus a handle to the encrypted packed action vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedStrategy {
    pub handle: CiphertextHandle,
    pub subjects: Vec<u8>,
    pub operators: Vec<u8>,
    pub values: Vec<u32>,
}

/// Arguments of the results-publication write
///
/// `scores` is parallel to `players`, `prizes` to `winners`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsSubmission {
    pub tournament_id: u64,
    pub players: Vec<Address>,
    pub scores: Vec<u64>,
    pub winners: Vec<Address>,
    pub prizes: Vec<u128>,
}

/// Receipt for an accepted ledger write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub tournament_id: u64,
    /// Monotonic write sequence number assigned by the ledger
    pub sequence: u64,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address of the tournament contract
    fn contract_address(&self) -> Address;

    /// Current tournament id, phase, round count and prize pool
    async fn tournament_info(&self) -> Result<TournamentInfo, LedgerError>;

    /// Players of a tournament in registration order
    async fn tournament_players(&self, tournament_id: u64) -> Result<Vec<Address>, LedgerError>;

    async fn encrypted_strategy(
        &self,
        tournament_id: u64,
        player: &Address,
    ) -> Result<EncryptedStrategy, LedgerError>;

    /// Identity allowed to decrypt strategies and publish results
    async fn computation_oracle(&self) -> Result<Address, LedgerError>;

    /// Publish results atomically; fails without partial effect.
    async fn publish_results(
        &self,
        sender: &Address,
        submission: ResultsSubmission,
    ) -> Result<Confirmation, LedgerError>;
}
