//! Sandbox tournament fixtures
//!
//! A fixture describes a tournament contract and its registered players.
//! It seeds the in-memory ledger for `run` and feeds offline `replay`.

use std::path::Path;
use std::sync::Arc;

use match_logic::Strategy;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::{LedgerError, OracleError};
use crate::ledger::{Address, InMemoryLedger, DEFAULT_ENTRY_FEE, DEFAULT_ROUNDS};
use crate::pass::{compute_results, TournamentResults};

fn default_entry_fee() -> u128 {
    DEFAULT_ENTRY_FEE
}

fn default_close_registration() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct FixturePlayer {
    pub address: Address,
    /// Built-in strategy name, e.g. `tit-for-tat`
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub strategy: Option<Strategy>,
}

impl FixturePlayer {
    pub fn resolve(&self) -> Result<Strategy, FixtureError> {
        match (&self.strategy, &self.preset) {
            (Some(strategy), _) => Ok(strategy.clone()),
            (None, Some(name)) => Strategy::preset(name).ok_or_else(|| FixtureError::UnknownPreset(name.clone())),
            (None, None) => Err(FixtureError::MissingStrategy(self.address.clone())),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Fixture {
    pub contract_address: Address,
    pub owner: Address,
    /// Wei paid per player
    #[serde(default = "default_entry_fee")]
    pub entry_fee: u128,
    #[serde(default)]
    pub round_count: Option<u32>,
    pub players: Vec<FixturePlayer>,
    /// Leave the tournament pending computation after seeding
    #[serde(default = "default_close_registration")]
    pub close_registration: bool,
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown strategy preset '{0}'")]
    UnknownPreset(String),

    #[error("player {0} has neither a preset nor a strategy")]
    MissingStrategy(Address),

    #[error("ledger rejected fixture: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Compute(#[from] OracleError),
}

impl Fixture {
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn round_count(&self) -> u32 {
        self.round_count.unwrap_or(DEFAULT_ROUNDS)
    }

    pub fn prize_pool(&self) -> u128 {
        self.entry_fee * self.players.len() as u128
    }

    pub fn strategies(&self) -> Result<Vec<Strategy>, FixtureError> {
        self.players.iter().map(FixturePlayer::resolve).collect()
    }

    /// Build a ledger with every fixture player registered
    pub async fn seed(&self, oracle: Address) -> Result<Arc<InMemoryLedger>, FixtureError> {
        let strategies = self.strategies()?;
        let ledger = Arc::new(InMemoryLedger::new(self.contract_address.clone(), self.owner.clone(), oracle));
        ledger.set_entry_fee(&self.owner, self.entry_fee).await?;
        if let Some(rounds) = self.round_count {
            ledger.set_round_count(&self.owner, rounds).await?;
        }

        for (player, strategy) in self.players.iter().zip(&strategies) {
            let conditions = strategy.conditions();
            ledger
                .submit_strategy(
                    &player.address,
                    conditions.iter().map(|c| c.subject.code()).collect(),
                    conditions.iter().map(|c| c.operator.code()).collect(),
                    conditions.iter().map(|c| c.value).collect(),
                    strategy.packed_actions(),
                )
                .await?;
        }

        if self.close_registration {
            ledger.close_registration(&self.owner).await?;
        }
        info!(
            contract = %self.contract_address,
            players = self.players.len(),
            "sandbox ledger seeded"
        );
        Ok(ledger)
    }

    /// Compute results offline from the plaintext strategies
    pub fn replay(&self) -> Result<TournamentResults, FixtureError> {
        let players: Vec<Address> = self.players.iter().map(|p| p.address.clone()).collect();
        let strategies = self.strategies()?;
        Ok(compute_results(&players, &strategies, self.round_count(), self.prize_pool())?)
    }
}
