//! Off-chain computation oracle for the encrypted-strategy tournament
//!
//! Watches the ledger for a tournament whose registration has closed,
//! decrypts every player's action vector, replays the round-robin with
//! `match-logic`, splits the prize pool and publishes the results in a
//! single ledger write.

pub mod config;
pub mod decryption;
pub mod decryptor;
pub mod error;
pub mod fixture;
pub mod ledger;
pub mod pass;
pub mod poller;
pub mod publisher;

pub use config::{ConfigError, OracleConfig};
pub use decryption::{
    Authorization, DecryptionRequest, DecryptionService, OracleIdentity, SandboxDecryptionService,
    SharedDecryptionService,
};
pub use decryptor::StrategyDecryptor;
pub use error::{DecryptionError, LedgerError, OracleError};
pub use fixture::{Fixture, FixtureError};
pub use ledger::{Address, InMemoryLedger, Ledger, Phase, TournamentInfo};
pub use pass::{compute_results, run_pass, OracleContext, PassReport, TournamentResults};
pub use poller::{OraclePoller, PollOutcome};
pub use publisher::ResultsPublisher;
