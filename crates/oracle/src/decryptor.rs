//! Strategy recovery
//!
//! Reads each player's cleartext rule metadata and encrypted action handle
//! from the ledger, decrypts the packed action vector and rebuilds the
//! strategy. Players are processed one at a time, in roster order. The
//! first failure aborts the whole batch.

use std::sync::Arc;
use std::time::Duration;

use match_logic::{conditions_from_codes, Strategy};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::decryption::{Authorization, DecryptionRequest, DecryptionService, OracleIdentity};
use crate::error::{DecryptionError, LedgerError, OracleError};
use crate::ledger::{Address, Ledger};

pub struct StrategyDecryptor {
    ledger: Arc<dyn Ledger>,
    service: Arc<dyn DecryptionService>,
    identity: OracleIdentity,
    request_timeout: Duration,
    authorization_days: u32,
}

impl StrategyDecryptor {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        service: Arc<dyn DecryptionService>,
        identity: OracleIdentity,
        request_timeout: Duration,
        authorization_days: u32,
    ) -> Self {
        Self {
            ledger,
            service,
            identity,
            request_timeout,
            authorization_days,
        }
    }

    /// Strategies parallel to `players`
    pub async fn decrypt_all(&self, tournament_id: u64, players: &[Address]) -> Result<Vec<Strategy>, OracleError> {
        let contract = self.ledger.contract_address();
        let authorization = self.identity.authorize(&contract, self.authorization_days);

        let mut strategies = Vec::with_capacity(players.len());
        for player in players {
            match self.decrypt_one(tournament_id, player, &contract, &authorization).await {
                Ok(strategy) => strategies.push(strategy),
                Err(e) => {
                    warn!(tournament_id, player = %player, error = %e, "aborting decryption batch");
                    return Err(e);
                }
            }
        }

        info!(tournament_id, players = strategies.len(), "all strategies decrypted");
        Ok(strategies)
    }

    async fn decrypt_one(
        &self,
        tournament_id: u64,
        player: &Address,
        contract: &Address,
        authorization: &Authorization,
    ) -> Result<Strategy, OracleError> {
        let encrypted = timeout(self.request_timeout, self.ledger.encrypted_strategy(tournament_id, player))
            .await
            .unwrap_or(Err(LedgerError::Timeout(self.request_timeout)))?;

        let conditions = conditions_from_codes(&encrypted.subjects, &encrypted.operators, &encrypted.values)
            .map_err(|source| OracleError::InvalidStrategy {
                player: player.clone(),
                source,
            })?;

        let request = DecryptionRequest {
            handle: encrypted.handle,
            contract: contract.clone(),
            authorization: authorization.clone(),
        };
        let packed = timeout(self.request_timeout, self.service.user_decrypt(&request))
            .await
            .unwrap_or(Err(DecryptionError::Timeout(self.request_timeout)))
            .map_err(|source| OracleError::Decryption {
                player: player.clone(),
                source,
            })?;

        let strategy = Strategy::from_parts(&conditions, packed).map_err(|source| OracleError::InvalidStrategy {
            player: player.clone(),
            source,
        })?;

        debug!(
            tournament_id,
            player = %player.short(),
            rules = strategy.rules().len(),
            default_action = %strategy.default_action(),
            "strategy decrypted"
        );
        Ok(strategy)
    }
}
