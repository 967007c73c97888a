//! Results publication

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{LedgerError, OracleError};
use crate::ledger::{Address, Confirmation, Ledger, ResultsSubmission};

/// Performs the single ledger write of a computation pass
pub struct ResultsPublisher {
    ledger: Arc<dyn Ledger>,
    sender: Address,
    request_timeout: Duration,
}

impl ResultsPublisher {
    pub fn new(ledger: Arc<dyn Ledger>, sender: Address, request_timeout: Duration) -> Self {
        Self {
            ledger,
            sender,
            request_timeout,
        }
    }

    /// Submit results; the submission owns copies of every list.
    pub async fn publish(
        &self,
        tournament_id: u64,
        players: &[Address],
        scores: &[u64],
        winners: &[Address],
        prizes: &[u128],
    ) -> Result<Confirmation, OracleError> {
        let submission = ResultsSubmission {
            tournament_id,
            players: players.to_vec(),
            scores: scores.to_vec(),
            winners: winners.to_vec(),
            prizes: prizes.to_vec(),
        };

        let result = timeout(self.request_timeout, self.ledger.publish_results(&self.sender, submission))
            .await
            .unwrap_or(Err(LedgerError::Timeout(self.request_timeout)));

        match result {
            Ok(confirmation) => {
                info!(
                    tournament_id,
                    sequence = confirmation.sequence,
                    winners = winners.len(),
                    "results published"
                );
                Ok(confirmation)
            }
            Err(source) => {
                warn!(tournament_id, error = %source, "results publication failed");
                Err(OracleError::Publish { tournament_id, source })
            }
        }
    }
}
