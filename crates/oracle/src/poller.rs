//! Ledger-driven control loop
//!
//! Phase transitions belong to the ledger. The poller only watches for a
//! tournament pending computation and runs one pass per observation.
//! Failures are logged and retried from scratch on the next poll.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{LedgerError, OracleError};
use crate::ledger::Phase;
use crate::pass::{run_pass, OracleContext, PassReport};

/// Result of a single poll iteration
#[derive(Debug)]
pub enum PollOutcome {
    /// Nothing to compute in this phase
    Idle(Phase),
    Published(PassReport),
    Failed(OracleError),
}

pub struct OraclePoller {
    ctx: Arc<OracleContext>,
    poll_interval: Duration,
}

impl OraclePoller {
    pub fn new(ctx: Arc<OracleContext>, poll_interval: Duration) -> Self {
        Self { ctx, poll_interval }
    }

    /// Read the current tournament and, if it is pending computation, run a pass
    pub async fn poll_once(&self) -> PollOutcome {
        let info = match timeout(self.ctx.request_timeout, self.ctx.ledger.tournament_info())
            .await
            .unwrap_or(Err(LedgerError::Timeout(self.ctx.request_timeout)))
        {
            Ok(info) => info,
            Err(e) => return PollOutcome::Failed(e.into()),
        };

        if info.phase != Phase::PendingComputation {
            debug!(tournament_id = info.id, phase = %info.phase, "nothing to compute");
            return PollOutcome::Idle(info.phase);
        }

        info!(tournament_id = info.id, "tournament pending computation");
        match run_pass(&self.ctx, &info).await {
            Ok(report) => PollOutcome::Published(report),
            Err(e) => PollOutcome::Failed(e),
        }
    }

    /// Poll until `cancel` fires
    ///
    /// Cancellation interrupts an in-flight pass as well as the sleep; an
    /// interrupted pass publishes nothing.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval = ?self.poll_interval, oracle = %self.ctx.identity.address(), "oracle poller started");

        while !cancel.is_cancelled() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => log_outcome(&outcome),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }

        info!("oracle poller stopped");
    }
}

fn log_outcome(outcome: &PollOutcome) {
    match outcome {
        PollOutcome::Idle(phase) => debug!(%phase, "idle"),
        PollOutcome::Published(report) => info!(
            tournament_id = report.tournament_id,
            sequence = report.confirmation.sequence,
            "computation pass complete"
        ),
        PollOutcome::Failed(e @ OracleError::Unauthorized { .. }) => {
            error!(kind = e.kind(), error = %e, "computation pass refused")
        }
        PollOutcome::Failed(e) => warn!(kind = e.kind(), error = %e, "computation pass failed, will retry"),
    }
}
