//! One decrypt, simulate, allocate and publish pass over a tournament

use std::sync::Arc;
use std::time::Duration;

use match_logic::{allocate_prizes, simulate_tournament, Strategy, TournamentError, MIN_PARTICIPANTS};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::decryption::{DecryptionService, OracleIdentity};
use crate::decryptor::StrategyDecryptor;
use crate::error::{LedgerError, OracleError};
use crate::ledger::{Address, Confirmation, Ledger, TournamentInfo};
use crate::publisher::ResultsPublisher;

/// Collaborators and settings shared by every pass
pub struct OracleContext {
    pub ledger: Arc<dyn Ledger>,
    pub decryption: Arc<dyn DecryptionService>,
    pub identity: OracleIdentity,
    pub request_timeout: Duration,
    pub authorization_days: u32,
}

/// Scores, winners and prizes of a tournament, ready to publish
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentResults {
    pub players: Vec<Address>,
    /// Parallel to `players`
    pub scores: Vec<u64>,
    /// Highest score first
    pub winners: Vec<Address>,
    /// Parallel to `winners`
    pub prizes: Vec<u128>,
    pub match_count: usize,
}

/// Outcome of a pass that reached the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub tournament_id: u64,
    pub results: TournamentResults,
    pub confirmation: Confirmation,
}

/// Simulate the round-robin and split the pool
///
/// Pure; the published values are recomputable from the revealed strategies.
pub fn compute_results(
    players: &[Address],
    strategies: &[Strategy],
    round_count: u32,
    prize_pool: u128,
) -> Result<TournamentResults, OracleError> {
    if players.len() != strategies.len() {
        return Err(LedgerError::LengthMismatch { what: "players and strategies" }.into());
    }

    let outcome = simulate_tournament(strategies, round_count).map_err(|e| match e {
        TournamentError::InsufficientParticipants { count } => OracleError::InsufficientParticipants { count },
    })?;

    for summary in &outcome.matches {
        debug!(
            match_index = summary.match_index,
            player_a = summary.player_a,
            player_b = summary.player_b,
            score_a = summary.score_a,
            score_b = summary.score_b,
            "match played"
        );
    }

    let allocation = allocate_prizes(&outcome.scores, prize_pool)?;
    let winners = allocation.winners.iter().map(|i| players[*i].clone()).collect();

    Ok(TournamentResults {
        players: players.to_vec(),
        scores: outcome.scores,
        winners,
        prizes: allocation.prizes,
        match_count: outcome.matches.len(),
    })
}

/// Run a full pass for the tournament described by `info`
///
/// Every step completes before the next starts; nothing is published
/// unless all of them succeed.
pub async fn run_pass(ctx: &OracleContext, info: &TournamentInfo) -> Result<PassReport, OracleError> {
    let tournament_id = info.id;

    let registered = timeout(ctx.request_timeout, ctx.ledger.computation_oracle())
        .await
        .unwrap_or(Err(LedgerError::Timeout(ctx.request_timeout)))?;
    if registered != *ctx.identity.address() {
        return Err(OracleError::Unauthorized {
            identity: ctx.identity.address().clone(),
            registered,
        });
    }

    let players = timeout(ctx.request_timeout, ctx.ledger.tournament_players(tournament_id))
        .await
        .unwrap_or(Err(LedgerError::Timeout(ctx.request_timeout)))?;
    info!(tournament_id, players = players.len(), "starting computation pass");
    if players.len() < MIN_PARTICIPANTS {
        return Err(OracleError::InsufficientParticipants { count: players.len() });
    }

    let decryptor = StrategyDecryptor::new(
        ctx.ledger.clone(),
        ctx.decryption.clone(),
        ctx.identity.clone(),
        ctx.request_timeout,
        ctx.authorization_days,
    );
    let strategies = decryptor.decrypt_all(tournament_id, &players).await?;

    let results = compute_results(&players, &strategies, info.round_count, info.prize_pool)?;
    info!(
        tournament_id,
        matches = results.match_count,
        rounds = info.round_count,
        winners = results.winners.len(),
        "tournament simulated"
    );

    let publisher = ResultsPublisher::new(ctx.ledger.clone(), ctx.identity.address().clone(), ctx.request_timeout);
    let confirmation = publisher
        .publish(tournament_id, &results.players, &results.scores, &results.winners, &results.prizes)
        .await?;

    Ok(PassReport {
        tournament_id,
        results,
        confirmation,
    })
}
