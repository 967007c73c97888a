//! In-memory ledger sandbox
//!
//! Models the tournament contract closely enough to drive the oracle end to
//! end: write-once strategy submission during registration, owner-driven
//! phase changes, oracle-only atomic result publication that opens the next
//! tournament, and prize claims. Encryption is simulated by keeping the
//! packed action vector behind an opaque handle that only the decryption
//! sandbox reads.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use match_logic::MAX_RULES;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{
    Address, CiphertextHandle, Confirmation, EncryptedStrategy, Ledger, Phase, ResultsSubmission,
    TournamentInfo,
};
use crate::error::LedgerError;

/// Allowed rounds per match
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 1000;

/// Rounds per match until the owner changes it
pub const DEFAULT_ROUNDS: u32 = 100;

/// 0.01 ETH in wei
pub const DEFAULT_ENTRY_FEE: u128 = 10_000_000_000_000_000;

#[derive(Debug)]
struct TournamentRecord {
    id: u64,
    phase: Phase,
    round_count: u32,
    prize_pool: u128,
    players: Vec<Address>,
    strategies: HashMap<Address, EncryptedStrategy>,
    results: Option<PublishedResults>,
}

impl TournamentRecord {
    fn new(id: u64, round_count: u32) -> Self {
        Self {
            id,
            phase: Phase::Registration,
            round_count,
            prize_pool: 0,
            players: Vec::new(),
            strategies: HashMap::new(),
            results: None,
        }
    }

    fn info(&self) -> TournamentInfo {
        TournamentInfo {
            id: self.id,
            phase: self.phase,
            round_count: self.round_count,
            prize_pool: self.prize_pool,
            player_count: self.players.len(),
        }
    }
}

#[derive(Debug)]
struct PublishedResults {
    scores: HashMap<Address, u64>,
    prizes: HashMap<Address, u128>,
    claimed: HashSet<Address>,
}

#[derive(Debug)]
struct LedgerState {
    owner: Address,
    oracle: Address,
    /// May close registration in addition to the owner
    starters: HashSet<Address>,
    entry_fee: u128,
    next_round_count: u32,
    current_id: u64,
    tournaments: BTreeMap<u64, TournamentRecord>,
    ciphertexts: HashMap<CiphertextHandle, u128>,
    next_handle: u64,
    sequence: u64,
    publish_failure: Option<String>,
}

impl LedgerState {
    fn current(&self) -> Result<&TournamentRecord, LedgerError> {
        self.tournaments
            .get(&self.current_id)
            .ok_or(LedgerError::UnknownTournament(self.current_id))
    }

    fn current_mut(&mut self) -> Result<&mut TournamentRecord, LedgerError> {
        let id = self.current_id;
        self.tournaments.get_mut(&id).ok_or(LedgerError::UnknownTournament(id))
    }

    fn tournament(&self, id: u64) -> Result<&TournamentRecord, LedgerError> {
        self.tournaments.get(&id).ok_or(LedgerError::UnknownTournament(id))
    }

    fn require_owner(&self, sender: &Address) -> Result<(), LedgerError> {
        if *sender != self.owner {
            return Err(LedgerError::NotAuthorized(sender.clone()));
        }
        Ok(())
    }

    fn require_starter(&self, sender: &Address) -> Result<(), LedgerError> {
        if *sender != self.owner && !self.starters.contains(sender) {
            return Err(LedgerError::NotAuthorized(sender.clone()));
        }
        Ok(())
    }
}

fn require_phase(record: &TournamentRecord, expected: Phase) -> Result<(), LedgerError> {
    if record.phase != expected {
        return Err(LedgerError::InvalidPhase {
            tournament_id: record.id,
            expected,
            actual: record.phase,
        });
    }
    Ok(())
}

/// Tournament contract held in memory
#[derive(Debug)]
pub struct InMemoryLedger {
    contract: Address,
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Create a ledger with tournament 0 open for registration
    pub fn new(contract: Address, owner: Address, oracle: Address) -> Self {
        let mut tournaments = BTreeMap::new();
        tournaments.insert(0, TournamentRecord::new(0, DEFAULT_ROUNDS));
        Self {
            contract,
            state: RwLock::new(LedgerState {
                owner,
                oracle,
                starters: HashSet::new(),
                entry_fee: DEFAULT_ENTRY_FEE,
                next_round_count: DEFAULT_ROUNDS,
                current_id: 0,
                tournaments,
                ciphertexts: HashMap::new(),
                next_handle: 0,
                sequence: 0,
                publish_failure: None,
            }),
        }
    }

    /// Fee every player pays into the prize pool on submission
    pub async fn set_entry_fee(&self, sender: &Address, fee: u128) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.require_owner(sender)?;
        state.entry_fee = fee;
        Ok(())
    }

    /// Set rounds per match for the current tournament and the ones after it
    pub async fn set_round_count(&self, sender: &Address, rounds: u32) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.require_owner(sender)?;
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&rounds) {
            return Err(LedgerError::InvalidRoundCount(rounds));
        }
        let current = state.current_mut()?;
        require_phase(current, Phase::Registration)?;
        current.round_count = rounds;
        state.next_round_count = rounds;
        Ok(())
    }

    /// Replace the registered computation oracle
    pub async fn set_computation_oracle(&self, sender: &Address, oracle: Address) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.require_owner(sender)?;
        state.oracle = oracle;
        Ok(())
    }

    /// Allow `starter` to close registration
    pub async fn add_authorized_starter(&self, sender: &Address, starter: Address) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.require_owner(sender)?;
        state.starters.insert(starter);
        Ok(())
    }

    pub async fn remove_authorized_starter(&self, sender: &Address, starter: &Address) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        state.require_owner(sender)?;
        state.starters.remove(starter);
        Ok(())
    }

    pub async fn is_authorized_starter(&self, account: &Address) -> bool {
        self.state.read().await.starters.contains(account)
    }

    /// Submit a strategy to the current tournament
    ///
    /// `packed_actions` is the plaintext the player would encrypt client-side.
    pub async fn submit_strategy(
        &self,
        player: &Address,
        subjects: Vec<u8>,
        operators: Vec<u8>,
        values: Vec<u32>,
        packed_actions: u128,
    ) -> Result<CiphertextHandle, LedgerError> {
        if subjects.len() != operators.len() || subjects.len() != values.len() {
            return Err(LedgerError::LengthMismatch { what: "rule metadata" });
        }
        if subjects.len() > MAX_RULES {
            return Err(LedgerError::TooManyRules { count: subjects.len(), max: MAX_RULES });
        }

        let mut state = self.state.write().await;
        let fee = state.entry_fee;
        let handle = CiphertextHandle(format!("0x{:064x}", state.next_handle));

        let current = state.current_mut()?;
        require_phase(current, Phase::Registration)?;
        if current.strategies.contains_key(player) {
            return Err(LedgerError::AlreadySubmitted(player.clone()));
        }

        current.players.push(player.clone());
        current.strategies.insert(
            player.clone(),
            EncryptedStrategy {
                handle: handle.clone(),
                subjects,
                operators,
                values,
            },
        );
        current.prize_pool += fee;
        let tournament_id = current.id;

        state.next_handle += 1;
        state.ciphertexts.insert(handle.clone(), packed_actions);

        debug!(tournament_id, player = %player, %handle, "strategy submitted");
        Ok(handle)
    }

    /// Close registration; the tournament waits for the oracle
    ///
    /// Callable by the owner or an authorized starter.
    pub async fn close_registration(&self, sender: &Address) -> Result<u64, LedgerError> {
        let mut state = self.state.write().await;
        state.require_starter(sender)?;
        let current = state.current_mut()?;
        require_phase(current, Phase::Registration)?;
        current.phase = Phase::PendingComputation;
        info!(
            tournament_id = current.id,
            players = current.players.len(),
            "registration closed, pending computation"
        );
        Ok(current.id)
    }

    /// Make the next publication fail with `reason` (`None` clears it)
    pub async fn set_publish_failure(&self, reason: Option<String>) {
        self.state.write().await.publish_failure = reason;
    }

    pub async fn tournament(&self, tournament_id: u64) -> Result<TournamentInfo, LedgerError> {
        Ok(self.state.read().await.tournament(tournament_id)?.info())
    }

    /// Published score of a player, if results exist
    pub async fn player_score(&self, tournament_id: u64, player: &Address) -> Result<Option<u64>, LedgerError> {
        let state = self.state.read().await;
        let record = state.tournament(tournament_id)?;
        Ok(record.results.as_ref().and_then(|r| r.scores.get(player).copied()))
    }

    /// Prize amount and whether it was claimed
    pub async fn claimable_prize(&self, tournament_id: u64, player: &Address) -> Result<(u128, bool), LedgerError> {
        let state = self.state.read().await;
        let record = state.tournament(tournament_id)?;
        Ok(match &record.results {
            Some(results) => (
                results.prizes.get(player).copied().unwrap_or(0),
                results.claimed.contains(player),
            ),
            None => (0, false),
        })
    }

    /// Claim a prize; the tournament finishes once every winner has claimed
    pub async fn claim_prize(&self, tournament_id: u64, player: &Address) -> Result<u128, LedgerError> {
        let mut state = self.state.write().await;
        let record = state
            .tournaments
            .get_mut(&tournament_id)
            .ok_or(LedgerError::UnknownTournament(tournament_id))?;
        require_phase(record, Phase::ResultsPublished)?;

        let results = record.results.as_mut().ok_or(LedgerError::NothingToClaim(player.clone()))?;
        let amount = match results.prizes.get(player) {
            Some(amount) if !results.claimed.contains(player) => *amount,
            _ => return Err(LedgerError::NothingToClaim(player.clone())),
        };
        results.claimed.insert(player.clone());

        if results.claimed.len() == results.prizes.len() {
            record.phase = Phase::Finished;
        }
        Ok(amount)
    }

    /// Plaintext behind a handle. Only the decryption sandbox reads this.
    pub(crate) async fn plaintext(&self, handle: &CiphertextHandle) -> Option<u128> {
        self.state.read().await.ciphertexts.get(handle).copied()
    }

    pub(crate) async fn registered_oracle(&self) -> Address {
        self.state.read().await.oracle.clone()
    }
}

fn validate_submission(record: &TournamentRecord, submission: &ResultsSubmission) -> Result<(), LedgerError> {
    if submission.players.len() != submission.scores.len() {
        return Err(LedgerError::LengthMismatch { what: "players and scores" });
    }
    if submission.winners.len() != submission.prizes.len() {
        return Err(LedgerError::LengthMismatch { what: "winners and prizes" });
    }
    if submission.players != record.players {
        return Err(LedgerError::RosterMismatch);
    }

    let mut seen = HashSet::new();
    for winner in &submission.winners {
        if !record.strategies.contains_key(winner) || !seen.insert(winner) {
            return Err(LedgerError::UnknownWinner(winner.clone()));
        }
    }

    let total = submission
        .prizes
        .iter()
        .try_fold(0u128, |acc, p| acc.checked_add(*p))
        .ok_or(LedgerError::PrizeMismatch { expected: record.prize_pool, actual: u128::MAX })?;
    if total != record.prize_pool {
        return Err(LedgerError::PrizeMismatch { expected: record.prize_pool, actual: total });
    }
    Ok(())
}

#[async_trait]
impl Ledger for InMemoryLedger {
    fn contract_address(&self) -> Address {
        self.contract.clone()
    }

    async fn tournament_info(&self) -> Result<TournamentInfo, LedgerError> {
        Ok(self.state.read().await.current()?.info())
    }

    async fn tournament_players(&self, tournament_id: u64) -> Result<Vec<Address>, LedgerError> {
        Ok(self.state.read().await.tournament(tournament_id)?.players.clone())
    }

    async fn encrypted_strategy(
        &self,
        tournament_id: u64,
        player: &Address,
    ) -> Result<EncryptedStrategy, LedgerError> {
        let state = self.state.read().await;
        state
            .tournament(tournament_id)?
            .strategies
            .get(player)
            .cloned()
            .ok_or_else(|| LedgerError::NoStrategy(player.clone()))
    }

    async fn computation_oracle(&self) -> Result<Address, LedgerError> {
        Ok(self.state.read().await.oracle.clone())
    }

    async fn publish_results(
        &self,
        sender: &Address,
        submission: ResultsSubmission,
    ) -> Result<Confirmation, LedgerError> {
        let mut state = self.state.write().await;
        if *sender != state.oracle {
            return Err(LedgerError::NotAuthorized(sender.clone()));
        }
        if submission.tournament_id != state.current_id {
            return Err(LedgerError::StaleTournament { tournament_id: submission.tournament_id });
        }
        if let Some(reason) = state.publish_failure.take() {
            return Err(LedgerError::Rejected(reason));
        }

        {
            let record = state.current()?;
            require_phase(record, Phase::PendingComputation)?;
            validate_submission(record, &submission)?;
        }

        // All checks passed; apply every effect together
        let next_rounds = state.next_round_count;
        let record = state.current_mut()?;
        let prizes: HashMap<Address, u128> = submission
            .winners
            .into_iter()
            .zip(submission.prizes)
            .collect();
        let scores: HashMap<Address, u64> = submission
            .players
            .into_iter()
            .zip(submission.scores)
            .collect();
        record.phase = if prizes.is_empty() { Phase::Finished } else { Phase::ResultsPublished };
        record.results = Some(PublishedResults {
            scores,
            prizes,
            claimed: HashSet::new(),
        });
        let tournament_id = record.id;

        let next_id = tournament_id + 1;
        state.tournaments.insert(next_id, TournamentRecord::new(next_id, next_rounds));
        state.current_id = next_id;
        state.sequence += 1;

        info!(tournament_id, next_tournament_id = next_id, "results published");
        Ok(Confirmation {
            tournament_id,
            sequence: state.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_logic::Strategy;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn ledger() -> InMemoryLedger {
        InMemoryLedger::new(addr("0xc0de"), addr("0x0w0"), addr("0x0ac1e"))
    }

    async fn submit(ledger: &InMemoryLedger, player: &str, strategy: &Strategy) -> Result<CiphertextHandle, LedgerError> {
        let conditions = strategy.conditions();
        ledger
            .submit_strategy(
                &addr(player),
                conditions.iter().map(|c| c.subject.code()).collect(),
                conditions.iter().map(|c| c.operator.code()).collect(),
                conditions.iter().map(|c| c.value).collect(),
                strategy.packed_actions(),
            )
            .await
    }

    fn submission(id: u64, players: &[&str], winners: &[&str], prizes: &[u128]) -> ResultsSubmission {
        ResultsSubmission {
            tournament_id: id,
            players: players.iter().map(|p| addr(p)).collect(),
            scores: players.iter().map(|_| 1).collect(),
            winners: winners.iter().map(|p| addr(p)).collect(),
            prizes: prizes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_submission_grows_pool_and_roster() {
        let ledger = ledger();
        submit(&ledger, "0xa", &Strategy::tit_for_tat()).await.unwrap();
        submit(&ledger, "0xb", &Strategy::always_defect()).await.unwrap();

        let info = ledger.tournament_info().await.unwrap();
        assert_eq!(info.phase, Phase::Registration);
        assert_eq!(info.player_count, 2);
        assert_eq!(info.prize_pool, 2 * DEFAULT_ENTRY_FEE);
        assert_eq!(
            ledger.tournament_players(0).await.unwrap(),
            vec![addr("0xa"), addr("0xb")]
        );

        let stored = ledger.encrypted_strategy(0, &addr("0xa")).await.unwrap();
        assert_eq!(stored.subjects, vec![2]);
        assert_eq!(stored.operators, vec![0]);
        assert_eq!(stored.values, vec![1]);
        assert_eq!(ledger.plaintext(&stored.handle).await, Some(0x0100));
    }

    #[tokio::test]
    async fn test_strategy_is_write_once() {
        let ledger = ledger();
        submit(&ledger, "0xa", &Strategy::tit_for_tat()).await.unwrap();
        assert_eq!(
            submit(&ledger, "0xa", &Strategy::always_defect()).await,
            Err(LedgerError::AlreadySubmitted(addr("0xa")))
        );
    }

    #[tokio::test]
    async fn test_too_many_rules_rejected() {
        let ledger = ledger();
        let n = MAX_RULES + 1;
        let result = ledger
            .submit_strategy(&addr("0xa"), vec![0; n], vec![4; n], vec![1; n], 0)
            .await;
        assert_eq!(result, Err(LedgerError::TooManyRules { count: n, max: MAX_RULES }));
    }

    #[tokio::test]
    async fn test_no_submission_outside_registration() {
        let ledger = ledger();
        ledger.close_registration(&addr("0x0w0")).await.unwrap();
        assert!(matches!(
            submit(&ledger, "0xa", &Strategy::tit_for_tat()).await,
            Err(LedgerError::InvalidPhase { .. })
        ));
    }

    #[tokio::test]
    async fn test_only_owner_closes_registration() {
        let ledger = ledger();
        assert_eq!(
            ledger.close_registration(&addr("0xa")).await,
            Err(LedgerError::NotAuthorized(addr("0xa")))
        );
    }

    #[tokio::test]
    async fn test_authorized_starter_closes_registration() {
        let ledger = ledger();
        let owner = addr("0x0w0");
        let starter = addr("0x57a47");

        // only the owner manages starters
        assert_eq!(
            ledger.add_authorized_starter(&starter, starter.clone()).await,
            Err(LedgerError::NotAuthorized(starter.clone()))
        );
        ledger.add_authorized_starter(&owner, starter.clone()).await.unwrap();
        assert!(ledger.is_authorized_starter(&starter).await);

        ledger.remove_authorized_starter(&owner, &starter).await.unwrap();
        assert!(!ledger.is_authorized_starter(&starter).await);
        assert_eq!(
            ledger.close_registration(&starter).await,
            Err(LedgerError::NotAuthorized(starter.clone()))
        );

        ledger.add_authorized_starter(&owner, starter.clone()).await.unwrap();
        assert_eq!(ledger.close_registration(&starter).await, Ok(0));
        assert_eq!(ledger.tournament_info().await.unwrap().phase, Phase::PendingComputation);
    }

    #[tokio::test]
    async fn test_round_count_bounds() {
        let ledger = ledger();
        let owner = addr("0x0w0");
        assert_eq!(ledger.set_round_count(&owner, 0).await, Err(LedgerError::InvalidRoundCount(0)));
        assert_eq!(ledger.set_round_count(&owner, 1001).await, Err(LedgerError::InvalidRoundCount(1001)));
        ledger.set_round_count(&owner, 250).await.unwrap();
        assert_eq!(ledger.tournament_info().await.unwrap().round_count, 250);
    }

    #[tokio::test]
    async fn test_publish_opens_next_tournament() {
        let ledger = ledger();
        ledger.set_entry_fee(&addr("0x0w0"), 5).await.unwrap();
        submit(&ledger, "0xa", &Strategy::tit_for_tat()).await.unwrap();
        submit(&ledger, "0xb", &Strategy::always_defect()).await.unwrap();
        ledger.close_registration(&addr("0x0w0")).await.unwrap();

        let confirmation = ledger
            .publish_results(&addr("0x0ac1e"), submission(0, &["0xa", "0xb"], &["0xb"], &[10]))
            .await
            .unwrap();
        assert_eq!(confirmation.tournament_id, 0);

        let info = ledger.tournament_info().await.unwrap();
        assert_eq!(info.id, 1);
        assert_eq!(info.phase, Phase::Registration);
        assert_eq!(ledger.tournament(0).await.unwrap().phase, Phase::ResultsPublished);
        assert_eq!(ledger.claimable_prize(0, &addr("0xb")).await.unwrap(), (10, false));
        assert_eq!(ledger.player_score(0, &addr("0xa")).await.unwrap(), Some(1));

        assert_eq!(ledger.claim_prize(0, &addr("0xb")).await.unwrap(), 10);
        assert_eq!(ledger.tournament(0).await.unwrap().phase, Phase::Finished);
        assert_eq!(
            ledger.claim_prize(0, &addr("0xb")).await,
            Err(LedgerError::InvalidPhase {
                tournament_id: 0,
                expected: Phase::ResultsPublished,
                actual: Phase::Finished,
            })
        );
    }

    #[tokio::test]
    async fn test_publish_validation_has_no_partial_effect() {
        let ledger = ledger();
        ledger.set_entry_fee(&addr("0x0w0"), 5).await.unwrap();
        submit(&ledger, "0xa", &Strategy::tit_for_tat()).await.unwrap();
        submit(&ledger, "0xb", &Strategy::always_defect()).await.unwrap();
        ledger.close_registration(&addr("0x0w0")).await.unwrap();
        let oracle = addr("0x0ac1e");

        // wrong sender
        assert_eq!(
            ledger
                .publish_results(&addr("0xa"), submission(0, &["0xa", "0xb"], &["0xb"], &[10]))
                .await,
            Err(LedgerError::NotAuthorized(addr("0xa")))
        );
        // prizes do not sum to the pool
        assert_eq!(
            ledger
                .publish_results(&oracle, submission(0, &["0xa", "0xb"], &["0xb"], &[9]))
                .await,
            Err(LedgerError::PrizeMismatch { expected: 10, actual: 9 })
        );
        // winner list and prize list disagree
        assert!(matches!(
            ledger
                .publish_results(&oracle, submission(0, &["0xa", "0xb"], &["0xb"], &[5, 5]))
                .await,
            Err(LedgerError::LengthMismatch { .. })
        ));
        // players and scores disagree
        let mut bad = submission(0, &["0xa", "0xb"], &["0xb"], &[10]);
        bad.scores.pop();
        assert!(matches!(
            ledger.publish_results(&oracle, bad).await,
            Err(LedgerError::LengthMismatch { .. })
        ));
        // roster reordered
        assert_eq!(
            ledger
                .publish_results(&oracle, submission(0, &["0xb", "0xa"], &["0xb"], &[10]))
                .await,
            Err(LedgerError::RosterMismatch)
        );
        // winner outside the roster
        assert_eq!(
            ledger
                .publish_results(&oracle, submission(0, &["0xa", "0xb"], &["0xc"], &[10]))
                .await,
            Err(LedgerError::UnknownWinner(addr("0xc")))
        );

        let info = ledger.tournament_info().await.unwrap();
        assert_eq!(info.id, 0);
        assert_eq!(info.phase, Phase::PendingComputation);
        assert_eq!(ledger.player_score(0, &addr("0xa")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_publish_failure_injection_is_one_shot() {
        let ledger = ledger();
        ledger.set_entry_fee(&addr("0x0w0"), 0).await.unwrap();
        submit(&ledger, "0xa", &Strategy::tit_for_tat()).await.unwrap();
        submit(&ledger, "0xb", &Strategy::tit_for_tat()).await.unwrap();
        ledger.close_registration(&addr("0x0w0")).await.unwrap();
        ledger.set_publish_failure(Some("out of gas".into())).await;

        let oracle = addr("0x0ac1e");
        assert_eq!(
            ledger
                .publish_results(&oracle, submission(0, &["0xa", "0xb"], &["0xa"], &[0]))
                .await,
            Err(LedgerError::Rejected("out of gas".into()))
        );
        assert!(ledger
            .publish_results(&oracle, submission(0, &["0xa", "0xb"], &["0xa"], &[0]))
            .await
            .is_ok());
    }
}
