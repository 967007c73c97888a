//! Decryption service backed by the in-memory ledger

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{unix_now, DecryptionRequest, DecryptionService, OracleIdentity};
use crate::error::DecryptionError;
use crate::ledger::{Address, CiphertextHandle, InMemoryLedger, Ledger};

/// Verifies authorizations the way the relayer would, then reads the
/// plaintext the ledger holds for the handle.
#[derive(Debug)]
pub struct SandboxDecryptionService {
    ledger: Arc<InMemoryLedger>,
    signers: HashMap<Address, OracleIdentity>,
    /// Fixed clock in unix seconds; zero means wall clock
    now: AtomicU64,
    latency: Mutex<Option<Duration>>,
    failures: Mutex<HashMap<CiphertextHandle, DecryptionError>>,
}

impl SandboxDecryptionService {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            ledger,
            signers: HashMap::new(),
            now: AtomicU64::new(0),
            latency: Mutex::new(None),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Accept authorizations signed by `identity`
    pub fn with_signer(mut self, identity: OracleIdentity) -> Self {
        self.signers.insert(identity.address().clone(), identity);
        self
    }

    pub fn set_now(&self, unix_seconds: u64) {
        self.now.store(unix_seconds, Ordering::SeqCst);
    }

    /// Delay every response by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Fail the next request for `handle` with `error`
    pub fn fail_once(&self, handle: CiphertextHandle, error: DecryptionError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, error);
    }

    fn current_time(&self) -> u64 {
        match self.now.load(Ordering::SeqCst) {
            0 => unix_now(),
            fixed => fixed,
        }
    }

    fn take_failure(&self, handle: &CiphertextHandle) -> Option<DecryptionError> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle)
    }

    fn latency(&self) -> Option<Duration> {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DecryptionService for SandboxDecryptionService {
    async fn user_decrypt(&self, request: &DecryptionRequest) -> Result<u128, DecryptionError> {
        if let Some(latency) = self.latency() {
            tokio::time::sleep(latency).await;
        }

        let auth = &request.authorization;
        let signer = self
            .signers
            .get(&auth.requester)
            .ok_or(DecryptionError::InvalidSignature)?;
        if !signer.verify(auth) {
            return Err(DecryptionError::InvalidSignature);
        }
        if !auth.is_valid_at(self.current_time()) {
            return Err(DecryptionError::Expired);
        }

        let contract = self.ledger.contract_address();
        if auth.contract != contract || request.contract != contract {
            return Err(DecryptionError::Unauthorized(auth.requester.clone()));
        }
        if auth.requester != self.ledger.registered_oracle().await {
            return Err(DecryptionError::Unauthorized(auth.requester.clone()));
        }

        if let Some(error) = self.take_failure(&request.handle) {
            warn!(handle = %request.handle, %error, "injected decryption failure");
            return Err(error);
        }

        let plaintext = self
            .ledger
            .plaintext(&request.handle)
            .await
            .ok_or_else(|| DecryptionError::UnknownHandle(request.handle.clone()))?;
        debug!(handle = %request.handle, requester = %auth.requester.short(), "handle decrypted");
        Ok(plaintext)
    }
}
