//! Decryption-service collaborator
//!
//! Strategy action vectors are stored encrypted on the ledger. The oracle
//! recovers them through a user-decryption request: a signed authorization
//! bound to the oracle's identity, the contract and a validity window.

mod sandbox;

pub use sandbox::SandboxDecryptionService;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::DecryptionError;
use crate::ledger::{Address, CiphertextHandle};

/// Validity window requested by the oracle
pub const AUTHORIZATION_DURATION_DAYS: u32 = 1;

const SECONDS_PER_DAY: u64 = 86_400;

/// Signed permission for `requester` to decrypt handles of `contract`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub requester: Address,
    pub contract: Address,
    /// Unix seconds
    pub start_timestamp: u64,
    pub duration_days: u32,
    /// Hex-encoded SHA-256 over the signing secret and the canonical message
    pub signature: String,
}

impl Authorization {
    /// `requester|contract|start|duration_days`
    pub fn canonical_message(requester: &Address, contract: &Address, start: u64, duration_days: u32) -> String {
        format!("{requester}|{contract}|{start}|{duration_days}")
    }

    pub fn message(&self) -> String {
        Self::canonical_message(&self.requester, &self.contract, self.start_timestamp, self.duration_days)
    }

    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(u64::from(self.duration_days).saturating_mul(SECONDS_PER_DAY))
    }

    /// Valid from the start timestamp until expiry, exclusive
    pub fn is_valid_at(&self, now: u64) -> bool {
        now >= self.start_timestamp && now < self.expires_at()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub handle: CiphertextHandle,
    pub contract: Address,
    pub authorization: Authorization,
}

#[async_trait]
pub trait DecryptionService: Send + Sync {
    /// Plaintext bound to the request's handle
    async fn user_decrypt(&self, request: &DecryptionRequest) -> Result<u128, DecryptionError>;
}

#[async_trait]
impl<T: DecryptionService + ?Sized> DecryptionService for Arc<T> {
    async fn user_decrypt(&self, request: &DecryptionRequest) -> Result<u128, DecryptionError> {
        (**self).user_decrypt(request).await
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Oracle address plus the secret it signs authorizations with
#[derive(Clone)]
pub struct OracleIdentity {
    address: Address,
    secret: String,
}

impl OracleIdentity {
    pub fn new(address: Address, secret: impl Into<String>) -> Self {
        Self {
            address,
            secret: secret.into(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Authorization starting now
    pub fn authorize(&self, contract: &Address, duration_days: u32) -> Authorization {
        self.authorize_at(contract, unix_now(), duration_days)
    }

    pub fn authorize_at(&self, contract: &Address, start_timestamp: u64, duration_days: u32) -> Authorization {
        let message = Authorization::canonical_message(&self.address, contract, start_timestamp, duration_days);
        Authorization {
            requester: self.address.clone(),
            contract: contract.clone(),
            start_timestamp,
            duration_days,
            signature: self.sign(&message),
        }
    }

    /// True when the authorization was issued by this identity and is untampered
    pub fn verify(&self, authorization: &Authorization) -> bool {
        authorization.requester == self.address && self.sign(&authorization.message()) == authorization.signature
    }

    fn sign(&self, message: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"|");
        hasher.update(message.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for OracleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleIdentity")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

type ServiceFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn DecryptionService>, DecryptionError>> + Send>>;
type ServiceFactory = Box<dyn Fn() -> ServiceFuture + Send + Sync>;

/// Decryption service handle built on first use
///
/// Concurrent first callers share one in-flight initialization. A failed
/// initialization is not cached; the next request tries again.
pub struct SharedDecryptionService {
    cell: OnceCell<Arc<dyn DecryptionService>>,
    init: ServiceFactory,
}

impl SharedDecryptionService {
    pub fn lazy<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn DecryptionService>, DecryptionError>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            init: Box::new(move || Box::pin(init())),
        }
    }

    /// Wrap an already constructed service
    pub fn ready(service: Arc<dyn DecryptionService>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(service)),
            init: Box::new(|| Box::pin(async { Err(DecryptionError::Unavailable("service already initialized".into())) })),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    async fn service(&self) -> Result<&Arc<dyn DecryptionService>, DecryptionError> {
        self.cell
            .get_or_try_init(|| async {
                info!("initializing decryption service");
                (self.init)().await
            })
            .await
    }
}

impl fmt::Debug for SharedDecryptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDecryptionService")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[async_trait]
impl DecryptionService for SharedDecryptionService {
    async fn user_decrypt(&self, request: &DecryptionRequest) -> Result<u128, DecryptionError> {
        self.service().await?.user_decrypt(request).await
    }
}
