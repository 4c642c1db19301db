//! Auth session management.
//!
//! The session is an explicit value with an expiry that is checked every
//! time it is handed out. A rejected token is replaced by signing the login
//! challenge again; last write wins.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use crate::blockchain::Wallet;
use crate::bookkeeping::types::{BackendResult, LoginGrant, LoginRequest};
use crate::bookkeeping::Bookkeeper;

/// Lifetime assumed when the server does not say when a token expires.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Tokens this close to expiry are treated as expired.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// A signed-in wallet.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub wallet: String,
    /// Unix seconds.
    pub expires_at: u64,
}

impl AuthSession {
    pub fn from_grant(grant: LoginGrant, wallet: String, now: u64) -> Self {
        let expires_at = grant
            .expires_at
            .unwrap_or_else(|| now + DEFAULT_SESSION_TTL.as_secs());
        Self {
            token: grant.token,
            wallet,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now + EXPIRY_SKEW.as_secs() >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("wallet", &self.wallet)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Holds the current session for one wallet.
pub struct SessionManager {
    wallet: Wallet,
    login_message: String,
    current: Mutex<Option<AuthSession>>,
}

impl SessionManager {
    pub fn new(wallet: Wallet, login_message: impl Into<String>) -> Self {
        Self {
            wallet,
            login_message: login_message.into(),
            current: Mutex::new(None),
        }
    }

    /// Signed login challenge for the wallet.
    pub fn login_request(&self) -> LoginRequest {
        let signature = self.wallet.sign_message(self.login_message.as_bytes());
        LoginRequest {
            wallet_address: self.wallet.pubkey().to_string(),
            signature: hex::encode(signature.as_ref()),
            message: self.login_message.clone(),
        }
    }

    /// Current session if still valid, otherwise a fresh one.
    pub async fn session<B: Bookkeeper>(&self, backend: &B) -> BackendResult<AuthSession> {
        if let Some(session) = self.current().await {
            if !session.is_expired() {
                return Ok(session);
            }
            tracing::debug!(wallet = %session.wallet, "Auth session expired");
        }
        self.refresh(backend).await
    }

    /// Sign in again regardless of the cached session.
    pub async fn refresh<B: Bookkeeper>(&self, backend: &B) -> BackendResult<AuthSession> {
        let request = self.login_request();
        let grant = backend.login(&request).await?;
        let session = AuthSession::from_grant(grant, request.wallet_address, unix_now());

        tracing::info!(wallet = %session.wallet, expires_at = session.expires_at, "Signed in");

        *self.current.lock().await = Some(session.clone());
        Ok(session)
    }

    /// Drop the cached session. The next call signs in again.
    pub async fn invalidate(&self) {
        self.current.lock().await.take();
    }

    pub async fn current(&self) -> Option<AuthSession> {
        self.current.lock().await.clone()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("wallet", &self.wallet.pubkey())
            .finish_non_exhaustive()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
