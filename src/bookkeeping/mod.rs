//! Off-chain bookkeeping.
//!
//! # Data Flow
//! ```text
//! Confirmed action
//!     → SessionManager (cached token, or sign the login challenge)
//!     → Bookkeeper (POST /ledger/new | /fund/new | /trade/fund/{addr}/execute)
//!     → unauthorized? refresh the session and retry exactly once
//! ```
//!
//! # Design Decisions
//! - Recording is best effort: callers turn errors into a receipt outcome
//! - Only the four calls the orchestrator needs are modelled

pub mod client;
pub mod session;
pub mod types;

use std::future::Future;

pub use client::BackendClient;
pub use session::{AuthSession, SessionManager};
pub use types::{
    BackendError, BackendResult, FundRecord, LedgerEntry, LedgerMethod, LoginGrant, LoginRequest,
    TradeRecord,
};

/// Bookkeeping API surface.
#[allow(async_fn_in_trait)]
pub trait Bookkeeper {
    async fn login(&self, request: &LoginRequest) -> BackendResult<LoginGrant>;

    async fn record_ledger(&self, session: &AuthSession, entry: &LedgerEntry) -> BackendResult<()>;

    async fn record_fund(&self, session: &AuthSession, record: &FundRecord) -> BackendResult<()>;

    async fn record_trade(&self, session: &AuthSession, record: &TradeRecord) -> BackendResult<()>;
}

/// Run an authenticated call, signing in again once if the token is rejected.
pub async fn with_session<B, T, F, Fut>(sessions: &SessionManager, backend: &B, call: F) -> BackendResult<T>
where
    B: Bookkeeper,
    F: Fn(AuthSession) -> Fut,
    Fut: Future<Output = BackendResult<T>>,
{
    let session = sessions.session(backend).await?;
    match call(session).await {
        Err(error) if error.is_unauthorized() => {
            tracing::info!("Auth token rejected, signing in again");
            sessions.invalidate().await;
            let session = sessions.refresh(backend).await?;
            call(session).await
        }
        other => other,
    }
}
