//! Bookkeeping API types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Server message for a rejected or expired token.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or Expired auth token.";

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Bookkeeping transport error: {0}")]
    Transport(String),

    /// Token missing, invalid or expired. Recoverable by signing in again.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bookkeeping API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Bookkeeping response decode error: {0}")]
    Decode(String),

    /// The fund logo could not be read for upload.
    #[error("Fund logo error: {0}")]
    Logo(String),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized(_))
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMethod {
    Buy,
    Sell,
}

/// `POST /ledger/new` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Fund state account (base58).
    pub fund_address: String,
    pub wallet_address: String,
    /// Amount in whole SOL.
    pub amount: f64,
    pub method: LedgerMethod,
    /// Confirmed transaction signature.
    pub signature: String,
}

/// `POST /fund/new` multipart form. Every field is a text part except the
/// logo, which is uploaded as the `logo` file part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRecord {
    pub fund_name: String,
    pub fund_ticker: String,
    pub fund_description: String,
    pub target_raise_amount: f64,
    pub annual_management_fee: f64,
    #[serde(skip)]
    pub logo: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    pub on_chain_fund_id: String,
    pub fund_contract_address: String,
    pub fund_token_address: String,
    pub manager_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_telegram_username: Option<String>,
}

/// `POST /trade/fund/{fundAddress}/execute` body. `fund_address` goes in the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(skip)]
    pub fund_address: String,
    pub from_token_address: String,
    pub to_token_address: String,
    pub from_token_symbol: String,
    pub to_token_symbol: String,
    /// Decimal amount of the input token.
    pub from_amount: String,
    pub slippage_bps: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    pub signature: String,
}

/// `POST /user/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub wallet_address: String,
    /// Hex-encoded ed25519 signature over `message`.
    pub signature: String,
    pub message: String,
}

/// Token handed out by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    /// Unix seconds, if the server said.
    pub expires_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub user: LoginUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginUser {
    pub auth_token: String,
    #[serde(default)]
    pub auth_expiry_date: Option<Value>,
}

impl LoginResponse {
    pub(crate) fn into_grant(self) -> LoginGrant {
        let expires_at = self.user.auth_expiry_date.as_ref().and_then(|value| match value {
            Value::Number(n) => n.as_u64().map(|ms| ms / 1000),
            Value::String(s) => parse_rfc3339(s),
            _ => None,
        });
        LoginGrant {
            token: self.user.auth_token,
            expires_at,
        }
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.fff]Z` into unix seconds.
pub fn parse_rfc3339(value: &str) -> Option<u64> {
    let value = value.strip_suffix('Z')?;
    let (date, time) = value.split_once('T')?;

    let mut date_parts = date.splitn(3, '-').map(|p| p.parse::<i64>().ok());
    let (year, month, day) = (date_parts.next()??, date_parts.next()??, date_parts.next()??);

    let time = time.split('.').next()?;
    let mut time_parts = time.splitn(3, ':').map(|p| p.parse::<i64>().ok());
    let (hour, minute, second) = (time_parts.next()??, time_parts.next()??, time_parts.next()??);

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 60 {
        return None;
    }

    // Days from civil date (proleptic Gregorian).
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146_097 + doe - 719_468;

    let secs = days * 86_400 + hour * 3600 + minute * 60 + second;
    u64::try_from(secs).ok()
}
