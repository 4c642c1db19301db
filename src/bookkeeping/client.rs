//! HTTP client for the bookkeeping API.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::bookkeeping::session::AuthSession;
use crate::bookkeeping::types::{
    BackendError, BackendResult, FundRecord, LedgerEntry, LoginGrant, LoginRequest, LoginResponse,
    TradeRecord, UNAUTHORIZED_MESSAGE,
};
use crate::bookkeeping::Bookkeeper;
use crate::config::schema::BackendConfig;

pub const WALLET_HEADER: &str = "wallet_address";
pub const TOKEN_HEADER: &str = "auth_token";

/// Multipart field carrying the fund logo.
pub const LOGO_FIELD: &str = "logo";

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, path: &str, session: &AuthSession) -> reqwest::RequestBuilder {
        self.http
            .post(self.endpoint(path))
            .header(WALLET_HEADER, &session.wallet)
            .header(TOKEN_HEADER, &session.token)
    }

    async fn post_authed<T: Serialize>(&self, path: &str, session: &AuthSession, body: &T) -> BackendResult<()> {
        let response = self
            .authed(path, session)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        read_body(response).await.map(|_| ())
    }
}

/// Text parts for every serialized field, then the logo file part.
async fn fund_form(record: &FundRecord) -> BackendResult<Form> {
    let fields = match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return Err(BackendError::Decode("fund record is not an object".to_string())),
        Err(e) => return Err(BackendError::Decode(format!("fund record: {}", e))),
    };

    let mut form = Form::new();
    for (name, value) in fields {
        let text = match value {
            Value::String(text) => text,
            Value::Null => continue,
            other => other.to_string(),
        };
        form = form.text(name, text);
    }

    let bytes = tokio::fs::read(&record.logo)
        .await
        .map_err(|e| BackendError::Logo(format!("{}: {}", record.logo.display(), e)))?;
    let file_name = record
        .logo
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logo".to_string());
    Ok(form.part(LOGO_FIELD, Part::bytes(bytes).file_name(file_name)))
}

impl Bookkeeper for BackendClient {
    async fn login(&self, request: &LoginRequest) -> BackendResult<LoginGrant> {
        let response = self
            .http
            .post(self.endpoint("user/login"))
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let body = read_body(response).await?;
        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::Decode(format!("login: {}", e)))?;
        Ok(parsed.into_grant())
    }

    async fn record_ledger(&self, session: &AuthSession, entry: &LedgerEntry) -> BackendResult<()> {
        self.post_authed("ledger/new", session, entry).await
    }

    async fn record_fund(&self, session: &AuthSession, record: &FundRecord) -> BackendResult<()> {
        let form = fund_form(record).await?;
        let response = self
            .authed("fund/new", session)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        read_body(response).await.map(|_| ())
    }

    async fn record_trade(&self, session: &AuthSession, record: &TradeRecord) -> BackendResult<()> {
        let path = format!("trade/fund/{}/execute", record.fund_address);
        self.post_authed(&path, session, record).await
    }
}

async fn read_body(response: reqwest::Response) -> BackendResult<String> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    classify(status, body)
}

/// Only the auth middleware's rejections mean the session is bad. Other 401s
/// (a missing upload) are plain failures.
fn is_session_rejection(status: u16, body: &str) -> bool {
    body.contains(UNAUTHORIZED_MESSAGE) || (status == 401 && body.contains("Unauthorized"))
}

fn classify(status: u16, body: String) -> BackendResult<String> {
    if is_session_rejection(status, &body) {
        return Err(BackendError::Unauthorized(body));
    }
    if !(200..300).contains(&status) {
        return Err(BackendError::Status { status, body });
    }
    Ok(body)
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let client = BackendClient::new(&BackendConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            ..BackendConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint("/ledger/new"), "http://localhost:5000/api/ledger/new");
    }

    #[test]
    fn test_classify_unauthorized() {
        let missing = r#"{"message":"Unauthorized: Missing key wallet-address or auth-token."}"#;
        assert!(classify(401, missing.to_string()).unwrap_err().is_unauthorized());

        let body = format!(r#"{{"message":"{}"}}"#, UNAUTHORIZED_MESSAGE);
        assert!(classify(400, body).unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_missing_logo_is_not_a_session_failure() {
        let err = classify(401, r#"{"message":"Fund logo is required."}"#.to_string()).unwrap_err();
        assert!(!err.is_unauthorized());
        assert!(matches!(err, BackendError::Status { status: 401, .. }));

        let forbidden = classify(403, r#"{"message":"You are not authorized"}"#.to_string()).unwrap_err();
        assert!(!forbidden.is_unauthorized());
    }

    #[tokio::test]
    async fn test_fund_form_requires_readable_logo() {
        let record = FundRecord {
            fund_name: "Alpha".to_string(),
            fund_ticker: "ALP".to_string(),
            fund_description: "d".to_string(),
            target_raise_amount: 10.0,
            annual_management_fee: 0.02,
            logo: std::path::PathBuf::from("/nonexistent/logo.png"),
            website_url: None,
            telegram_url: None,
            twitter_handle: None,
            on_chain_fund_id: "fund-1".to_string(),
            fund_contract_address: "Fund111".to_string(),
            fund_token_address: "Mint111".to_string(),
            manager_address: "Wallet111".to_string(),
            manager_telegram_username: None,
        };
        assert!(matches!(fund_form(&record).await, Err(BackendError::Logo(_))));
    }

    #[test]
    fn test_classify_other_statuses() {
        assert!(matches!(
            classify(500, "boom".to_string()),
            Err(BackendError::Status { status: 500, .. })
        ));
        assert_eq!(classify(201, "{}".to_string()).unwrap(), "{}");
    }
}
