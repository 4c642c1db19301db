//! Jupiter v6 HTTP client.
//!
//! # Responsibilities
//! - `GET /quote` and `POST /swap-instructions`
//! - Retry transport errors and retryable statuses under a [`RetryPolicy`]
//! - Turn "no route" answers and empty route plans into errors
//!
//! # Design Decisions
//! - Both calls are idempotent reads, so they retry; the resulting
//!   transaction is never retried here
//! - After the policy gives up the last error is propagated, never a
//!   degraded quote

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::schema::AggregatorConfig;
use crate::observability::metrics;
use crate::quoting::types::{
    AggregatorError, AggregatorResult, Quote, QuoteRequest, SwapInstructions, SwapInstructionsBody,
    SwapRequest,
};
use crate::quoting::SwapAggregator;
use crate::resilience::RetryPolicy;

const NO_ROUTE_MARKERS: [&str; 2] = ["COULD_NOT_FIND_ANY_ROUTE", "No routes found"];

/// HTTP client for the aggregator API.
#[derive(Clone)]
pub struct JupiterClient {
    http: reqwest::Client,
    config: AggregatorConfig,
    policy: RetryPolicy,
}

impl JupiterClient {
    pub fn new(config: AggregatorConfig, policy: RetryPolicy) -> AggregatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AggregatorError::Transport(e.to_string()))?;

        Ok(Self { http, config, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn is_retryable(&self, error: &AggregatorError) -> bool {
        match error {
            AggregatorError::Transport(_) => true,
            AggregatorError::Status { status, .. } => self.policy.is_retryable_status(*status),
            _ => false,
        }
    }

    /// Wrap an error that survived every retry.
    fn give_up(&self, error: AggregatorError) -> AggregatorError {
        if self.is_retryable(&error) {
            AggregatorError::Exhausted {
                attempts: self.policy.max_attempts,
                last: error.to_string(),
            }
        } else {
            error
        }
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> AggregatorResult<Quote> {
        let mut params: Vec<(&str, String)> = vec![
            ("inputMint", request.input_mint.to_string()),
            ("outputMint", request.output_mint.to_string()),
            ("amount", request.amount.to_string()),
            ("slippageBps", request.slippage_bps.to_string()),
            ("onlyDirectRoutes", "false".to_string()),
            ("asLegacyTransaction", self.config.as_legacy_transaction.to_string()),
        ];
        if !self.config.exclude_dexes.is_empty() {
            params.push(("excludeDexes", self.config.exclude_dexes.join(",")));
        }

        let response = self
            .http
            .get(self.endpoint("quote"))
            .query(&params)
            .send()
            .await
            .map_err(|e| AggregatorError::Transport(e.to_string()))?;

        read_json("quote", response).await
    }

    async fn fetch_swap_instructions(&self, request: &SwapRequest) -> AggregatorResult<SwapInstructions> {
        let body = SwapInstructionsBody {
            quote_response: &request.quote,
            user_public_key: request.user.to_string(),
            destination_token_account: request.destination_token_account.map(|p| p.to_string()),
            wrap_and_unwrap_sol: request.wrap_and_unwrap_sol,
            skip_user_accounts_creation: request.skip_user_accounts_creation,
            as_legacy_transaction: self.config.as_legacy_transaction,
        };

        let response = self
            .http
            .post(self.endpoint("swap-instructions"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AggregatorError::Transport(e.to_string()))?;

        read_json("swap-instructions", response).await
    }
}

impl SwapAggregator for JupiterClient {
    async fn quote(&self, request: &QuoteRequest) -> AggregatorResult<Quote> {
        let no_route = || AggregatorError::NoRoute {
            input_mint: request.input_mint.to_string(),
            output_mint: request.output_mint.to_string(),
        };

        let quote = self
            .policy
            .run("quote", |_| self.fetch_quote(request), |e| self.is_retryable(e))
            .await
            .map_err(|e| match e {
                AggregatorError::NoRoute { .. } => no_route(),
                other => self.give_up(other),
            })?;

        if !quote.has_route() {
            return Err(no_route());
        }

        tracing::info!(
            input_mint = %quote.input_mint,
            output_mint = %quote.output_mint,
            in_amount = %quote.in_amount,
            out_amount = %quote.out_amount,
            price_impact_pct = %quote.price_impact_pct,
            "Quote received"
        );
        Ok(quote)
    }

    async fn swap_instructions(&self, request: &SwapRequest) -> AggregatorResult<SwapInstructions> {
        self.policy
            .run(
                "swap-instructions",
                |_| self.fetch_swap_instructions(request),
                |e| self.is_retryable(e),
            )
            .await
            .map_err(|e| self.give_up(e))
    }
}

async fn read_json<T: DeserializeOwned>(endpoint: &'static str, response: reqwest::Response) -> AggregatorResult<T> {
    let status = response.status();
    metrics::record_aggregator_request(endpoint, status.as_u16());

    let body = response
        .text()
        .await
        .map_err(|e| AggregatorError::Transport(e.to_string()))?;

    if !status.is_success() {
        if NO_ROUTE_MARKERS.iter().any(|m| body.contains(m)) {
            return Err(AggregatorError::NoRoute {
                input_mint: String::new(),
                output_mint: String::new(),
            });
        }
        return Err(AggregatorError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| AggregatorError::Decode(format!("{}: {}", endpoint, e)))
}

impl std::fmt::Debug for JupiterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JupiterClient")
            .field("base_url", &self.config.base_url)
            .field("max_attempts", &self.policy.max_attempts)
            .finish()
    }
}
