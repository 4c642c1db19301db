//! Blockchain RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the primary and failover JSON-RPC endpoints
//! - Query chain state (accounts, balances, blockhash, signature status)
//! - Submit transactions and classify preflight failures
//! - Handle timeouts and transport errors on reads by moving to the next provider
//! - Send transactions through the primary only

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::blockchain::ledger::Ledger;
use crate::blockchain::types::{ChainError, ChainResult};
use crate::config::schema::RpcConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;

/// Nonblocking RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Primary first, then failovers.
    providers: Vec<Arc<RpcClient>>,
    config: RpcConfig,
    commitment: CommitmentConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    pub fn new(config: RpcConfig) -> ChainResult<Self> {
        let commitment = CommitmentConfig::from_str(&config.commitment)
            .map_err(|_| ChainError::Rpc(format!("Invalid commitment '{}'", config.commitment)))?;
        let timeout_duration = Duration::from_secs(config.timeout_secs);

        url::Url::parse(&config.url)
            .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL '{}': {}", config.url, e)))?;

        let mut providers = vec![Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            timeout_duration,
            commitment,
        ))];

        for url_str in &config.failover_urls {
            if url::Url::parse(url_str).is_ok() {
                providers.push(Arc::new(RpcClient::new_with_timeout_and_commitment(
                    url_str.clone(),
                    timeout_duration,
                    commitment,
                )));
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.url,
            failovers = providers.len() - 1,
            commitment = %config.commitment,
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            config,
            commitment,
            timeout_duration,
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Run `call` against each provider in turn.
    ///
    /// Transport errors and timeouts move on to the next provider. RPC
    /// response errors (preflight failures, invalid params) are answers, not
    /// outages, and are returned immediately.
    async fn with_failover<T, F, Fut>(&self, operation: &'static str, call: F) -> ChainResult<T>
    where
        F: Fn(Arc<RpcClient>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match with_timeout(operation, self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if is_definitive(&e) => return Err(map_client_error(e)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                }
                Err(e) => {
                    tracing::warn!(provider_idx = i, operation, error = %e, "RPC timeout, trying next provider");
                }
            }
            metrics::record_rpc_failover(operation);
        }
        Err(ChainError::Rpc(format!("All RPC providers failed: {}", operation)))
    }
}

impl Ledger for BlockchainClient {
    async fn get_account(&self, address: &Pubkey) -> ChainResult<Option<Account>> {
        let commitment = self.commitment;
        self.with_failover("get_account", |rpc| async move {
            rpc.get_account_with_commitment(address, commitment)
                .await
                .map(|response| response.value)
        })
        .await
    }

    async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        self.with_failover("get_balance", |rpc| async move { rpc.get_balance(address).await })
            .await
    }

    async fn get_token_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        let ui_amount = self
            .with_failover("get_token_balance", |rpc| async move {
                rpc.get_token_account_balance(address).await
            })
            .await?;
        ui_amount.amount.parse::<u64>().map_err(|e| {
            ChainError::AccountData(format!("Bad token amount '{}': {}", ui_amount.amount, e))
        })
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> ChainResult<u64> {
        self.with_failover("minimum_balance_for_rent_exemption", |rpc| async move {
            rpc.get_minimum_balance_for_rent_exemption(data_len).await
        })
        .await
    }

    async fn latest_blockhash(&self) -> ChainResult<(Hash, u64)> {
        let commitment = self.commitment;
        self.with_failover("latest_blockhash", |rpc| async move {
            rpc.get_latest_blockhash_with_commitment(commitment).await
        })
        .await
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<Signature> {
        let send_config = RpcSendTransactionConfig {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries: Some(self.config.max_send_retries),
            ..Default::default()
        };
        // Primary only. A timed-out send may still land.
        let primary = &self.providers[0];
        match with_timeout(
            "send_transaction",
            self.timeout_duration,
            primary.send_transaction_with_config(transaction, send_config),
        )
        .await
        {
            Ok(result) => result.map_err(map_client_error),
            Err(_) => Err(ChainError::Timeout(self.timeout_duration.as_secs())),
        }
    }

    async fn signature_status(&self, signature: &Signature) -> ChainResult<Option<Result<(), String>>> {
        let commitment = self.commitment;
        let statuses = self
            .with_failover("signature_status", |rpc| async move {
                rpc.get_signature_statuses(std::slice::from_ref(signature))
                    .await
                    .map(|response| response.value)
            })
            .await?;

        Ok(statuses.into_iter().next().flatten().and_then(|status| {
            if let Some(err) = status.err {
                Some(Err(err.to_string()))
            } else if status.satisfies_commitment(commitment) {
                Some(Ok(()))
            } else {
                None
            }
        }))
    }

    async fn block_height(&self) -> ChainResult<u64> {
        self.with_failover("block_height", |rpc| async move { rpc.get_block_height().await })
            .await
    }
}

fn is_definitive(error: &ClientError) -> bool {
    matches!(
        error.kind(),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { .. })
            | ClientErrorKind::TransactionError(_)
    )
}

fn map_client_error(error: ClientError) -> ChainError {
    match error.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { message, data, .. }) => {
            let logs = match data {
                RpcResponseErrorData::SendTransactionPreflightFailure(simulation) => {
                    simulation.logs.clone().unwrap_or_default()
                }
                _ => Vec::new(),
            };
            ChainError::program_failure(message.clone(), logs)
        }
        ClientErrorKind::TransactionError(e) => ChainError::program_failure(e.to_string(), Vec::new()),
        _ => ChainError::Rpc(error.to_string()),
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.url)
            .field("providers", &self.providers.len())
            .field("commitment", &self.config.commitment)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}
