//! Swap aggregator wire types.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors from the aggregator client.
#[derive(Debug, Clone, Error)]
pub enum AggregatorError {
    /// Connection, TLS or timeout failure.
    #[error("Aggregator transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("Aggregator returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Retryable failures persisted past the retry policy.
    #[error("Aggregator still failing after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// The quote has no route.
    #[error("No route from {input_mint} to {output_mint}")]
    NoRoute { input_mint: String, output_mint: String },

    /// Response body did not match the expected shape.
    #[error("Aggregator response decode error: {0}")]
    Decode(String),

    /// An instruction in the response could not be converted.
    #[error("Invalid aggregator instruction: {0}")]
    InvalidInstruction(String),
}

pub type AggregatorResult<T> = Result<T, AggregatorError>;

/// Input to `GET /quote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Raw input amount in the input mint's base units.
    pub amount: u64,
    pub slippage_bps: u16,
}

/// `GET /quote` response.
///
/// Fields the orchestrator reads are typed; everything else is kept in
/// `extra` so the quote can be echoed back verbatim to `/swap-instructions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub input_mint: String,
    pub in_amount: String,
    pub output_mint: String,
    pub out_amount: String,
    #[serde(default)]
    pub other_amount_threshold: String,
    #[serde(default)]
    pub slippage_bps: u16,
    #[serde(default)]
    pub price_impact_pct: String,
    #[serde(default)]
    pub route_plan: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Quote {
    pub fn has_route(&self) -> bool {
        !self.route_plan.is_empty()
    }

    /// Expected output in base units, if parseable.
    pub fn out_amount_units(&self) -> Option<u64> {
        self.out_amount.parse().ok()
    }
}

/// Input to `POST /swap-instructions`.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub quote: Quote,
    /// Wallet the aggregator builds the swap for.
    pub user: Pubkey,
    /// Where the output tokens land; `None` lets the aggregator pick the user's ATA.
    pub destination_token_account: Option<Pubkey>,
    pub wrap_and_unwrap_sol: bool,
    pub skip_user_accounts_creation: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwapInstructionsBody<'a> {
    pub quote_response: &'a Quote,
    pub user_public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_token_account: Option<String>,
    pub wrap_and_unwrap_sol: bool,
    pub skip_user_accounts_creation: bool,
    pub as_legacy_transaction: bool,
}

/// Account entry as the aggregator sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Instruction as the aggregator sends it (base64 data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInstruction {
    pub program_id: String,
    pub accounts: Vec<ApiAccountMeta>,
    pub data: String,
}

impl ApiInstruction {
    /// Account metas exactly as sent, signer flags untouched.
    pub fn account_metas(&self) -> AggregatorResult<Vec<AccountMeta>> {
        self.accounts
            .iter()
            .map(|meta| {
                let pubkey = parse_pubkey(&meta.pubkey)?;
                Ok(AccountMeta {
                    pubkey,
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
            })
            .collect()
    }

    pub fn decode_data(&self) -> AggregatorResult<Vec<u8>> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| AggregatorError::InvalidInstruction(format!("bad base64 data: {}", e)))
    }

    pub fn to_instruction(&self) -> AggregatorResult<Instruction> {
        Ok(Instruction {
            program_id: parse_pubkey(&self.program_id)?,
            accounts: self.account_metas()?,
            data: self.decode_data()?,
        })
    }
}

/// `POST /swap-instructions` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInstructions {
    #[serde(default)]
    pub token_ledger_instruction: Option<ApiInstruction>,
    #[serde(default)]
    pub compute_budget_instructions: Vec<ApiInstruction>,
    #[serde(default)]
    pub setup_instructions: Vec<ApiInstruction>,
    pub swap_instruction: ApiInstruction,
    #[serde(default)]
    pub cleanup_instruction: Option<ApiInstruction>,
    #[serde(default)]
    pub address_lookup_table_addresses: Vec<String>,
}

fn parse_pubkey(value: &str) -> AggregatorResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|_| AggregatorError::InvalidInstruction(format!("bad pubkey '{}'", value)))
}
