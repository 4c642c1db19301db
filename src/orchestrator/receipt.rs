//! Typed results returned by [`FundService`](crate::orchestrator::FundService).

use std::fmt::Display;

use serde::{Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use uuid::Uuid;

use crate::blockchain::units::{format_units, SOL_DECIMALS};
use crate::program::{DepositorTotal, FundDetails, FundStatus};

fn as_string<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn as_opt_string<T: Display, S: Serializer>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    InitializeManager,
    CreateFund,
    Deposit,
    Redeem,
    Trade,
    UsdcToSol,
    RedeemTrade,
    WithdrawAll,
    DrainAll,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::InitializeManager => "initialize_manager",
            ActionKind::CreateFund => "create_fund",
            ActionKind::Deposit => "deposit",
            ActionKind::Redeem => "redeem",
            ActionKind::Trade => "trade",
            ActionKind::UsdcToSol => "usdc_to_sol",
            ActionKind::RedeemTrade => "redeem_trade",
            ActionKind::WithdrawAll => "withdraw_all",
            ActionKind::DrainAll => "drain_all",
        }
    }
}

/// What happened to the off-chain record of a confirmed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum RecordOutcome {
    Recorded,
    /// Bookkeeping is disabled or the action has nothing to record.
    Skipped,
    Failed(String),
}

/// A confirmed money-moving action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReceipt {
    pub action_id: Uuid,
    pub action: ActionKind,
    #[serde(serialize_with = "as_string")]
    pub signature: Signature,
    pub record: RecordOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerAccount {
    #[serde(serialize_with = "as_string")]
    pub address: Pubkey,
    /// `None` when the account already existed.
    #[serde(serialize_with = "as_opt_string")]
    pub signature: Option<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundCreated {
    pub fund_id: String,
    #[serde(serialize_with = "as_string")]
    pub fund_address: Pubkey,
    #[serde(serialize_with = "as_string")]
    pub token_mint: Pubkey,
    pub receipt: ActionReceipt,
}

/// Human-readable view of a fund account. Amounts are in SOL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundReport {
    pub fund_id: String,
    pub address: String,
    pub authority: String,
    pub name: String,
    pub description: String,
    pub token_mint: String,
    pub status: FundStatus,
    pub target: String,
    pub invest_threshold: String,
    pub total_deposit: String,
    pub current_deposit: String,
    pub current_fund_token: String,
    pub start_time: i64,
    pub depositors: usize,
}

impl FundReport {
    pub fn new(address: &Pubkey, details: &FundDetails) -> Self {
        let sol = |units: u64| format_units(units, SOL_DECIMALS);
        Self {
            fund_id: details.fund_id.clone(),
            address: address.to_string(),
            authority: details.authority.to_string(),
            name: details.fund_name.clone(),
            description: details.description.clone(),
            token_mint: details.fund_token_mint.to_string(),
            status: details.status,
            target: sol(details.tokens_minted),
            invest_threshold: sol(details.invest_threshold),
            total_deposit: sol(details.total_deposit),
            current_deposit: sol(details.current_deposit),
            current_fund_token: sol(details.current_fund_token),
            start_time: details.start_time,
            depositors: details.user_deposits.len(),
        }
    }
}

/// One depositor's aggregate. `total` is in SOL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositorReport {
    pub user: String,
    pub deposits: usize,
    pub total: String,
}

impl From<&DepositorTotal> for DepositorReport {
    fn from(total: &DepositorTotal) -> Self {
        Self {
            user: total.user.to_string(),
            deposits: total.deposits,
            total: format_units(total.total, SOL_DECIMALS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub wallet: String,
    pub wallet_sol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fund_vault: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fund_vault_sol: Option<String>,
    /// USDC held by the fund, when it has a USDC account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fund_usdc: Option<String>,
}
