//! Prerequisite account checks.
//!
//! Each helper derives the account, asks the ledger whether it exists, and
//! schedules a creation in the plan only when it does not.

use solana_sdk::pubkey::Pubkey;

use crate::blockchain::pda::associated_token_address;
use crate::blockchain::types::ChainResult;
use crate::blockchain::Ledger;
use crate::orchestrator::plan::TxPlan;
use crate::program::tokens::create_ata;

/// Make sure `owner`'s associated token account for `mint` exists or is
/// planned. Returns its address.
pub async fn ensure_ata<L: Ledger>(
    ledger: &L,
    plan: &mut TxPlan,
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> ChainResult<Pubkey> {
    let address = associated_token_address(owner, mint);
    if plan.is_scheduled(&address) {
        return Ok(address);
    }

    if ledger.account_exists(&address).await? {
        tracing::debug!(account = %address, mint = %mint, "Token account exists");
    } else {
        tracing::info!(account = %address, owner = %owner, mint = %mint, "Scheduling token account creation");
        plan.schedule_creation(address, create_ata(payer, owner, mint));
    }
    Ok(address)
}
