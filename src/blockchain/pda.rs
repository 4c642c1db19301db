//! Program-derived addresses.
//!
//! The single place seeds are spelled out. Every flow that needs a vault,
//! authority or fund account goes through [`ProgramAddresses`], so client
//! derivations cannot drift from the program's.

use solana_sdk::pubkey::{Pubkey, MAX_SEED_LEN};
use spl_associated_token_account::get_associated_token_address;

use crate::blockchain::types::{ChainError, ChainResult};

pub const AUTHORITY_SEED: &[u8] = b"authority";
pub const WSOL_SEED: &[u8] = b"wsol";
pub const VAULT_SEED: &[u8] = b"fund_vault";
pub const FUND_TOKEN_SEED: &[u8] = b"fund_token";
pub const FUND_DETAILS_SEED: &[u8] = b"fund_details";
pub const MANAGER_SEED: &[u8] = b"fund_manager";

/// Address deriver bound to one program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddresses {
    program_id: Pubkey,
}

impl ProgramAddresses {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Derive an address from raw seeds.
    pub fn derive(&self, seeds: &[&[u8]]) -> ChainResult<(Pubkey, u8)> {
        if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
            return Err(ChainError::InvalidSeed(format!(
                "seed of {} bytes exceeds {} byte limit",
                seed.len(),
                MAX_SEED_LEN
            )));
        }
        Pubkey::try_find_program_address(seeds, &self.program_id)
            .ok_or_else(|| ChainError::InvalidSeed("no viable bump seed".to_string()))
    }

    fn address(&self, seeds: &[&[u8]]) -> ChainResult<Pubkey> {
        self.derive(seeds).map(|(address, _)| address)
    }

    /// Program-wide authority that signs swaps.
    pub fn authority(&self) -> ChainResult<Pubkey> {
        self.address(&[AUTHORITY_SEED])
    }

    /// Program-owned wrapped SOL account.
    pub fn program_wsol(&self) -> ChainResult<Pubkey> {
        self.address(&[WSOL_SEED])
    }

    /// Lamport vault of a fund.
    pub fn fund_vault(&self, fund_id: &str) -> ChainResult<Pubkey> {
        self.address(&[VAULT_SEED, fund_id.as_bytes()])
    }

    /// Fund-owned token account for `mint` used as a swap destination.
    pub fn fund_token(&self, fund_id: &str, mint: &Pubkey) -> ChainResult<Pubkey> {
        self.address(&[FUND_TOKEN_SEED, fund_id.as_bytes(), mint.as_ref()])
    }

    /// Fund state account. Also the mint authority of the fund token.
    pub fn fund_details(&self, fund_id: &str, creator: &Pubkey) -> ChainResult<Pubkey> {
        self.address(&[FUND_DETAILS_SEED, fund_id.as_bytes(), creator.as_ref()])
    }

    /// Fee account of a platform manager.
    pub fn manager(&self, manager: &Pubkey) -> ChainResult<Pubkey> {
        self.address(&[MANAGER_SEED, manager.as_ref()])
    }
}

/// Associated token account of `owner` for `mint` under the classic token program.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}
