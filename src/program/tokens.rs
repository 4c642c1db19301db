//! SPL token setup instructions and mint inspection.

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use spl_associated_token_account::instruction::create_associated_token_account;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;

use crate::blockchain::types::{ChainError, ChainResult};

/// Size of a classic token account.
pub const TOKEN_ACCOUNT_LEN: usize = spl_token::state::Account::LEN;

/// Size of a mint account.
pub const MINT_ACCOUNT_LEN: usize = Mint::LEN;

/// Wrapped SOL mint.
pub fn wsol_mint() -> Pubkey {
    spl_token::native_mint::id()
}

/// Create `owner`'s associated token account for `mint`, paid by `payer`.
///
/// Fails on-chain if the account exists; callers check first.
pub fn create_ata(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account(payer, owner, mint, &spl_token::id())
}

/// Allocate a rent-exempt mint account owned by the token program.
pub fn create_mint_account(payer: &Pubkey, mint: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::create_account(payer, mint, lamports, MINT_ACCOUNT_LEN as u64, &spl_token::id())
}

/// Initialise a mint with no freeze authority.
pub fn initialize_mint(mint: &Pubkey, authority: &Pubkey, decimals: u8) -> ChainResult<Instruction> {
    spl_token::instruction::initialize_mint2(&spl_token::id(), mint, authority, None, decimals)
        .map_err(|e| ChainError::Encoding(format!("initialize_mint2: {}", e)))
}

/// Decimals of a mint from its account data.
pub fn mint_decimals(data: &[u8]) -> ChainResult<u8> {
    Mint::unpack(data)
        .map(|mint| mint.decimals)
        .map_err(|e| ChainError::AccountData(format!("mint: {}", e)))
}
