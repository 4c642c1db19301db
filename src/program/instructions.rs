//! Fund program instruction builders.
//!
//! Instruction data is the Anchor method discriminator
//! (`sha256("global:<name>")[..8]`) followed by the borsh-encoded arguments.
//! Account lists follow the program's account structs field by field.

use borsh::BorshSerialize;
use solana_sdk::hash::hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

use crate::blockchain::types::{ChainError, ChainResult};

/// Anchor method discriminator.
pub fn sighash(method: &str) -> [u8; 8] {
    let digest = hash(format!("global:{}", method).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.to_bytes()[..8]);
    out
}

fn encode<A: BorshSerialize>(method: &str, args: &A) -> ChainResult<Vec<u8>> {
    let mut data = sighash(method).to_vec();
    args.serialize(&mut data)
        .map_err(|e| ChainError::Encoding(format!("{}: {}", method, e)))?;
    Ok(data)
}

fn writable(pubkey: Pubkey) -> AccountMeta {
    AccountMeta::new(pubkey, false)
}

fn readonly(pubkey: Pubkey) -> AccountMeta {
    AccountMeta::new_readonly(pubkey, false)
}

fn signer(pubkey: Pubkey) -> AccountMeta {
    AccountMeta::new(pubkey, true)
}

/// Accounts for `create_fund`.
#[derive(Debug, Clone)]
pub struct CreateFundAccounts {
    pub fund_details: Pubkey,
    pub token_mint: Pubkey,
    pub fund_token_account: Pubkey,
    pub creator: Pubkey,
}

/// Accounts for `deposit_liquidity`.
#[derive(Debug, Clone)]
pub struct DepositAccounts {
    pub fund_details: Pubkey,
    pub fund_vault: Pubkey,
    pub fund_token_account: Pubkey,
    pub user_token_account: Pubkey,
    pub user: Pubkey,
    pub fund_creator: Pubkey,
    pub manager_account: Pubkey,
    pub fund_token_mint: Pubkey,
}

/// Accounts for `redeem_liquidity`.
#[derive(Debug, Clone)]
pub struct RedeemAccounts {
    pub fund_details: Pubkey,
    pub fund_token_account: Pubkey,
    pub manager_account: Pubkey,
    pub user_token_account: Pubkey,
    pub user: Pubkey,
    pub fund_creator: Pubkey,
    pub fund_token_mint: Pubkey,
}

/// Accounts for `trade` (SOL from the vault into a token).
#[derive(Debug, Clone)]
pub struct TradeAccounts {
    pub fund_details: Pubkey,
    pub manager_account: Pubkey,
    pub program_authority: Pubkey,
    pub program_wsol: Pubkey,
    pub user: Pubkey,
    pub fund_vault: Pubkey,
    pub sol_mint: Pubkey,
    pub destination_mint: Pubkey,
    pub fund_token_account: Pubkey,
    pub jupiter_program: Pubkey,
}

/// Accounts for `usdc_to_sol_trade`.
#[derive(Debug, Clone)]
pub struct UsdcToSolAccounts {
    pub program_authority: Pubkey,
    pub destination_token_account: Pubkey,
    pub program_wsol: Pubkey,
    pub user: Pubkey,
    pub fund_vault: Pubkey,
    pub sol_mint: Pubkey,
    pub fund_token_account: Pubkey,
    pub usdc_mint: Pubkey,
    pub jupiter_program: Pubkey,
}

/// Accounts for `redeem_trade`.
#[derive(Debug, Clone)]
pub struct RedeemTradeAccounts {
    pub fund_details: Pubkey,
    pub program_authority: Pubkey,
    pub program_wsol: Pubkey,
    pub user: Pubkey,
    pub sol_mint: Pubkey,
    pub user_token_account: Pubkey,
    pub fund_token_account: Pubkey,
    pub jupiter_program: Pubkey,
}

/// Accounts for `drain_all_funds`.
#[derive(Debug, Clone)]
pub struct DrainAccounts {
    pub program_authority: Pubkey,
    pub fund_vault: Pubkey,
    pub fund_token_account: Pubkey,
    pub program_wsol: Pubkey,
    pub usdc_mint: Pubkey,
    pub destination: Pubkey,
    pub destination_token_account: Pubkey,
}

/// Instruction factory for one deployment of the fund program.
#[derive(Debug, Clone, Copy)]
pub struct FundProgram {
    program_id: Pubkey,
}

impl FundProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    fn instruction(&self, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts,
            data,
        }
    }

    /// Register the fee account of a platform manager.
    pub fn initialize(&self, manager_account: Pubkey, payer: Pubkey, manager: Pubkey) -> ChainResult<Instruction> {
        let data = encode("initialize", &manager.to_bytes())?;
        Ok(self.instruction(
            vec![writable(manager_account), signer(payer), readonly(system_program::id())],
            data,
        ))
    }

    pub fn create_fund(
        &self,
        accounts: &CreateFundAccounts,
        fund_id: &str,
        target_amount: u64,
        fund_name: &str,
        description: &str,
        invest_threshold: u64,
    ) -> ChainResult<Instruction> {
        let data = encode(
            "create_fund",
            &(
                fund_id.to_string(),
                target_amount,
                fund_name.to_string(),
                description.to_string(),
                invest_threshold,
            ),
        )?;
        Ok(self.instruction(
            vec![
                writable(accounts.fund_details),
                writable(accounts.token_mint),
                writable(accounts.fund_token_account),
                signer(accounts.creator),
                readonly(system_program::id()),
                readonly(spl_token::id()),
                readonly(sysvar::rent::id()),
            ],
            data,
        ))
    }

    pub fn deposit_liquidity(
        &self,
        accounts: &DepositAccounts,
        amount: u64,
        fund_id: &str,
        manager: &Pubkey,
        tvl: u64,
    ) -> ChainResult<Instruction> {
        let data = encode(
            "deposit_liquidity",
            &(
                amount,
                fund_id.to_string(),
                accounts.fund_creator.to_bytes(),
                manager.to_bytes(),
                tvl,
            ),
        )?;
        Ok(self.instruction(
            vec![
                writable(accounts.fund_details),
                writable(accounts.fund_vault),
                writable(accounts.fund_token_account),
                writable(accounts.user_token_account),
                signer(accounts.user),
                writable(accounts.fund_creator),
                writable(accounts.manager_account),
                writable(accounts.fund_token_mint),
                readonly(system_program::id()),
                readonly(spl_token::id()),
                readonly(sysvar::rent::id()),
                readonly(spl_associated_token_account::id()),
            ],
            data,
        ))
    }

    pub fn redeem_liquidity(
        &self,
        accounts: &RedeemAccounts,
        amount: u64,
        fund_id: &str,
        manager: &Pubkey,
    ) -> ChainResult<Instruction> {
        let data = encode(
            "redeem_liquidity",
            &(
                amount,
                fund_id.to_string(),
                accounts.fund_creator.to_bytes(),
                manager.to_bytes(),
            ),
        )?;
        Ok(self.instruction(
            vec![
                writable(accounts.fund_details),
                writable(accounts.fund_token_account),
                writable(accounts.manager_account),
                writable(accounts.user_token_account),
                signer(accounts.user),
                writable(accounts.fund_creator),
                writable(accounts.fund_token_mint),
                readonly(accounts.fund_token_mint),
                readonly(spl_token::id()),
                readonly(system_program::id()),
                readonly(sysvar::rent::id()),
                readonly(spl_associated_token_account::id()),
            ],
            data,
        ))
    }

    /// Swap vault SOL through the aggregator. `route` is the swap
    /// instruction's accounts, appended as remaining accounts.
    pub fn trade(
        &self,
        accounts: &TradeAccounts,
        fund_id: &str,
        amount: u64,
        swap_data: Vec<u8>,
        route: Vec<AccountMeta>,
    ) -> ChainResult<Instruction> {
        let data = encode("trade", &(fund_id.to_string(), amount, swap_data))?;
        let mut metas = vec![
            writable(accounts.fund_details),
            readonly(accounts.manager_account),
            writable(accounts.program_authority),
            writable(accounts.program_wsol),
            signer(accounts.user),
            writable(accounts.fund_vault),
            readonly(accounts.sol_mint),
            readonly(accounts.destination_mint),
            writable(accounts.fund_token_account),
            readonly(accounts.jupiter_program),
            readonly(spl_token::id()),
            readonly(system_program::id()),
        ];
        metas.extend(route);
        Ok(self.instruction(metas, data))
    }

    pub fn usdc_to_sol_trade(
        &self,
        accounts: &UsdcToSolAccounts,
        fund_id: &str,
        amount: u64,
        swap_data: Vec<u8>,
        route: Vec<AccountMeta>,
    ) -> ChainResult<Instruction> {
        let data = encode("usdc_to_sol_trade", &(fund_id.to_string(), amount, swap_data))?;
        let mut metas = vec![
            writable(accounts.program_authority),
            writable(accounts.destination_token_account),
            writable(accounts.program_wsol),
            readonly(accounts.user),
            writable(accounts.fund_vault),
            readonly(accounts.sol_mint),
            writable(accounts.fund_token_account),
            readonly(accounts.usdc_mint),
            readonly(accounts.jupiter_program),
            readonly(spl_token::id()),
            readonly(system_program::id()),
            readonly(spl_associated_token_account::id()),
        ];
        metas.extend(route);
        Ok(self.instruction(metas, data))
    }

    pub fn redeem_trade(
        &self,
        accounts: &RedeemTradeAccounts,
        fund_id: &str,
        amount: u64,
        swap_data: Vec<u8>,
        route: Vec<AccountMeta>,
    ) -> ChainResult<Instruction> {
        let data = encode("redeem_trade", &(fund_id.to_string(), amount, swap_data))?;
        let mut metas = vec![
            writable(accounts.fund_details),
            writable(accounts.program_authority),
            writable(accounts.program_wsol),
            signer(accounts.user),
            readonly(accounts.sol_mint),
            writable(accounts.user_token_account),
            writable(accounts.fund_token_account),
            readonly(accounts.jupiter_program),
            readonly(spl_token::id()),
            readonly(system_program::id()),
        ];
        metas.extend(route);
        Ok(self.instruction(metas, data))
    }

    /// Create the authority-owned token account a fund swaps into.
    pub fn create_fund_token_account(
        &self,
        fund_id: &str,
        program_authority: Pubkey,
        fund_token_account: Pubkey,
        mint: Pubkey,
        payer: Pubkey,
    ) -> ChainResult<Instruction> {
        let data = encode("create_fund_token_account", &fund_id.to_string())?;
        Ok(self.instruction(
            vec![
                writable(program_authority),
                writable(fund_token_account),
                readonly(mint),
                signer(payer),
                readonly(spl_token::id()),
                readonly(system_program::id()),
                readonly(sysvar::rent::id()),
            ],
            data,
        ))
    }

    /// Move all lamports in a fund vault to `destination`.
    pub fn withdraw_all_funds(
        &self,
        fund_id: &str,
        fund_vault: Pubkey,
        destination: Pubkey,
        user: Pubkey,
    ) -> ChainResult<Instruction> {
        let data = encode("withdraw_all_funds", &fund_id.to_string())?;
        Ok(self.instruction(
            vec![
                writable(fund_vault),
                writable(destination),
                signer(user),
                readonly(system_program::id()),
            ],
            data,
        ))
    }

    /// Sweep vault SOL, program WSOL and fund USDC to `destination`.
    pub fn drain_all_funds(&self, accounts: &DrainAccounts, fund_id: &str) -> ChainResult<Instruction> {
        let data = encode("drain_all_funds", &fund_id.to_string())?;
        Ok(self.instruction(
            vec![
                writable(accounts.program_authority),
                writable(accounts.fund_vault),
                writable(accounts.fund_token_account),
                writable(accounts.program_wsol),
                readonly(accounts.usdc_mint),
                writable(accounts.destination),
                writable(accounts.destination_token_account),
                readonly(spl_token::id()),
                readonly(system_program::id()),
            ],
            data,
        ))
    }
}
