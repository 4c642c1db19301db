//! The ledger seam.
//!
//! Everything the orchestrator needs from the chain, as a trait, so flows can
//! run against [`BlockchainClient`](crate::blockchain::BlockchainClient) in
//! production and an in-memory ledger in tests.

use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::blockchain::types::ChainResult;

#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Fetch an account; `None` if it does not exist.
    async fn get_account(&self, address: &Pubkey) -> ChainResult<Option<Account>>;

    async fn account_exists(&self, address: &Pubkey) -> ChainResult<bool> {
        Ok(self.get_account(address).await?.is_some())
    }

    /// Lamport balance; zero for missing accounts.
    async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64>;

    /// Raw token amount held by a token account.
    async fn get_token_balance(&self, address: &Pubkey) -> ChainResult<u64>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> ChainResult<u64>;

    /// Latest blockhash and the last block height at which it is valid.
    async fn latest_blockhash(&self) -> ChainResult<(Hash, u64)>;

    /// Submit a signed transaction. Preflight failures come back as program errors.
    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<Signature>;

    /// `None` while not yet visible at the configured commitment,
    /// `Some(Err(reason))` if it landed and failed.
    async fn signature_status(&self, signature: &Signature) -> ChainResult<Option<Result<(), String>>>;

    async fn block_height(&self) -> ChainResult<u64>;
}
