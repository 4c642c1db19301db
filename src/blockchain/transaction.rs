//! Transaction signing, submission and confirmation monitoring.
//!
//! # Responsibilities
//! - Sign an instruction list with the wallet as fee payer plus extra signers
//! - Submit once (never re-submit a money-moving transaction)
//! - Poll signature status until confirmed, failed, expired or timed out

use std::time::Duration;

use solana_sdk::instruction::Instruction;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tokio::time::{interval, timeout};

use crate::blockchain::ledger::Ledger;
use crate::blockchain::types::{ChainError, ChainResult, ConfirmationStatus};
use crate::blockchain::wallet::Wallet;
use crate::config::schema::RpcConfig;

/// How long and how often to poll for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ConfirmSettings {
    pub fn from_config(config: &RpcConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.confirm_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Signs and submits transactions for one wallet.
pub struct TxSender<'a, L> {
    ledger: &'a L,
    wallet: &'a Wallet,
    settings: ConfirmSettings,
}

impl<'a, L: Ledger> TxSender<'a, L> {
    pub fn new(ledger: &'a L, wallet: &'a Wallet, settings: ConfirmSettings) -> Self {
        Self {
            ledger,
            wallet,
            settings,
        }
    }

    /// Build and sign a legacy transaction paid by the wallet.
    ///
    /// Returns the transaction and the last block height its blockhash is valid for.
    pub async fn build(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> ChainResult<(Transaction, u64)> {
        let (blockhash, last_valid_block_height) = self.ledger.latest_blockhash().await?;

        let mut signers: Vec<&dyn Signer> = vec![self.wallet.keypair()];
        signers.extend(extra_signers.iter().map(|k| *k as &dyn Signer));

        let mut transaction = Transaction::new_with_payer(instructions, Some(&self.wallet.pubkey()));
        transaction
            .try_sign(&signers, blockhash)
            .map_err(|e| ChainError::Wallet(format!("Signing failed: {}", e)))?;

        Ok((transaction, last_valid_block_height))
    }

    /// Sign, submit and wait for confirmation.
    ///
    /// A transaction that lands and fails is returned as a program error.
    pub async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> ChainResult<Signature> {
        let (transaction, last_valid_block_height) = self.build(instructions, extra_signers).await?;
        let signature = self.ledger.send_transaction(&transaction).await?;

        tracing::info!(
            signature = %signature,
            instructions = instructions.len(),
            "Transaction submitted"
        );

        match self.wait_for_confirmation(&signature, last_valid_block_height).await? {
            ConfirmationStatus::Confirmed => {
                tracing::info!(signature = %signature, "Transaction confirmed");
                Ok(signature)
            }
            ConfirmationStatus::Failed(reason) => {
                tracing::error!(signature = %signature, reason = %reason, "Transaction failed");
                Err(ChainError::program_failure(reason, Vec::new()))
            }
            ConfirmationStatus::Pending => Err(ChainError::ConfirmationTimeout {
                signature: signature.to_string(),
                timeout_secs: self.settings.timeout.as_secs(),
            }),
        }
    }

    /// Poll until the signature resolves or the blockhash expires.
    pub async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> ChainResult<ConfirmationStatus> {
        let result = timeout(self.settings.timeout, async {
            let mut ticker = interval(self.settings.poll_interval);

            loop {
                ticker.tick().await;

                match self.ledger.signature_status(signature).await? {
                    Some(Ok(())) => return Ok(ConfirmationStatus::Confirmed),
                    Some(Err(reason)) => return Ok(ConfirmationStatus::Failed(reason)),
                    None => {}
                }

                let height = self.ledger.block_height().await?;
                if height > last_valid_block_height {
                    return Err(ChainError::BlockhashExpired(signature.to_string()));
                }

                tracing::debug!(
                    signature = %signature,
                    block_height = height,
                    last_valid_block_height,
                    "Transaction pending"
                );
            }
        })
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Ok(ConfirmationStatus::Pending),
        }
    }
}
