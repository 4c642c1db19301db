//! Wallet management and signing.
//!
//! # Security
//! - Keys are loaded from a keypair file whose path comes from config or
//!   the `FUND_WALLET_KEYPAIR` environment variable
//! - Keys are never logged or serialized

use std::path::PathBuf;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature, Signer};

use crate::blockchain::types::{ChainError, ChainResult};
use crate::config::schema::WalletConfig;

/// Environment variable overriding the configured keypair path.
pub const KEYPAIR_PATH_ENV_VAR: &str = "FUND_WALLET_KEYPAIR";

/// The signing wallet. Cloning shares the keypair.
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Load a Solana CLI keypair file (JSON array of 64 bytes).
    pub fn from_file(path: &str) -> ChainResult<Self> {
        let resolved = expand_home(path);
        let keypair = read_keypair_file(&resolved).map_err(|e| {
            ChainError::Wallet(format!("Failed to read keypair {}: {}", resolved.display(), e))
        })?;

        tracing::info!(address = %keypair.pubkey(), "Wallet loaded");

        Ok(Self::from_keypair(keypair))
    }

    /// Load from `FUND_WALLET_KEYPAIR` if set, else the configured path.
    pub fn from_config(config: &WalletConfig) -> ChainResult<Self> {
        match std::env::var(KEYPAIR_PATH_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(&path),
            _ => Self::from_file(&config.keypair_path),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Ed25519 signature over raw message bytes.
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("pubkey", &self.pubkey()).finish()
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
