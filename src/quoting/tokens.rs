//! Token registry: symbols, mints and decimals.

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;

use crate::config::schema::TokenConfig;

/// Known tokens plus decimals learned from mint accounts at runtime.
#[derive(Clone, Default)]
pub struct TokenRegistry {
    decimals: Arc<DashMap<Pubkey, u8>>,
    symbols: Arc<DashMap<String, Pubkey>>,
}

impl TokenRegistry {
    /// Seed with wrapped SOL, the configured USDC mint, and the configured token list.
    pub fn new(usdc_mint: Pubkey, tokens: &[TokenConfig]) -> Self {
        let registry = Self::default();
        registry.insert("SOL", spl_token::native_mint::id(), 9);
        registry.insert("USDC", usdc_mint, 6);

        for token in tokens {
            match Pubkey::from_str(&token.mint) {
                Ok(mint) => registry.insert(&token.symbol, mint, token.decimals),
                Err(_) => tracing::warn!(symbol = %token.symbol, "Skipping token with invalid mint"),
            }
        }
        registry
    }

    fn insert(&self, symbol: &str, mint: Pubkey, decimals: u8) {
        self.symbols.insert(symbol.to_uppercase(), mint);
        self.decimals.insert(mint, decimals);
    }

    /// Resolve a symbol (case-insensitive) or a base58 mint.
    pub fn resolve(&self, symbol_or_mint: &str) -> Option<Pubkey> {
        if let Some(mint) = self.symbols.get(&symbol_or_mint.to_uppercase()) {
            return Some(*mint);
        }
        Pubkey::from_str(symbol_or_mint).ok()
    }

    pub fn symbol_of(&self, mint: &Pubkey) -> Option<String> {
        self.symbols
            .iter()
            .find(|entry| entry.value() == mint)
            .map(|entry| entry.key().clone())
    }

    pub fn decimals(&self, mint: &Pubkey) -> Option<u8> {
        self.decimals.get(mint).map(|d| *d)
    }

    /// Cache decimals read from a mint account.
    pub fn remember_decimals(&self, mint: Pubkey, decimals: u8) {
        self.decimals.insert(mint, decimals);
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("known_mints", &self.decimals.len())
            .finish()
    }
}
