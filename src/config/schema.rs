//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the fund
//! orchestrator. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a minimal file works.

use serde::{Deserialize, Serialize};

/// Mainnet USDC mint.
pub const DEFAULT_USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Jupiter v6 aggregator program.
pub const DEFAULT_JUPITER_PROGRAM_ID: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";

/// Deployed fund program.
pub const DEFAULT_PROGRAM_ID: &str = "6Trk4KwsUJztAXAuHrPrp66VL8zW9Amru9jcehzTBfNB";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// JSON-RPC endpoints and confirmation settings.
    pub rpc: RpcConfig,

    /// Fund program addresses and well-known accounts.
    pub program: ProgramConfig,

    /// Swap aggregator settings.
    pub aggregator: AggregatorConfig,

    /// Retry policy for idempotent external calls.
    pub retries: RetryConfig,

    /// Compute budget per action.
    pub budget: BudgetConfig,

    /// Trade guard settings.
    pub trade: TradeConfig,

    /// Signing wallet.
    pub wallet: WalletConfig,

    /// Off-chain bookkeeping API.
    pub backend: BackendConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Known tokens (symbol, mint, decimals).
    pub tokens: Vec<TokenConfig>,
}

/// Blockchain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Primary RPC endpoint URL.
    pub url: String,

    /// Fallback RPC endpoints, tried in order.
    pub failover_urls: Vec<String>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Commitment level: processed, confirmed or finalized.
    pub commitment: String,

    /// Skip preflight simulation when sending.
    pub skip_preflight: bool,

    /// RPC node side send retries. The orchestrator never re-submits itself.
    pub max_send_retries: usize,

    /// Maximum time to wait for confirmation.
    pub confirm_timeout_secs: u64,

    /// Interval between signature status polls.
    pub poll_interval_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            failover_urls: Vec::new(),
            timeout_secs: 30,
            commitment: "confirmed".to_string(),
            skip_preflight: false,
            max_send_retries: 3,
            confirm_timeout_secs: 60,
            poll_interval_ms: 500,
        }
    }
}

/// Fund program and well-known account addresses (base58).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Fund program id.
    pub program_id: String,

    /// Platform manager wallet whose `fund_manager` PDA collects fees.
    pub manager_address: String,

    /// Destination for `withdraw-all` and `drain-all`.
    pub treasury_address: String,

    /// USDC mint used for fund-side swaps.
    pub usdc_mint: String,

    /// Aggregator program passed to trade instructions.
    pub jupiter_program_id: String,

    /// Decimals of fund tokens minted on creation.
    pub fund_token_decimals: u8,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            manager_address: String::new(),
            treasury_address: String::new(),
            usdc_mint: DEFAULT_USDC_MINT.to_string(),
            jupiter_program_id: DEFAULT_JUPITER_PROGRAM_ID.to_string(),
            fund_token_decimals: 9,
        }
    }
}

/// Swap aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// API base URL.
    pub base_url: String,

    /// Slippage tolerance in basis points.
    pub slippage_bps: u16,

    /// DEX labels excluded from routing.
    pub exclude_dexes: Vec<String>,

    /// Request legacy (non-versioned) transaction layouts.
    pub as_legacy_transaction: bool,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://quote-api.jup.ag/v6".to_string(),
            slippage_bps: 150,
            exclude_dexes: vec!["Obric V2".to_string(), "obric".to_string()],
            as_legacy_transaction: true,
            request_timeout_secs: 15,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff (milliseconds).
    pub base_delay_ms: u64,

    /// Maximum delay between retries (milliseconds).
    pub max_delay_ms: u64,

    /// HTTP statuses that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Compute unit limit and priority price for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ComputeBudget {
    /// Compute unit limit.
    pub unit_limit: u32,

    /// Priority fee in micro-lamports per compute unit.
    pub unit_price_micro_lamports: u64,
}

impl ComputeBudget {
    pub const fn new(unit_limit: u32, unit_price_micro_lamports: u64) -> Self {
        Self {
            unit_limit,
            unit_price_micro_lamports,
        }
    }
}

/// Per-action compute budgets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub deposit: ComputeBudget,
    pub redeem: ComputeBudget,
    pub trade: ComputeBudget,
    /// USDC to SOL swaps and swap-backed redemptions.
    pub swap: ComputeBudget,
    /// Administrative calls (init, withdraw, drain). `None` sends no budget instructions.
    pub admin: Option<ComputeBudget>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            deposit: ComputeBudget::new(400_000, 10_000),
            redeem: ComputeBudget::new(400_000, 10_000),
            trade: ComputeBudget::new(1_400_000, 20_000),
            swap: ComputeBudget::new(1_400_000, 1_000_000),
            admin: None,
        }
    }
}

/// Trade guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Lamports kept in the vault on top of the traded amount and WSOL rent.
    pub vault_buffer_lamports: u64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            vault_buffer_lamports: 100_000,
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Path to a Solana CLI keypair file (JSON byte array).
    pub keypair_path: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: "~/.config/solana/id.json".to_string(),
        }
    }
}

/// Bookkeeping API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Record actions with the bookkeeping API.
    pub enabled: bool,

    /// API base URL.
    pub base_url: String,

    /// Message signed to obtain an auth token.
    pub login_message: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:5000/api".to_string(),
            login_message: "This is to sign and verify your wallet connection!".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A token the orchestrator can quote without looking up its mint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenConfig {
    pub symbol: String,
    pub mint: String,
    pub decimals: u8,
}
