//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (RPC URLs, keypair path)
//!     → wallet.rs (key loading, signing)
//!     → pda.rs (deterministic program addresses)
//!     → client.rs (RPC connection with timeouts and failover, implements ledger.rs)
//!     → transaction.rs (sign, submit once, confirm)
//! ```
//!
//! # Security Constraints
//! - Keys only from a keypair file named by config or environment
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod ledger;
pub mod pda;
pub mod transaction;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::BlockchainClient;
pub use ledger::Ledger;
pub use pda::ProgramAddresses;
pub use transaction::{ConfirmSettings, TxSender};
pub use types::{ChainError, ChainResult, ConfirmationStatus};
pub use wallet::Wallet;
