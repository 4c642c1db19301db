//! Fund program interface.
//!
//! # Data Flow
//! ```text
//! Orchestrator intent
//!     → instructions.rs (Anchor discriminator + borsh args, fixed account order)
//!     → tokens.rs (SPL mint / associated token account setup)
//!
//! Account data from the ledger
//!     → accounts.rs (FundDetails decoding, deposit aggregation)
//! ```
//!
//! # Design Decisions
//! - Account orders mirror the program's account structs; remaining accounts
//!   (aggregator route) are appended last
//! - Pubkeys are encoded as raw 32-byte arrays in borsh payloads

pub mod accounts;
pub mod instructions;
pub mod tokens;

pub use accounts::{summarize_deposits, DepositorTotal, FundDetails, FundStatus, UserDeposit};
pub use instructions::FundProgram;
