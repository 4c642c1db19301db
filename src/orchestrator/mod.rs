//! Transaction orchestration.
//!
//! # Data Flow
//! ```text
//! FundService operation
//!     → setup.rs (existence checks, creations scheduled once per address)
//!     → plan.rs (one atomic instruction list + extra signers)
//!     → budget.rs (compute unit limit and price first)
//!     → blockchain::TxSender (sign, submit, confirm)
//!     → receipt.rs (typed result, bookkeeping outcome)
//! ```
//!
//! # Design Decisions
//! - The service is generic over the ledger, aggregator and bookkeeper so
//!   every flow runs against in-memory fakes in tests
//! - Money-moving transactions are submitted once; only reads and quotes retry

pub mod budget;
pub mod error;
pub mod plan;
pub mod receipt;
pub mod service;
pub mod setup;

pub use error::{OrchestratorError, OrchestratorResult};
pub use plan::TxPlan;
pub use receipt::{
    ActionKind, ActionReceipt, BalanceReport, DepositorReport, FundCreated, FundReport, ManagerAccount,
    RecordOutcome,
};
pub use service::{generate_fund_id, CreateFundParams, FundService};
