//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Idempotent external call (quote, swap-instructions, RPC read):
//!     → timeouts.rs (enforce a deadline per call)
//!     → On failure: retries.rs (check if retryable, retry with backoff)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Only idempotent steps retry; transaction submission never does
//! - Retryable statuses are configuration, not code

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
