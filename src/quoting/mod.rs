//! Swap quoting subsystem.
//!
//! # Data Flow
//! ```text
//! QuoteRequest (input mint, output mint, base units)
//!     → client.rs (GET /quote with retry policy)
//!     → Quote (typed fields + verbatim remainder)
//!     → client.rs (POST /swap-instructions)
//!     → SwapInstructions
//!     → signers.rs (downgrade foreign signer flags before splicing)
//! ```
//!
//! # Design Decisions
//! - The aggregator sits behind a trait so flows are testable without HTTP
//! - Token decimals are cached in a concurrent map, seeded from config

pub mod client;
pub mod signers;
pub mod tokens;
pub mod types;

pub use client::JupiterClient;
pub use tokens::TokenRegistry;
pub use types::{AggregatorError, AggregatorResult, Quote, QuoteRequest, SwapInstructions, SwapRequest};

/// Quote and swap-instruction source.
#[allow(async_fn_in_trait)]
pub trait SwapAggregator {
    /// Best route for the request. Errors if no route exists.
    async fn quote(&self, request: &QuoteRequest) -> AggregatorResult<Quote>;

    /// Executable instructions for a previously fetched quote.
    async fn swap_instructions(&self, request: &SwapRequest) -> AggregatorResult<SwapInstructions>;
}
