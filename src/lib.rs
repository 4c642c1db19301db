//! Fund platform transaction orchestrator.
//!
//! Drives an Anchor fund program on Solana: derives program addresses,
//! assembles atomic multi-instruction transactions, splices Jupiter swap
//! routes into program calls, and records confirmed actions with an
//! off-chain bookkeeping API.

pub mod blockchain;
pub mod bookkeeping;
pub mod config;
pub mod observability;
pub mod orchestrator;
pub mod program;
pub mod quoting;
pub mod resilience;

pub use config::schema::OrchestratorConfig;
pub use orchestrator::{FundService, OrchestratorError};
