//! Orchestrator error taxonomy.

use thiserror::Error;

use crate::blockchain::types::ChainError;
use crate::blockchain::units::UnitsError;
use crate::bookkeeping::BackendError;
use crate::quoting::AggregatorError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A prerequisite is missing or conflicting.
    #[error("Setup error: {0}")]
    Setup(String),

    /// The swap aggregator failed, had no route, or kept failing past the retry policy.
    #[error("External service error: {0}")]
    External(#[from] AggregatorError),

    /// Simulation or execution failure with the raw program logs.
    #[error("Program error: {message}")]
    Program { message: String, logs: Vec<String> },

    /// Sign-in failed even after refreshing the session.
    #[error("Session error: {0}")]
    Session(#[from] BackendError),

    #[error("Chain error: {0}")]
    Chain(ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid amount: {0}")]
    Amount(#[from] UnitsError),
}

impl OrchestratorError {
    pub fn setup(message: impl Into<String>) -> Self {
        OrchestratorError::Setup(message.into())
    }

    /// Program logs attached to the error, empty if none.
    pub fn logs(&self) -> &[String] {
        match self {
            OrchestratorError::Program { logs, .. } => logs,
            _ => &[],
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::Setup(_) => "setup",
            OrchestratorError::External(_) => "external",
            OrchestratorError::Program { .. } => "program",
            OrchestratorError::Session(_) => "session",
            OrchestratorError::Chain(_) => "chain",
            OrchestratorError::Config(_) => "config",
            OrchestratorError::Amount(_) => "amount",
        }
    }
}

impl From<ChainError> for OrchestratorError {
    fn from(error: ChainError) -> Self {
        match error {
            ChainError::Program { message, logs } => OrchestratorError::Program { message, logs },
            ChainError::InvalidSeed(message) => OrchestratorError::Setup(message),
            ChainError::AccountInUse { message, logs } => OrchestratorError::Program { message, logs },
            other => OrchestratorError::Chain(other),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
