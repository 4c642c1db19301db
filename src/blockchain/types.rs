//! Chain-specific types and error definitions.

use thiserror::Error;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not confirmed within the configured wait.
    #[error("Transaction {signature} not confirmed after {timeout_secs} seconds")]
    ConfirmationTimeout { signature: String, timeout_secs: u64 },

    /// The blockhash expired before the transaction landed.
    #[error("Transaction {0} expired before confirmation")]
    BlockhashExpired(String),

    /// An account the transaction tried to create already exists.
    #[error("Account already in use: {message}")]
    AccountInUse { message: String, logs: Vec<String> },

    /// Simulation or execution failure. Logs are the raw program logs, if any.
    #[error("Program error: {message}")]
    Program { message: String, logs: Vec<String> },

    /// Invalid keypair or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Seed too long or no valid bump for a derived address.
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Account exists but its data could not be decoded.
    #[error("Account data error: {0}")]
    AccountData(String),

    /// Instruction arguments could not be encoded.
    #[error("Instruction encoding error: {0}")]
    Encoding(String),
}

impl ChainError {
    /// Classify a failed simulation or execution.
    ///
    /// "already in use" failures become [`ChainError::AccountInUse`] so setup
    /// steps can recover; everything else is a program error. Both keep the logs.
    pub fn program_failure(message: impl Into<String>, logs: Vec<String>) -> Self {
        let message = message.into();
        let in_use = message.contains("already in use")
            || logs.iter().any(|line| line.contains("already in use"));
        if in_use {
            ChainError::AccountInUse { message, logs }
        } else {
            ChainError::Program { message, logs }
        }
    }

    /// Program logs attached to this error, empty if none.
    pub fn logs(&self) -> &[String] {
        match self {
            ChainError::Program { logs, .. } | ChainError::AccountInUse { logs, .. } => logs,
            _ => &[],
        }
    }
}

/// Result type for blockchain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Not yet seen at the configured commitment.
    Pending,
    /// Landed and reached the configured commitment.
    Confirmed,
    /// Landed and failed.
    Failed(String),
}
