//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → OrchestratorConfig (validated, immutable)
//!     → handed to FundService, clients and the CLI
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No addresses of real wallets are baked in; manager and treasury must be configured

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::OrchestratorConfig;
pub use schema::{
    AggregatorConfig, BackendConfig, BudgetConfig, ComputeBudget, ProgramConfig, RetryConfig,
    RpcConfig, TokenConfig,
};
