//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that addresses are base58 pubkeys and URLs parse
//! - Validate value ranges (timeouts > 0, budgets within runtime limits)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OrchestratorConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::config::schema::{ComputeBudget, OrchestratorConfig};

/// Runtime ceiling for compute units per transaction.
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &OrchestratorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "rpc.url", &config.rpc.url);
    for (i, url) in config.rpc.failover_urls.iter().enumerate() {
        check_url(&mut errors, &format!("rpc.failover_urls[{}]", i), url);
    }
    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.timeout_secs", "must be > 0"));
    }
    if config.rpc.poll_interval_ms == 0 {
        errors.push(ValidationError::new("rpc.poll_interval_ms", "must be > 0"));
    }
    if config.rpc.confirm_timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.confirm_timeout_secs", "must be > 0"));
    }
    if !matches!(config.rpc.commitment.as_str(), "processed" | "confirmed" | "finalized") {
        errors.push(ValidationError::new(
            "rpc.commitment",
            format!("unknown commitment '{}'", config.rpc.commitment),
        ));
    }

    check_pubkey(&mut errors, "program.program_id", &config.program.program_id);
    check_pubkey(&mut errors, "program.manager_address", &config.program.manager_address);
    check_pubkey(&mut errors, "program.treasury_address", &config.program.treasury_address);
    check_pubkey(&mut errors, "program.usdc_mint", &config.program.usdc_mint);
    check_pubkey(&mut errors, "program.jupiter_program_id", &config.program.jupiter_program_id);

    check_url(&mut errors, "aggregator.base_url", &config.aggregator.base_url);
    if config.aggregator.slippage_bps > 10_000 {
        errors.push(ValidationError::new("aggregator.slippage_bps", "must be <= 10000"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be >= 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    check_budget(&mut errors, "budget.deposit", &config.budget.deposit);
    check_budget(&mut errors, "budget.redeem", &config.budget.redeem);
    check_budget(&mut errors, "budget.trade", &config.budget.trade);
    check_budget(&mut errors, "budget.swap", &config.budget.swap);
    if let Some(admin) = &config.budget.admin {
        check_budget(&mut errors, "budget.admin", admin);
    }

    if config.backend.enabled {
        check_url(&mut errors, "backend.base_url", &config.backend.base_url);
    }

    let mut symbols = HashSet::new();
    for (i, token) in config.tokens.iter().enumerate() {
        check_pubkey(&mut errors, &format!("tokens[{}].mint", i), &token.mint);
        if !symbols.insert(token.symbol.to_uppercase()) {
            errors.push(ValidationError::new(
                format!("tokens[{}].symbol", i),
                format!("duplicate symbol '{}'", token.symbol),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

fn check_pubkey(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::new(field, "must be set"));
    } else if Pubkey::from_str(value).is_err() {
        errors.push(ValidationError::new(field, format!("invalid address '{}'", value)));
    }
}

fn check_budget(errors: &mut Vec<ValidationError>, field: &str, budget: &ComputeBudget) {
    if budget.unit_limit == 0 || budget.unit_limit > MAX_COMPUTE_UNIT_LIMIT {
        errors.push(ValidationError::new(
            format!("{}.unit_limit", field),
            format!("must be within 1..={}", MAX_COMPUTE_UNIT_LIMIT),
        ));
    }
}
