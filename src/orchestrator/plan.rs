//! Transaction plans.
//!
//! A plan collects every instruction of one action so the action lands in a
//! single transaction. Account creations are keyed by address: scheduling the
//! same account twice is a no-op.

use std::collections::HashSet;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use crate::config::schema::ComputeBudget;
use crate::orchestrator::budget::budget_instructions;

#[derive(Default)]
pub struct TxPlan {
    budget: Option<ComputeBudget>,
    instructions: Vec<Instruction>,
    created: Vec<Pubkey>,
    scheduled: HashSet<Pubkey>,
    signers: Vec<Keypair>,
}

impl TxPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: Option<ComputeBudget>) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    pub fn is_scheduled(&self, address: &Pubkey) -> bool {
        self.scheduled.contains(address)
    }

    /// Append a creation for `address` unless one is already planned.
    /// Returns whether the instruction was added.
    pub fn schedule_creation(&mut self, address: Pubkey, instruction: Instruction) -> bool {
        if !self.scheduled.insert(address) {
            return false;
        }
        self.created.push(address);
        self.instructions.push(instruction);
        true
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Co-signer besides the wallet, e.g. a fresh mint keypair.
    pub fn add_signer(&mut self, keypair: Keypair) {
        self.signers.push(keypair);
    }

    /// Addresses this plan creates, in order.
    pub fn creations(&self) -> &[Pubkey] {
        &self.created
    }

    /// Final instruction list: budget first, then everything in plan order.
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut out = Vec::with_capacity(self.instructions.len() + 2);
        if let Some(budget) = &self.budget {
            out.extend(budget_instructions(budget));
        }
        out.extend(self.instructions.iter().cloned());
        out
    }

    pub fn signers(&self) -> Vec<&Keypair> {
        self.signers.iter().collect()
    }
}

impl std::fmt::Debug for TxPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPlan")
            .field("budget", &self.budget)
            .field("instructions", &self.instructions.len())
            .field("creations", &self.created)
            .field("extra_signers", &self.signers.len())
            .finish()
    }
}
