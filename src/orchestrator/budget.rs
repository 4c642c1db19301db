//! Compute budget instructions.

use solana_sdk::compute_budget::{self, ComputeBudgetInstruction};
use solana_sdk::instruction::Instruction;

use crate::config::schema::ComputeBudget;

/// `SetComputeUnitLimit` followed by `SetComputeUnitPrice`.
pub fn budget_instructions(budget: &ComputeBudget) -> [Instruction; 2] {
    [
        ComputeBudgetInstruction::set_compute_unit_limit(budget.unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(budget.unit_price_micro_lamports),
    ]
}

/// Whether an instruction targets the compute budget program.
///
/// Aggregator responses carry their own budget instructions; a transaction
/// may hold only one of each, so those are dropped in favour of ours.
pub fn is_budget_instruction(instruction: &Instruction) -> bool {
    instruction.program_id == compute_budget::id()
}
