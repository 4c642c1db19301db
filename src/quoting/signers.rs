//! Signer-flag rewriting for spliced aggregator instructions.
//!
//! The aggregator builds swaps for a user wallet signing directly. When the
//! swap runs through the fund program, accounts such as the program
//! authority appear as signers even though only the program can sign for
//! them via CPI. Any signer that is not the active wallet is downgraded.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

/// Downgrade every signer that is not `wallet`. Wallet entries are left untouched.
pub fn rewrite_signers(metas: Vec<AccountMeta>, wallet: &Pubkey) -> Vec<AccountMeta> {
    let mut downgraded = 0usize;
    let rewritten = metas
        .into_iter()
        .map(|mut meta| {
            if meta.is_signer && meta.pubkey != *wallet {
                meta.is_signer = false;
                downgraded += 1;
            }
            meta
        })
        .collect();

    if downgraded > 0 {
        tracing::debug!(downgraded, "Downgraded aggregator signer flags");
    }
    rewritten
}

/// [`rewrite_signers`] applied to a whole instruction.
pub fn rewrite_instruction(mut instruction: Instruction, wallet: &Pubkey) -> Instruction {
    instruction.accounts = rewrite_signers(std::mem::take(&mut instruction.accounts), wallet);
    instruction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_signers_downgraded() {
        let wallet = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let pool = Pubkey::new_unique();

        let metas = vec![
            AccountMeta::new(wallet, true),
            AccountMeta::new(authority, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new_readonly(authority, true),
        ];
        let rewritten = rewrite_signers(metas.clone(), &wallet);

        assert_eq!(rewritten[0], metas[0]);
        assert!(!rewritten[1].is_signer);
        assert!(rewritten[1].is_writable);
        assert_eq!(rewritten[2], metas[2]);
        assert!(!rewritten[3].is_signer);
        assert!(rewritten.iter().filter(|m| m.is_signer).all(|m| m.pubkey == wallet));
    }

    #[test]
    fn test_wallet_non_signer_entry_untouched() {
        let wallet = Pubkey::new_unique();
        let metas = vec![AccountMeta::new_readonly(wallet, false)];
        assert_eq!(rewrite_signers(metas.clone(), &wallet), metas);
    }

    #[test]
    fn test_rewrite_instruction_keeps_data() {
        let wallet = Pubkey::new_unique();
        let ix = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new(Pubkey::new_unique(), true)],
            data: vec![9, 9],
        };
        let rewritten = rewrite_instruction(ix.clone(), &wallet);
        assert_eq!(rewritten.data, ix.data);
        assert_eq!(rewritten.program_id, ix.program_id);
        assert!(!rewritten.accounts[0].is_signer);
    }
}
