//! Fund program account decoding.

use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_sdk::hash::hash;
use solana_sdk::pubkey::Pubkey;

use crate::blockchain::types::{ChainError, ChainResult};

/// Anchor account discriminator.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = hash(format!("account:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.to_bytes()[..8]);
    out
}

#[derive(BorshSerialize, BorshDeserialize)]
struct RawUserDeposit {
    user: [u8; 32],
    deposit_amount: u64,
    fund_id: [u8; 32],
}

#[derive(BorshSerialize, BorshDeserialize)]
struct RawFundDetails {
    authority: [u8; 32],
    fund_token_mint: [u8; 32],
    tokens_minted: u64,
    start_time: i64,
    fund_id: [u8; 32],
    fund_name: [u8; 10],
    description: [u8; 32],
    invest_threshold: u64,
    total_deposit: u64,
    current_fund_token: u64,
    current_deposit: u64,
    user_deposits: Vec<RawUserDeposit>,
    status: u8,
}

/// Lifecycle stage stored in the fund account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FundStatus {
    Fundraising,
    Trading,
    Expired,
    Unknown(u8),
}

impl From<u8> for FundStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => FundStatus::Fundraising,
            1 => FundStatus::Trading,
            2 => FundStatus::Expired,
            other => FundStatus::Unknown(other),
        }
    }
}

impl From<FundStatus> for u8 {
    fn from(status: FundStatus) -> Self {
        match status {
            FundStatus::Fundraising => 0,
            FundStatus::Trading => 1,
            FundStatus::Expired => 2,
            FundStatus::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeposit {
    pub user: Pubkey,
    pub deposit_amount: u64,
    pub fund_id: String,
}

/// Decoded `FundDetails` account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundDetails {
    pub authority: Pubkey,
    pub fund_token_mint: Pubkey,
    pub tokens_minted: u64,
    pub start_time: i64,
    pub fund_id: String,
    pub fund_name: String,
    pub description: String,
    pub invest_threshold: u64,
    pub total_deposit: u64,
    pub current_fund_token: u64,
    pub current_deposit: u64,
    pub user_deposits: Vec<UserDeposit>,
    pub status: FundStatus,
}

impl FundDetails {
    pub const ACCOUNT_NAME: &'static str = "FundDetails";

    /// Decode account data. Trailing bytes past the borsh payload are ignored.
    pub fn decode(data: &[u8]) -> ChainResult<Self> {
        if data.len() < 8 || data[..8] != account_discriminator(Self::ACCOUNT_NAME) {
            return Err(ChainError::AccountData(
                "not a FundDetails account".to_string(),
            ));
        }
        let mut payload = &data[8..];
        let raw = RawFundDetails::deserialize(&mut payload)
            .map_err(|e| ChainError::AccountData(format!("FundDetails: {}", e)))?;

        Ok(Self {
            authority: Pubkey::new_from_array(raw.authority),
            fund_token_mint: Pubkey::new_from_array(raw.fund_token_mint),
            tokens_minted: raw.tokens_minted,
            start_time: raw.start_time,
            fund_id: trim_padded(&raw.fund_id),
            fund_name: trim_padded(&raw.fund_name),
            description: trim_padded(&raw.description),
            invest_threshold: raw.invest_threshold,
            total_deposit: raw.total_deposit,
            current_fund_token: raw.current_fund_token,
            current_deposit: raw.current_deposit,
            user_deposits: raw
                .user_deposits
                .into_iter()
                .map(|d| UserDeposit {
                    user: Pubkey::new_from_array(d.user),
                    deposit_amount: d.deposit_amount,
                    fund_id: trim_padded(&d.fund_id),
                })
                .collect(),
            status: FundStatus::from(raw.status),
        })
    }

    /// Encode as account data, discriminator included.
    pub fn encode(&self) -> ChainResult<Vec<u8>> {
        let raw = RawFundDetails {
            authority: self.authority.to_bytes(),
            fund_token_mint: self.fund_token_mint.to_bytes(),
            tokens_minted: self.tokens_minted,
            start_time: self.start_time,
            fund_id: pad_bytes(&self.fund_id),
            fund_name: pad_bytes(&self.fund_name),
            description: pad_bytes(&self.description),
            invest_threshold: self.invest_threshold,
            total_deposit: self.total_deposit,
            current_fund_token: self.current_fund_token,
            current_deposit: self.current_deposit,
            user_deposits: self
                .user_deposits
                .iter()
                .map(|d| RawUserDeposit {
                    user: d.user.to_bytes(),
                    deposit_amount: d.deposit_amount,
                    fund_id: pad_bytes(&d.fund_id),
                })
                .collect(),
            status: self.status.into(),
        };
        let mut data = account_discriminator(Self::ACCOUNT_NAME).to_vec();
        raw.serialize(&mut data)
            .map_err(|e| ChainError::Encoding(format!("FundDetails: {}", e)))?;
        Ok(data)
    }
}

/// Per-depositor totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositorTotal {
    pub user: Pubkey,
    pub deposits: usize,
    pub total: u64,
}

/// Aggregate deposits by user, in order of first deposit.
pub fn summarize_deposits(deposits: &[UserDeposit]) -> Vec<DepositorTotal> {
    let mut index: HashMap<Pubkey, usize> = HashMap::new();
    let mut totals: Vec<DepositorTotal> = Vec::new();

    for deposit in deposits {
        match index.get(&deposit.user) {
            Some(&i) => {
                totals[i].deposits += 1;
                totals[i].total = totals[i].total.saturating_add(deposit.deposit_amount);
            }
            None => {
                index.insert(deposit.user, totals.len());
                totals.push(DepositorTotal {
                    user: deposit.user,
                    deposits: 1,
                    total: deposit.deposit_amount,
                });
            }
        }
    }
    totals
}

/// Fixed-size field as text, without NUL or space padding.
fn trim_padded(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

fn pad_bytes<const N: usize>(value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = value.as_bytes();
    let len = bytes.len().min(N);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FundDetails {
        let depositor = Pubkey::new_unique();
        FundDetails {
            authority: Pubkey::new_unique(),
            fund_token_mint: Pubkey::new_unique(),
            tokens_minted: 5,
            start_time: 1_730_000_000,
            fund_id: "17300000000001234".to_string(),
            fund_name: "Alpha".to_string(),
            description: "Momentum basket".to_string(),
            invest_threshold: 10_000_000_000,
            total_deposit: 30,
            current_fund_token: 5,
            current_deposit: 30,
            user_deposits: vec![
                UserDeposit { user: depositor, deposit_amount: 10, fund_id: "17300000000001234".to_string() },
                UserDeposit { user: Pubkey::new_unique(), deposit_amount: 5, fund_id: "17300000000001234".to_string() },
                UserDeposit { user: depositor, deposit_amount: 15, fund_id: "17300000000001234".to_string() },
            ],
            status: FundStatus::Trading,
        }
    }

    #[test]
    fn test_decode_ignores_trailing_space() {
        let fund = sample();
        let mut data = fund.encode().unwrap();
        data.extend_from_slice(&[0u8; 64]);
        assert_eq!(FundDetails::decode(&data).unwrap(), fund);
    }

    #[test]
    fn test_layout_offsets() {
        let fund = sample();
        let data = fund.encode().unwrap();
        assert_eq!(&data[8..40], fund.authority.as_ref());
        assert_eq!(&data[40..72], fund.fund_token_mint.as_ref());
        // fund_name starts after two u64/i64 fields and the 32-byte id
        assert_eq!(&data[120..130], b"Alpha\0\0\0\0\0");
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let mut data = sample().encode().unwrap();
        data[0] ^= 0xff;
        assert!(matches!(FundDetails::decode(&data), Err(ChainError::AccountData(_))));
        assert!(FundDetails::decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_summarize_deposits() {
        let fund = sample();
        let totals = summarize_deposits(&fund.user_deposits);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].user, fund.user_deposits[0].user);
        assert_eq!(totals[0].deposits, 2);
        assert_eq!(totals[0].total, 25);
        assert_eq!(totals[1].total, 5);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(FundStatus::from(0), FundStatus::Fundraising);
        assert_eq!(FundStatus::from(9), FundStatus::Unknown(9));
        assert_eq!(u8::from(FundStatus::Expired), 2);
    }
}
