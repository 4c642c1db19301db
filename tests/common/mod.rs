//! Shared fakes for the orchestrator integration tests.
//!
//! - [`MockLedger`]: in-memory accounts that apply a transaction all-or-nothing
//! - [`MockAggregator`]: scripted quotes and swap instructions
//! - [`MockBookkeeper`]: recording API with accept / fail / stale-token modes
//! - [`start_programmable_backend`]: raw TCP HTTP server for client tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use borsh::BorshDeserialize;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::rent::Rent;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;
use solana_sdk::{compute_budget, system_program};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use fund_orchestrator::blockchain::pda::associated_token_address;
use fund_orchestrator::blockchain::{ChainError, ChainResult, Ledger, ProgramAddresses, Wallet};
use fund_orchestrator::bookkeeping::{
    AuthSession, BackendError, BackendResult, Bookkeeper, FundRecord, LedgerEntry, LoginGrant, LoginRequest,
    TradeRecord,
};
use fund_orchestrator::config::schema::{DEFAULT_JUPITER_PROGRAM_ID, DEFAULT_PROGRAM_ID};
use fund_orchestrator::orchestrator::FundService;
use fund_orchestrator::program::accounts::account_discriminator;
use fund_orchestrator::program::instructions::sighash;
use fund_orchestrator::program::tokens::{MINT_ACCOUNT_LEN, TOKEN_ACCOUNT_LEN};
use fund_orchestrator::program::{FundDetails, FundStatus, UserDeposit};
use fund_orchestrator::quoting::types::{ApiAccountMeta, ApiInstruction};
use fund_orchestrator::quoting::{
    AggregatorError, AggregatorResult, Quote, QuoteRequest, SwapAggregator, SwapInstructions, SwapRequest,
};
use fund_orchestrator::OrchestratorConfig;

pub type TestService = FundService<MockLedger, MockAggregator, MockBookkeeper>;

pub fn program_id() -> Pubkey {
    Pubkey::from_str(DEFAULT_PROGRAM_ID).unwrap()
}

pub fn jupiter_program_id() -> Pubkey {
    Pubkey::from_str(DEFAULT_JUPITER_PROGRAM_ID).unwrap()
}

pub fn addresses() -> ProgramAddresses {
    ProgramAddresses::new(program_id())
}

/// Config with manager and treasury set and fast confirmation polling.
pub fn test_config(manager: &Pubkey, treasury: &Pubkey) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.program.manager_address = manager.to_string();
    config.program.treasury_address = treasury.to_string();
    config.rpc.confirm_timeout_secs = 5;
    config.rpc.poll_interval_ms = 5;
    config
}

/// A service over fresh fakes. Returns the service, the manager and the treasury.
pub fn build_service(
    wallet: Keypair,
    ledger: MockLedger,
    aggregator: MockAggregator,
    bookkeeper: Option<MockBookkeeper>,
) -> (TestService, Pubkey, Pubkey) {
    build_service_with(wallet, ledger, aggregator, bookkeeper, |_| {})
}

/// [`build_service`] with a config tweak applied before construction.
pub fn build_service_with(
    wallet: Keypair,
    ledger: MockLedger,
    aggregator: MockAggregator,
    bookkeeper: Option<MockBookkeeper>,
    edit: impl FnOnce(&mut OrchestratorConfig),
) -> (TestService, Pubkey, Pubkey) {
    let manager = Pubkey::new_unique();
    let treasury = Pubkey::new_unique();
    let mut config = test_config(&manager, &treasury);
    edit(&mut config);
    let service = FundService::new(
        config,
        Wallet::from_keypair(wallet),
        ledger,
        aggregator,
        bookkeeper,
    )
    .unwrap();
    (service, manager, treasury)
}

/// Store a fund account and its token account. Returns (fund address, fund token mint).
pub fn seed_fund(ledger: &MockLedger, fund_id: &str, creator: &Pubkey, target: u64) -> (Pubkey, Pubkey) {
    let (address, details) = seed_fund_with(ledger, fund_id, creator, |fund| fund.tokens_minted = target).unwrap();
    (address, details.fund_token_mint)
}

/// Store a fund account after letting `edit` adjust the defaults.
pub fn seed_fund_with(
    ledger: &MockLedger,
    fund_id: &str,
    creator: &Pubkey,
    edit: impl FnOnce(&mut FundDetails),
) -> ChainResult<(Pubkey, FundDetails)> {
    let address = addresses().fund_details(fund_id, creator)?;
    let mint = Pubkey::new_unique();
    let mut details = FundDetails {
        authority: *creator,
        fund_token_mint: mint,
        tokens_minted: 10_000_000_000,
        start_time: 1_730_000_000,
        fund_id: fund_id.to_string(),
        fund_name: "Alpha".to_string(),
        description: "Test fund".to_string(),
        invest_threshold: 0,
        total_deposit: 0,
        current_fund_token: 0,
        current_deposit: 0,
        user_deposits: Vec::new(),
        status: FundStatus::Fundraising,
    };
    edit(&mut details);

    ledger.insert_account(address, program_account(details.encode()?));
    ledger.insert_account(
        associated_token_address(&address, &details.fund_token_mint),
        token_account(),
    );
    Ok((address, details))
}

/// Store the fee account of `owner`, as `initialize` would. Returns its address.
pub fn seed_manager_account(ledger: &MockLedger, owner: &Pubkey) -> Pubkey {
    let address = addresses().manager(owner).unwrap();
    ledger.insert_account(address, manager_account(owner));
    address
}

/// Fee account data: discriminator then the registered owner.
pub fn manager_account(owner: &Pubkey) -> Account {
    let mut data = account_discriminator("HedgeFundOwner").to_vec();
    data.extend_from_slice(owner.as_ref());
    program_account(data)
}

pub fn program_account(data: Vec<u8>) -> Account {
    Account {
        lamports: Rent::default().minimum_balance(data.len()),
        data,
        owner: program_id(),
        executable: false,
        rent_epoch: 0,
    }
}

pub fn token_account() -> Account {
    Account {
        lamports: Rent::default().minimum_balance(TOKEN_ACCOUNT_LEN),
        data: vec![0; TOKEN_ACCOUNT_LEN],
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// Rebuild instructions from a compiled transaction. Only signer flags are
/// recovered; writability is left false.
pub fn decompile(transaction: &Transaction) -> Vec<Instruction> {
    let message = &transaction.message;
    let keys = &message.account_keys;
    message
        .instructions
        .iter()
        .map(|compiled| Instruction {
            program_id: keys[compiled.program_id_index as usize],
            accounts: compiled
                .accounts
                .iter()
                .map(|&index| AccountMeta {
                    pubkey: keys[index as usize],
                    is_signer: message.is_signer(index as usize),
                    is_writable: false,
                })
                .collect(),
            data: compiled.data.clone(),
        })
        .collect()
}

pub fn is_program_call(instruction: &Instruction, method: &str) -> bool {
    instruction.program_id == program_id() && instruction.data.starts_with(&sighash(method))
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, Account>,
    token_balances: HashMap<Pubkey, u64>,
    /// Exist on-chain but reads miss them, as if created after the check.
    hidden: HashSet<Pubkey>,
    rejected_programs: HashSet<Pubkey>,
    submitted: Vec<Transaction>,
    attempts: usize,
    landed: HashSet<Signature>,
}

/// In-memory ledger. A transaction either applies every instruction or
/// leaves the state untouched.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, address: Pubkey, account: Account) {
        self.state.lock().unwrap().accounts.insert(address, account);
    }

    /// Account that exists but is invisible to reads.
    pub fn insert_hidden(&self, address: Pubkey, account: Account) {
        let mut state = self.state.lock().unwrap();
        state.accounts.insert(address, account);
        state.hidden.insert(address);
    }

    pub fn set_lamports(&self, address: Pubkey, lamports: u64) {
        let mut state = self.state.lock().unwrap();
        let account = state.accounts.entry(address).or_insert_with(|| Account {
            lamports: 0,
            data: Vec::new(),
            owner: system_program::id(),
            executable: false,
            rent_epoch: 0,
        });
        account.lamports = lamports;
    }

    pub fn set_token_balance(&self, address: Pubkey, amount: u64) {
        self.state.lock().unwrap().token_balances.insert(address, amount);
    }

    /// Fail every transaction that calls `program`.
    pub fn reject_program(&self, program: Pubkey) {
        self.state.lock().unwrap().rejected_programs.insert(program);
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.state.lock().unwrap().accounts.get(address).cloned()
    }

    pub fn fund(&self, address: &Pubkey) -> FundDetails {
        FundDetails::decode(&self.account(address).unwrap().data).unwrap()
    }

    pub fn update_fund(&self, address: &Pubkey, edit: impl FnOnce(&mut FundDetails)) {
        let mut fund = self.fund(address);
        edit(&mut fund);
        self.insert_account(*address, program_account(fund.encode().unwrap()));
    }

    /// Transactions that landed, in order.
    pub fn submitted(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Every send, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }
}

fn created(owner: Pubkey, lamports: u64, space: usize) -> Account {
    Account {
        lamports,
        data: vec![0; space],
        owner,
        executable: false,
        rent_epoch: 0,
    }
}

fn in_use(address: &Pubkey) -> ChainError {
    ChainError::program_failure(
        "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x0",
        vec![format!("Allocate: account Address {{ address: {}, base: None }} already in use", address)],
    )
}

fn create(accounts: &mut HashMap<Pubkey, Account>, address: Pubkey, account: Account) -> ChainResult<()> {
    if accounts.contains_key(&address) {
        return Err(in_use(&address));
    }
    accounts.insert(address, account);
    Ok(())
}

fn anchor_error(account: &str, code: &str, number: u32) -> ChainError {
    ChainError::program_failure(
        format!(
            "Transaction simulation failed: Error processing Instruction 0: custom program error: {:#x}",
            number
        ),
        vec![format!(
            "Program log: AnchorError caused by account: {}. Error Code: {}. Error Number: {}.",
            account, code, number
        )],
    )
}

/// The program re-derives `account` from its seeds and rejects any other address.
fn expect_seeds(account: &str, actual: Pubkey, expected: ChainResult<Pubkey>) -> ChainResult<()> {
    if actual == expected? {
        Ok(())
    } else {
        Err(anchor_error(account, "ConstraintSeeds", 2006))
    }
}

fn load_fund(accounts: &HashMap<Pubkey, Account>, address: &Pubkey) -> ChainResult<FundDetails> {
    let account = accounts
        .get(address)
        .ok_or_else(|| anchor_error("fund_details", "AccountNotInitialized", 3012))?;
    FundDetails::decode(&account.data)
}

/// Apply one instruction to a scratch copy of the accounts.
fn apply(accounts: &mut HashMap<Pubkey, Account>, instruction: &Instruction) -> ChainResult<()> {
    let key = |i: usize| instruction.accounts[i].pubkey;
    let rent = Rent::default();

    if instruction.program_id == spl_associated_token_account::id() {
        let idempotent = instruction.data.first() == Some(&1);
        let address = key(1);
        if idempotent && accounts.contains_key(&address) {
            return Ok(());
        }
        return create(
            accounts,
            address,
            created(spl_token::id(), rent.minimum_balance(TOKEN_ACCOUNT_LEN), TOKEN_ACCOUNT_LEN),
        );
    }

    if instruction.program_id == system_program::id() && instruction.data.starts_with(&[0, 0, 0, 0]) {
        // CreateAccount { lamports, space, owner }
        let data = &instruction.data[4..];
        let lamports = u64::from_le_bytes(data[..8].try_into().unwrap());
        let space = u64::from_le_bytes(data[8..16].try_into().unwrap()) as usize;
        let owner = Pubkey::try_from(&data[16..48]).unwrap();
        return create(accounts, key(1), created(owner, lamports, space));
    }

    if instruction.program_id != program_id() {
        return Ok(());
    }

    let (discriminator, args) = instruction.data.split_at(8);
    if discriminator == sighash("initialize") {
        let owner = Pubkey::new_from_array(<[u8; 32]>::try_from_slice(args).unwrap());
        expect_seeds("hedge_fund_owner", key(0), addresses().manager(&owner))?;
        create(accounts, key(0), manager_account(&owner))
    } else if discriminator == sighash("create_fund_token_account") {
        create(
            accounts,
            key(1),
            created(spl_token::id(), rent.minimum_balance(TOKEN_ACCOUNT_LEN), TOKEN_ACCOUNT_LEN),
        )
    } else if discriminator == sighash("create_fund") {
        let (fund_id, target, name, description, threshold) =
            <(String, u64, String, String, u64)>::try_from_slice(args).unwrap();
        let fund = FundDetails {
            authority: key(3),
            fund_token_mint: key(1),
            tokens_minted: target,
            start_time: 1_730_000_000,
            fund_id,
            fund_name: name.trim_end().to_string(),
            description: description.trim_end().to_string(),
            invest_threshold: threshold,
            total_deposit: 0,
            current_fund_token: 0,
            current_deposit: 0,
            user_deposits: Vec::new(),
            status: FundStatus::Fundraising,
        };
        create(accounts, key(0), program_account(fund.encode()?))
    } else if discriminator == sighash("deposit_liquidity") {
        let (amount, fund_id, creator, manager, _tvl) =
            <(u64, String, [u8; 32], [u8; 32], u64)>::try_from_slice(args).unwrap();
        let fund_address = key(0);
        let creator = Pubkey::new_from_array(creator);
        expect_seeds("fund_details", fund_address, addresses().fund_details(&fund_id, &creator))?;
        expect_seeds("fund_vault", key(1), addresses().fund_vault(&fund_id))?;
        expect_seeds("hedge_fund_owner", key(6), addresses().manager(&Pubkey::new_from_array(manager)))?;
        let mut fund = load_fund(accounts, &fund_address)?;
        fund.total_deposit += amount;
        fund.current_deposit += amount;
        fund.user_deposits.push(UserDeposit {
            user: key(4),
            deposit_amount: amount,
            fund_id,
        });
        accounts.insert(fund_address, program_account(fund.encode()?));
        accounts.entry(key(1)).or_insert_with(|| created(system_program::id(), 0, 0)).lamports += amount;
        Ok(())
    } else if discriminator == sighash("redeem_liquidity") {
        let (_amount, fund_id, creator, manager) =
            <(u64, String, [u8; 32], [u8; 32])>::try_from_slice(args).unwrap();
        expect_seeds("fund_details", key(0), addresses().fund_details(&fund_id, &Pubkey::new_from_array(creator)))?;
        expect_seeds("hedge_fund_owner", key(2), addresses().manager(&Pubkey::new_from_array(manager)))?;
        load_fund(accounts, &key(0)).map(|_| ())
    } else if discriminator == sighash("trade") {
        let (fund_id, _amount, _swap_data) = <(String, u64, Vec<u8>)>::try_from_slice(args).unwrap();
        let user = key(4);
        expect_seeds("fund_details", key(0), addresses().fund_details(&fund_id, &user))?;
        let fund = load_fund(accounts, &key(0))?;
        expect_seeds("hedge_fund_owner", key(1), addresses().manager(&fund.authority))?;
        let owner = accounts
            .get(&key(1))
            .ok_or_else(|| anchor_error("hedge_fund_owner", "AccountNotInitialized", 3012))?;
        if owner.data.get(8..40) != Some(user.as_ref()) {
            return Err(anchor_error("hedge_fund_owner", "UnauthorizedTrader", 6000));
        }
        expect_seeds("fund_vault", key(5), addresses().fund_vault(&fund_id))
    } else if discriminator == sighash("withdraw_all_funds") {
        let drained = accounts.get_mut(&key(0)).map(|vault| std::mem::take(&mut vault.lamports)).unwrap_or(0);
        accounts.entry(key(1)).or_insert_with(|| created(system_program::id(), 0, 0)).lamports += drained;
        Ok(())
    } else {
        Ok(())
    }
}

impl Ledger for MockLedger {
    async fn get_account(&self, address: &Pubkey) -> ChainResult<Option<Account>> {
        let state = self.state.lock().unwrap();
        if state.hidden.contains(address) {
            return Ok(None);
        }
        Ok(state.accounts.get(address).cloned())
    }

    async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        Ok(self.state.lock().unwrap().accounts.get(address).map(|a| a.lamports).unwrap_or(0))
    }

    async fn get_token_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        Ok(self.state.lock().unwrap().token_balances.get(address).copied().unwrap_or(0))
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> ChainResult<u64> {
        Ok(Rent::default().minimum_balance(data_len))
    }

    async fn latest_blockhash(&self) -> ChainResult<(Hash, u64)> {
        Ok((Hash::new_unique(), 1_000))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<Signature> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;

        let instructions = decompile(transaction);
        if let Some(rejected) = instructions
            .iter()
            .find(|ix| state.rejected_programs.contains(&ix.program_id))
        {
            return Err(ChainError::program_failure(
                "Transaction simulation failed: custom program error: 0x1771",
                vec![
                    format!("Program {} invoke [1]", rejected.program_id),
                    "Program log: AnchorError occurred. Error Code: InvalidAmount.".to_string(),
                ],
            ));
        }

        let mut scratch = state.accounts.clone();
        for instruction in &instructions {
            apply(&mut scratch, instruction)?;
        }

        let signature = transaction.signatures[0];
        state.accounts = scratch;
        state.landed.insert(signature);
        state.submitted.push(transaction.clone());
        Ok(signature)
    }

    async fn signature_status(&self, signature: &Signature) -> ChainResult<Option<Result<(), String>>> {
        let landed = self.state.lock().unwrap().landed.contains(signature);
        Ok(landed.then_some(Ok(())))
    }

    async fn block_height(&self) -> ChainResult<u64> {
        Ok(10)
    }
}

pub fn mint_account(decimals: u8) -> Account {
    use spl_token::solana_program::program_option::COption;
    use spl_token::solana_program::program_pack::Pack;

    let mut data = vec![0; MINT_ACCOUNT_LEN];
    spl_token::state::Mint {
        mint_authority: COption::None,
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    }
    .pack_into_slice(&mut data);
    Account {
        lamports: Rent::default().minimum_balance(MINT_ACCOUNT_LEN),
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub fn to_api(instruction: &Instruction) -> ApiInstruction {
    ApiInstruction {
        program_id: instruction.program_id.to_string(),
        accounts: instruction
            .accounts
            .iter()
            .map(|meta| ApiAccountMeta {
                pubkey: meta.pubkey.to_string(),
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            })
            .collect(),
        data: STANDARD.encode(&instruction.data),
    }
}

pub fn quote_for(request: &QuoteRequest, out_amount: u64) -> Quote {
    serde_json::from_value(serde_json::json!({
        "inputMint": request.input_mint.to_string(),
        "inAmount": request.amount.to_string(),
        "outputMint": request.output_mint.to_string(),
        "outAmount": out_amount.to_string(),
        "otherAmountThreshold": out_amount.to_string(),
        "swapMode": "ExactIn",
        "slippageBps": request.slippage_bps,
        "priceImpactPct": "0",
        "routePlan": [{"swapInfo": {"label": "Whirlpool"}, "percent": 100}]
    }))
    .unwrap()
}

/// Scripted aggregator.
///
/// The swap instruction lists the wallet and `foreign_signer` as signers.
/// Setup holds a compute-budget instruction and an idempotent creation of
/// the wallet's ATA for the output mint.
pub struct MockAggregator {
    pub foreign_signer: Pubkey,
    pub out_amount: u64,
    pub failure: Option<AggregatorError>,
    pub quotes: Mutex<Vec<QuoteRequest>>,
    pub swaps: Mutex<Vec<SwapRequest>>,
}

impl MockAggregator {
    pub fn new() -> Self {
        Self {
            foreign_signer: Pubkey::new_unique(),
            out_amount: 1_500_000,
            failure: None,
            quotes: Mutex::new(Vec::new()),
            swaps: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AggregatorError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    pub fn quote_requests(&self) -> Vec<QuoteRequest> {
        self.quotes.lock().unwrap().clone()
    }

    pub fn swap_requests(&self) -> Vec<SwapRequest> {
        self.swaps.lock().unwrap().clone()
    }
}

impl SwapAggregator for MockAggregator {
    async fn quote(&self, request: &QuoteRequest) -> AggregatorResult<Quote> {
        self.quotes.lock().unwrap().push(request.clone());
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(quote_for(request, self.out_amount))
    }

    async fn swap_instructions(&self, request: &SwapRequest) -> AggregatorResult<SwapInstructions> {
        self.swaps.lock().unwrap().push(request.clone());
        let output_mint = Pubkey::from_str(&request.quote.output_mint).unwrap();
        let destination = request
            .destination_token_account
            .unwrap_or_else(|| associated_token_address(&request.user, &output_mint));

        let budget = compute_budget::ComputeBudgetInstruction::set_compute_unit_limit(1_400_000);
        let create_destination =
            spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                &request.user,
                &request.user,
                &output_mint,
                &spl_token::id(),
            );
        let swap = Instruction {
            program_id: jupiter_program_id(),
            accounts: vec![
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new(request.user, true),
                AccountMeta::new_readonly(self.foreign_signer, true),
                AccountMeta::new(destination, false),
                AccountMeta::new_readonly(output_mint, false),
            ],
            data: vec![0xe5, 0x17, 0xcb, 0x97, 0x7a, 0xe3, 0xad, 0x2a],
        };

        Ok(SwapInstructions {
            token_ledger_instruction: None,
            compute_budget_instructions: vec![to_api(&budget)],
            setup_instructions: vec![to_api(&budget), to_api(&create_destination)],
            swap_instruction: to_api(&swap),
            cleanup_instruction: None,
            address_lookup_table_addresses: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Bookkeeper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookkeeperMode {
    Accept,
    /// Every record call fails with a 500.
    Fail,
    /// The first token handed out is rejected as expired.
    RejectFirstToken,
}

pub struct MockBookkeeper {
    mode: BookkeeperMode,
    logins: AtomicU32,
    record_calls: AtomicU32,
    pub ledger: Mutex<Vec<LedgerEntry>>,
    pub funds: Mutex<Vec<FundRecord>>,
    pub trades: Mutex<Vec<TradeRecord>>,
}

impl MockBookkeeper {
    pub fn new(mode: BookkeeperMode) -> Self {
        Self {
            mode,
            logins: AtomicU32::new(0),
            record_calls: AtomicU32::new(0),
            ledger: Mutex::new(Vec::new()),
            funds: Mutex::new(Vec::new()),
            trades: Mutex::new(Vec::new()),
        }
    }

    pub fn logins(&self) -> u32 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> u32 {
        self.record_calls.load(Ordering::SeqCst)
    }

    fn admit(&self, session: &AuthSession) -> BackendResult<()> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            BookkeeperMode::Accept => Ok(()),
            BookkeeperMode::Fail => Err(BackendError::Status {
                status: 500,
                body: "database unavailable".to_string(),
            }),
            BookkeeperMode::RejectFirstToken if session.token == "token-1" => Err(BackendError::Unauthorized(
                "Unauthorized: Invalid or Expired auth token.".to_string(),
            )),
            BookkeeperMode::RejectFirstToken => Ok(()),
        }
    }
}

impl Bookkeeper for MockBookkeeper {
    async fn login(&self, request: &LoginRequest) -> BackendResult<LoginGrant> {
        assert!(!request.signature.is_empty());
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LoginGrant {
            token: format!("token-{}", n),
            expires_at: None,
        })
    }

    async fn record_ledger(&self, session: &AuthSession, entry: &LedgerEntry) -> BackendResult<()> {
        self.admit(session)?;
        self.ledger.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn record_fund(&self, session: &AuthSession, record: &FundRecord) -> BackendResult<()> {
        self.admit(session)?;
        self.funds.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn record_trade(&self, session: &AuthSession, record: &TradeRecord) -> BackendResult<()> {
        self.admit(session)?;
        self.trades.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// One request as seen by the programmable backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<SeenRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers.get("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    while buffer.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buffer[header_end..]).to_string();

    Some(SeenRequest {
        method,
        path,
        headers,
        body,
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock HTTP server. `f` sees each request and returns
/// the status and JSON body.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
