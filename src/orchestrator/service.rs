//! The fund service.
//!
//! # Data Flow
//! ```text
//! intent (fund id, amount, token)
//!     → derive addresses (ProgramAddresses)
//!     → load fund state, check prerequisites, plan missing accounts
//!     → quote + swap instructions (swaps only), signer rewrite
//!     → compute budget, sign, submit once, poll for confirmation
//!     → best-effort bookkeeping record
//!     → ActionReceipt
//! ```
//!
//! # Design Decisions
//! - Every dependent instruction of one action goes into one transaction
//! - Setup-only transactions (manager account, fund swap token account)
//!   treat "already in use" as success and return the derived address
//! - Confirmed actions never fail because of bookkeeping

use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::pda::associated_token_address;
use crate::blockchain::transaction::{ConfirmSettings, TxSender};
use crate::blockchain::types::{ChainError, ChainResult};
use crate::blockchain::units::{format_units, parse_units, units_to_f64, SOL_DECIMALS};
use crate::blockchain::{Ledger, ProgramAddresses, Wallet};
use crate::bookkeeping::{
    with_session, AuthSession, BackendResult, Bookkeeper, FundRecord, LedgerEntry, LedgerMethod,
    SessionManager, TradeRecord,
};
use crate::config::schema::OrchestratorConfig;
use crate::observability::metrics;
use crate::observability::tracing::action_span;
use crate::orchestrator::budget::is_budget_instruction;
use crate::orchestrator::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::plan::TxPlan;
use crate::orchestrator::receipt::{
    ActionKind, ActionReceipt, BalanceReport, DepositorReport, FundCreated, FundReport, ManagerAccount,
    RecordOutcome,
};
use crate::orchestrator::setup::ensure_ata;
use crate::program::instructions::{
    CreateFundAccounts, DepositAccounts, DrainAccounts, RedeemAccounts, RedeemTradeAccounts, TradeAccounts,
    UsdcToSolAccounts,
};
use crate::program::tokens::{
    create_ata, create_mint_account, initialize_mint, mint_decimals, wsol_mint, MINT_ACCOUNT_LEN,
    TOKEN_ACCOUNT_LEN,
};
use crate::program::{summarize_deposits, FundDetails, FundProgram};
use crate::quoting::signers::{rewrite_instruction, rewrite_signers};
use crate::quoting::{Quote, QuoteRequest, SwapAggregator, SwapInstructions, SwapRequest, TokenRegistry};

/// Bytes reserved for the fund name on-chain.
pub const FUND_NAME_LEN: usize = 10;

/// Bytes reserved for the description on-chain.
pub const FUND_DESCRIPTION_LEN: usize = 32;

/// Longest fund id that still fits a seed and the on-chain id field.
pub const FUND_ID_MAX_LEN: usize = 32;

/// Input for [`FundService::create_fund`]. Amounts are decimal SOL strings.
#[derive(Debug, Clone, Default)]
pub struct CreateFundParams {
    /// Generated from the clock and the wallet address when absent.
    pub fund_id: Option<String>,
    pub name: String,
    pub ticker: String,
    pub description: String,
    pub target_amount: String,
    /// Stored on-chain as the invest threshold.
    pub management_fee: String,
    /// Image uploaded with the fund record. Recording is skipped without it.
    pub logo: Option<PathBuf>,
    pub website: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub manager_telegram: Option<String>,
}

/// Drives the fund program for one wallet.
pub struct FundService<L, A, B> {
    config: OrchestratorConfig,
    wallet: Wallet,
    ledger: L,
    aggregator: A,
    bookkeeper: Option<B>,
    sessions: SessionManager,
    addresses: ProgramAddresses,
    program: FundProgram,
    tokens: TokenRegistry,
    confirm: ConfirmSettings,
    manager: Pubkey,
    treasury: Pubkey,
    usdc_mint: Pubkey,
    jupiter_program: Pubkey,
}

impl<L: Ledger, A: SwapAggregator, B: Bookkeeper> FundService<L, A, B> {
    /// `bookkeeper` is `None` when recording is disabled.
    pub fn new(
        config: OrchestratorConfig,
        wallet: Wallet,
        ledger: L,
        aggregator: A,
        bookkeeper: Option<B>,
    ) -> OrchestratorResult<Self> {
        let program_id = parse_address("program.program_id", &config.program.program_id)?;
        let manager = parse_address("program.manager_address", &config.program.manager_address)?;
        let treasury = parse_address("program.treasury_address", &config.program.treasury_address)?;
        let usdc_mint = parse_address("program.usdc_mint", &config.program.usdc_mint)?;
        let jupiter_program = parse_address("program.jupiter_program_id", &config.program.jupiter_program_id)?;

        let tokens = TokenRegistry::new(usdc_mint, &config.tokens);
        let sessions = SessionManager::new(wallet.clone(), config.backend.login_message.clone());
        let confirm = ConfirmSettings::from_config(&config.rpc);

        tracing::info!(
            wallet = %wallet.pubkey(),
            program_id = %program_id,
            bookkeeping = bookkeeper.is_some(),
            "Fund service ready"
        );

        Ok(Self {
            config,
            wallet,
            ledger,
            aggregator,
            bookkeeper,
            sessions,
            addresses: ProgramAddresses::new(program_id),
            program: FundProgram::new(program_id),
            tokens,
            confirm,
            manager,
            treasury,
            usdc_mint,
            jupiter_program,
        })
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    pub fn bookkeeper(&self) -> Option<&B> {
        self.bookkeeper.as_ref()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ----- actions -----

    /// Create the configured manager's fee account if it does not exist.
    pub async fn initialize_manager(&self) -> OrchestratorResult<ManagerAccount> {
        let action = ActionKind::InitializeManager;
        self.run(action, Uuid::new_v4(), async {
            let address = self.addresses.manager(&self.manager)?;
            if self.ledger.account_exists(&address).await? {
                tracing::info!(manager_account = %address, "Manager account already initialized");
                return Ok(ManagerAccount {
                    address,
                    signature: None,
                });
            }

            let mut plan = TxPlan::with_budget(self.config.budget.admin);
            plan.schedule_creation(
                address,
                self.program.initialize(address, self.wallet.pubkey(), self.manager)?,
            );

            let signature = match self.submit(&plan).await {
                Ok(signature) => Some(signature),
                Err(ChainError::AccountInUse { .. }) => {
                    tracing::info!(manager_account = %address, "Manager account created concurrently");
                    None
                }
                Err(e) => return Err(e.into()),
            };
            Ok(ManagerAccount { address, signature })
        })
        .await
    }

    /// Mint a fund token and create the fund in one transaction.
    pub async fn create_fund(&self, params: CreateFundParams) -> OrchestratorResult<FundCreated> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::CreateFund, action_id, async {
            let creator = self.wallet.pubkey();
            let fund_id = match params.fund_id.clone() {
                Some(id) => id,
                None => generate_fund_id(&creator, unix_millis()),
            };
            check_fund_id(&fund_id)?;
            let name = pad_field("name", &params.name, FUND_NAME_LEN)?;
            let description = pad_field("description", &params.description, FUND_DESCRIPTION_LEN)?;
            let target = parse_units(&params.target_amount, SOL_DECIMALS)?;
            let threshold = parse_units(&params.management_fee, SOL_DECIMALS)?;

            let fund_address = self.addresses.fund_details(&fund_id, &creator)?;
            if self.ledger.account_exists(&fund_address).await? {
                return Err(OrchestratorError::setup(format!(
                    "fund '{}' already exists at {}",
                    fund_id, fund_address
                )));
            }

            let mint = Keypair::new();
            let token_mint = mint.pubkey();
            let mint_rent = self.ledger.minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN).await?;
            let fund_token_account = associated_token_address(&fund_address, &token_mint);

            let mut plan = TxPlan::with_budget(self.config.budget.admin);
            plan.schedule_creation(token_mint, create_mint_account(&creator, &token_mint, mint_rent));
            plan.push(initialize_mint(
                &token_mint,
                &fund_address,
                self.config.program.fund_token_decimals,
            )?);
            plan.schedule_creation(fund_token_account, create_ata(&creator, &fund_address, &token_mint));
            plan.push(self.program.create_fund(
                &CreateFundAccounts {
                    fund_details: fund_address,
                    token_mint,
                    fund_token_account,
                    creator,
                },
                &fund_id,
                target,
                &name,
                &description,
                threshold,
            )?);
            plan.add_signer(mint);

            tracing::info!(fund_id = %fund_id, fund = %fund_address, mint = %token_mint, "Creating fund");
            let signature = self.submit(&plan).await?;

            let record = match params.logo.clone() {
                Some(logo) => {
                    self.record_fund(FundRecord {
                        fund_name: params.name.clone(),
                        fund_ticker: params.ticker.clone(),
                        fund_description: params.description.clone(),
                        target_raise_amount: units_to_f64(target, SOL_DECIMALS),
                        annual_management_fee: units_to_f64(threshold, SOL_DECIMALS),
                        logo,
                        website_url: params.website.clone(),
                        telegram_url: params.telegram.clone(),
                        twitter_handle: params.twitter.clone(),
                        on_chain_fund_id: fund_id.clone(),
                        fund_contract_address: fund_address.to_string(),
                        fund_token_address: token_mint.to_string(),
                        manager_address: creator.to_string(),
                        manager_telegram_username: params.manager_telegram.clone(),
                    })
                    .await
                }
                None => {
                    tracing::warn!(fund_id = %fund_id, "No fund logo given, fund record not sent");
                    RecordOutcome::Skipped
                }
            };

            Ok(FundCreated {
                fund_id,
                fund_address,
                token_mint,
                receipt: ActionReceipt {
                    action_id,
                    action: ActionKind::CreateFund,
                    signature,
                    record,
                },
            })
        })
        .await
    }

    /// Deposit `amount` SOL into a fund.
    pub async fn deposit(&self, fund_id: &str, creator: &Pubkey, amount: &str) -> OrchestratorResult<ActionReceipt> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::Deposit, action_id, async {
            let amount = positive(parse_units(amount, SOL_DECIMALS)?)?;
            let (fund_address, fund) = self.load_fund(fund_id, creator).await?;
            let user = self.wallet.pubkey();
            let mint = fund.fund_token_mint;

            let mut plan = TxPlan::with_budget(Some(self.config.budget.deposit));
            let user_token_account = ensure_ata(&self.ledger, &mut plan, &user, &user, &mint).await?;

            let accounts = DepositAccounts {
                fund_details: fund_address,
                fund_vault: self.addresses.fund_vault(fund_id)?,
                fund_token_account: associated_token_address(&fund_address, &mint),
                user_token_account,
                user,
                fund_creator: *creator,
                manager_account: self.addresses.manager(&self.manager)?,
                fund_token_mint: mint,
            };
            plan.push(self.program.deposit_liquidity(
                &accounts,
                amount,
                fund_id,
                &self.manager,
                fund.tokens_minted,
            )?);

            tracing::info!(fund_id, vault = %accounts.fund_vault, lamports = amount, "Depositing");
            let signature = self.submit(&plan).await?;

            let record = self
                .record_ledger(&fund_address, amount, SOL_DECIMALS, LedgerMethod::Buy, &signature)
                .await;
            Ok(ActionReceipt {
                action_id,
                action: ActionKind::Deposit,
                signature,
                record,
            })
        })
        .await
    }

    /// Redeem `amount` fund tokens.
    pub async fn redeem(&self, fund_id: &str, creator: &Pubkey, amount: &str) -> OrchestratorResult<ActionReceipt> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::Redeem, action_id, async {
            let amount = positive(parse_units(amount, self.config.program.fund_token_decimals)?)?;
            let (fund_address, fund) = self.load_fund(fund_id, creator).await?;
            let user = self.wallet.pubkey();
            let mint = fund.fund_token_mint;

            let mut plan = TxPlan::with_budget(Some(self.config.budget.redeem));
            let user_token_account = ensure_ata(&self.ledger, &mut plan, &user, &user, &mint).await?;

            let accounts = RedeemAccounts {
                fund_details: fund_address,
                fund_token_account: associated_token_address(&fund_address, &mint),
                manager_account: self.addresses.manager(&self.manager)?,
                user_token_account,
                user,
                fund_creator: *creator,
                fund_token_mint: mint,
            };
            plan.push(self.program.redeem_liquidity(&accounts, amount, fund_id, &self.manager)?);

            tracing::info!(fund_id, amount, "Redeeming");
            let signature = self.submit(&plan).await?;

            let record = self
                .record_ledger(
                    &fund_address,
                    amount,
                    self.config.program.fund_token_decimals,
                    LedgerMethod::Sell,
                    &signature,
                )
                .await;
            Ok(ActionReceipt {
                action_id,
                action: ActionKind::Redeem,
                signature,
                record,
            })
        })
        .await
    }

    /// Swap `amount` SOL from the vault of a fund the wallet manages into `output`.
    pub async fn trade(&self, fund_id: &str, amount: &str, output: &str) -> OrchestratorResult<ActionReceipt> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::Trade, action_id, async {
            let output_mint = self.resolve_token(output)?;
            let amount = positive(parse_units(amount, SOL_DECIMALS)?)?;
            let user = self.wallet.pubkey();

            let (fund_address, fund) = self.load_fund(fund_id, &user).await?;
            if fund.authority != user {
                return Err(OrchestratorError::setup(format!(
                    "wallet {} does not manage fund '{}'",
                    user, fund_id
                )));
            }
            let manager_account = self.addresses.manager(&fund.authority)?;
            if !self.ledger.account_exists(&manager_account).await? {
                return Err(OrchestratorError::setup(format!(
                    "no manager account for {} at {}",
                    fund.authority, manager_account
                )));
            }

            let fund_vault = self.addresses.fund_vault(fund_id)?;
            let available = self.ledger.get_balance(&fund_vault).await?;
            let wsol_rent = self.ledger.minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN).await?;
            let required = amount
                .saturating_add(wsol_rent)
                .saturating_add(self.config.trade.vault_buffer_lamports);
            if available < required {
                return Err(OrchestratorError::setup(format!(
                    "insufficient vault balance: {} SOL available, {} SOL required",
                    format_units(available, SOL_DECIMALS),
                    format_units(required, SOL_DECIMALS)
                )));
            }

            let output_decimals = self.token_decimals(&output_mint).await?;
            let fund_token_account = self.ensure_fund_token_account(fund_id, &output_mint).await?;
            let (quote, swap) = self
                .fetch_swap(wsol_mint(), output_mint, amount, fund_token_account, false)
                .await?;

            let mut plan = TxPlan::with_budget(Some(self.config.budget.trade));
            let (swap_data, route) = self.splice_swap(&mut plan, &swap)?;
            let accounts = TradeAccounts {
                fund_details: fund_address,
                manager_account,
                program_authority: self.addresses.authority()?,
                program_wsol: self.addresses.program_wsol()?,
                user,
                fund_vault,
                sol_mint: wsol_mint(),
                destination_mint: output_mint,
                fund_token_account,
                jupiter_program: self.jupiter_program,
            };
            plan.push(self.program.trade(&accounts, fund_id, amount, swap_data, route)?);

            tracing::info!(fund_id, output_mint = %output_mint, lamports = amount, "Trading");
            let signature = self.submit(&plan).await?;

            let record = self
                .record_trade(TradeRecord {
                    fund_address: fund_address.to_string(),
                    from_token_address: wsol_mint().to_string(),
                    to_token_address: output_mint.to_string(),
                    from_token_symbol: self.symbol_or_mint(&wsol_mint()),
                    to_token_symbol: self.symbol_or_mint(&output_mint),
                    from_amount: format_units(amount, SOL_DECIMALS),
                    slippage_bps: self.config.aggregator.slippage_bps,
                    expected_output: expected_output(&quote, output_decimals),
                    signature: signature.to_string(),
                })
                .await;
            Ok(ActionReceipt {
                action_id,
                action: ActionKind::Trade,
                signature,
                record,
            })
        })
        .await
    }

    /// Swap `amount` USDC held by the fund back into the program WSOL account.
    pub async fn usdc_to_sol(&self, fund_id: &str, amount: &str) -> OrchestratorResult<ActionReceipt> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::UsdcToSol, action_id, async {
            check_fund_id(fund_id)?;
            let usdc_decimals = self.token_decimals(&self.usdc_mint).await?;
            let amount = positive(parse_units(amount, usdc_decimals)?)?;
            let user = self.wallet.pubkey();

            let fund_token_account = self.addresses.fund_token(fund_id, &self.usdc_mint)?;
            if !self.ledger.account_exists(&fund_token_account).await? {
                return Err(OrchestratorError::setup(format!(
                    "fund '{}' has no USDC account at {}",
                    fund_id, fund_token_account
                )));
            }
            let program_wsol = self.addresses.program_wsol()?;

            let mut plan = TxPlan::with_budget(Some(self.config.budget.swap));
            let destination_token_account =
                ensure_ata(&self.ledger, &mut plan, &user, &user, &self.usdc_mint).await?;
            let (quote, swap) = self
                .fetch_swap(self.usdc_mint, wsol_mint(), amount, program_wsol, true)
                .await?;
            let (swap_data, route) = self.splice_swap(&mut plan, &swap)?;

            let accounts = UsdcToSolAccounts {
                program_authority: self.addresses.authority()?,
                destination_token_account,
                program_wsol,
                user,
                fund_vault: self.addresses.fund_vault(fund_id)?,
                sol_mint: wsol_mint(),
                fund_token_account,
                usdc_mint: self.usdc_mint,
                jupiter_program: self.jupiter_program,
            };
            plan.push(self.program.usdc_to_sol_trade(&accounts, fund_id, amount, swap_data, route)?);

            tracing::info!(fund_id, amount, "Swapping fund USDC to SOL");
            let signature = self.submit(&plan).await?;

            let fund_address = self.addresses.fund_details(fund_id, &user)?;
            let record = self
                .record_trade(TradeRecord {
                    fund_address: fund_address.to_string(),
                    from_token_address: self.usdc_mint.to_string(),
                    to_token_address: wsol_mint().to_string(),
                    from_token_symbol: self.symbol_or_mint(&self.usdc_mint),
                    to_token_symbol: self.symbol_or_mint(&wsol_mint()),
                    from_amount: format_units(amount, usdc_decimals),
                    slippage_bps: self.config.aggregator.slippage_bps,
                    expected_output: expected_output(&quote, SOL_DECIMALS),
                    signature: signature.to_string(),
                })
                .await;
            Ok(ActionReceipt {
                action_id,
                action: ActionKind::UsdcToSol,
                signature,
                record,
            })
        })
        .await
    }

    /// Redeem through a USDC to SOL swap. The amount is clamped to the
    /// fund's current deposit.
    pub async fn redeem_trade(&self, fund_id: &str, creator: &Pubkey, amount: &str) -> OrchestratorResult<ActionReceipt> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::RedeemTrade, action_id, async {
            let requested = positive(parse_units(amount, self.config.program.fund_token_decimals)?)?;
            let (fund_address, fund) = self.load_fund(fund_id, creator).await?;
            let amount = positive(requested.min(fund.current_deposit))?;
            if amount < requested {
                tracing::info!(fund_id, requested, clamped = amount, "Redeem amount clamped to current deposit");
            }

            let user = self.wallet.pubkey();
            let mint = fund.fund_token_mint;

            let mut plan = TxPlan::with_budget(Some(self.config.budget.swap));
            let wallet_wsol = ensure_ata(&self.ledger, &mut plan, &user, &user, &wsol_mint()).await?;
            let (_, swap) = self
                .fetch_swap(self.usdc_mint, wsol_mint(), amount, wallet_wsol, true)
                .await?;
            let (swap_data, route) = self.splice_swap(&mut plan, &swap)?;

            let accounts = RedeemTradeAccounts {
                fund_details: fund_address,
                program_authority: self.addresses.authority()?,
                program_wsol: self.addresses.program_wsol()?,
                user,
                sol_mint: wsol_mint(),
                user_token_account: associated_token_address(&user, &mint),
                fund_token_account: associated_token_address(&fund_address, &mint),
                jupiter_program: self.jupiter_program,
            };
            plan.push(self.program.redeem_trade(&accounts, fund_id, amount, swap_data, route)?);

            tracing::info!(fund_id, amount, "Redeeming through swap");
            let signature = self.submit(&plan).await?;

            let record = self
                .record_ledger(
                    &fund_address,
                    amount,
                    self.config.program.fund_token_decimals,
                    LedgerMethod::Sell,
                    &signature,
                )
                .await;
            Ok(ActionReceipt {
                action_id,
                action: ActionKind::RedeemTrade,
                signature,
                record,
            })
        })
        .await
    }

    /// Move every lamport in the fund vault to the treasury. `None` if the vault is empty.
    pub async fn withdraw_all(&self, fund_id: &str) -> OrchestratorResult<Option<ActionReceipt>> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::WithdrawAll, action_id, async {
            check_fund_id(fund_id)?;
            let fund_vault = self.addresses.fund_vault(fund_id)?;
            let balance = self.ledger.get_balance(&fund_vault).await?;
            if balance == 0 {
                tracing::info!(fund_id, vault = %fund_vault, "Vault is empty, nothing to withdraw");
                return Ok(None);
            }

            let mut plan = TxPlan::with_budget(self.config.budget.admin);
            plan.push(self.program.withdraw_all_funds(
                fund_id,
                fund_vault,
                self.treasury,
                self.wallet.pubkey(),
            )?);

            tracing::info!(fund_id, lamports = balance, treasury = %self.treasury, "Withdrawing vault");
            let signature = self.submit(&plan).await?;
            Ok(Some(ActionReceipt {
                action_id,
                action: ActionKind::WithdrawAll,
                signature,
                record: RecordOutcome::Skipped,
            }))
        })
        .await
    }

    /// Sweep vault SOL, program WSOL and fund USDC to the treasury.
    pub async fn drain_all(&self, fund_id: &str) -> OrchestratorResult<ActionReceipt> {
        let action_id = Uuid::new_v4();
        self.run(ActionKind::DrainAll, action_id, async {
            check_fund_id(fund_id)?;
            let payer = self.wallet.pubkey();

            let mut plan = TxPlan::with_budget(self.config.budget.admin);
            let destination_token_account =
                ensure_ata(&self.ledger, &mut plan, &payer, &self.treasury, &self.usdc_mint).await?;

            let accounts = DrainAccounts {
                program_authority: self.addresses.authority()?,
                fund_vault: self.addresses.fund_vault(fund_id)?,
                fund_token_account: self.addresses.fund_token(fund_id, &self.usdc_mint)?,
                program_wsol: self.addresses.program_wsol()?,
                usdc_mint: self.usdc_mint,
                destination: self.treasury,
                destination_token_account,
            };
            plan.push(self.program.drain_all_funds(&accounts, fund_id)?);

            tracing::info!(fund_id, treasury = %self.treasury, "Draining fund");
            let signature = self.submit(&plan).await?;
            Ok(ActionReceipt {
                action_id,
                action: ActionKind::DrainAll,
                signature,
                record: RecordOutcome::Skipped,
            })
        })
        .await
    }

    // ----- reads -----

    pub async fn fund_details(&self, fund_id: &str, creator: &Pubkey) -> OrchestratorResult<FundReport> {
        let (address, details) = self.load_fund(fund_id, creator).await?;
        Ok(FundReport::new(&address, &details))
    }

    /// Deposits grouped per depositor, in order of first deposit.
    pub async fn fund_deposits(&self, fund_id: &str, creator: &Pubkey) -> OrchestratorResult<Vec<DepositorReport>> {
        let (_, details) = self.load_fund(fund_id, creator).await?;
        Ok(summarize_deposits(&details.user_deposits)
            .iter()
            .map(DepositorReport::from)
            .collect())
    }

    pub async fn balances(&self, fund_id: Option<&str>) -> OrchestratorResult<BalanceReport> {
        let wallet = self.wallet.pubkey();
        let wallet_lamports = self.ledger.get_balance(&wallet).await?;

        let mut report = BalanceReport {
            wallet: wallet.to_string(),
            wallet_sol: format_units(wallet_lamports, SOL_DECIMALS),
            fund_vault: None,
            fund_vault_sol: None,
            fund_usdc: None,
        };
        let Some(fund_id) = fund_id else {
            return Ok(report);
        };

        check_fund_id(fund_id)?;
        let vault = self.addresses.fund_vault(fund_id)?;
        let lamports = self.ledger.get_balance(&vault).await?;
        report.fund_vault = Some(vault.to_string());
        report.fund_vault_sol = Some(format_units(lamports, SOL_DECIMALS));

        let usdc_account = self.addresses.fund_token(fund_id, &self.usdc_mint)?;
        if self.ledger.account_exists(&usdc_account).await? {
            let units = self.ledger.get_token_balance(&usdc_account).await?;
            let decimals = self.token_decimals(&self.usdc_mint).await?;
            report.fund_usdc = Some(format_units(units, decimals));
        }
        Ok(report)
    }

    /// Sign in to the bookkeeping API now rather than on first record.
    pub async fn sign_in(&self) -> OrchestratorResult<AuthSession> {
        let backend = self
            .bookkeeper
            .as_ref()
            .ok_or_else(|| OrchestratorError::Config("bookkeeping is disabled".to_string()))?;
        Ok(self.sessions.refresh(backend).await?)
    }

    // ----- steps -----

    async fn run<T, Fut>(&self, action: ActionKind, action_id: Uuid, flow: Fut) -> OrchestratorResult<T>
    where
        Fut: Future<Output = OrchestratorResult<T>>,
    {
        let started = Instant::now();
        let result = flow.instrument(action_span(action.as_str(), action_id)).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => {
                tracing::error!(
                    action = action.as_str(),
                    action_id = %action_id,
                    error = %e,
                    logs = ?e.logs(),
                    "Action failed"
                );
                e.kind()
            }
        };
        metrics::record_action(action.as_str(), outcome, started.elapsed());
        result
    }

    async fn submit(&self, plan: &TxPlan) -> ChainResult<Signature> {
        TxSender::new(&self.ledger, &self.wallet, self.confirm)
            .send_and_confirm(&plan.instructions(), &plan.signers())
            .await
    }

    async fn load_fund(&self, fund_id: &str, creator: &Pubkey) -> OrchestratorResult<(Pubkey, FundDetails)> {
        check_fund_id(fund_id)?;
        let address = self.addresses.fund_details(fund_id, creator)?;
        let account = self.ledger.get_account(&address).await?.ok_or_else(|| {
            OrchestratorError::setup(format!("fund '{}' not found at {}", fund_id, address))
        })?;
        let details = FundDetails::decode(&account.data)
            .map_err(|e| OrchestratorError::setup(format!("fund '{}': {}", fund_id, e)))?;
        Ok((address, details))
    }

    fn resolve_token(&self, symbol_or_mint: &str) -> OrchestratorResult<Pubkey> {
        self.tokens
            .resolve(symbol_or_mint)
            .ok_or_else(|| OrchestratorError::setup(format!("unknown token '{}'", symbol_or_mint)))
    }

    fn symbol_or_mint(&self, mint: &Pubkey) -> String {
        self.tokens.symbol_of(mint).unwrap_or_else(|| mint.to_string())
    }

    /// Registry decimals, else read from the mint account and cached.
    async fn token_decimals(&self, mint: &Pubkey) -> OrchestratorResult<u8> {
        if let Some(decimals) = self.tokens.decimals(mint) {
            return Ok(decimals);
        }
        let account = self
            .ledger
            .get_account(mint)
            .await?
            .ok_or_else(|| OrchestratorError::setup(format!("mint {} not found", mint)))?;
        let decimals = mint_decimals(&account.data)?;
        self.tokens.remember_decimals(*mint, decimals);
        Ok(decimals)
    }

    /// The fund's program-owned token account for `mint`, created in its own
    /// transaction if missing.
    async fn ensure_fund_token_account(&self, fund_id: &str, mint: &Pubkey) -> OrchestratorResult<Pubkey> {
        let address = self.addresses.fund_token(fund_id, mint)?;
        if self.ledger.account_exists(&address).await? {
            return Ok(address);
        }

        let mut plan = TxPlan::with_budget(self.config.budget.admin);
        plan.schedule_creation(
            address,
            self.program.create_fund_token_account(
                fund_id,
                self.addresses.authority()?,
                address,
                *mint,
                self.wallet.pubkey(),
            )?,
        );

        match self.submit(&plan).await {
            Ok(signature) => {
                tracing::info!(fund_id, account = %address, signature = %signature, "Fund token account created")
            }
            Err(ChainError::AccountInUse { .. }) => {
                tracing::info!(fund_id, account = %address, "Fund token account already exists")
            }
            Err(e) => return Err(e.into()),
        }
        Ok(address)
    }

    async fn fetch_swap(
        &self,
        input_mint: Pubkey,
        output_mint: Pubkey,
        amount: u64,
        destination: Pubkey,
        skip_user_accounts_creation: bool,
    ) -> OrchestratorResult<(Quote, SwapInstructions)> {
        let quote = self
            .aggregator
            .quote(&QuoteRequest {
                input_mint,
                output_mint,
                amount,
                slippage_bps: self.config.aggregator.slippage_bps,
            })
            .await?;

        let swap = self
            .aggregator
            .swap_instructions(&SwapRequest {
                quote: quote.clone(),
                user: self.wallet.pubkey(),
                destination_token_account: Some(destination),
                wrap_and_unwrap_sol: true,
                skip_user_accounts_creation,
            })
            .await?;

        Ok((quote, swap))
    }

    /// Add the aggregator's setup instructions to the plan and return the
    /// swap data plus the rewritten route accounts for the program call.
    fn splice_swap(&self, plan: &mut TxPlan, swap: &SwapInstructions) -> OrchestratorResult<(Vec<u8>, Vec<AccountMeta>)> {
        let wallet = self.wallet.pubkey();

        for api in &swap.setup_instructions {
            let instruction = rewrite_instruction(api.to_instruction()?, &wallet);
            if is_budget_instruction(&instruction) {
                continue;
            }
            match created_account(&instruction) {
                Some(address) => {
                    plan.schedule_creation(address, instruction);
                }
                None => plan.push(instruction),
            }
        }

        let data = swap.swap_instruction.decode_data()?;
        let route = rewrite_signers(swap.swap_instruction.account_metas()?, &wallet);
        Ok((data, route))
    }

    // ----- bookkeeping -----

    async fn record_ledger(
        &self,
        fund_address: &Pubkey,
        amount: u64,
        decimals: u8,
        method: LedgerMethod,
        signature: &Signature,
    ) -> RecordOutcome {
        let Some(backend) = self.bookkeeper.as_ref() else {
            return RecordOutcome::Skipped;
        };
        let entry = LedgerEntry {
            fund_address: fund_address.to_string(),
            wallet_address: self.wallet.pubkey().to_string(),
            amount: units_to_f64(amount, decimals),
            method,
            signature: signature.to_string(),
        };
        let entry = &entry;
        let result = with_session(&self.sessions, backend, |session| async move {
            backend.record_ledger(&session, entry).await
        })
        .await;
        record_outcome("ledger", result)
    }

    async fn record_fund(&self, record: FundRecord) -> RecordOutcome {
        let Some(backend) = self.bookkeeper.as_ref() else {
            return RecordOutcome::Skipped;
        };
        let record = &record;
        let result = with_session(&self.sessions, backend, |session| async move {
            backend.record_fund(&session, record).await
        })
        .await;
        record_outcome("fund", result)
    }

    async fn record_trade(&self, record: TradeRecord) -> RecordOutcome {
        let Some(backend) = self.bookkeeper.as_ref() else {
            return RecordOutcome::Skipped;
        };
        let record = &record;
        let result = with_session(&self.sessions, backend, |session| async move {
            backend.record_trade(&session, record).await
        })
        .await;
        record_outcome("trade", result)
    }
}

impl<L, A, B> std::fmt::Debug for FundService<L, A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundService")
            .field("wallet", &self.wallet.pubkey())
            .field("program_id", &self.program.program_id())
            .field("bookkeeping", &self.bookkeeper.is_some())
            .finish_non_exhaustive()
    }
}

fn record_outcome(kind: &str, result: BackendResult<()>) -> RecordOutcome {
    match result {
        Ok(()) => {
            tracing::info!(kind, "Action recorded");
            RecordOutcome::Recorded
        }
        Err(e) => {
            tracing::warn!(kind, error = %e, "Bookkeeping failed, action stands");
            metrics::record_bookkeeping_failure(kind);
            RecordOutcome::Failed(e.to_string())
        }
    }
}

/// Account created by an associated-token-account instruction, if any.
fn created_account(instruction: &solana_sdk::instruction::Instruction) -> Option<Pubkey> {
    if instruction.program_id != spl_associated_token_account::id() {
        return None;
    }
    instruction.accounts.get(1).map(|meta| meta.pubkey)
}

fn expected_output(quote: &Quote, decimals: u8) -> Option<String> {
    quote.out_amount_units().map(|units| format_units(units, decimals))
}

fn parse_address(field: &str, value: &str) -> OrchestratorResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|_| OrchestratorError::Config(format!("{} is not a valid address: '{}'", field, value)))
}

fn positive(amount: u64) -> OrchestratorResult<u64> {
    if amount == 0 {
        return Err(OrchestratorError::setup("amount must be greater than zero"));
    }
    Ok(amount)
}

fn check_fund_id(fund_id: &str) -> OrchestratorResult<()> {
    if fund_id.is_empty() {
        return Err(OrchestratorError::setup("fund id must not be empty"));
    }
    if fund_id.len() > FUND_ID_MAX_LEN {
        return Err(OrchestratorError::setup(format!(
            "fund id '{}' is {} bytes, the limit is {}",
            fund_id,
            fund_id.len(),
            FUND_ID_MAX_LEN
        )));
    }
    Ok(())
}

/// Right-pad with spaces to exactly `len` bytes.
fn pad_field(field: &str, value: &str, len: usize) -> OrchestratorResult<String> {
    if value.len() > len {
        return Err(OrchestratorError::setup(format!(
            "{} '{}' is {} bytes, the limit is {}",
            field,
            value,
            value.len(),
            len
        )));
    }
    let mut padded = value.to_string();
    padded.extend(std::iter::repeat(' ').take(len - value.len()));
    Ok(padded)
}

/// Millisecond timestamp followed by up to four digits taken from the
/// creator address read as base 36.
pub fn generate_fund_id(creator: &Pubkey, now_ms: u128) -> String {
    let encoded = creator.to_string();
    let tail = &encoded[encoded.len().saturating_sub(4)..];
    let numeric = u64::from_str_radix(tail, 36)
        .map(|n| n.to_string())
        .unwrap_or_default();
    let suffix = &numeric[numeric.len().saturating_sub(4)..];
    format!("{}{}", now_ms, suffix)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
