//! Fund orchestrator CLI.
//!
//! ```text
//!   CLI args ──▶ config (TOML + validation) ──▶ logging / metrics
//!                                    │
//!                                    ▼
//!                             ┌─────────────┐
//!   keypair file ───────────▶ │ FundService │ ──▶ JSON on stdout
//!                             └──────┬──────┘
//!                                    │
//!           ┌────────────────────────┼────────────────────────┐
//!           ▼                        ▼                        ▼
//!   BlockchainClient           JupiterClient            BackendClient
//!   (RPC + failover)        (quotes, retry policy)   (bookkeeping, optional)
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use fund_orchestrator::blockchain::{BlockchainClient, Wallet};
use fund_orchestrator::bookkeeping::BackendClient;
use fund_orchestrator::config::load_config;
use fund_orchestrator::observability::{logging, metrics};
use fund_orchestrator::orchestrator::{CreateFundParams, FundService, OrchestratorError};
use fund_orchestrator::quoting::JupiterClient;
use fund_orchestrator::resilience::RetryPolicy;

#[derive(Parser)]
#[command(name = "fund-orchestrator")]
#[command(about = "Drive the fund program: deposits, redemptions, trades and admin sweeps", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "fund-orchestrator.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configured manager's fee account
    Init,
    /// Create a fund and mint its token
    CreateFund {
        #[arg(long)]
        name: String,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        description: String,
        /// Target raise in SOL
        #[arg(long)]
        target: String,
        /// Annual management fee, stored as the invest threshold
        #[arg(long, default_value = "0")]
        management_fee: String,
        /// Explicit fund id; generated when omitted
        #[arg(long)]
        fund_id: Option<String>,
        /// Image file uploaded with the fund record
        #[arg(long)]
        logo: Option<PathBuf>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        telegram: Option<String>,
        #[arg(long)]
        twitter: Option<String>,
        #[arg(long)]
        manager_telegram: Option<String>,
    },
    /// Deposit SOL into a fund
    Deposit {
        fund_id: String,
        /// Amount in SOL
        amount: String,
        /// Fund creator; defaults to the wallet
        #[arg(long)]
        creator: Option<String>,
    },
    /// Redeem fund tokens
    Redeem {
        fund_id: String,
        amount: String,
        #[arg(long)]
        creator: Option<String>,
    },
    /// Swap SOL from the fund vault into a token
    Trade {
        fund_id: String,
        /// Amount of SOL to swap
        amount: String,
        /// Output token symbol or mint
        #[arg(long, default_value = "USDC")]
        token: String,
    },
    /// Redeem through a USDC to SOL swap
    RedeemTrade {
        fund_id: String,
        amount: String,
        #[arg(long)]
        creator: Option<String>,
    },
    /// Show decoded fund state
    Details {
        fund_id: String,
        #[arg(long)]
        creator: Option<String>,
    },
    /// Show deposits grouped by depositor
    Deposits {
        fund_id: String,
        #[arg(long)]
        creator: Option<String>,
    },
    /// Move all vault SOL to the treasury
    WithdrawAll { fund_id: String },
    /// Swap fund USDC back to SOL
    UsdcToSol {
        fund_id: String,
        /// Amount in USDC
        amount: String,
    },
    /// Sweep vault SOL, program WSOL and fund USDC to the treasury
    DrainAll { fund_id: String },
    /// Show wallet and optional fund vault balances
    Balance {
        #[arg(long)]
        fund_id: Option<String>,
    },
    /// Sign in to the bookkeeping API
    Login,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if let Some(logs) = e.downcast_ref::<OrchestratorError>().map(|e| e.logs()) {
            for line in logs {
                eprintln!("  {}", line);
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(config = %cli.config.display(), "fund-orchestrator v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let wallet = Wallet::from_config(&config.wallet)?;
    let ledger = BlockchainClient::new(config.rpc.clone())?;
    let aggregator = JupiterClient::new(config.aggregator.clone(), RetryPolicy::from_config(&config.retries))?;
    let bookkeeper = if config.backend.enabled {
        Some(BackendClient::new(&config.backend)?)
    } else {
        None
    };
    let service = FundService::new(config, wallet, ledger, aggregator, bookkeeper)?;
    let creator = |arg: Option<String>| -> Result<Pubkey, Box<dyn std::error::Error>> {
        match arg {
            Some(value) => Ok(Pubkey::from_str(&value)?),
            None => Ok(service.wallet().pubkey()),
        }
    };

    match cli.command {
        Commands::Init => print_json(&service.initialize_manager().await?)?,
        Commands::CreateFund {
            name,
            ticker,
            description,
            target,
            management_fee,
            fund_id,
            logo,
            website,
            telegram,
            twitter,
            manager_telegram,
        } => {
            let params = CreateFundParams {
                fund_id,
                name,
                ticker,
                description,
                target_amount: target,
                management_fee,
                logo,
                website,
                telegram,
                twitter,
                manager_telegram,
            };
            print_json(&service.create_fund(params).await?)?
        }
        Commands::Deposit { fund_id, amount, creator: c } => {
            print_json(&service.deposit(&fund_id, &creator(c)?, &amount).await?)?
        }
        Commands::Redeem { fund_id, amount, creator: c } => {
            print_json(&service.redeem(&fund_id, &creator(c)?, &amount).await?)?
        }
        Commands::Trade { fund_id, amount, token } => print_json(&service.trade(&fund_id, &amount, &token).await?)?,
        Commands::RedeemTrade { fund_id, amount, creator: c } => {
            print_json(&service.redeem_trade(&fund_id, &creator(c)?, &amount).await?)?
        }
        Commands::Details { fund_id, creator: c } => {
            print_json(&service.fund_details(&fund_id, &creator(c)?).await?)?
        }
        Commands::Deposits { fund_id, creator: c } => {
            print_json(&service.fund_deposits(&fund_id, &creator(c)?).await?)?
        }
        Commands::WithdrawAll { fund_id } => match service.withdraw_all(&fund_id).await? {
            Some(receipt) => print_json(&receipt)?,
            None => println!("Fund vault for '{}' is empty, nothing to withdraw", fund_id),
        },
        Commands::UsdcToSol { fund_id, amount } => print_json(&service.usdc_to_sol(&fund_id, &amount).await?)?,
        Commands::DrainAll { fund_id } => print_json(&service.drain_all(&fund_id).await?)?,
        Commands::Balance { fund_id } => print_json(&service.balances(fund_id.as_deref()).await?)?,
        Commands::Login => {
            let session = service.sign_in().await?;
            print_json(&serde_json::json!({
                "wallet": session.wallet,
                "expires_at": session.expires_at,
            }))?
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
