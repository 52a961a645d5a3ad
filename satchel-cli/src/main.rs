mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliContext;
use satchel_core::WalletError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "Client-side HD Bitcoin wallet")]
#[command(version)]
struct Cli {
    /// Data directory for wallet snapshots
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Chain-data provider URL (overrides the network default)
    #[arg(short, long, global = true)]
    provider_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet management commands
    #[command(subcommand)]
    Wallet(commands::WalletCommands),

    /// Transaction commands
    #[command(subcommand)]
    Transaction(commands::TransactionCommands),

    /// Balance and address commands
    #[command(subcommand)]
    Balance(commands::BalanceCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "satchel={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("satchel")
    });
    std::fs::create_dir_all(&data_dir)?;

    let ctx = CliContext {
        data_dir,
        provider_url: cli.provider_url,
    };

    let result = match cli.command {
        Commands::Wallet(cmd) => commands::handle_wallet_command(cmd, &ctx).await,
        Commands::Transaction(cmd) => commands::handle_transaction_command(cmd, &ctx).await,
        Commands::Balance(cmd) => commands::handle_balance_command(cmd, &ctx).await,
    };

    if let Err(e) = result {
        match e {
            WalletError::InsufficientFunds { has, needed, pending } => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {} sats (incl. fee), Available: {} sats", needed, has);
                if pending {
                    eprintln!("Unconfirmed funds would cover this; retry with --min-conf 0 or wait for confirmations");
                }
            }
            WalletError::InvalidAddress(msg) => {
                eprintln!("Error: Invalid address: {}", msg);
            }
            WalletError::BelowDust { value, threshold } => {
                eprintln!(
                    "Error: Amount {} sats is at or below the dust threshold ({} sats)",
                    value, threshold
                );
            }
            WalletError::UnknownAddress(addr) => {
                eprintln!("Error: Address {} does not belong to this wallet", addr);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
