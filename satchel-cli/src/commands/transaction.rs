use crate::config::CliContext;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use satchel_core::{CreateTxOptions, Result, WalletError};

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Build, sign and broadcast a payment
    Send {
        /// Wallet name
        wallet: String,
        /// Recipient address
        address: String,
        /// Amount in satoshis
        amount: u64,
        /// Explicit fee in satoshis (estimated when omitted)
        #[arg(short, long)]
        fee: Option<u64>,
        /// Minimum confirmations for spendable inputs
        #[arg(short, long)]
        min_conf: Option<u32>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show transaction history
    History {
        /// Wallet name
        wallet: String,
        /// Number of transactions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

pub async fn handle_transaction_command(cmd: TransactionCommands, ctx: &CliContext) -> Result<()> {
    match cmd {
        TransactionCommands::Send {
            wallet: name,
            address,
            amount,
            fee,
            min_conf,
            yes,
        } => {
            let mut wallet = ctx.load_wallet(&name)?;

            let options = CreateTxOptions {
                fee,
                min_conf,
                utxos: None,
            };
            let tx = wallet.create_tx(&address, amount, options)?;

            let total_in: u64 = wallet.balance(min_conf.unwrap_or(1));
            let fee_paid: u64 = fee.unwrap_or_else(|| wallet.network_params().estimate_fee(&tx));
            println!("Sending {} sats to {}", amount, address);
            println!("  Fee: {} sats", fee_paid);
            println!("  Spendable before send: {} sats", total_in);

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Broadcast this transaction?")
                    .default(false)
                    .interact()
                    .map_err(|e| WalletError::config(e.to_string()))?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            let txid = wallet.send_tx(tx).await?;
            ctx.save_wallet(&name, &wallet)?;

            println!("Transaction sent successfully!");
            println!("Transaction ID: {}", txid);
        }

        TransactionCommands::History { wallet, limit } => {
            let wallet = ctx.load_wallet(&wallet)?;
            let history = wallet.transaction_history();

            if history.is_empty() {
                println!("No transactions.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Txid", "Conf", "Value (sats)", "Fee (sats)", "Time"]);

            for tx in history.iter().take(limit) {
                let txid = tx.compute_txid();
                let meta = wallet.tx_metadata(&txid).cloned().unwrap_or_default();
                table.add_row(vec![
                    txid.to_string(),
                    meta.confirmations
                        .map_or_else(|| "-".to_string(), |c| c.to_string()),
                    meta.value
                        .map_or_else(|| "-".to_string(), |v| v.to_string()),
                    meta.fee.map_or_else(|| "-".to_string(), |f| f.to_string()),
                    meta.timestamp
                        .map_or_else(|| "-".to_string(), |t| t.to_rfc3339()),
                ]);
            }

            println!("{}", table);
        }
    }

    Ok(())
}
