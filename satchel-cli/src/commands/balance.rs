use crate::config::CliContext;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use satchel_core::{ChainDataProvider, Result};

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Show wallet balance
    Show {
        /// Wallet name
        wallet: String,
        /// Minimum confirmations to count an output as spendable
        #[arg(short, long, default_value = "1")]
        min_conf: u32,
    },
    /// Show the next address for receiving funds
    Address {
        /// Wallet name
        wallet: String,
        /// Show the next change address instead
        #[arg(short, long)]
        change: bool,
    },
    /// List unspent outputs as reported by the chain provider
    Unspents {
        /// Wallet name
        wallet: String,
    },
}

pub async fn handle_balance_command(cmd: BalanceCommands, ctx: &CliContext) -> Result<()> {
    match cmd {
        BalanceCommands::Show { wallet, min_conf } => {
            let wallet = ctx.load_wallet(&wallet)?;

            println!("Balance at {} confirmation(s):", min_conf);
            println!("  Spendable: {} sats", wallet.balance(min_conf));
            println!("  Total (incl. unconfirmed): {} sats", wallet.balance(0));
        }

        BalanceCommands::Address { wallet, change } => {
            let wallet = ctx.load_wallet(&wallet)?;
            if change {
                println!("{}", wallet.next_change_address()?);
            } else {
                println!("{}", wallet.next_address()?);
            }
        }

        BalanceCommands::Unspents { wallet } => {
            let wallet = ctx.load_wallet(&wallet)?;
            let provider = ctx.provider_for(wallet.network_params())?;

            let all: Vec<_> = wallet
                .addresses()
                .iter()
                .chain(wallet.change_addresses().iter())
                .cloned()
                .collect();
            if all.is_empty() {
                println!("No addresses in use.");
                return Ok(());
            }

            let unspents = provider.unspents(&all).await?;
            if unspents.is_empty() {
                println!("No unspent outputs.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Address", "Txid", "Vout", "Value (sats)", "Conf"]);

            let mut total = 0u64;
            for utxo in &unspents {
                total += utxo.value;
                table.add_row(vec![
                    utxo.address.clone(),
                    utxo.tx_id.clone(),
                    utxo.vout.to_string(),
                    utxo.value.to_string(),
                    utxo.confirmations
                        .map_or_else(|| "-".to_string(), |c| c.to_string()),
                ]);
            }

            println!("{}", table);
            println!("Total: {} sats across {} outputs", total, unspents.len());
        }
    }

    Ok(())
}
