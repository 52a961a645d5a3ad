use crate::config::CliContext;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::{Confirm, Password};
use satchel_core::{
    accounts_from_mnemonic, generate_mnemonic, Account, NetworkParams, Result, Snapshot, Wallet,
    WalletError,
};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create a new wallet from a fresh mnemonic
    Create {
        /// Wallet name
        name: String,
        /// Bitcoin network (bitcoin, testnet, regtest)
        #[arg(short, long, default_value = "regtest")]
        network: String,
    },
    /// Import a wallet from a mnemonic
    Import {
        /// Wallet name
        name: String,
        /// Bitcoin network (bitcoin, testnet, regtest)
        #[arg(short, long, default_value = "regtest")]
        network: String,
        /// Mnemonic phrase (will prompt if not provided)
        #[arg(short, long)]
        mnemonic: Option<String>,
    },
    /// List all wallets
    List,
    /// Show wallet information
    Info {
        /// Wallet name
        name: String,
    },
    /// Re-run discovery and history loading against the chain
    Refresh {
        /// Wallet name
        name: String,
    },
    /// Write a wallet's raw snapshot to a file (or stdout)
    Export {
        /// Wallet name
        name: String,
        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a wallet from an exported snapshot file
    Restore {
        /// Wallet name
        name: String,
        /// Snapshot file
        file: PathBuf,
    },
    /// Delete a wallet
    Delete {
        /// Wallet name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn handle_wallet_command(cmd: WalletCommands, ctx: &CliContext) -> Result<()> {
    match cmd {
        WalletCommands::Create { name, network } => {
            ensure_absent(ctx, &name)?;
            let params = network_params(ctx, &network)?;
            let mnemonic = generate_mnemonic()?;
            let (external, internal) = accounts_from_mnemonic(&mnemonic, params.network)?;

            println!("Creating wallet '{}'...", name);
            let provider = ctx.provider_for(&params)?;
            let wallet = Wallet::open(external, internal, params, provider).await?;
            ctx.save_wallet(&name, &wallet)?;

            println!("Wallet created successfully!");
            println!();
            println!("IMPORTANT: Save your mnemonic phrase securely!");
            println!("Mnemonic: {}", mnemonic);
            println!();
            print_info(&name, &wallet)?;
        }

        WalletCommands::Import {
            name,
            network,
            mnemonic,
        } => {
            ensure_absent(ctx, &name)?;
            let params = network_params(ctx, &network)?;

            let mnemonic = match mnemonic {
                Some(m) => m,
                None => Password::new()
                    .with_prompt("Enter mnemonic phrase")
                    .interact()
                    .map_err(|e| WalletError::config(e.to_string()))?,
            };
            let (external, internal) = accounts_from_mnemonic(&mnemonic, params.network)?;

            println!("Importing wallet '{}'...", name);
            let provider = ctx.provider_for(&params)?;
            let wallet = Wallet::open(external, internal, params, provider).await?;
            ctx.save_wallet(&name, &wallet)?;

            println!("Wallet imported successfully!");
            print_info(&name, &wallet)?;
        }

        WalletCommands::List => {
            let names = list_wallets(ctx)?;
            if names.is_empty() {
                println!("No wallets found.");
                println!("Create a new wallet with: satchel wallet create <name>");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Name", "Network", "Status"]);

            for name in names {
                match ctx.load_snapshot(&name) {
                    Ok(snapshot) => {
                        table.add_row(vec![
                            name.as_str(),
                            snapshot.network_name.as_str(),
                            "Available",
                        ]);
                    }
                    Err(_) => {
                        table.add_row(vec![name.as_str(), "Unknown", "Error"]);
                    }
                }
            }

            println!("{}", table);
        }

        WalletCommands::Info { name } => {
            let wallet = ctx.load_wallet(&name)?;
            print_info(&name, &wallet)?;
        }

        WalletCommands::Refresh { name } => {
            let snapshot = ctx.load_snapshot(&name)?;
            let params = NetworkParams::from_name(&snapshot.network_name)?;
            let external = Account::from_base58(&snapshot.external_account, params.network)?;
            let internal = Account::from_base58(&snapshot.internal_account, params.network)?;

            println!("Refreshing wallet '{}'...", name);
            let provider = ctx.provider_for(&params)?;
            let wallet = Wallet::open(external, internal, params, provider).await?;
            ctx.save_wallet(&name, &wallet)?;

            print_info(&name, &wallet)?;
        }

        WalletCommands::Export { name, output } => {
            // Validate before handing the file out.
            let snapshot = ctx.load_snapshot(&name)?;
            let json = serde_json::to_string_pretty(&snapshot)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("Snapshot written to {}", path.display());
                    println!("WARNING: the snapshot contains extended private keys.");
                }
                None => println!("{}", json),
            }
        }

        WalletCommands::Restore { name, file } => {
            ensure_absent(ctx, &name)?;

            let json = std::fs::read_to_string(&file)?;
            let snapshot: Snapshot = serde_json::from_str(&json)?;
            let params = NetworkParams::from_name(&snapshot.network_name)?;
            let provider = ctx.provider_for(&params)?;
            let wallet = Wallet::from_snapshot(snapshot, provider)?;
            ctx.save_wallet(&name, &wallet)?;

            println!("Wallet '{}' restored.", name);
            print_info(&name, &wallet)?;
        }

        WalletCommands::Delete { name, force } => {
            let path = ctx.wallet_path(&name);
            if !path.exists() {
                return Err(WalletError::config(format!("Wallet '{}' not found", name)));
            }

            if !force {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Delete wallet '{}'? Without the mnemonic its funds are unrecoverable",
                        name
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| WalletError::config(e.to_string()))?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            std::fs::remove_file(path)?;
            println!("Wallet '{}' deleted.", name);
        }
    }

    Ok(())
}

fn network_params(ctx: &CliContext, network: &str) -> Result<NetworkParams> {
    let mut params = NetworkParams::from_name(network)?;
    if let Some(url) = &ctx.provider_url {
        params.provider_url = url.clone();
    }
    params.validate()?;
    Ok(params)
}

fn ensure_absent(ctx: &CliContext, name: &str) -> Result<()> {
    if ctx.wallet_path(name).exists() {
        return Err(WalletError::config(format!(
            "Wallet '{}' already exists",
            name
        )));
    }
    Ok(())
}

fn list_wallets(ctx: &CliContext) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !ctx.data_dir.exists() {
        return Ok(names);
    }

    for entry in std::fs::read_dir(&ctx.data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

fn print_info(name: &str, wallet: &Wallet) -> Result<()> {
    println!("Wallet Information:");
    println!("  Name: {}", name);
    println!("  Network: {}", wallet.network_params().network_name());
    println!("  Receive addresses in use: {}", wallet.addresses().len());
    println!(
        "  Change addresses in use: {}",
        wallet.change_addresses().len()
    );
    println!("  Next receive address: {}", wallet.next_address()?);
    println!();
    println!("Balance:");
    println!("  Confirmed: {} sats", wallet.balance(1));
    println!("  Total (incl. unconfirmed): {} sats", wallet.balance(0));
    Ok(())
}
