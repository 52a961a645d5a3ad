//! Gap-limit address discovery against the chain data provider.

use crate::account::Account;
use crate::api::ChainDataProvider;
use crate::error::{Result, WalletError};
use bitcoin::Address;

pub const DEFAULT_BATCH_SIZE: u32 = 5;

/// Outcome of scanning one account chain.
#[derive(Debug, Clone)]
pub struct DiscoveredChain {
    /// Addresses confirmed used, truncated to the highest used index + 1.
    /// Unused gaps between used addresses stay in the list.
    pub addresses: Vec<Address>,
    /// Sum of provider-reported balances over every queried address.
    pub balance: u64,
}

/// Scan one chain: derive `batch_size` addresses at a time, query their
/// usage in one call, and stop after the first batch with no used address.
/// Batches are strictly sequential; the stop condition depends on the
/// previous batch's outcome.
pub async fn discover_account(
    provider: &dyn ChainDataProvider,
    account: &Account,
    batch_size: u32,
) -> Result<DiscoveredChain> {
    let batch_size = batch_size.max(1);

    let mut addresses: Vec<Address> = Vec::new();
    let mut balance = 0u64;
    let mut last_used: Option<usize> = None;
    let mut cursor = 0u32;

    loop {
        let mut batch = Vec::with_capacity(batch_size as usize);
        for index in cursor..cursor + batch_size {
            batch.push(account.address_at(index)?);
        }

        let summaries = provider.address_summaries(&batch).await?;
        if summaries.len() != batch.len() {
            return Err(WalletError::discovery(format!(
                "Provider returned {} summaries for {} addresses",
                summaries.len(),
                batch.len()
            )));
        }

        let mut any_used = false;
        for (offset, summary) in summaries.iter().enumerate() {
            balance += summary.balance;
            if summary.tx_count > 0 {
                any_used = true;
                last_used = Some(cursor as usize + offset);
            }
        }

        addresses.append(&mut batch);
        tracing::debug!(cursor, any_used, "discovery batch complete");

        if !any_used {
            break;
        }
        cursor += batch_size;
    }

    let used = last_used.map_or(0, |index| index + 1);
    addresses.truncate(used);
    tracing::info!("Discovered {} addresses", used);

    Ok(DiscoveredChain { addresses, balance })
}

/// Discover both chains of a wallet concurrently. Either chain failing
/// fails the whole discovery; no partial result is returned.
pub async fn discover_accounts(
    provider: &dyn ChainDataProvider,
    external: &Account,
    internal: &Account,
    batch_size: u32,
) -> Result<(DiscoveredChain, DiscoveredChain)> {
    tokio::try_join!(
        discover_account(provider, external, batch_size),
        discover_account(provider, internal, batch_size),
    )
}
