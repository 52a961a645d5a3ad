//! The wallet proper: address windows, transaction graph, metadata and the
//! balance/history/send surface.

use crate::account::Account;
use crate::api::{ChainDataProvider, TxRecord};
use crate::builder::{self, CreateTxOptions};
use crate::config::NetworkParams;
use crate::discovery::{self, DEFAULT_BATCH_SIZE};
use crate::error::{Result, WalletError};
use crate::graph::TxGraph;
use crate::types::{IncomingTx, TxMetadata};
use bitcoin::consensus::encode;
use bitcoin::{Address, PrivateKey, ScriptBuf, Transaction, Txid};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct Wallet {
    pub(crate) external: Account,
    pub(crate) internal: Account,
    pub(crate) params: NetworkParams,
    pub(crate) provider: Arc<dyn ChainDataProvider>,
    /// Receive chain window: addresses derived at [0, len).
    pub(crate) addresses: Vec<Address>,
    /// Change chain window.
    pub(crate) change_addresses: Vec<Address>,
    pub(crate) graph: TxGraph,
    pub(crate) metadata: HashMap<Txid, TxMetadata>,
}

impl Wallet {
    /// Build a wallet by discovering used addresses and loading their
    /// transaction history. Any provider failure aborts construction; no
    /// partial wallet is returned.
    pub async fn open(
        external: Account,
        internal: Account,
        params: NetworkParams,
        provider: Arc<dyn ChainDataProvider>,
    ) -> Result<Self> {
        params.validate()?;

        if external.network() != params.network || internal.network() != params.network {
            return Err(WalletError::invalid_account(format!(
                "Accounts must be for network {}",
                params.network
            )));
        }

        let (external_chain, internal_chain) = discovery::discover_accounts(
            provider.as_ref(),
            &external,
            &internal,
            DEFAULT_BATCH_SIZE,
        )
        .await?;

        tracing::info!(
            addresses = external_chain.addresses.len(),
            change_addresses = internal_chain.addresses.len(),
            balance = external_chain.balance + internal_chain.balance,
            "discovery complete"
        );

        let mut wallet = Self::from_parts(external, internal, params, provider);
        wallet.addresses = external_chain.addresses;
        wallet.change_addresses = internal_chain.addresses;

        let all: Vec<Address> = wallet
            .addresses
            .iter()
            .chain(wallet.change_addresses.iter())
            .cloned()
            .collect();

        if !all.is_empty() {
            let records = fetch_transactions(wallet.provider.as_ref(), &all).await?;
            for (tx, confirmations, timestamp) in records {
                let txid = wallet.graph.add_tx(tx);
                let meta = wallet.metadata.entry(txid).or_default();
                if confirmations.is_some() {
                    meta.confirmations = confirmations;
                }
                if timestamp.is_some() {
                    meta.timestamp = timestamp;
                }
            }
        }

        wallet.recompute();
        Ok(wallet)
    }

    /// Bare wallet around existing parts; windows and graph start empty.
    pub(crate) fn from_parts(
        external: Account,
        internal: Account,
        params: NetworkParams,
        provider: Arc<dyn ChainDataProvider>,
    ) -> Self {
        Self {
            external,
            internal,
            params,
            provider,
            addresses: Vec::new(),
            change_addresses: Vec::new(),
            graph: TxGraph::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn network_params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn change_addresses(&self) -> &[Address] {
        &self.change_addresses
    }

    pub fn graph(&self) -> &TxGraph {
        &self.graph
    }

    pub fn tx_metadata(&self, txid: &Txid) -> Option<&TxMetadata> {
        self.metadata.get(txid)
    }

    /// Next unused receive address.
    pub fn next_address(&self) -> Result<Address> {
        self.external.address_at(self.addresses.len() as u32)
    }

    /// Next unused change address.
    pub fn next_change_address(&self) -> Result<Address> {
        self.internal.address_at(self.change_addresses.len() as u32)
    }

    /// Confirmed spendable balance: positive net values of graph heads with
    /// at least `min_conf` confirmations (unknown counts as zero).
    pub fn balance(&self, min_conf: u32) -> u64 {
        self.graph
            .heads()
            .iter()
            .filter_map(|node| self.metadata.get(&node.txid))
            .filter(|meta| meta.confirmations.unwrap_or(0) >= min_conf)
            .filter_map(|meta| meta.value)
            .filter(|value| *value > 0)
            .map(|value| value as u64)
            .sum()
    }

    /// Signing key for an address in either window. Asking for an address
    /// the wallet does not track is a caller bug and a hard error.
    pub fn private_key_for(&self, address: &Address) -> Result<PrivateKey> {
        if let Some(index) = self.addresses.iter().position(|a| a == address) {
            let (_, key) = self.external.derive(index as u32)?;
            return Ok(key);
        }

        if let Some(index) = self.change_addresses.iter().position(|a| a == address) {
            let (_, key) = self.internal.derive(index as u32)?;
            return Ok(key);
        }

        Err(WalletError::UnknownAddress(address.to_string()))
    }

    /// Absorb newly observed transactions: grow the address windows to
    /// cover every payment destination in the batch, insert into the
    /// graph, upsert metadata and recompute fees/values.
    pub fn process_txs(&mut self, txs: Vec<IncomingTx>) -> Result<()> {
        // Fixed-point window extension: a newly revealed address can itself
        // be paid by another transaction in the same batch, so rescan until
        // a full pass grows nothing. Bounded by the number of outputs.
        loop {
            let next = self.next_address()?;
            let next_change = self.next_change_address()?;
            let next_spk = next.script_pubkey();
            let next_change_spk = next_change.script_pubkey();

            let mut grew = false;
            'batch: for item in &txs {
                for output in &item.tx.output {
                    if output.script_pubkey == next_change_spk {
                        self.change_addresses.push(next_change);
                        grew = true;
                        break 'batch;
                    }
                    if output.script_pubkey == next_spk {
                        self.addresses.push(next);
                        grew = true;
                        break 'batch;
                    }
                }
            }

            if !grew {
                break;
            }
        }

        for item in txs {
            let txid = self.graph.add_tx(item.tx);
            let meta = self.metadata.entry(txid).or_default();
            if item.confirmations.is_some() {
                meta.confirmations = item.confirmations;
            }
            if item.timestamp.is_some() {
                meta.timestamp = item.timestamp;
            }
        }

        self.recompute();
        Ok(())
    }

    pub fn process_tx(&mut self, tx: Transaction) -> Result<()> {
        self.process_txs(vec![IncomingTx::from(tx)])
    }

    /// Transactions with a known net value, least-confirmed first, equal
    /// confirmation counts ordered ancestors-first by graph depth, txid as
    /// the final tiebreak. The comparator must be a total order; `sort_by`
    /// may panic otherwise.
    pub fn transaction_history(&self) -> Vec<Transaction> {
        let mut nodes: Vec<_> = self
            .graph
            .all_nodes()
            .filter(|node| node.tx.is_some())
            .filter(|node| {
                self.metadata
                    .get(&node.txid)
                    .map_or(false, |meta| meta.value.is_some())
            })
            .collect();

        let depths = self.graph.depths();
        nodes.sort_by(|a, b| {
            let conf_a = self.confirmations_or_zero(&a.txid);
            let conf_b = self.confirmations_or_zero(&b.txid);
            conf_a
                .cmp(&conf_b)
                .then_with(|| depths.get(&a.txid).cmp(&depths.get(&b.txid)))
                .then_with(|| a.txid.cmp(&b.txid))
        });

        nodes
            .into_iter()
            .filter_map(|node| node.tx.clone())
            .collect()
    }

    /// Build and sign an outgoing transaction; see [`CreateTxOptions`] for
    /// the fee/min-conf/utxo knobs.
    pub fn create_tx(&self, to: &str, value: u64, options: CreateTxOptions) -> Result<Transaction> {
        builder::create_transaction(self, to, value, &options)
    }

    /// Broadcast a signed transaction and, only on acknowledgment, absorb
    /// it into local state.
    pub async fn send_tx(&mut self, tx: Transaction) -> Result<Txid> {
        let raw = encode::serialize_hex(&tx);
        self.provider.propagate(&raw).await?;

        let txid = tx.compute_txid();
        self.process_tx(tx)?;
        tracing::info!(%txid, "transaction broadcast");
        Ok(txid)
    }

    pub(crate) fn tracked_scripts(&self) -> HashSet<ScriptBuf> {
        self.addresses
            .iter()
            .chain(self.change_addresses.iter())
            .map(|a| a.script_pubkey())
            .collect()
    }

    fn confirmations_or_zero(&self, txid: &Txid) -> u32 {
        self.metadata
            .get(txid)
            .and_then(|meta| meta.confirmations)
            .unwrap_or(0)
    }

    /// Re-run fee/value propagation over the full address window and fold
    /// the results into the metadata map. A negative net value gets the fee
    /// added back so boundary transactions report the economic debit
    /// without double-counting the fee.
    fn recompute(&mut self) {
        let tracked = self.tracked_scripts();
        let computed = self.graph.fees_and_values(&tracked);

        for (txid, meta) in self.metadata.iter_mut() {
            let Some(fv) = computed.get(txid) else {
                continue;
            };

            if let Some(fee) = fv.fee {
                meta.fee = Some(fee);
            }

            let mut value = fv.value;
            if value < 0 {
                value += fv.fee.unwrap_or(0) as i64;
            }
            meta.value = Some(value);
        }
    }
}

/// Fetch every transaction touching `addresses`, then backfill missing
/// ancestors in one extra round so fees can be computed.
async fn fetch_transactions(
    provider: &dyn ChainDataProvider,
    addresses: &[Address],
) -> Result<Vec<(Transaction, Option<u32>, Option<DateTime<Utc>>)>> {
    let records = provider.address_transactions(addresses).await?;
    let mut parsed = parse_records(&records)?;

    let known: HashSet<Txid> = parsed.iter().map(|(tx, _, _)| tx.compute_txid()).collect();
    let mut missing: Vec<Txid> = Vec::new();
    for (tx, _, _) in &parsed {
        for input in &tx.input {
            let prev = input.previous_output;
            if !prev.is_null() && !known.contains(&prev.txid) && !missing.contains(&prev.txid) {
                missing.push(prev.txid);
            }
        }
    }

    if !missing.is_empty() {
        tracing::debug!(count = missing.len(), "backfilling ancestor transactions");
        let ancestors = provider.transactions(&missing).await?;
        parsed.extend(parse_records(&ancestors)?);
    }

    Ok(parsed)
}

fn parse_records(
    records: &[TxRecord],
) -> Result<Vec<(Transaction, Option<u32>, Option<DateTime<Utc>>)>> {
    records
        .iter()
        .map(|record| {
            let bytes = hex::decode(&record.tx_hex)
                .map_err(|e| WalletError::encoding(format!("Invalid transaction hex: {}", e)))?;
            let tx: Transaction = encode::deserialize(&bytes)
                .map_err(|e| WalletError::encoding(format!("Invalid transaction: {}", e)))?;
            let timestamp = record
                .block_timestamp
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            Ok((tx, record.confirmations, timestamp))
        })
        .collect()
}
