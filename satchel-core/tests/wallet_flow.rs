//! End-to-end wallet flows against a canned provider: discovery, history
//! loading with ancestor backfill, sending, and snapshot reload.

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use satchel_core::{
    accounts_from_mnemonic, AddressSummary, ChainDataProvider, CreateTxOptions, IncomingTx,
    NetworkParams, Result, TxRecord, UnspentInfo, Wallet, WalletError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

struct MockProvider {
    /// address -> (tx_count, balance)
    summaries: HashMap<String, (u32, u64)>,
    /// address -> records returned by `address_transactions`
    address_txs: HashMap<String, Vec<TxRecord>>,
    /// txid -> record returned by `transactions`
    lookup: HashMap<Txid, TxRecord>,
    propagated: Mutex<Vec<String>>,
    fail_propagate: bool,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            summaries: HashMap::new(),
            address_txs: HashMap::new(),
            lookup: HashMap::new(),
            propagated: Mutex::new(Vec::new()),
            fail_propagate: false,
        }
    }
}

#[async_trait]
impl ChainDataProvider for MockProvider {
    async fn address_summaries(&self, addresses: &[Address]) -> Result<Vec<AddressSummary>> {
        Ok(addresses
            .iter()
            .map(|a| {
                let key = a.to_string();
                let (tx_count, balance) = self.summaries.get(&key).copied().unwrap_or((0, 0));
                AddressSummary {
                    address: key,
                    tx_count,
                    balance,
                }
            })
            .collect())
    }

    async fn address_transactions(&self, addresses: &[Address]) -> Result<Vec<TxRecord>> {
        let mut records = Vec::new();
        for address in addresses {
            if let Some(txs) = self.address_txs.get(&address.to_string()) {
                records.extend(txs.iter().cloned());
            }
        }
        Ok(records)
    }

    async fn unspents(&self, _: &[Address]) -> Result<Vec<UnspentInfo>> {
        Ok(vec![])
    }

    async fn transactions(&self, ids: &[Txid]) -> Result<Vec<TxRecord>> {
        Ok(ids.iter().filter_map(|id| self.lookup.get(id).cloned()).collect())
    }

    async fn propagate(&self, raw_tx_hex: &str) -> Result<()> {
        if self.fail_propagate {
            return Err(WalletError::broadcast("mempool rejected transaction"));
        }
        self.propagated.lock().unwrap().push(raw_tx_hex.to_string());
        Ok(())
    }
}

fn tx(inputs: &[(Txid, u32)], outputs: &[(ScriptBuf, u64)]) -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|(txid, vout)| TxIn {
                previous_output: OutPoint {
                    txid: *txid,
                    vout: *vout,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            })
            .collect(),
        output: outputs
            .iter()
            .map(|(spk, value)| TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: spk.clone(),
            })
            .collect(),
    }
}

fn record(tx: &Transaction, confirmations: Option<u32>, block_timestamp: Option<i64>) -> TxRecord {
    TxRecord {
        tx_hex: encode::serialize_hex(tx),
        confirmations,
        block_timestamp,
    }
}

/// Provider state for a wallet with one funded receive address, the
/// funding transaction's parent only reachable through backfill.
fn funded_provider(addr0: &Address) -> (MockProvider, Transaction) {
    let stranger = ScriptBuf::from_bytes(vec![0x51]);

    let parent = tx(&[(Txid::from_byte_array([9; 32]), 0)], &[(stranger, 520_000)]);
    let parent_id = parent.compute_txid();
    let funding = tx(&[(parent_id, 0)], &[(addr0.script_pubkey(), 500_000)]);

    let mut provider = MockProvider::new();
    provider
        .summaries
        .insert(addr0.to_string(), (1, 500_000));
    provider.address_txs.insert(
        addr0.to_string(),
        vec![record(&funding, Some(3), Some(1_400_000_000))],
    );
    provider.lookup.insert(parent_id, record(&parent, Some(10), None));

    (provider, funding)
}

#[tokio::test]
async fn test_open_discovers_and_loads_history() {
    let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
    let addr0 = external.address_at(0).unwrap();
    let (provider, funding) = funded_provider(&addr0);
    let funding_id = funding.compute_txid();

    let wallet = Wallet::open(
        external,
        internal,
        NetworkParams::default(),
        Arc::new(provider),
    )
    .await
    .unwrap();

    assert_eq!(wallet.addresses(), &[addr0]);
    assert!(wallet.change_addresses().is_empty());
    assert_eq!(wallet.balance(0), 500_000);
    assert_eq!(wallet.balance(3), 500_000);
    assert_eq!(wallet.balance(4), 0);

    let meta = wallet.tx_metadata(&funding_id).unwrap();
    assert_eq!(meta.confirmations, Some(3));
    assert_eq!(meta.value, Some(500_000));
    // The parent was backfilled, so the fee is computable: 520k in, 500k out.
    assert_eq!(meta.fee, Some(20_000));
    assert!(meta.timestamp.is_some());

    let history = wallet.transaction_history();
    assert!(history.iter().any(|tx| tx.compute_txid() == funding_id));
}

#[tokio::test]
async fn test_open_with_empty_account() {
    let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
    let provider = MockProvider::new();

    let wallet = Wallet::open(
        external,
        internal,
        NetworkParams::default(),
        Arc::new(provider),
    )
    .await
    .unwrap();

    assert!(wallet.addresses().is_empty());
    assert!(wallet.change_addresses().is_empty());
    assert_eq!(wallet.balance(0), 0);
    assert!(wallet.transaction_history().is_empty());
}

#[tokio::test]
async fn test_send_broadcasts_then_ingests() {
    let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
    let addr0 = external.address_at(0).unwrap();
    let destination = external.address_at(50).unwrap().to_string();
    let (provider, _) = funded_provider(&addr0);
    let provider = Arc::new(provider);

    let mut wallet = Wallet::open(
        external,
        internal,
        NetworkParams::default(),
        provider.clone(),
    )
    .await
    .unwrap();

    let outgoing = wallet
        .create_tx(&destination, 100_000, CreateTxOptions::default())
        .unwrap();
    let txid = wallet.send_tx(outgoing).await.unwrap();

    // The raw hex reached the provider before any local mutation.
    let propagated = provider.propagated.lock().unwrap();
    assert_eq!(propagated.len(), 1);
    let broadcast: Transaction =
        encode::deserialize(&hex::decode(&propagated[0]).unwrap()).unwrap();
    assert_eq!(broadcast.compute_txid(), txid);
    drop(propagated);

    // Change went to the first change address, growing that window.
    assert_eq!(wallet.change_addresses().len(), 1);
    let meta = wallet.tx_metadata(&txid).unwrap();
    assert_eq!(meta.fee, Some(10_000));
    assert_eq!(meta.value, Some(-100_000));
    assert_eq!(meta.confirmations, None);
}

#[tokio::test]
async fn test_failed_broadcast_does_not_mutate_state() {
    let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
    let addr0 = external.address_at(0).unwrap();
    let destination = external.address_at(50).unwrap().to_string();
    let (mut provider, _) = funded_provider(&addr0);
    provider.fail_propagate = true;

    let mut wallet = Wallet::open(
        external,
        internal,
        NetworkParams::default(),
        Arc::new(provider),
    )
    .await
    .unwrap();

    let outgoing = wallet
        .create_tx(&destination, 100_000, CreateTxOptions::default())
        .unwrap();
    let txid = outgoing.compute_txid();
    let balance_before = wallet.balance(0);

    let result = wallet.send_tx(outgoing).await;
    assert!(matches!(result, Err(WalletError::Broadcast(_))));
    assert!(wallet.tx_metadata(&txid).is_none());
    assert_eq!(wallet.balance(0), balance_before);
    assert!(wallet.change_addresses().is_empty());
}

#[tokio::test]
async fn test_snapshot_reload_skips_discovery() {
    let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
    let addr0 = external.address_at(0).unwrap();
    let (provider, _) = funded_provider(&addr0);

    let wallet = Wallet::open(
        external,
        internal,
        NetworkParams::default(),
        Arc::new(provider),
    )
    .await
    .unwrap();

    let json = wallet.serialize().unwrap();

    // Reload against a provider that knows nothing; no discovery runs.
    let restored = Wallet::deserialize(&json, Arc::new(MockProvider::new())).unwrap();
    assert_eq!(restored.addresses(), wallet.addresses());
    assert_eq!(restored.balance(0), wallet.balance(0));
    assert_eq!(restored.transaction_history().len(), wallet.transaction_history().len());
}

#[tokio::test]
async fn test_processing_observed_incoming_payment() {
    let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
    let addr0 = external.address_at(0).unwrap();
    let (provider, _) = funded_provider(&addr0);

    let mut wallet = Wallet::open(
        external,
        internal,
        NetworkParams::default(),
        Arc::new(provider),
    )
    .await
    .unwrap();

    // A payment to the next receive address arrives from the network.
    let next = wallet.next_address().unwrap();
    let incoming = tx(
        &[(Txid::from_byte_array([5; 32]), 1)],
        &[(next.script_pubkey(), 75_000)],
    );

    wallet
        .process_txs(vec![IncomingTx {
            tx: incoming,
            confirmations: Some(0),
            timestamp: None,
        }])
        .unwrap();

    assert_eq!(wallet.addresses().len(), 2);
    assert_eq!(wallet.addresses()[1], next);
    assert_eq!(wallet.balance(0), 575_000);
}
