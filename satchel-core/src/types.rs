use bitcoin::{Address, Transaction, Txid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wallet-local metadata tracked per transaction in the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxMetadata {
    /// None = unknown / not yet verified against the chain.
    pub confirmations: Option<u32>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Net satoshi delta to the wallet; negative when the wallet is a net
    /// sender. Recomputed whenever the address window or graph changes.
    pub value: Option<i64>,
    /// Only present when every input of the transaction is resolvable in
    /// the graph.
    pub fee: Option<u64>,
}

/// One observed transaction handed to `Wallet::process_txs`, with whatever
/// chain facts the caller happens to know.
#[derive(Debug, Clone)]
pub struct IncomingTx {
    pub tx: Transaction,
    pub confirmations: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<Transaction> for IncomingTx {
    fn from(tx: Transaction) -> Self {
        Self {
            tx,
            confirmations: None,
            timestamp: None,
        }
    }
}

/// A spendable output candidate. Derived from the graph (or supplied
/// explicitly by the caller), never stored.
#[derive(Debug, Clone)]
pub struct UnspentOutput {
    pub txid: Txid,
    pub vout: u32,
    pub address: Address,
    pub value: u64,
    pub confirmations: Option<u32>,
}
