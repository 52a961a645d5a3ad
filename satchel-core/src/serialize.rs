//! Snapshot persistence: everything needed to rebuild a wallet without
//! re-running discovery.
//!
//! Addresses are never stored; only the window lengths are. Both windows
//! are re-derived on load so they can never drift from the accounts.

use crate::account::Account;
use crate::api::ChainDataProvider;
use crate::config::NetworkParams;
use crate::error::{Result, WalletError};
use crate::types::TxMetadata;
use crate::wallet::Wallet;
use bitcoin::consensus::encode;
use bitcoin::{Transaction, Txid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Base58 extended key of the receive chain.
    pub external_account: String,
    /// Base58 extended key of the change chain.
    pub internal_account: String,
    /// Receive window length (next unused derivation index).
    pub address_index: u32,
    /// Change window length.
    pub change_address_index: u32,
    pub network_name: String,
    /// Raw hex of every materialized transaction in the graph.
    pub txs: Vec<String>,
    /// Metadata keyed by txid.
    pub tx_metadata: HashMap<String, TxMetadata>,
}

impl Wallet {
    pub fn to_snapshot(&self) -> Snapshot {
        let txs = self
            .graph
            .all_nodes()
            .filter_map(|node| node.tx.as_ref())
            .map(encode::serialize_hex)
            .collect();

        let tx_metadata = self
            .metadata
            .iter()
            .map(|(txid, meta)| (txid.to_string(), meta.clone()))
            .collect();

        Snapshot {
            external_account: self.external.to_base58(),
            internal_account: self.internal.to_base58(),
            address_index: self.addresses.len() as u32,
            change_address_index: self.change_addresses.len() as u32,
            network_name: self.params.network_name(),
            txs,
            tx_metadata,
        }
    }

    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_snapshot())?)
    }

    pub fn from_snapshot(
        snapshot: Snapshot,
        provider: Arc<dyn ChainDataProvider>,
    ) -> Result<Wallet> {
        let params = NetworkParams::from_name(&snapshot.network_name)?;
        let external = Account::from_base58(&snapshot.external_account, params.network)?;
        let internal = Account::from_base58(&snapshot.internal_account, params.network)?;

        let mut wallet = Wallet::from_parts(external, internal, params, provider);

        for index in 0..snapshot.address_index {
            wallet.addresses.push(wallet.external.address_at(index)?);
        }
        for index in 0..snapshot.change_address_index {
            wallet
                .change_addresses
                .push(wallet.internal.address_at(index)?);
        }

        for tx_hex in &snapshot.txs {
            let bytes = hex::decode(tx_hex)
                .map_err(|e| WalletError::encoding(format!("Invalid transaction hex: {}", e)))?;
            let tx: Transaction = encode::deserialize(&bytes)
                .map_err(|e| WalletError::encoding(format!("Invalid transaction: {}", e)))?;
            wallet.graph.add_tx(tx);
        }

        for (txid, meta) in snapshot.tx_metadata {
            let txid = Txid::from_str(&txid)
                .map_err(|e| WalletError::encoding(format!("Invalid txid '{}': {}", txid, e)))?;
            wallet.metadata.insert(txid, meta);
        }

        Ok(wallet)
    }

    pub fn deserialize(json: &str, provider: Arc<dyn ChainDataProvider>) -> Result<Wallet> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testutil::NullProvider;
    use crate::types::IncomingTx;
    use crate::wallet::tests::{offline_wallet, pay_to};
    use chrono::{DateTime, Utc};
    use std::collections::HashSet;

    fn populated_wallet() -> Wallet {
        let mut wallet = offline_wallet();
        let a0 = wallet.external.address_at(0).unwrap();
        let a1 = wallet.external.address_at(1).unwrap();
        let change = wallet.internal.address_at(0).unwrap();

        let timestamp: Option<DateTime<Utc>> = DateTime::from_timestamp(1_400_000_000, 0);
        wallet
            .process_txs(vec![
                IncomingTx {
                    tx: pay_to(&a0, 400_000, 1),
                    confirmations: Some(12),
                    timestamp,
                },
                IncomingTx {
                    tx: pay_to(&a1, 250_000, 2),
                    confirmations: Some(3),
                    timestamp: None,
                },
                IncomingTx {
                    tx: pay_to(&change, 90_000, 3),
                    confirmations: None,
                    timestamp: None,
                },
            ])
            .unwrap();
        wallet
    }

    #[test]
    fn test_round_trip_preserves_wallet_state() {
        let wallet = populated_wallet();
        let json = wallet.serialize().unwrap();

        let restored = Wallet::deserialize(&json, Arc::new(NullProvider)).unwrap();

        assert_eq!(restored.addresses(), wallet.addresses());
        assert_eq!(restored.change_addresses(), wallet.change_addresses());
        assert_eq!(
            restored.network_params().network,
            wallet.network_params().network
        );
        assert_eq!(restored.external.to_base58(), wallet.external.to_base58());
        assert_eq!(restored.internal.to_base58(), wallet.internal.to_base58());

        let heads = |w: &Wallet| -> HashSet<Txid> {
            w.graph().heads().iter().map(|n| n.txid).collect()
        };
        assert_eq!(heads(&restored), heads(&wallet));
        assert_eq!(restored.graph().node_count(), wallet.graph().node_count());

        for node in wallet.graph().all_nodes() {
            assert_eq!(
                restored.tx_metadata(&node.txid),
                wallet.tx_metadata(&node.txid)
            );
        }
    }

    #[test]
    fn test_round_trip_preserves_balance_and_selection_inputs() {
        let wallet = populated_wallet();
        let json = wallet.serialize().unwrap();
        let restored = Wallet::deserialize(&json, Arc::new(NullProvider)).unwrap();

        assert_eq!(restored.balance(0), wallet.balance(0));
        assert_eq!(restored.balance(4), wallet.balance(4));
        assert_eq!(
            restored.next_address().unwrap(),
            wallet.next_address().unwrap()
        );
        assert_eq!(
            restored.next_change_address().unwrap(),
            wallet.next_change_address().unwrap()
        );
    }

    #[test]
    fn test_snapshot_field_names_are_stable() {
        let wallet = populated_wallet();
        let json = wallet.serialize().unwrap();
        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();

        for field in [
            "externalAccount",
            "internalAccount",
            "addressIndex",
            "changeAddressIndex",
            "networkName",
            "txs",
            "txMetadata",
        ] {
            assert!(raw.get(field).is_some(), "missing snapshot field {}", field);
        }

        assert_eq!(raw["addressIndex"], 2);
        assert_eq!(raw["changeAddressIndex"], 1);
        assert_eq!(raw["networkName"], "regtest");
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(Wallet::deserialize("not json", Arc::new(NullProvider)).is_err());

        let mut snapshot = populated_wallet().to_snapshot();
        snapshot.txs.push("zz".to_string());
        assert!(Wallet::from_snapshot(snapshot, Arc::new(NullProvider)).is_err());
    }
}
