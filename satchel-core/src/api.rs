//! Remote chain-data provider: the wallet's only window onto the chain.
//!
//! The provider is a trait object so the wallet can run against the HTTP
//! client in production and canned fixtures in tests. Retry and backoff
//! policy, if any, lives behind this boundary; the wallet itself never
//! retries.

use crate::error::{Result, WalletError};
use async_trait::async_trait;
use bitcoin::{Address, Txid};
use serde::{Deserialize, Serialize};

/// Per-address usage summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub address: String,
    pub tx_count: u32,
    pub balance: u64,
}

/// A raw transaction with the chain facts the provider knows about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRecord {
    pub tx_hex: String,
    #[serde(default)]
    pub confirmations: Option<u32>,
    /// Unix seconds of the containing block, when confirmed.
    #[serde(default)]
    pub block_timestamp: Option<i64>,
}

/// An unspent output as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentInfo {
    pub address: String,
    pub tx_id: String,
    pub vout: u32,
    pub value: u64,
    #[serde(default)]
    pub confirmations: Option<u32>,
}

#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Usage summaries for a batch of addresses, one call.
    async fn address_summaries(&self, addresses: &[Address]) -> Result<Vec<AddressSummary>>;

    /// Every transaction touching any of the given addresses.
    async fn address_transactions(&self, addresses: &[Address]) -> Result<Vec<TxRecord>>;

    /// Unspent outputs of the given addresses.
    async fn unspents(&self, addresses: &[Address]) -> Result<Vec<UnspentInfo>>;

    /// Raw transaction lookup by id.
    async fn transactions(&self, ids: &[Txid]) -> Result<Vec<TxRecord>>;

    /// Broadcast a raw transaction. Resolves only once the provider has
    /// accepted it.
    async fn propagate(&self, raw_tx_hex: &str) -> Result<()>;
}

/// HTTP implementation of [`ChainDataProvider`] against the satchel chain
/// API (JSON over POST).
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        if base_url.is_empty() {
            return Err(WalletError::config("Provider URL cannot be empty"));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| WalletError::api(format!("{}: {}", path, e)))?;

        Ok(response.json::<T>().await?)
    }

    fn address_body(addresses: &[Address]) -> serde_json::Value {
        let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        serde_json::json!({ "addresses": addresses })
    }
}

#[async_trait]
impl ChainDataProvider for HttpClient {
    async fn address_summaries(&self, addresses: &[Address]) -> Result<Vec<AddressSummary>> {
        self.post("addresses/summary", Self::address_body(addresses))
            .await
    }

    async fn address_transactions(&self, addresses: &[Address]) -> Result<Vec<TxRecord>> {
        self.post("addresses/transactions", Self::address_body(addresses))
            .await
    }

    async fn unspents(&self, addresses: &[Address]) -> Result<Vec<UnspentInfo>> {
        self.post("addresses/unspents", Self::address_body(addresses))
            .await
    }

    async fn transactions(&self, ids: &[Txid]) -> Result<Vec<TxRecord>> {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.post("transactions/get", serde_json::json!({ "ids": ids }))
            .await
    }

    async fn propagate(&self, raw_tx_hex: &str) -> Result<()> {
        let url = format!("{}/transactions/propagate", self.base_url);
        self.client
            .post(&url)
            .json(&serde_json::json!({ "hex": raw_tx_hex }))
            .send()
            .await
            .map_err(|e| WalletError::broadcast(e.to_string()))?
            .error_for_status()
            .map_err(|e| WalletError::broadcast(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Provider that refuses every call; for tests that never touch the
    /// network.
    pub(crate) struct NullProvider;

    #[async_trait]
    impl ChainDataProvider for NullProvider {
        async fn address_summaries(&self, _: &[Address]) -> Result<Vec<AddressSummary>> {
            Err(WalletError::api("network disabled in tests"))
        }

        async fn address_transactions(&self, _: &[Address]) -> Result<Vec<TxRecord>> {
            Err(WalletError::api("network disabled in tests"))
        }

        async fn unspents(&self, _: &[Address]) -> Result<Vec<UnspentInfo>> {
            Err(WalletError::api("network disabled in tests"))
        }

        async fn transactions(&self, _: &[Txid]) -> Result<Vec<TxRecord>> {
            Err(WalletError::api("network disabled in tests"))
        }

        async fn propagate(&self, _: &str) -> Result<()> {
            Err(WalletError::broadcast("network disabled in tests"))
        }
    }
}
