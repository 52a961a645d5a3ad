use crate::error::{Result, WalletError};
use bitcoin::{Network, Transaction};
use serde::{Deserialize, Serialize};

/// Network-level parameters used by validation, fee estimation and the
/// provider client. Passed explicitly to every operation that needs it;
/// nothing here is ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkParams {
    pub network: Network,
    /// Outputs at or below this value are rejected (sends) or folded into
    /// the fee (change).
    pub dust_threshold: u64,
    /// Value given to the placeholder change output while estimating fees.
    pub dust_soft_threshold: u64,
    /// Flat fee per started kilobyte of raw transaction size.
    pub fee_per_kb: u64,
    /// Base URL of the chain data provider.
    pub provider_url: String,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            network: Network::Regtest,
            dust_threshold: 546,
            dust_soft_threshold: 0,
            fee_per_kb: 10_000,
            provider_url: "http://localhost:3000".to_string(),
        }
    }
}

impl NetworkParams {
    pub fn new(network: Network) -> Self {
        let mut params = Self::default();
        params.network = network;
        params.provider_url = match network {
            Network::Bitcoin => "https://chain.satchel.example/btc".to_string(),
            Network::Testnet => "https://chain.satchel.example/tbtc".to_string(),
            _ => params.provider_url,
        };
        params
    }

    /// Canonical name used in snapshots ("bitcoin", "testnet", ...).
    pub fn network_name(&self) -> String {
        self.network.to_string()
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let network: Network = name
            .parse()
            .map_err(|_| WalletError::config(format!("Unknown network name '{}'", name)))?;
        Ok(Self::new(network))
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider_url.is_empty() {
            return Err(WalletError::config("Provider URL cannot be empty"));
        }

        if self.fee_per_kb == 0 {
            return Err(WalletError::config("Fee per kB must be greater than 0"));
        }

        Ok(())
    }

    /// Size-based fee for a fully assembled (but possibly unsigned)
    /// transaction: every started kilobyte costs `fee_per_kb`.
    pub fn estimate_fee(&self, tx: &Transaction) -> u64 {
        let size = tx.total_size() as u64;
        size.div_ceil(1000) * self.fee_per_kb
    }
}
