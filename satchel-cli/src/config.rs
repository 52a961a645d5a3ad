use satchel_core::{HttpClient, NetworkParams, Result, Snapshot, Wallet, WalletError};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared command context: where snapshots live and which provider to use.
pub struct CliContext {
    pub data_dir: PathBuf,
    pub provider_url: Option<String>,
}

impl CliContext {
    pub fn wallet_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    pub fn provider_for(&self, params: &NetworkParams) -> Result<Arc<HttpClient>> {
        let url = self
            .provider_url
            .as_deref()
            .unwrap_or(&params.provider_url);
        Ok(Arc::new(HttpClient::new(url)?))
    }

    pub fn load_snapshot(&self, name: &str) -> Result<Snapshot> {
        let path = self.wallet_path(name);
        if !path.exists() {
            return Err(WalletError::config(format!("Wallet '{}' not found", name)));
        }

        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load a wallet from its snapshot; no discovery is run.
    pub fn load_wallet(&self, name: &str) -> Result<Wallet> {
        let snapshot = self.load_snapshot(name)?;
        let params = NetworkParams::from_name(&snapshot.network_name)?;
        let provider = self.provider_for(&params)?;
        Wallet::from_snapshot(snapshot, provider)
    }

    pub fn save_wallet(&self, name: &str, wallet: &Wallet) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        // TODO: encrypt snapshots at rest; they contain extended private keys.
        std::fs::write(self.wallet_path(name), wallet.serialize()?)?;
        Ok(())
    }
}
