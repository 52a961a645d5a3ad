use crate::error::{Result, WalletError};
use bip39::{Language, Mnemonic};
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::{Address, Network, NetworkKind, PrivateKey};
use std::str::FromStr;

/// One HD chain of a wallet (external/receive or internal/change).
///
/// Wraps the chain-level extended private key; children are derived
/// non-hardened at sequential indices. The account never changes after
/// construction; the wallet only moves its own window counters.
#[derive(Clone)]
pub struct Account {
    xprv: Xpriv,
    network: Network,
    secp: Secp256k1<All>,
}

impl Account {
    pub fn new(xprv: Xpriv, network: Network) -> Result<Self> {
        if xprv.network != NetworkKind::from(network) {
            return Err(WalletError::invalid_account(format!(
                "Extended key is for {:?}, wallet network is {}",
                xprv.network, network
            )));
        }

        Ok(Self {
            xprv,
            network,
            secp: Secp256k1::new(),
        })
    }

    pub fn from_base58(encoded: &str, network: Network) -> Result<Self> {
        let xprv = Xpriv::from_str(encoded)?;
        Self::new(xprv, network)
    }

    pub fn to_base58(&self) -> String {
        self.xprv.to_string()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn child(&self, index: u32) -> Result<Xpriv> {
        let child = self
            .xprv
            .derive_priv(&self.secp, &[ChildNumber::from_normal_idx(index)?])?;
        Ok(child)
    }

    /// Address derived at `index`. Invariant: the wallet's address window
    /// at position `index` always equals this.
    pub fn address_at(&self, index: u32) -> Result<Address> {
        let child = self.child(index)?;
        let privkey = PrivateKey::new(child.private_key, self.network);
        let pubkey = privkey.public_key(&self.secp);
        Ok(Address::p2pkh(pubkey.pubkey_hash(), self.network))
    }

    /// Address and signing key for the child at `index`.
    pub fn derive(&self, index: u32) -> Result<(Address, PrivateKey)> {
        let child = self.child(index)?;
        let privkey = PrivateKey::new(child.private_key, self.network);
        let pubkey = privkey.public_key(&self.secp);
        let address = Address::p2pkh(pubkey.pubkey_hash(), self.network);
        Ok((address, privkey))
    }
}

pub fn generate_mnemonic() -> Result<String> {
    let mut rng = bip39::rand::thread_rng();
    let mnemonic = Mnemonic::generate_in_with(&mut rng, Language::English, 24)
        .map_err(|e| WalletError::config(format!("Failed to generate mnemonic: {}", e)))?;
    Ok(mnemonic.to_string())
}

/// External and internal accounts for a BIP44-style wallet:
/// `m/44'/coin'/0'/0` and `m/44'/coin'/0'/1`.
pub fn accounts_from_mnemonic(mnemonic: &str, network: Network) -> Result<(Account, Account)> {
    let mnemonic = Mnemonic::parse_in(Language::English, mnemonic)
        .map_err(|e| WalletError::config(format!("Invalid mnemonic: {}", e)))?;

    let seed = mnemonic.to_seed("");
    let secp = Secp256k1::new();
    let master = Xpriv::new_master(network, &seed)?;

    let coin = match network {
        Network::Bitcoin => 0,
        _ => 1,
    };

    let external_path = DerivationPath::from_str(&format!("m/44'/{}'/0'/0", coin))?;
    let internal_path = DerivationPath::from_str(&format!("m/44'/{}'/0'/1", coin))?;

    let external = Account::new(master.derive_priv(&secp, &external_path)?, network)?;
    let internal = Account::new(master.derive_priv(&secp, &internal_path)?, network)?;
    Ok((external, internal))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_derivation_is_deterministic() {
        let (external, _) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();

        let a = external.address_at(0).unwrap();
        let b = external.address_at(0).unwrap();
        assert_eq!(a, b);

        let c = external.address_at(1).unwrap();
        assert_ne!(a, c);

        let (addr, _key) = external.derive(0).unwrap();
        assert_eq!(addr, a);
    }

    #[test]
    fn test_chains_are_independent() {
        let (external, internal) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
        assert_ne!(
            external.address_at(0).unwrap(),
            internal.address_at(0).unwrap()
        );
    }

    #[test]
    fn test_base58_round_trip() {
        let (external, _) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
        let encoded = external.to_base58();

        let restored = Account::from_base58(&encoded, Network::Regtest).unwrap();
        assert_eq!(
            restored.address_at(3).unwrap(),
            external.address_at(3).unwrap()
        );
    }

    #[test]
    fn test_network_mismatch_rejected() {
        let (external, _) = accounts_from_mnemonic(MNEMONIC, Network::Regtest).unwrap();
        let encoded = external.to_base58();
        assert!(Account::from_base58(&encoded, Network::Bitcoin).is_err());
    }
}
