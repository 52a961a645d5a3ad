use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Address discovery failed: {0}")]
    Discovery(String),

    #[error("Chain data provider error: {0}")]
    Api(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{value} must be above dust threshold ({threshold} satoshis)")]
    BelowDust { value: u64, threshold: u64 },

    #[error("Invalid unspent output: {0}")]
    InvalidUtxo(String),

    #[error("Not enough funds (incl. fee): {has} < {needed}")]
    InsufficientFunds {
        has: u64,
        needed: u64,
        /// Whether zero-confirmation outputs would have covered the target.
        pending: bool,
    },

    #[error("Unknown address: {0}. Make sure the address is from the keychain and has been generated")]
    UnknownAddress(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Key derivation error: {0}")]
    Derivation(#[from] bitcoin::bip32::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WalletError {
    pub fn invalid_account(msg: impl Into<String>) -> Self {
        Self::InvalidAccount(msg.into())
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn invalid_utxo(msg: impl Into<String>) -> Self {
        Self::InvalidUtxo(msg.into())
    }

    pub fn broadcast(msg: impl Into<String>) -> Self {
        Self::Broadcast(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}
