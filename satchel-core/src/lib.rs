//! satchel - client-side hierarchical-deterministic Bitcoin wallet
//!
//! Given an external (receive) and internal (change) HD account and a
//! remote chain-data provider, this library discovers used addresses with
//! a gap-limit scan, rebuilds the wallet's transaction history in a local
//! dependency graph, computes balances, and builds signed outgoing
//! transactions with automatic coin selection and change handling.
//! Wallet state round-trips through a JSON snapshot so discovery does not
//! need to be re-run on every start.

pub mod account;
pub mod api;
pub mod builder;
pub mod config;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod serialize;
pub mod types;
pub mod wallet;

pub use account::{accounts_from_mnemonic, generate_mnemonic, Account};
pub use api::{AddressSummary, ChainDataProvider, HttpClient, TxRecord, UnspentInfo};
pub use builder::CreateTxOptions;
pub use config::NetworkParams;
pub use error::{Result, WalletError};
pub use graph::{FeeAndValue, TxGraph};
pub use serialize::Snapshot;
pub use types::{IncomingTx, TxMetadata, UnspentOutput};
pub use wallet::Wallet;

pub use bitcoin::{Address, Amount, Network, Transaction, Txid};
