pub mod balance;
pub mod transaction;
pub mod wallet;

pub use balance::{handle_balance_command, BalanceCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};
pub use wallet::{handle_wallet_command, WalletCommands};
