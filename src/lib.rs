/// Predix - round-based, oracle-settled prediction market
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod codec;
pub mod config;
pub mod handlers;
pub mod ledger;
pub mod market;
pub mod models;
pub mod oracle;
pub mod routes;
pub mod storage;

pub use codec::{Bet, CodecError, Outcome, Round, Side};
pub use config::ServiceConfig;
pub use ledger::{Address, GroupReceipt, Ledger, LedgerError, SignedTxn, Txn, TxnResult, World};
pub use market::{CallResult, ErrorKind, MarketCall, MarketConfig, MarketError, RoundSelector, ROUND_LEN};
pub use oracle::{MockOracle, OracleError, OracleSource};
pub use routes::build_router;
pub use storage::{KeyValueStore, MemoryStore, SledStore, StorageError, StoreBackend};
