// Application state management

use std::collections::BTreeMap;
use std::fs;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::ServiceConfig;
use crate::ledger::{Address, Ledger, LedgerError, WORLD_KEY};
use crate::storage::{KeyValueStore, MemoryStore, SledStore, StoreBackend};

pub type SharedState = Arc<Mutex<AppState>>;

/// Account that deploys the oracle and the market and feeds prices
pub const OPERATOR_ACCOUNT: &str = "OPERATOR";

/// Name accepted wherever an address is expected, meaning the market custody
pub const MARKET_ACCOUNT: &str = "MARKET";

const SLED_DIR: &str = "sled";

pub struct AppState {
    pub ledger: Ledger<StoreBackend>,
    pub config: ServiceConfig,
    pub operator: Address,
    pub oracle_ref: u64,
    /// Named accounts → addresses
    pub accounts: BTreeMap<String, Address>,
}

impl AppState {
    /// Open storage, resume the committed world if any, and deploy the oracle
    /// and the market on a fresh store.
    pub fn new(config: ServiceConfig) -> Result<Self, LedgerError> {
        info!("🚀 Initializing Predix round market...");

        let store = match &config.data_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| LedgerError::Snapshot(format!("{}: {}", dir.display(), e)))?;
                StoreBackend::Sled(SledStore::open(dir.join(SLED_DIR))?)
            }
            None => StoreBackend::Memory(MemoryStore::new()),
        };

        let resumed = store.get(WORLD_KEY)?.is_some();
        let mut ledger = Ledger::open(store)?;
        info!(backend = ledger.store().describe(), resumed, height = ledger.height(), "storage ready");

        let operator = Address::from_seed(OPERATOR_ACCOUNT);
        let mut accounts = BTreeMap::new();
        accounts.insert(OPERATOR_ACCOUNT.to_string(), operator);
        for name in &config.genesis_accounts {
            accounts.insert(name.clone(), Address::from_seed(name));
        }

        let oracle_ref = match ledger.market_config()? {
            Some(market_config) => {
                if ledger.market_app_id().is_none() {
                    return Err(LedgerError::Snapshot(
                        "market slots exist but the stored world has no market application".to_string(),
                    ));
                }
                info!(oracle_ref = market_config.oracle_ref, "market already deployed");
                market_config.oracle_ref
            }
            None => {
                if !resumed {
                    for (name, address) in &accounts {
                        if name != OPERATOR_ACCOUNT {
                            ledger.fund(address, config.genesis_funds)?;
                        }
                    }
                }
                // Boot may have stopped between the two deploys
                let oracle_ref = match ledger.world().oracles.keys().next() {
                    Some(existing) => *existing,
                    None => ledger.deploy_oracle(operator)?,
                };
                let app_id = ledger.deploy_market(operator, oracle_ref)?;
                info!(oracle_ref, app_id, "deployed oracle and market");
                oracle_ref
            }
        };

        if let Some(custody) = ledger.market_address() {
            accounts.insert(MARKET_ACCOUNT.to_string(), custody);
        }

        Ok(Self { ledger, config, operator, oracle_ref, accounts })
    }

    /// In-memory state with default settings
    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::new(ServiceConfig::default())
    }

    /// Accepts a named account (case-insensitive) or a 64-char hex address
    pub fn resolve_address(&self, name_or_hex: &str) -> Result<Address, String> {
        match self.accounts.get(&name_or_hex.to_uppercase()) {
            Some(address) => Ok(*address),
            None => Address::from_hex(name_or_hex),
        }
    }

    /// One block of the height ticker; the new height is stored before it is returned
    pub fn tick(&mut self) -> Result<u64, LedgerError> {
        let height = self.ledger.advance(1);
        self.ledger.checkpoint()?;
        Ok(height)
    }

    /// Checkpoint the world and flush sled; groups are already durable on commit
    pub fn save_to_disk(&mut self) -> Result<(), String> {
        self.ledger
            .checkpoint()
            .map_err(|e| format!("Failed to checkpoint world: {}", e))?;
        self.ledger
            .store()
            .flush()
            .map_err(|e| format!("Failed to flush storage: {}", e))?;

        info!(backend = self.ledger.store().describe(), height = self.ledger.height(), "💾 state saved to disk");
        Ok(())
    }
}
