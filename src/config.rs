// Service configuration - read from the environment after loading .env

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_BLOCK_INTERVAL_MS: u64 = 2800;
pub const DEFAULT_GENESIS_FUNDS: u64 = 100_000_000;
pub const DEFAULT_GENESIS_ACCOUNTS: &str = "ALICE,BOB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    /// Sled directory; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    pub block_interval_ms: u64,
    pub genesis_funds: u64,
    pub genesis_accounts: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1234)),
            data_dir: None,
            block_interval_ms: DEFAULT_BLOCK_INTERVAL_MS,
            genesis_funds: DEFAULT_GENESIS_FUNDS,
            genesis_accounts: parse_accounts(DEFAULT_GENESIS_ACCOUNTS),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("PREDIX_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("PREDIX_BIND_ADDR is not a socket address: {}", e))?;

        let data_dir = lookup("PREDIX_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let block_interval_ms = parse_u64(&lookup, "PREDIX_BLOCK_INTERVAL_MS", DEFAULT_BLOCK_INTERVAL_MS)?;
        if block_interval_ms == 0 {
            return Err("PREDIX_BLOCK_INTERVAL_MS must be positive".to_string());
        }

        let genesis_funds = parse_u64(&lookup, "PREDIX_GENESIS_FUNDS", DEFAULT_GENESIS_FUNDS)?;
        let genesis_accounts =
            parse_accounts(&lookup("PREDIX_GENESIS_ACCOUNTS").unwrap_or_else(|| DEFAULT_GENESIS_ACCOUNTS.to_string()));

        Ok(Self { bind_addr, data_dir, block_interval_ms, genesis_funds, genesis_accounts })
    }
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| format!("{} is not a number: {}", key, e)),
        None => Ok(default),
    }
}

/// Comma separated, upper-cased, blanks dropped
fn parse_accounts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().to_uppercase())
        .filter(|name| !name.is_empty())
        .collect()
}
