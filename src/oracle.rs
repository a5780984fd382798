// ============================================================================
// Oracle - Published price feed read by the market
// ============================================================================
//
// The oracle is a separate application on the ledger holding a single u64
// under the global key "price". The market trusts the value verbatim.
//
// Architecture:
//   OracleSource trait → implemented by the ledger's application registry
//   → read_price() fails closed when nothing is published
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Global key the oracle publishes its price under
pub const PRICE_KEY: &str = "price";

/// Price a freshly created mock oracle publishes
pub const MOCK_INITIAL_PRICE: u64 = 1000;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OracleError {
    /// Oracle application exists but has no published price
    NoPublishedPrice(u64),
    /// No oracle application with this reference
    UnknownOracle(u64),
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::NoPublishedPrice(id) => write!(f, "Oracle {} has no published price", id),
            OracleError::UnknownOracle(id) => write!(f, "Oracle {} does not exist", id),
        }
    }
}

impl std::error::Error for OracleError {}

// ============================================================================
// ORACLE SOURCE TRAIT
// ============================================================================

/// Read access to oracle application globals
pub trait OracleSource {
    /// `None` if the application does not exist
    fn globals(&self, oracle_ref: u64) -> Option<&BTreeMap<String, u64>>;
}

impl OracleSource for BTreeMap<u64, MockOracle> {
    fn globals(&self, oracle_ref: u64) -> Option<&BTreeMap<String, u64>> {
        self.get(&oracle_ref).map(|oracle| &oracle.globals)
    }
}

/// Current published price of `oracle_ref`. Never defaults to zero.
pub fn read_price(source: &dyn OracleSource, oracle_ref: u64) -> Result<u64, OracleError> {
    let globals = source
        .globals(oracle_ref)
        .ok_or(OracleError::UnknownOracle(oracle_ref))?;

    globals
        .get(PRICE_KEY)
        .copied()
        .ok_or(OracleError::NoPublishedPrice(oracle_ref))
}

// ============================================================================
// MOCK ORACLE
// ============================================================================

/// Test oracle: publishes 1000 on create, any caller may set a new price
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockOracle {
    pub globals: BTreeMap<String, u64>,
}

impl MockOracle {
    pub fn create() -> Self {
        let mut globals = BTreeMap::new();
        globals.insert(PRICE_KEY.to_string(), MOCK_INITIAL_PRICE);
        Self { globals }
    }

    /// An oracle that was deployed but never initialised
    pub fn unpublished() -> Self {
        Self::default()
    }

    pub fn update_price(&mut self, price: u64) {
        self.globals.insert(PRICE_KEY.to_string(), price);
    }

    pub fn price(&self) -> Option<u64> {
        self.globals.get(PRICE_KEY).copied()
    }
}

// ============================================================================
// TESTS
// ============================================================================
