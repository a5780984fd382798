/// Ledger transaction types
///
/// Top-level transactions are submitted in atomic groups. Inner transactions
/// are side effects an application requests while executing; the ledger
/// applies them in the same all-or-nothing step as the storage writes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// ADDRESS
// ============================================================================

/// 32-byte account address, hex in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Address of a well-known development account ("ALICE", "BOB", ...),
    /// the public half of `signing::dev_signing_key(seed)`
    pub fn from_seed(seed: &str) -> Self {
        super::signing::address_of(&super::signing::dev_signing_key(seed))
    }

    /// Custody address of an application. A hash with no private key, so
    /// nothing outside the application can sign for it.
    pub fn for_application(app_id: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"appID");
        hasher.update(app_id.to_be_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| format!("Invalid address hex: {}", e))?;
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("Address must be 32 bytes, got {}", b.len()))?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex chars, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::from_hex(&value)
    }
}

// ============================================================================
// TOP-LEVEL TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Txn {
    Payment {
        sender: Address,
        receiver: Address,
        amount: u64,
    },
    /// Deploys the market application; args carry the oracle reference
    MarketCreate {
        sender: Address,
        args: Vec<Vec<u8>>,
    },
    MarketCall {
        sender: Address,
        args: Vec<Vec<u8>>,
    },
    OracleCreate {
        sender: Address,
    },
    OracleUpdate {
        sender: Address,
        oracle_ref: u64,
        price: u64,
    },
}

impl Txn {
    pub fn sender(&self) -> &Address {
        match self {
            Txn::Payment { sender, .. }
            | Txn::MarketCreate { sender, .. }
            | Txn::MarketCall { sender, .. }
            | Txn::OracleCreate { sender }
            | Txn::OracleUpdate { sender, .. } => sender,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Txn::Payment { .. } => "payment",
            Txn::MarketCreate { .. } => "market_create",
            Txn::MarketCall { .. } => "market_call",
            Txn::OracleCreate { .. } => "oracle_create",
            Txn::OracleUpdate { .. } => "oracle_update",
        }
    }

    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        Txn::Payment { sender, receiver, amount }
    }

    pub fn market_call(sender: Address, args: Vec<Vec<u8>>) -> Self {
        Txn::MarketCall { sender, args }
    }
}

/// Big-endian integer argument
pub fn itob(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode a big-endian integer argument of at most 8 bytes
pub fn btoi(bytes: &[u8]) -> Option<u64> {
    if bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

// ============================================================================
// INNER TRANSACTIONS
// ============================================================================

/// Parameters of an asset created by an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub unit_name: String,
    pub asset_name: String,
    pub manager: Address,
    pub reserve: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerTxn {
    AssetCreate {
        asset_id: u64,
        params: AssetParams,
    },
    AssetTransfer {
        asset_id: u64,
        receiver: Address,
        amount: u64,
    },
    Payment {
        receiver: Address,
        amount: u64,
    },
}
