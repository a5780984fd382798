// Request / response shapes for the HTTP surface

use serde::{Deserialize, Serialize};

use crate::codec::{Bet, Round};
use crate::ledger::{itob, Address, SignedTxn, Txn};

// ===== REQUEST TYPES =====

/// Application call argument as sent over JSON.
/// Numbers become 8-byte big-endian; "0x…" strings are hex; other strings are UTF-8 tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CallArg {
    Int(u64),
    Text(String),
}

impl CallArg {
    pub fn into_bytes(self) -> Result<Vec<u8>, String> {
        match self {
            CallArg::Int(value) => Ok(itob(value)),
            CallArg::Text(text) => match text.strip_prefix("0x") {
                Some(hex_part) => hex::decode(hex_part).map_err(|e| format!("Invalid hex argument {}: {}", text, e)),
                None => Ok(text.into_bytes()),
            },
        }
    }
}

/// One transaction of a submitted group. Addresses are hex or named accounts.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxnRequest {
    Payment { sender: String, receiver: String, amount: u64 },
    MarketCreate { sender: String, args: Vec<CallArg> },
    MarketCall { sender: String, args: Vec<CallArg> },
    OracleCreate { sender: String },
    OracleUpdate { sender: String, oracle_ref: u64, price: u64 },
}

impl TxnRequest {
    pub fn into_txn<F>(self, resolve: F) -> Result<Txn, String>
    where
        F: Fn(&str) -> Result<Address, String>,
    {
        let txn = match self {
            TxnRequest::Payment { sender, receiver, amount } => Txn::Payment {
                sender: resolve(&sender)?,
                receiver: resolve(&receiver)?,
                amount,
            },
            TxnRequest::MarketCreate { sender, args } => Txn::MarketCreate {
                sender: resolve(&sender)?,
                args: encode_args(args)?,
            },
            TxnRequest::MarketCall { sender, args } => Txn::MarketCall {
                sender: resolve(&sender)?,
                args: encode_args(args)?,
            },
            TxnRequest::OracleCreate { sender } => Txn::OracleCreate { sender: resolve(&sender)? },
            TxnRequest::OracleUpdate { sender, oracle_ref, price } => Txn::OracleUpdate {
                sender: resolve(&sender)?,
                oracle_ref,
                price,
            },
        };
        Ok(txn)
    }
}

fn encode_args(args: Vec<CallArg>) -> Result<Vec<Vec<u8>>, String> {
    args.into_iter().map(CallArg::into_bytes).collect()
}

/// A transaction with its sender's authorization. The signature is hex and
/// covers the group with every address resolved to hex (see `ledger::signing`).
#[derive(Debug, Clone, Deserialize)]
pub struct SignedTxnRequest {
    pub txn: TxnRequest,
    pub nonce: u64,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitGroupRequest {
    pub txns: Vec<SignedTxnRequest>,
}

impl SubmitGroupRequest {
    pub fn into_signed<F>(self, resolve: F) -> Result<Vec<SignedTxn>, String>
    where
        F: Fn(&str) -> Result<Address, String>,
    {
        self.txns
            .into_iter()
            .map(|request| {
                let signature = hex::decode(request.signature.trim_start_matches("0x"))
                    .map_err(|e| format!("Invalid signature hex: {}", e))?;
                Ok(SignedTxn { txn: request.txn.into_txn(&resolve)?, nonce: request.nonce, signature })
            })
            .collect()
    }
}

// ===== RESPONSE TYPES =====

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self { success: false, error: error.into(), kind: kind.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub index: u64,
    #[serde(flatten)]
    pub round: Round,
}

#[derive(Debug, Clone, Serialize)]
pub struct BetView {
    pub round: u64,
    pub bettor: Address,
    #[serde(flatten)]
    pub bet: Bet,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetHolding {
    pub asset_id: u64,
    pub asset_name: String,
    pub units: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub address: Address,
    pub balance: u64,
    /// Nonce the next signed transaction from this account must carry
    pub nonce: u64,
    pub assets: Vec<AssetHolding>,
}
