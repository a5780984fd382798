// ============================================================================
// Round Store - per-round aggregates keyed by round index
// ============================================================================
//
// A round record is created lazily by the first bet of its height window and
// is never deleted. Creation goes through the overlay's create-if-absent
// primitive, so a duplicate initialisation cannot clobber an existing round.
//
// ============================================================================

use tracing::info;

use crate::codec::{decode_round, encode_round, round_key, Round};
use crate::ledger::{Address, AssetParams};
use crate::oracle::{read_price, OracleSource};
use crate::storage::{KeyValueStore, Overlay, StorageError};

use super::context::InnerTxns;
use super::MarketError;

/// Supply of each per-round receipt asset
pub const RECEIPT_TOTAL: u64 = 1_000_000_000;

pub const RECEIPT_UNIT_NAME: &str = "RCPT";

pub fn receipt_asset_name(round_index: u64) -> String {
    format!("RoundReceipt_{}", round_index)
}

pub fn try_load<S: KeyValueStore + ?Sized>(
    state: &Overlay<'_, S>,
    round_index: u64,
) -> Result<Option<Round>, MarketError> {
    match state.get(&round_key(round_index))? {
        Some(bytes) => Ok(Some(decode_round(&bytes)?)),
        None => Ok(None),
    }
}

pub fn load<S: KeyValueStore + ?Sized>(state: &Overlay<'_, S>, round_index: u64) -> Result<Round, MarketError> {
    try_load(state, round_index)?.ok_or(MarketError::RoundNotFound(round_index))
}

/// Overwrite the whole record. Load the fresh value first.
pub fn save<S: KeyValueStore + ?Sized>(state: &mut Overlay<'_, S>, round_index: u64, round: &Round) {
    state.put(round_key(round_index), encode_round(round).to_vec());
}

/// Open the round if nobody has bet in it yet. Returns whether this call
/// opened it.
pub fn ensure_round_initialized<S: KeyValueStore + ?Sized>(
    state: &mut Overlay<'_, S>,
    oracle: &dyn OracleSource,
    oracle_ref: u64,
    inner: &mut InnerTxns,
    custody: Address,
    round_index: u64,
) -> Result<bool, MarketError> {
    let key = round_key(round_index);
    if state.contains(&key)? {
        return Ok(false);
    }

    let start_price = read_price(oracle, oracle_ref)?;

    let tracking_asset_id = inner.create_asset(AssetParams {
        total: RECEIPT_TOTAL,
        decimals: 0,
        unit_name: RECEIPT_UNIT_NAME.to_string(),
        asset_name: receipt_asset_name(round_index),
        manager: custody,
        reserve: custody,
    });

    let round = Round::open(start_price, tracking_asset_id);
    state
        .create(key, encode_round(&round).to_vec())
        .map_err(|e| match e {
            StorageError::AlreadyExists(_) => MarketError::Storage(StorageError::Conflict(format!("round {}", round_index))),
            other => MarketError::Storage(other),
        })?;

    info!(round = round_index, start_price, tracking_asset_id, "round opened");
    Ok(true)
}
