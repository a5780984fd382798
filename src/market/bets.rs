// Bet Ledger - one bet per (round, bettor)

use crate::codec::{bet_key, decode_bet, encode_bet, Bet, Side};
use crate::ledger::Address;
use crate::storage::{KeyValueStore, Overlay, StorageError};

use super::MarketError;

pub fn try_load_bet<S: KeyValueStore + ?Sized>(
    state: &Overlay<'_, S>,
    round_index: u64,
    bettor: &Address,
) -> Result<Option<Bet>, MarketError> {
    match state.get(&bet_key(round_index, bettor))? {
        Some(bytes) => Ok(Some(decode_bet(&bytes)?)),
        None => Ok(None),
    }
}

pub fn load_bet<S: KeyValueStore + ?Sized>(
    state: &Overlay<'_, S>,
    round_index: u64,
    bettor: &Address,
) -> Result<Bet, MarketError> {
    try_load_bet(state, round_index, bettor)?.ok_or(MarketError::BetNotFound { round: round_index, bettor: *bettor })
}

/// Create the bettor's slot for this round; a second bet is rejected
pub fn record_bet<S: KeyValueStore + ?Sized>(
    state: &mut Overlay<'_, S>,
    round_index: u64,
    bettor: &Address,
    amount: u64,
    side: Side,
) -> Result<Bet, MarketError> {
    let bet = Bet { amount, side, claimed: false };
    match state.create(bet_key(round_index, bettor), encode_bet(&bet).to_vec()) {
        Ok(()) => Ok(bet),
        Err(StorageError::AlreadyExists(_)) => Err(MarketError::DuplicateBet { round: round_index, bettor: *bettor }),
        Err(e) => Err(e.into()),
    }
}

/// Flip `claimed` 0 → 1
pub fn mark_claimed<S: KeyValueStore + ?Sized>(
    state: &mut Overlay<'_, S>,
    round_index: u64,
    bettor: &Address,
) -> Result<Bet, MarketError> {
    let mut bet = load_bet(state, round_index, bettor)?;
    if bet.claimed {
        return Err(MarketError::AlreadyClaimed { round: round_index, bettor: *bettor });
    }
    bet.claimed = true;
    state.put(bet_key(round_index, bettor), encode_bet(&bet).to_vec());
    Ok(bet)
}
