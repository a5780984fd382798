// ============================================================================
// Binary State Codec - Predix Round Market
// ============================================================================
//
// Fixed-width records persisted in the market's key-value slots.
//
// Layout (every field is a big-endian u64):
//   Round (56 bytes): start_price | end_price | total_up | total_down |
//                     resolved | outcome | tracking_asset_id
//   Bet   (24 bytes): amount | side | claimed
//
// Keys:
//   "r|" ++ be_u64(round)
//   "b|" ++ be_u64(round) ++ "|" ++ address (32 bytes)
//
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::ledger::Address;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const WORD_LEN: usize = 8;

/// Encoded size of a Round record
pub const ROUND_RECORD_LEN: usize = 7 * WORD_LEN;

/// Encoded size of a Bet record
pub const BET_RECORD_LEN: usize = 3 * WORD_LEN;

pub const ROUND_KEY_PREFIX: &[u8] = b"r|";
pub const BET_KEY_PREFIX: &[u8] = b"b|";

// ============================================================================
// ENUMS
// ============================================================================

/// Resolved direction of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Tie,
    Up,
    Down,
}

impl Outcome {
    pub fn as_u64(&self) -> u64 {
        match self {
            Outcome::Tie => 0,
            Outcome::Up => 1,
            Outcome::Down => 2,
        }
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Outcome::Tie),
            1 => Some(Outcome::Up),
            2 => Some(Outcome::Down),
            _ => None,
        }
    }

    /// Compare the closing price against the opening price
    pub fn from_prices(start_price: u64, end_price: u64) -> Self {
        if end_price > start_price {
            Outcome::Up
        } else if end_price < start_price {
            Outcome::Down
        } else {
            Outcome::Tie
        }
    }
}

/// Side a bettor wagers on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Up,
    Down,
}

impl Side {
    pub fn as_u64(&self) -> u64 {
        match self {
            Side::Up => 1,
            Side::Down => 2,
        }
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Side::Up),
            2 => Some(Side::Down),
            _ => None,
        }
    }

    /// The outcome under which this side wins
    pub fn winning_outcome(&self) -> Outcome {
        match self {
            Side::Up => Outcome::Up,
            Side::Down => Outcome::Down,
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Per-round aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub start_price: u64,
    pub end_price: u64,
    pub total_up: u64,
    pub total_down: u64,
    pub resolved: bool,
    pub outcome: Outcome,
    pub tracking_asset_id: u64,
}

impl Round {
    /// Fresh round opened at `start_price`
    pub fn open(start_price: u64, tracking_asset_id: u64) -> Self {
        Self {
            start_price,
            end_price: 0,
            total_up: 0,
            total_down: 0,
            resolved: false,
            outcome: Outcome::Tie,
            tracking_asset_id,
        }
    }

    pub fn side_total(&self, side: Side) -> u64 {
        match side {
            Side::Up => self.total_up,
            Side::Down => self.total_down,
        }
    }

    /// Sum of both sides, `None` on u64 overflow
    pub fn pool(&self) -> Option<u64> {
        self.total_up.checked_add(self.total_down)
    }
}

/// One bettor's wager in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub amount: u64,
    pub side: Side,
    pub claimed: bool,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Decoding failures. All writes go through `encode_*`, so any of these
/// means the stored bytes are corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CodecError {
    WrongLength { record: &'static str, expected: usize, actual: usize },
    InvalidField { record: &'static str, field: &'static str, value: u64 },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::WrongLength { record, expected, actual } => {
                write!(f, "{} record must be {} bytes, got {}", record, expected, actual)
            }
            CodecError::InvalidField { record, field, value } => {
                write!(f, "{} record has invalid {}: {}", record, field, value)
            }
        }
    }
}

impl std::error::Error for CodecError {}

// ============================================================================
// ENCODE / DECODE
// ============================================================================

fn put_words<const N: usize>(words: &[u64]) -> [u8; N] {
    let mut out = [0u8; N];
    for (chunk, word) in out.chunks_exact_mut(WORD_LEN).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

fn word_at(buf: &[u8], index: usize) -> u64 {
    let mut word = [0u8; WORD_LEN];
    word.copy_from_slice(&buf[index * WORD_LEN..(index + 1) * WORD_LEN]);
    u64::from_be_bytes(word)
}

fn flag(record: &'static str, field: &'static str, value: u64) -> Result<bool, CodecError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CodecError::InvalidField { record, field, value }),
    }
}

pub fn encode_round(round: &Round) -> [u8; ROUND_RECORD_LEN] {
    put_words(&[
        round.start_price,
        round.end_price,
        round.total_up,
        round.total_down,
        round.resolved as u64,
        round.outcome.as_u64(),
        round.tracking_asset_id,
    ])
}

pub fn decode_round(buf: &[u8]) -> Result<Round, CodecError> {
    if buf.len() != ROUND_RECORD_LEN {
        return Err(CodecError::WrongLength {
            record: "round",
            expected: ROUND_RECORD_LEN,
            actual: buf.len(),
        });
    }

    let outcome_word = word_at(buf, 5);
    let outcome = Outcome::from_u64(outcome_word).ok_or(CodecError::InvalidField {
        record: "round",
        field: "outcome",
        value: outcome_word,
    })?;

    Ok(Round {
        start_price: word_at(buf, 0),
        end_price: word_at(buf, 1),
        total_up: word_at(buf, 2),
        total_down: word_at(buf, 3),
        resolved: flag("round", "resolved", word_at(buf, 4))?,
        outcome,
        tracking_asset_id: word_at(buf, 6),
    })
}

pub fn encode_bet(bet: &Bet) -> [u8; BET_RECORD_LEN] {
    put_words(&[bet.amount, bet.side.as_u64(), bet.claimed as u64])
}

pub fn decode_bet(buf: &[u8]) -> Result<Bet, CodecError> {
    if buf.len() != BET_RECORD_LEN {
        return Err(CodecError::WrongLength {
            record: "bet",
            expected: BET_RECORD_LEN,
            actual: buf.len(),
        });
    }

    let side_word = word_at(buf, 1);
    let side = Side::from_u64(side_word).ok_or(CodecError::InvalidField {
        record: "bet",
        field: "side",
        value: side_word,
    })?;

    Ok(Bet {
        amount: word_at(buf, 0),
        side,
        claimed: flag("bet", "claimed", word_at(buf, 2))?,
    })
}

// ============================================================================
// KEYS
// ============================================================================

pub fn round_key(round_index: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROUND_KEY_PREFIX.len() + WORD_LEN);
    key.extend_from_slice(ROUND_KEY_PREFIX);
    key.extend_from_slice(&round_index.to_be_bytes());
    key
}

pub fn bet_key(round_index: u64, bettor: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(BET_KEY_PREFIX.len() + WORD_LEN + 1 + 32);
    key.extend_from_slice(BET_KEY_PREFIX);
    key.extend_from_slice(&round_index.to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(bettor.as_bytes());
    key
}

// ============================================================================
// TESTS
// ============================================================================
