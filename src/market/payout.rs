// ============================================================================
// Payout Math
// ============================================================================
//
//   TIE             → refund the stake
//   losing side     → 0
//   winning side    → floor(amount * (total_up + total_down) / winning_total)
//
// The product is taken in u128 so it never truncates before the division.
// Flooring leaves a residual of less than `winning_total` base units in
// custody per round.
//
// ============================================================================

use crate::codec::{Bet, Outcome, Round};

use super::MarketError;

/// `floor(a * b / denominator)` without intermediate overflow.
/// `None` on a zero denominator or a quotient above u64::MAX.
pub fn wide_ratio(a: u64, b: u64, denominator: u64) -> Option<u64> {
    if denominator == 0 {
        return None;
    }
    let quotient = u128::from(a) * u128::from(b) / u128::from(denominator);
    u64::try_from(quotient).ok()
}

pub fn compute_payout(bet: &Bet, round: &Round) -> Result<u64, MarketError> {
    if round.outcome == Outcome::Tie {
        return Ok(bet.amount);
    }
    if round.outcome != bet.side.winning_outcome() {
        return Ok(0);
    }

    let pool = round.pool().ok_or(MarketError::Overflow("pool total"))?;
    let winning_total = round.side_total(bet.side);
    wide_ratio(bet.amount, pool, winning_total).ok_or(MarketError::Overflow("payout"))
}
