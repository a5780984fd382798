// ============================================================================
// Market State Machine - Predix Round Market
// ============================================================================
//
// Four entry points, each a transition on (Round, Bet) state:
//
//   create(oracle_ref)          write-once configuration
//   place_bet(side)             [payment → custody, call] group of two
//   resolve("latest" | round)   permissionless, once per round
//   claim(round)                exactly once per bet
//
// Rounds are implicit windows of the height axis:
//   round_index = floor(height / ROUND_LEN)
//
// Round: absent → open → resolved
// Bet:   absent → placed → claimed
//
// Every call runs against a staging overlay. Any error aborts the whole
// group: storage writes and requested inner transactions are dropped
// together by the host ledger.
//
// ============================================================================

pub mod bets;
pub mod context;
pub mod payout;
pub mod rounds;

pub use context::{round_index, CallContext, InnerTxns};

use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{CodecError, Outcome, Side};
use crate::ledger::{btoi, itob, Address, Txn};
use crate::oracle::{read_price, OracleError, OracleSource};
use crate::storage::{KeyValueStore, Overlay, StorageError};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Height units per round
pub const ROUND_LEN: u64 = 10;

/// Global slot holding the oracle application id
pub const ORACLE_CONFIG_KEY: &[u8] = b"oracle_app_id";

pub const OP_BET_UP: &[u8] = b"bet_up";
pub const OP_BET_DOWN: &[u8] = b"bet_down";
pub const OP_RESOLVE: &[u8] = b"resolve";
pub const OP_CLAIM: &[u8] = b"claim";
pub const SELECTOR_LATEST: &[u8] = b"latest";

// ============================================================================
// ERRORS
// ============================================================================

/// Coarse failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PreconditionFailed,
    NotFound,
    OracleUnavailable,
    Corrupt,
    Storage,
    /// Signature missing or not made by the sender
    Unauthorized,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::OracleUnavailable => "oracle_unavailable",
            ErrorKind::Corrupt => "corrupt",
            ErrorKind::Storage => "storage",
            ErrorKind::Unauthorized => "unauthorized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    NotInitialized,
    AlreadyInitialized,
    InvalidArguments(String),
    InvalidGroup(String),
    DuplicateBet { round: u64, bettor: Address },
    AlreadyClaimed { round: u64, bettor: Address },
    RoundStillOpen { round: u64, current: u64 },
    RoundAlreadyResolved(u64),
    RoundNotResolved(u64),
    Overflow(&'static str),
    RoundNotFound(u64),
    BetNotFound { round: u64, bettor: Address },
    OracleUnavailable(OracleError),
    Corrupt(CodecError),
    Storage(StorageError),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::RoundNotFound(_) | MarketError::BetNotFound { .. } => ErrorKind::NotFound,
            MarketError::OracleUnavailable(_) => ErrorKind::OracleUnavailable,
            MarketError::Corrupt(_) => ErrorKind::Corrupt,
            MarketError::Storage(_) => ErrorKind::Storage,
            _ => ErrorKind::PreconditionFailed,
        }
    }
}

impl std::fmt::Display for MarketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketError::NotInitialized => write!(f, "Market has not been created"),
            MarketError::AlreadyInitialized => write!(f, "Market is already created"),
            MarketError::InvalidArguments(msg) => write!(f, "Invalid arguments: {}", msg),
            MarketError::InvalidGroup(msg) => write!(f, "Invalid group: {}", msg),
            MarketError::DuplicateBet { round, bettor } => {
                write!(f, "Duplicate bet: {} already bet in round {}", bettor.short(), round)
            }
            MarketError::AlreadyClaimed { round, bettor } => {
                write!(f, "Already claimed: {} in round {}", bettor.short(), round)
            }
            MarketError::RoundStillOpen { round, current } => {
                write!(f, "Round {} is still open (current round {})", round, current)
            }
            MarketError::RoundAlreadyResolved(round) => write!(f, "Round {} is already resolved", round),
            MarketError::RoundNotResolved(round) => write!(f, "Round {} is not resolved", round),
            MarketError::Overflow(what) => write!(f, "Arithmetic overflow: {}", what),
            MarketError::RoundNotFound(round) => write!(f, "Round not found: {}", round),
            MarketError::BetNotFound { round, bettor } => {
                write!(f, "Bet not found: {} in round {}", bettor.short(), round)
            }
            MarketError::OracleUnavailable(e) => write!(f, "Oracle unavailable: {}", e),
            MarketError::Corrupt(e) => write!(f, "Corrupt record: {}", e),
            MarketError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MarketError {}

impl From<OracleError> for MarketError {
    fn from(e: OracleError) -> Self {
        MarketError::OracleUnavailable(e)
    }
}

impl From<CodecError> for MarketError {
    fn from(e: CodecError) -> Self {
        MarketError::Corrupt(e)
    }
}

impl From<StorageError> for MarketError {
    fn from(e: StorageError) -> Self {
        MarketError::Storage(e)
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Write-once configuration set by `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketConfig {
    pub oracle_ref: u64,
}

impl MarketConfig {
    pub fn load<S: KeyValueStore + ?Sized>(state: &Overlay<'_, S>) -> Result<Self, MarketError> {
        let bytes = state.get(ORACLE_CONFIG_KEY)?.ok_or(MarketError::NotInitialized)?;
        if bytes.len() != 8 {
            return Err(CodecError::WrongLength { record: "config", expected: 8, actual: bytes.len() }.into());
        }
        let oracle_ref = btoi(&bytes).ok_or(MarketError::NotInitialized)?;
        Ok(Self { oracle_ref })
    }

    fn store<S: KeyValueStore + ?Sized>(&self, state: &mut Overlay<'_, S>) -> Result<(), MarketError> {
        state
            .create(ORACLE_CONFIG_KEY.to_vec(), itob(self.oracle_ref))
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => MarketError::AlreadyInitialized,
                other => other.into(),
            })
    }
}

// ============================================================================
// CALLS
// ============================================================================

/// Which round `resolve` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundSelector {
    /// Most recently completed round, or 0 when none has completed
    Latest,
    Index(u64),
}

impl RoundSelector {
    pub fn select(&self, current_round: u64) -> u64 {
        match self {
            RoundSelector::Latest => current_round.saturating_sub(1),
            RoundSelector::Index(round) => *round,
        }
    }
}

/// Parsed application arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketCall {
    Create { oracle_ref: u64 },
    PlaceBet { side: Side },
    Resolve { selector: RoundSelector },
    Claim { round: u64 },
}

fn int_arg(name: &str, bytes: &[u8]) -> Result<u64, MarketError> {
    btoi(bytes).ok_or_else(|| MarketError::InvalidArguments(format!("{} must be an integer of at most 8 bytes", name)))
}

impl MarketCall {
    /// Arguments of the application-create transaction: `[oracle_ref]`
    pub fn parse_create(args: &[Vec<u8>]) -> Result<Self, MarketError> {
        match args {
            [oracle_ref] => Ok(MarketCall::Create { oracle_ref: int_arg("oracle reference", oracle_ref)? }),
            _ => Err(MarketError::InvalidArguments(format!("create expects 1 argument, got {}", args.len()))),
        }
    }

    /// Arguments of a regular call: operation tag plus positional arguments
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, MarketError> {
        let (op, rest) = args
            .split_first()
            .ok_or_else(|| MarketError::InvalidArguments("missing operation tag".into()))?;

        let expect = |n: usize| -> Result<(), MarketError> {
            if rest.len() == n {
                Ok(())
            } else {
                Err(MarketError::InvalidArguments(format!(
                    "{} expects {} argument(s) after the tag, got {}",
                    String::from_utf8_lossy(op),
                    n,
                    rest.len()
                )))
            }
        };

        match op.as_slice() {
            OP_BET_UP => {
                expect(0)?;
                Ok(MarketCall::PlaceBet { side: Side::Up })
            }
            OP_BET_DOWN => {
                expect(0)?;
                Ok(MarketCall::PlaceBet { side: Side::Down })
            }
            OP_RESOLVE => {
                expect(1)?;
                let selector = if rest[0].as_slice() == SELECTOR_LATEST {
                    RoundSelector::Latest
                } else {
                    RoundSelector::Index(int_arg("round", &rest[0])?)
                };
                Ok(MarketCall::Resolve { selector })
            }
            OP_CLAIM => {
                expect(1)?;
                Ok(MarketCall::Claim { round: int_arg("round", &rest[0])? })
            }
            other => Err(MarketError::InvalidArguments(format!(
                "unknown operation '{}'",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Wire arguments for this call
    pub fn to_args(&self) -> Vec<Vec<u8>> {
        match self {
            MarketCall::Create { oracle_ref } => vec![itob(*oracle_ref)],
            MarketCall::PlaceBet { side: Side::Up } => vec![OP_BET_UP.to_vec()],
            MarketCall::PlaceBet { side: Side::Down } => vec![OP_BET_DOWN.to_vec()],
            MarketCall::Resolve { selector: RoundSelector::Latest } => {
                vec![OP_RESOLVE.to_vec(), SELECTOR_LATEST.to_vec()]
            }
            MarketCall::Resolve { selector: RoundSelector::Index(round) } => vec![OP_RESOLVE.to_vec(), itob(*round)],
            MarketCall::Claim { round } => vec![OP_CLAIM.to_vec(), itob(*round)],
        }
    }
}

/// What a successful call did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum CallResult {
    Created {
        oracle_ref: u64,
    },
    BetPlaced {
        round: u64,
        side: Side,
        amount: u64,
        tracking_asset_id: u64,
        round_opened: bool,
    },
    Resolved {
        round: u64,
        start_price: u64,
        end_price: u64,
        outcome: Outcome,
    },
    Claimed {
        round: u64,
        payout: u64,
    },
}

// ============================================================================
// TRANSITIONS
// ============================================================================

pub fn execute<S: KeyValueStore + ?Sized>(
    call: &MarketCall,
    ctx: &CallContext<'_>,
    state: &mut Overlay<'_, S>,
    oracle: &dyn OracleSource,
    inner: &mut InnerTxns,
) -> Result<CallResult, MarketError> {
    debug!(sender = %ctx.sender.short(), height = ctx.height, ?call, "market call");
    match *call {
        MarketCall::Create { oracle_ref } => create(state, oracle_ref),
        MarketCall::PlaceBet { side } => place_bet(ctx, state, oracle, inner, side),
        MarketCall::Resolve { selector } => resolve(ctx, state, oracle, selector),
        MarketCall::Claim { round } => claim(ctx, state, inner, round),
    }
}

pub fn create<S: KeyValueStore + ?Sized>(state: &mut Overlay<'_, S>, oracle_ref: u64) -> Result<CallResult, MarketError> {
    MarketConfig { oracle_ref }.store(state)?;
    info!(oracle_ref, "market created");
    Ok(CallResult::Created { oracle_ref })
}

/// Amount of the payment bundled ahead of a bet call
fn bundled_payment(ctx: &CallContext<'_>) -> Result<u64, MarketError> {
    if ctx.group.len() != 2 {
        return Err(MarketError::InvalidGroup(format!(
            "bet requires a group of 2 transactions, got {}",
            ctx.group.len()
        )));
    }
    if ctx.group_index != 1 {
        return Err(MarketError::InvalidGroup("bet call must be the second transaction".into()));
    }

    match &ctx.group[0] {
        Txn::Payment { receiver, amount, .. } => {
            if *receiver != ctx.app_address {
                return Err(MarketError::InvalidGroup("payment must go to the market custody address".into()));
            }
            if *amount == 0 {
                return Err(MarketError::InvalidGroup("payment amount must be positive".into()));
            }
            Ok(*amount)
        }
        other => Err(MarketError::InvalidGroup(format!(
            "first transaction must be a payment, got {}",
            other.kind()
        ))),
    }
}

pub fn place_bet<S: KeyValueStore + ?Sized>(
    ctx: &CallContext<'_>,
    state: &mut Overlay<'_, S>,
    oracle: &dyn OracleSource,
    inner: &mut InnerTxns,
    side: Side,
) -> Result<CallResult, MarketError> {
    let config = MarketConfig::load(state)?;
    let amount = bundled_payment(ctx)?;
    let round_index = ctx.round_index();

    let round_opened =
        rounds::ensure_round_initialized(state, oracle, config.oracle_ref, inner, ctx.app_address, round_index)?;

    let mut round = rounds::load(state, round_index)?;
    if round.resolved {
        return Err(MarketError::RoundAlreadyResolved(round_index));
    }
    match side {
        Side::Up => round.total_up = round.total_up.checked_add(amount).ok_or(MarketError::Overflow("total_up"))?,
        Side::Down => {
            round.total_down = round.total_down.checked_add(amount).ok_or(MarketError::Overflow("total_down"))?
        }
    }
    round.pool().ok_or(MarketError::Overflow("pool total"))?;
    rounds::save(state, round_index, &round);

    bets::record_bet(state, round_index, &ctx.sender, amount, side)?;
    inner.asset_transfer(round.tracking_asset_id, ctx.sender, 1);

    info!(
        round = round_index,
        bettor = %ctx.sender.short(),
        ?side,
        amount,
        total_up = round.total_up,
        total_down = round.total_down,
        "bet placed"
    );
    Ok(CallResult::BetPlaced {
        round: round_index,
        side,
        amount,
        tracking_asset_id: round.tracking_asset_id,
        round_opened,
    })
}

pub fn resolve<S: KeyValueStore + ?Sized>(
    ctx: &CallContext<'_>,
    state: &mut Overlay<'_, S>,
    oracle: &dyn OracleSource,
    selector: RoundSelector,
) -> Result<CallResult, MarketError> {
    let config = MarketConfig::load(state)?;
    let current = ctx.round_index();
    let round_index = selector.select(current);

    if round_index >= current {
        return Err(MarketError::RoundStillOpen { round: round_index, current });
    }

    let mut round = rounds::load(state, round_index)?;
    if round.resolved {
        return Err(MarketError::RoundAlreadyResolved(round_index));
    }

    let end_price = read_price(oracle, config.oracle_ref)?;
    round.end_price = end_price;
    round.outcome = Outcome::from_prices(round.start_price, end_price);
    round.resolved = true;
    rounds::save(state, round_index, &round);

    info!(
        round = round_index,
        start_price = round.start_price,
        end_price,
        outcome = ?round.outcome,
        "round resolved"
    );
    Ok(CallResult::Resolved {
        round: round_index,
        start_price: round.start_price,
        end_price,
        outcome: round.outcome,
    })
}

pub fn claim<S: KeyValueStore + ?Sized>(
    ctx: &CallContext<'_>,
    state: &mut Overlay<'_, S>,
    inner: &mut InnerTxns,
    round_index: u64,
) -> Result<CallResult, MarketError> {
    MarketConfig::load(state)?;

    let round = rounds::load(state, round_index)?;
    if !round.resolved {
        return Err(MarketError::RoundNotResolved(round_index));
    }

    let bet = bets::load_bet(state, round_index, &ctx.sender)?;
    if bet.claimed {
        return Err(MarketError::AlreadyClaimed { round: round_index, bettor: ctx.sender });
    }

    let payout = payout::compute_payout(&bet, &round)?;

    // Flag before paying
    bets::mark_claimed(state, round_index, &ctx.sender)?;
    if payout > 0 {
        inner.payment(ctx.sender, payout);
    }

    info!(round = round_index, bettor = %ctx.sender.short(), payout, "claim settled");
    Ok(CallResult::Claimed { round: round_index, payout })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;
    use crate::storage::MemoryStore;
    use std::collections::BTreeMap;

    const ORACLE: u64 = 1;
    const APP: u64 = 2;

    fn apps(price: u64) -> BTreeMap<u64, MockOracle> {
        let mut oracle = MockOracle::create();
        oracle.update_price(price);
        let mut apps = BTreeMap::new();
        apps.insert(ORACLE, oracle);
        apps
    }

    fn created_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut state = Overlay::new(&store);
        create(&mut state, ORACLE).unwrap();
        let writes = state.into_write_set();
        store.commit(writes).unwrap();
        store
    }

    fn bet_group(bettor: Address, amount: u64, side: Side) -> Vec<Txn> {
        vec![
            Txn::payment(bettor, Address::for_application(APP), amount),
            Txn::market_call(bettor, MarketCall::PlaceBet { side }.to_args()),
        ]
    }

    fn ctx<'a>(sender: Address, height: u64, group: &'a [Txn], group_index: usize) -> CallContext<'a> {
        CallContext {
            sender,
            height,
            app_address: Address::for_application(APP),
            group,
            group_index,
        }
    }

    #[test]
    fn test_parse_calls() {
        assert_eq!(MarketCall::parse(&[b"bet_up".to_vec()]), Ok(MarketCall::PlaceBet { side: Side::Up }));
        assert_eq!(
            MarketCall::parse(&[b"resolve".to_vec(), b"latest".to_vec()]),
            Ok(MarketCall::Resolve { selector: RoundSelector::Latest })
        );
        assert_eq!(
            MarketCall::parse(&[b"resolve".to_vec(), itob(4)]),
            Ok(MarketCall::Resolve { selector: RoundSelector::Index(4) })
        );
        assert_eq!(MarketCall::parse(&[b"claim".to_vec(), vec![0x02]]), Ok(MarketCall::Claim { round: 2 }));
        assert_eq!(MarketCall::parse_create(&[itob(9)]), Ok(MarketCall::Create { oracle_ref: 9 }));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(MarketCall::parse(&[]).is_err());
        assert!(MarketCall::parse(&[b"bet_up".to_vec(), b"extra".to_vec()]).is_err());
        assert!(MarketCall::parse(&[b"claim".to_vec()]).is_err());
        assert!(MarketCall::parse(&[b"claim".to_vec(), vec![0; 9]]).is_err());
        assert!(MarketCall::parse(&[b"withdraw".to_vec()]).is_err());
        assert!(MarketCall::parse_create(&[]).is_err());
    }

    #[test]
    fn test_call_args_round_trip_through_parser() {
        let calls = [
            MarketCall::PlaceBet { side: Side::Down },
            MarketCall::Resolve { selector: RoundSelector::Latest },
            MarketCall::Claim { round: 17 },
        ];
        for call in calls {
            assert_eq!(MarketCall::parse(&call.to_args()), Ok(call));
        }
    }

    #[test]
    fn test_latest_selector() {
        assert_eq!(RoundSelector::Latest.select(0), 0);
        assert_eq!(RoundSelector::Latest.select(5), 4);
        assert_eq!(RoundSelector::Index(2).select(5), 2);
    }

    #[test]
    fn test_create_is_write_once() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        assert_eq!(create(&mut state, 5), Err(MarketError::AlreadyInitialized));
        assert_eq!(MarketConfig::load(&state).unwrap().oracle_ref, ORACLE);
    }

    #[test]
    fn test_calls_before_create_fail() {
        let store = MemoryStore::new();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let group = bet_group(alice, 10, Side::Up);
        let mut inner = InnerTxns::new(1);

        let result = place_bet(&ctx(alice, 3, &group, 1), &mut state, &apps(1000), &mut inner, Side::Up);
        assert_eq!(result, Err(MarketError::NotInitialized));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn test_place_bet_accumulates_pool() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let bob = Address::from_seed("bob");
        let oracle = apps(1000);
        let mut inner = InnerTxns::new(100);

        let group_a = bet_group(alice, 100, Side::Up);
        let first = place_bet(&ctx(alice, 12, &group_a, 1), &mut state, &oracle, &mut inner, Side::Up).unwrap();
        let group_b = bet_group(bob, 300, Side::Down);
        let second = place_bet(&ctx(bob, 15, &group_b, 1), &mut state, &oracle, &mut inner, Side::Down).unwrap();

        assert!(matches!(first, CallResult::BetPlaced { round: 1, round_opened: true, .. }));
        assert!(matches!(second, CallResult::BetPlaced { round: 1, round_opened: false, .. }));

        let round = rounds::load(&state, 1).unwrap();
        assert_eq!((round.total_up, round.total_down), (100, 300));
        assert_eq!(round.start_price, 1000);
        // one asset create, two receipt transfers
        assert_eq!(inner.submitted().len(), 3);
    }

    #[test]
    fn test_bet_group_shape_enforced() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let oracle = apps(1000);
        let mut inner = InnerTxns::new(1);

        // Missing payment
        let lone = vec![Txn::market_call(alice, vec![b"bet_up".to_vec()])];
        let result = place_bet(&ctx(alice, 0, &lone, 0), &mut state, &oracle, &mut inner, Side::Up);
        assert!(matches!(result, Err(MarketError::InvalidGroup(_))));

        // Payment to the wrong account
        let wrong = vec![
            Txn::payment(alice, Address::from_seed("mallory"), 10),
            Txn::market_call(alice, vec![b"bet_up".to_vec()]),
        ];
        let result = place_bet(&ctx(alice, 0, &wrong, 1), &mut state, &oracle, &mut inner, Side::Up);
        assert!(matches!(result, Err(MarketError::InvalidGroup(_))));

        // Zero amount
        let zero = bet_group(alice, 0, Side::Up);
        let result = place_bet(&ctx(alice, 0, &zero, 1), &mut state, &oracle, &mut inner, Side::Up);
        assert!(matches!(result, Err(MarketError::InvalidGroup(_))));

        // Call in first position
        let group = bet_group(alice, 10, Side::Up);
        let result = place_bet(&ctx(alice, 0, &group, 0), &mut state, &oracle, &mut inner, Side::Up);
        assert!(matches!(result, Err(MarketError::InvalidGroup(_))));

        assert!(rounds::try_load(&state, 0).unwrap().is_none());
    }

    #[test]
    fn test_resolve_requires_finished_window() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let mut inner = InnerTxns::new(1);
        let group = bet_group(alice, 10, Side::Up);
        place_bet(&ctx(alice, 20, &group, 1), &mut state, &apps(1000), &mut inner, Side::Up).unwrap();

        let result = resolve(&ctx(alice, 25, &[], 0), &mut state, &apps(1100), RoundSelector::Index(2));
        assert_eq!(result, Err(MarketError::RoundStillOpen { round: 2, current: 2 }));

        let resolved = resolve(&ctx(alice, 30, &[], 0), &mut state, &apps(1100), RoundSelector::Latest).unwrap();
        assert!(matches!(resolved, CallResult::Resolved { round: 2, outcome: Outcome::Up, end_price: 1100, .. }));
    }

    #[test]
    fn test_resolve_twice_fails() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let mut inner = InnerTxns::new(1);
        let group = bet_group(alice, 10, Side::Up);
        place_bet(&ctx(alice, 0, &group, 1), &mut state, &apps(1000), &mut inner, Side::Up).unwrap();

        resolve(&ctx(alice, 10, &[], 0), &mut state, &apps(900), RoundSelector::Index(0)).unwrap();
        let before = rounds::load(&state, 0).unwrap();

        let again = resolve(&ctx(alice, 11, &[], 0), &mut state, &apps(5000), RoundSelector::Index(0));
        assert_eq!(again, Err(MarketError::RoundAlreadyResolved(0)));
        assert_eq!(rounds::load(&state, 0).unwrap(), before);
        assert_eq!(before.outcome, Outcome::Down);
    }

    #[test]
    fn test_resolve_missing_round() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let anyone = Address::from_seed("anyone");

        let result = resolve(&ctx(anyone, 40, &[], 0), &mut state, &apps(1000), RoundSelector::Latest);
        assert_eq!(result, Err(MarketError::RoundNotFound(3)));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_resolve_without_price_fails_closed() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let mut inner = InnerTxns::new(1);
        let group = bet_group(alice, 10, Side::Up);
        place_bet(&ctx(alice, 0, &group, 1), &mut state, &apps(1000), &mut inner, Side::Up).unwrap();

        let mut dark = BTreeMap::new();
        dark.insert(ORACLE, MockOracle::unpublished());
        let result = resolve(&ctx(alice, 10, &[], 0), &mut state, &dark, RoundSelector::Index(0));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::OracleUnavailable);
        assert!(!rounds::load(&state, 0).unwrap().resolved);
    }

    #[test]
    fn test_claim_flow() {
        let store = created_store();
        let mut state = Overlay::new(&store);
        let alice = Address::from_seed("alice");
        let bob = Address::from_seed("bob");
        let mut inner = InnerTxns::new(1);

        let group_a = bet_group(alice, 100, Side::Up);
        place_bet(&ctx(alice, 1, &group_a, 1), &mut state, &apps(1000), &mut inner, Side::Up).unwrap();
        let group_b = bet_group(bob, 300, Side::Down);
        place_bet(&ctx(bob, 2, &group_b, 1), &mut state, &apps(1000), &mut inner, Side::Down).unwrap();

        let mut claims = InnerTxns::new(1);
        let early = claim(&ctx(alice, 5, &[], 0), &mut state, &mut claims, 0);
        assert_eq!(early, Err(MarketError::RoundNotResolved(0)));

        resolve(&ctx(bob, 10, &[], 0), &mut state, &apps(1200), RoundSelector::Latest).unwrap();

        assert_eq!(
            claim(&ctx(alice, 11, &[], 0), &mut state, &mut claims, 0),
            Ok(CallResult::Claimed { round: 0, payout: 400 })
        );
        assert_eq!(
            claim(&ctx(bob, 11, &[], 0), &mut state, &mut claims, 0),
            Ok(CallResult::Claimed { round: 0, payout: 0 })
        );
        // Only the winner gets a payment
        assert_eq!(claims.submitted().len(), 1);

        assert_eq!(
            claim(&ctx(alice, 12, &[], 0), &mut state, &mut claims, 0),
            Err(MarketError::AlreadyClaimed { round: 0, bettor: alice })
        );
        let stranger = Address::from_seed("stranger");
        assert!(matches!(
            claim(&ctx(stranger, 12, &[], 0), &mut state, &mut claims, 0),
            Err(MarketError::BetNotFound { .. })
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(MarketError::DuplicateBet { round: 0, bettor: Address([0; 32]) }.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(MarketError::Overflow("x").kind(), ErrorKind::PreconditionFailed);
        assert_eq!(MarketError::RoundNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            MarketError::Corrupt(CodecError::WrongLength { record: "bet", expected: 24, actual: 0 }).kind(),
            ErrorKind::Corrupt
        );
    }
}
