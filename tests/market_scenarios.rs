/// End-to-end market scenarios driven through atomic ledger groups
///
/// Every test deploys the mock oracle and the market on a fresh ledger, funds
/// named accounts, and then moves the height across round boundaries.

use predix_market::app_state::AppState;
use predix_market::config::ServiceConfig;
use predix_market::ledger::{Address, Ledger, LedgerError, Txn, TxnResult};
use predix_market::storage::{KeyValueStore, MemoryStore, SledStore};
use predix_market::{CallResult, ErrorKind, MarketCall, MarketError, Outcome, RoundSelector, Side, ROUND_LEN};

// ============================================================================
// HELPERS
// ============================================================================

const FUNDS: u64 = 10_000;

struct Market<S: KeyValueStore> {
    ledger: Ledger<S>,
    operator: Address,
    oracle_ref: u64,
}

impl<S: KeyValueStore> Market<S> {
    fn deploy(store: S) -> Self {
        let mut ledger = Ledger::new(store);
        let operator = Address::from_seed("OPERATOR");
        let oracle_ref = ledger.deploy_oracle(operator).unwrap();
        ledger.deploy_market(operator, oracle_ref).unwrap();
        Self { ledger, operator, oracle_ref }
    }

    fn account(&mut self, name: &str) -> Address {
        let address = Address::from_seed(name);
        self.ledger.fund(&address, FUNDS).unwrap();
        address
    }

    fn price(&mut self, price: u64) {
        self.ledger.set_oracle_price(self.operator, self.oracle_ref, price).unwrap();
    }

    fn next_round(&mut self) {
        self.ledger.advance(ROUND_LEN);
    }

    fn custody(&self) -> Address {
        self.ledger.market_address().unwrap()
    }

    fn claim(&mut self, bettor: Address, round: u64) -> u64 {
        let receipt = self.ledger.claim(bettor, round).unwrap();
        match receipt.results[0].market_call() {
            Some(CallResult::Claimed { payout, .. }) => *payout,
            other => panic!("unexpected claim result: {:?}", other),
        }
    }
}

fn market_error(result: Result<predix_market::GroupReceipt, LedgerError>) -> MarketError {
    match result {
        Err(e) => e.market_error().cloned().unwrap_or_else(|| panic!("not a market error: {}", e)),
        Ok(receipt) => panic!("group unexpectedly committed: {:?}", receipt.results),
    }
}

fn temp_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "predix-scenario-{}-{}-{}",
        label,
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// ============================================================================
// SETTLEMENT SCENARIOS
// ============================================================================

#[test]
fn test_up_round_pays_winner_whole_pool() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");
    let bob = market.account("BOB");

    market.ledger.place_bet(alice, Side::Up, 100).unwrap();
    market.ledger.place_bet(bob, Side::Down, 300).unwrap();

    let round = market.ledger.market_round(0).unwrap().unwrap();
    assert_eq!(round.start_price, 1000);
    assert_eq!((round.total_up, round.total_down), (100, 300));
    assert_eq!(market.ledger.balance(&market.custody()), 400);

    market.price(1100);
    market.next_round();
    let receipt = market.ledger.resolve(bob, RoundSelector::Latest).unwrap();
    assert_eq!(
        receipt.results[0].market_call(),
        Some(&CallResult::Resolved { round: 0, start_price: 1000, end_price: 1100, outcome: Outcome::Up })
    );

    assert_eq!(market.claim(alice, 0), 400);
    assert_eq!(market.claim(bob, 0), 0);

    assert_eq!(market.ledger.balance(&alice), FUNDS + 300);
    assert_eq!(market.ledger.balance(&bob), FUNDS - 300);
    assert_eq!(market.ledger.balance(&market.custody()), 0);
    assert!(market.ledger.market_bet(0, &bob).unwrap().unwrap().claimed);
}

#[test]
fn test_tie_refunds_every_bettor() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");
    let bob = market.account("BOB");

    market.ledger.place_bet(alice, Side::Up, 250).unwrap();
    market.ledger.place_bet(bob, Side::Down, 750).unwrap();
    market.next_round();
    market.ledger.resolve(alice, RoundSelector::Index(0)).unwrap();

    let round = market.ledger.market_round(0).unwrap().unwrap();
    assert_eq!(round.outcome, Outcome::Tie);
    assert_eq!(round.end_price, round.start_price);

    assert_eq!(market.claim(alice, 0), 250);
    assert_eq!(market.claim(bob, 0), 750);
    assert_eq!(market.ledger.balance(&alice), FUNDS);
    assert_eq!(market.ledger.balance(&bob), FUNDS);
}

#[test]
fn test_down_round_with_empty_winning_side_pays_nobody() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    market.ledger.place_bet(alice, Side::Up, 500).unwrap();
    market.price(900);
    market.next_round();
    market.ledger.resolve(alice, RoundSelector::Latest).unwrap();

    assert_eq!(market.ledger.market_round(0).unwrap().unwrap().outcome, Outcome::Down);
    assert_eq!(market.claim(alice, 0), 0);
    // Stake stays in custody
    assert_eq!(market.ledger.balance(&market.custody()), 500);
}

#[test]
fn test_payouts_never_exceed_pool() {
    let mut market = Market::deploy(MemoryStore::new());
    let names = ["A1", "A2", "A3", "B1", "B2"];
    let stakes = [(Side::Up, 7), (Side::Up, 11), (Side::Up, 13), (Side::Down, 17), (Side::Down, 19)];
    let bettors: Vec<Address> = names.iter().map(|n| market.account(n)).collect();

    for (bettor, (side, amount)) in bettors.iter().zip(stakes.iter()) {
        market.ledger.place_bet(*bettor, *side, *amount).unwrap();
    }
    let pool: u64 = stakes.iter().map(|(_, a)| a).sum();

    let round = market.ledger.market_round(0).unwrap().unwrap();
    assert_eq!(round.total_up, 31);
    assert_eq!(round.total_down, 36);
    assert_eq!(round.total_up + round.total_down, pool);

    market.price(1001);
    market.next_round();
    market.ledger.resolve(bettors[0], RoundSelector::Index(0)).unwrap();

    let paid: u64 = bettors.iter().map(|b| market.claim(*b, 0)).sum();
    let residual = market.ledger.balance(&market.custody());

    assert!(paid <= pool);
    assert_eq!(paid + residual, pool);
    // Flooring loses less than one unit per winning bet
    assert!(residual < 3);
}

// ============================================================================
// REJECTIONS
// ============================================================================

#[test]
fn test_duplicate_bet_rejected_without_moving_funds() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    market.ledger.place_bet(alice, Side::Up, 100).unwrap();
    let err = market_error(market.ledger.place_bet(alice, Side::Down, 50));

    assert!(matches!(err, MarketError::DuplicateBet { round: 0, .. }));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(market.ledger.balance(&alice), FUNDS - 100);
    let round = market.ledger.market_round(0).unwrap().unwrap();
    assert_eq!((round.total_up, round.total_down), (100, 0));

    // A new round accepts the same bettor again
    market.next_round();
    market.ledger.place_bet(alice, Side::Down, 50).unwrap();
    assert_eq!(market.ledger.market_bet(1, &alice).unwrap().unwrap().side, Side::Down);
}

#[test]
fn test_double_claim_rejected() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    market.ledger.place_bet(alice, Side::Up, 100).unwrap();
    market.price(2000);
    market.next_round();
    market.ledger.resolve(alice, RoundSelector::Latest).unwrap();

    assert_eq!(market.claim(alice, 0), 100);
    let err = market_error(market.ledger.claim(alice, 0));
    assert!(matches!(err, MarketError::AlreadyClaimed { round: 0, .. }));
    assert_eq!(market.ledger.balance(&alice), FUNDS);
}

#[test]
fn test_resolve_is_one_shot() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    market.ledger.place_bet(alice, Side::Down, 100).unwrap();
    market.price(800);
    market.next_round();
    market.ledger.resolve(alice, RoundSelector::Index(0)).unwrap();

    // Later price moves cannot rewrite a settled round
    market.price(5000);
    let err = market_error(market.ledger.resolve(alice, RoundSelector::Index(0)));
    assert_eq!(err, MarketError::RoundAlreadyResolved(0));

    let round = market.ledger.market_round(0).unwrap().unwrap();
    assert_eq!(round.end_price, 800);
    assert_eq!(round.outcome, Outcome::Down);
}

#[test]
fn test_open_round_cannot_be_resolved_or_claimed() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");
    market.ledger.place_bet(alice, Side::Up, 100).unwrap();

    let err = market_error(market.ledger.resolve(alice, RoundSelector::Latest));
    assert_eq!(err, MarketError::RoundStillOpen { round: 0, current: 0 });

    let err = market_error(market.ledger.claim(alice, 0));
    assert_eq!(err, MarketError::RoundNotResolved(0));
}

#[test]
fn test_round_exists_only_after_a_bet() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    market.next_round();
    market.next_round();
    assert!(market.ledger.market_round(0).unwrap().is_none());
    assert!(market.ledger.market_round(1).unwrap().is_none());

    let err = market_error(market.ledger.resolve(alice, RoundSelector::Index(1)));
    assert_eq!(err, MarketError::RoundNotFound(1));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = market_error(market.ledger.claim(alice, 1));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_bet_group_must_carry_payment() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    let args = MarketCall::PlaceBet { side: Side::Up }.to_args();
    let lone_call = vec![Txn::market_call(alice, args.clone())];
    assert!(matches!(market_error(market.ledger.submit(lone_call)), MarketError::InvalidGroup(_)));

    let wrong_receiver = vec![Txn::payment(alice, alice, 10), Txn::market_call(alice, args)];
    assert!(matches!(market_error(market.ledger.submit(wrong_receiver)), MarketError::InvalidGroup(_)));

    assert!(market.ledger.market_round(0).unwrap().is_none());
    assert_eq!(market.ledger.balance(&alice), FUNDS);
}

#[test]
fn test_payment_shortfall_drops_whole_group() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    let result = market.ledger.place_bet(alice, Side::Up, FUNDS + 1);
    assert!(matches!(result, Err(LedgerError::TxnFailed { index: 0, .. })));
    assert!(market.ledger.market_round(0).unwrap().is_none());
    assert!(market.ledger.market_bet(0, &alice).unwrap().is_none());
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[test]
fn test_sled_state_survives_reopen() {
    let dir = temp_dir("reopen");
    let alice = Address::from_seed("ALICE");

    let first_asset = {
        let mut market = Market::deploy(SledStore::open(&dir).unwrap());
        market.ledger.fund(&alice, FUNDS).unwrap();
        market.ledger.place_bet(alice, Side::Up, 321).unwrap();
        // No flush and no checkpoint: only what each commit wrote
        market.ledger.market_round(0).unwrap().unwrap().tracking_asset_id
    };

    let mut ledger = Ledger::open(SledStore::open(&dir).unwrap()).unwrap();
    let custody = ledger.market_address().unwrap();
    let round = ledger.market_round(0).unwrap().unwrap();
    assert_eq!(round.total_up, 321);
    assert!(ledger.market_config().unwrap().is_some());
    assert_eq!(ledger.balance(&alice), FUNDS - 321);
    assert_eq!(ledger.balance(&custody), round.total_up + round.total_down);
    assert_eq!(ledger.asset_balance(first_asset, &alice), 1);

    // The stored bet still blocks a second one
    let result = ledger.place_bet(alice, Side::Down, 5);
    assert!(matches!(result.unwrap_err().market_error(), Some(MarketError::DuplicateBet { .. })));

    // The next round mints a fresh receipt asset
    ledger.advance(ROUND_LEN);
    ledger.place_bet(alice, Side::Down, 5).unwrap();
    assert!(ledger.market_round(1).unwrap().unwrap().tracking_asset_id > first_asset);

    drop(ledger);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_service_restart_from_disk_keeps_custody_equal_to_pool() {
    let dir = temp_dir("restart");
    let config = ServiceConfig { data_dir: Some(dir.clone()), ..ServiceConfig::default() };

    let (alice, bob) = {
        let mut state = AppState::new(config.clone()).unwrap();
        let alice = state.resolve_address("alice").unwrap();
        let bob = state.resolve_address("bob").unwrap();
        state.ledger.place_bet(alice, Side::Up, 250).unwrap();
        state.ledger.place_bet(bob, Side::Down, 150).unwrap();
        (alice, bob)
    };

    let mut state = AppState::new(config).unwrap();
    let custody = state.resolve_address("market").unwrap();
    let round = state.ledger.market_round(0).unwrap().unwrap();

    assert_eq!(state.ledger.balance(&custody), 400);
    assert_eq!(round.total_up + round.total_down, 400);
    assert_eq!(state.ledger.balance(&alice), state.config.genesis_funds - 250);
    assert_eq!(state.ledger.balance(&bob), state.config.genesis_funds - 150);

    // Settlement still works on the restarted service
    let (operator, oracle_ref) = (state.operator, state.oracle_ref);
    state.ledger.set_oracle_price(operator, oracle_ref, 900).unwrap();
    state.ledger.advance(ROUND_LEN);
    state.ledger.resolve(bob, RoundSelector::Latest).unwrap();
    let receipt = state.ledger.claim(bob, 0).unwrap();
    assert!(matches!(receipt.results[0].market_call(), Some(CallResult::Claimed { payout: 400, .. })));
    assert_eq!(state.ledger.balance(&custody), 0);

    drop(state);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_receipts_match_committed_results() {
    let mut market = Market::deploy(MemoryStore::new());
    let alice = market.account("ALICE");

    let receipt = market.ledger.place_bet(alice, Side::Up, 42).unwrap();
    assert_eq!(receipt.results.len(), 2);
    assert!(matches!(receipt.results[0], TxnResult::Payment { amount: 42 }));
    match receipt.results[1].market_call() {
        Some(CallResult::BetPlaced { round, amount, round_opened, .. }) => {
            assert_eq!((*round, *amount, *round_opened), (0, 42, true));
        }
        other => panic!("unexpected bet result: {:?}", other),
    }
}
