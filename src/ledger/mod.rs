/// Host Ledger for the Predix round market
///
/// In-process rendition of the ledger the market contract runs on:
/// - Accounts, payments and application-issued assets
/// - The mock price oracle application
/// - Atomic transaction groups: every transaction in a group commits, or none does
/// - The monotonic height counter that rounds are derived from
///
/// KEY FEATURES:
/// - Each group executes against a cloned world and a storage overlay
/// - Market storage writes, inner transactions and the world itself commit
///   in one store write, so a reopened store is always self-consistent
/// - Externally submitted groups are signed and nonce-checked per sender
/// - Bounded activity log of committed and rejected groups

pub mod signing;
pub mod txn;

pub use signing::{SignatureError, SignedTxn};
pub use txn::{btoi, itob, Address, AssetParams, InnerTxn, Txn};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, VecDeque};
use tracing::{info, warn};

use crate::codec::{Bet, Round, Side};
use crate::market::{self, bets, rounds, CallContext, CallResult, ErrorKind, InnerTxns, MarketCall, MarketConfig, MarketError, RoundSelector};
use crate::oracle::MockOracle;
use crate::storage::{KeyValueStore, Overlay, StorageError};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Largest atomic group accepted
pub const MAX_GROUP_SIZE: usize = 16;

/// First application id handed out
pub const FIRST_APP_ID: u64 = 1001;

/// First asset id handed out
pub const FIRST_ASSET_ID: u64 = 5001;

/// Activity entries kept in memory
pub const MAX_ACTIVITY: usize = 1000;

/// Store slot holding the serialized `World`
pub const WORLD_KEY: &[u8] = b"ledger|world";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    EmptyGroup,
    GroupTooLarge(usize),
    InsufficientFunds { address: Address, needed: u64, available: u64 },
    InsufficientAssets { asset_id: u64, address: Address, needed: u64, available: u64 },
    BalanceOverflow(Address),
    UnknownAsset(u64),
    UnknownOracle(u64),
    MarketNotDeployed,
    MarketAlreadyDeployed(u64),
    /// Transaction `index` of the group failed; nothing was applied
    TxnFailed { index: usize, source: Box<LedgerError> },
    BadSignature(SignatureError),
    BadNonce { address: Address, expected: u64, got: u64 },
    Market(MarketError),
    Storage(StorageError),
    Snapshot(String),
}

impl LedgerError {
    /// The contract error behind a rejection, if any
    pub fn market_error(&self) -> Option<&MarketError> {
        match self {
            LedgerError::Market(e) => Some(e),
            LedgerError::TxnFailed { source, .. } => source.market_error(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Market(e) => e.kind(),
            LedgerError::TxnFailed { source, .. } => source.kind(),
            LedgerError::UnknownAsset(_) | LedgerError::UnknownOracle(_) | LedgerError::MarketNotDeployed => {
                ErrorKind::NotFound
            }
            LedgerError::Storage(StorageError::Conflict(_)) => ErrorKind::PreconditionFailed,
            LedgerError::Storage(_) | LedgerError::Snapshot(_) => ErrorKind::Storage,
            LedgerError::BadSignature(_) => ErrorKind::Unauthorized,
            _ => ErrorKind::PreconditionFailed,
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::EmptyGroup => write!(f, "Group is empty"),
            LedgerError::GroupTooLarge(n) => write!(f, "Group of {} exceeds the limit of {}", n, MAX_GROUP_SIZE),
            LedgerError::InsufficientFunds { address, needed, available } => {
                write!(f, "Insufficient funds in {}: {} < {}", address.short(), available, needed)
            }
            LedgerError::InsufficientAssets { asset_id, address, needed, available } => write!(
                f,
                "Insufficient units of asset {} in {}: {} < {}",
                asset_id,
                address.short(),
                available,
                needed
            ),
            LedgerError::BalanceOverflow(address) => write!(f, "Balance overflow for {}", address.short()),
            LedgerError::UnknownAsset(id) => write!(f, "Asset not found: {}", id),
            LedgerError::UnknownOracle(id) => write!(f, "Oracle application not found: {}", id),
            LedgerError::MarketNotDeployed => write!(f, "Market application is not deployed"),
            LedgerError::MarketAlreadyDeployed(id) => write!(f, "Market application already deployed as {}", id),
            LedgerError::TxnFailed { index, source } => write!(f, "Transaction {} rejected: {}", index, source),
            LedgerError::BadSignature(e) => write!(f, "{}", e),
            LedgerError::BadNonce { address, expected, got } => {
                write!(f, "Stale nonce for {}: expected {}, got {}", address.short(), expected, got)
            }
            LedgerError::Market(e) => write!(f, "{}", e),
            LedgerError::Storage(e) => write!(f, "{}", e),
            LedgerError::Snapshot(msg) => write!(f, "Snapshot error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<MarketError> for LedgerError {
    fn from(e: MarketError) -> Self {
        LedgerError::Market(e)
    }
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        LedgerError::Storage(e)
    }
}

// ============================================================================
// WORLD STATE
// ============================================================================

/// Everything the ledger tracks outside the market's key-value slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub height: u64,
    pub balances: BTreeMap<Address, u64>,
    /// asset id -> holder -> units
    pub holdings: BTreeMap<u64, BTreeMap<Address, u64>>,
    pub assets: BTreeMap<u64, AssetParams>,
    pub oracles: BTreeMap<u64, MockOracle>,
    pub market_app_id: Option<u64>,
    pub next_app_id: u64,
    pub next_asset_id: u64,
    /// Next nonce each signer must use
    pub nonces: BTreeMap<Address, u64>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            height: 0,
            balances: BTreeMap::new(),
            holdings: BTreeMap::new(),
            assets: BTreeMap::new(),
            oracles: BTreeMap::new(),
            market_app_id: None,
            next_app_id: FIRST_APP_ID,
            next_asset_id: FIRST_ASSET_ID,
            nonces: BTreeMap::new(),
        }
    }
}

impl World {
    pub fn balance(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn asset_balance(&self, asset_id: u64, address: &Address) -> u64 {
        self.holdings
            .get(&asset_id)
            .and_then(|holders| holders.get(address))
            .copied()
            .unwrap_or(0)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(*address).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::BalanceOverflow(*address))?;
        Ok(())
    }

    pub fn debit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance(address);
        if available < amount {
            return Err(LedgerError::InsufficientFunds { address: *address, needed: amount, available });
        }
        self.balances.insert(*address, available - amount);
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    pub fn transfer_asset(&mut self, asset_id: u64, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let holders = self.holdings.get_mut(&asset_id).ok_or(LedgerError::UnknownAsset(asset_id))?;
        let available = holders.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientAssets { asset_id, address: *from, needed: amount, available });
        }
        holders.insert(*from, available - amount);
        let held = holders.entry(*to).or_insert(0);
        *held = held.checked_add(amount).ok_or(LedgerError::BalanceOverflow(*to))?;
        Ok(())
    }

    fn allocate_app_id(&mut self) -> u64 {
        let id = self.next_app_id;
        self.next_app_id += 1;
        id
    }

    /// Execute side effects requested by the application at `app_address`
    pub fn apply_inner(&mut self, app_address: &Address, inner: &[InnerTxn]) -> Result<(), LedgerError> {
        for txn in inner {
            match txn {
                InnerTxn::AssetCreate { asset_id, params } => {
                    let mut holders = BTreeMap::new();
                    holders.insert(params.reserve, params.total);
                    self.holdings.insert(*asset_id, holders);
                    self.assets.insert(*asset_id, params.clone());
                    self.next_asset_id = self.next_asset_id.max(asset_id + 1);
                }
                InnerTxn::AssetTransfer { asset_id, receiver, amount } => {
                    self.transfer_asset(*asset_id, app_address, receiver, *amount)?;
                }
                InnerTxn::Payment { receiver, amount } => {
                    self.transfer(app_address, receiver, *amount)?;
                }
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Snapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Snapshot(e.to_string()))
    }
}

// ============================================================================
// RECEIPTS & ACTIVITY
// ============================================================================

/// Result of one top-level transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxnResult {
    Payment { amount: u64 },
    OracleCreated { oracle_ref: u64 },
    OracleUpdated { oracle_ref: u64, price: u64 },
    MarketCreated { app_id: u64, app_address: Address, call: CallResult },
    MarketCall { call: CallResult },
}

impl TxnResult {
    pub fn market_call(&self) -> Option<&CallResult> {
        match self {
            TxnResult::MarketCreated { call, .. } | TxnResult::MarketCall { call } => Some(call),
            _ => None,
        }
    }
}

/// Everything a committed group did
#[derive(Debug, Clone, Serialize)]
pub struct GroupReceipt {
    pub group_id: String,
    pub height: u64,
    pub results: Vec<TxnResult>,
    pub inner_txns: Vec<InnerTxn>,
}

/// One line of the activity log
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub height: u64,
    pub emoji: &'static str,
    pub action: String,
    pub details: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    pub height: u64,
    pub accounts: usize,
    pub assets: usize,
    pub committed_groups: u64,
    pub rejected_groups: u64,
}

fn describe(result: &TxnResult) -> (&'static str, &'static str, String) {
    match result {
        TxnResult::Payment { amount } => ("💸", "PAYMENT", format!("{} units", amount)),
        TxnResult::OracleCreated { oracle_ref } => ("🔮", "ORACLE_CREATED", format!("oracle {}", oracle_ref)),
        TxnResult::OracleUpdated { oracle_ref, price } => {
            ("🔮", "ORACLE_UPDATED", format!("oracle {} price {}", oracle_ref, price))
        }
        TxnResult::MarketCreated { app_id, call, .. } => ("📊", "MARKET_CREATED", format!("app {} {:?}", app_id, call)),
        TxnResult::MarketCall { call } => match call {
            CallResult::BetPlaced { round, side, amount, .. } => {
                ("🎯", "BET", format!("round {} {:?} {} units", round, side, amount))
            }
            CallResult::Resolved { round, start_price, end_price, outcome } => (
                "✅",
                "RESOLVED",
                format!("round {} {} -> {} {:?}", round, start_price, end_price, outcome),
            ),
            CallResult::Claimed { round, payout } => ("💰", "CLAIM", format!("round {} payout {}", round, payout)),
            CallResult::Created { oracle_ref } => ("📊", "MARKET_CREATED", format!("oracle {}", oracle_ref)),
        },
    }
}

// ============================================================================
// GROUP EXECUTION
// ============================================================================

fn run_market_call<S: KeyValueStore + ?Sized>(
    world: &mut World,
    state: &mut Overlay<'_, S>,
    call: &MarketCall,
    sender: Address,
    app_id: u64,
    group: &[Txn],
    group_index: usize,
) -> Result<(CallResult, Vec<InnerTxn>), LedgerError> {
    let app_address = Address::for_application(app_id);
    let ctx = CallContext { sender, height: world.height, app_address, group, group_index };

    let mut inner = InnerTxns::new(world.next_asset_id);
    let result = market::execute(call, &ctx, state, &world.oracles, &mut inner)?;
    world.next_asset_id = inner.next_asset_id();

    let submitted = inner.into_submitted();
    world.apply_inner(&app_address, &submitted)?;
    Ok((result, submitted))
}

fn apply_txn<S: KeyValueStore + ?Sized>(
    world: &mut World,
    state: &mut Overlay<'_, S>,
    group: &[Txn],
    index: usize,
) -> Result<(TxnResult, Vec<InnerTxn>), LedgerError> {
    match &group[index] {
        Txn::Payment { sender, receiver, amount } => {
            world.transfer(sender, receiver, *amount)?;
            Ok((TxnResult::Payment { amount: *amount }, Vec::new()))
        }
        Txn::OracleCreate { .. } => {
            let oracle_ref = world.allocate_app_id();
            world.oracles.insert(oracle_ref, MockOracle::create());
            Ok((TxnResult::OracleCreated { oracle_ref }, Vec::new()))
        }
        Txn::OracleUpdate { oracle_ref, price, .. } => {
            world
                .oracles
                .get_mut(oracle_ref)
                .ok_or(LedgerError::UnknownOracle(*oracle_ref))?
                .update_price(*price);
            Ok((TxnResult::OracleUpdated { oracle_ref: *oracle_ref, price: *price }, Vec::new()))
        }
        Txn::MarketCreate { sender, args } => {
            if let Some(existing) = world.market_app_id {
                return Err(LedgerError::MarketAlreadyDeployed(existing));
            }
            let call = MarketCall::parse_create(args)?;
            let app_id = world.allocate_app_id();
            let (call, inner) = run_market_call(world, state, &call, *sender, app_id, group, index)?;
            world.market_app_id = Some(app_id);
            let app_address = Address::for_application(app_id);
            Ok((TxnResult::MarketCreated { app_id, app_address, call }, inner))
        }
        Txn::MarketCall { sender, args } => {
            let app_id = world.market_app_id.ok_or(LedgerError::MarketNotDeployed)?;
            let call = MarketCall::parse(args)?;
            let (call, inner) = run_market_call(world, state, &call, *sender, app_id, group, index)?;
            Ok((TxnResult::MarketCall { call }, inner))
        }
    }
}

fn execute_group<S: KeyValueStore + ?Sized>(
    world: &mut World,
    state: &mut Overlay<'_, S>,
    group: &[Txn],
) -> Result<(Vec<TxnResult>, Vec<InnerTxn>), LedgerError> {
    let mut results = Vec::with_capacity(group.len());
    let mut inner_txns = Vec::new();
    for index in 0..group.len() {
        let (result, inner) = apply_txn(world, state, group, index)
            .map_err(|e| LedgerError::TxnFailed { index, source: Box::new(e) })?;
        results.push(result);
        inner_txns.extend(inner);
    }
    Ok((results, inner_txns))
}

// ============================================================================
// LEDGER
// ============================================================================

fn check_group_size(len: usize) -> Result<(), LedgerError> {
    if len == 0 {
        return Err(LedgerError::EmptyGroup);
    }
    if len > MAX_GROUP_SIZE {
        return Err(LedgerError::GroupTooLarge(len));
    }
    Ok(())
}

pub struct Ledger<S: KeyValueStore> {
    world: World,
    store: S,
    activity: VecDeque<ActivityEntry>,
    committed_groups: u64,
    rejected_groups: u64,
}

impl<S: KeyValueStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { world: World::default(), store, activity: VecDeque::new(), committed_groups: 0, rejected_groups: 0 }
    }

    /// Resume from whatever world the store last committed
    pub fn open(store: S) -> Result<Self, LedgerError> {
        let world = match store.get(WORLD_KEY)? {
            Some(bytes) => World::from_bytes(&bytes)?,
            None => World::default(),
        };
        info!(height = world.height, accounts = world.balances.len(), "ledger opened");
        Ok(Self { world, ..Self::new(store) })
    }

    /// Persist the current world on its own (after `advance`)
    pub fn checkpoint(&mut self) -> Result<(), LedgerError> {
        let bytes = self.world.to_bytes()?;
        self.commit_world(bytes)
    }

    fn commit_world(&mut self, bytes: Vec<u8>) -> Result<(), LedgerError> {
        let mut state = Overlay::new(&self.store);
        state.put(WORLD_KEY.to_vec(), bytes);
        let writes = state.into_write_set();
        self.store.commit(writes)?;
        Ok(())
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn height(&self) -> u64 {
        self.world.height
    }

    pub fn current_round(&self) -> u64 {
        market::round_index(self.world.height)
    }

    /// Produce `blocks` empty blocks
    pub fn advance(&mut self, blocks: u64) -> u64 {
        self.world.height = self.world.height.saturating_add(blocks);
        self.world.height
    }

    /// Genesis / faucet credit
    pub fn fund(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut world = self.world.clone();
        world.credit(address, amount)?;
        self.commit_world(world.to_bytes()?)?;
        self.world = world;
        self.record_activity("🏦", "FUND", format!("{} +{}", address.short(), amount));
        Ok(())
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.world.balance(address)
    }

    pub fn asset_balance(&self, asset_id: u64, address: &Address) -> u64 {
        self.world.asset_balance(asset_id, address)
    }

    pub fn market_app_id(&self) -> Option<u64> {
        self.world.market_app_id
    }

    /// Custody account holding wagered funds
    pub fn market_address(&self) -> Option<Address> {
        self.world.market_app_id.map(Address::for_application)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.world.nonce(address)
    }

    pub fn oracle_price(&self, oracle_ref: u64) -> Option<u64> {
        self.world.oracles.get(&oracle_ref).and_then(|o| o.price())
    }

    pub fn market_config(&self) -> Result<Option<MarketConfig>, LedgerError> {
        match MarketConfig::load(&Overlay::new(&self.store)) {
            Ok(config) => Ok(Some(config)),
            Err(MarketError::NotInitialized) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn market_round(&self, round_index: u64) -> Result<Option<Round>, LedgerError> {
        Ok(rounds::try_load(&Overlay::new(&self.store), round_index)?)
    }

    pub fn market_bet(&self, round_index: u64, bettor: &Address) -> Result<Option<Bet>, LedgerError> {
        Ok(bets::try_load_bet(&Overlay::new(&self.store), round_index, bettor)?)
    }

    /// Oldest first
    pub fn activity(&self) -> &VecDeque<ActivityEntry> {
        &self.activity
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            height: self.world.height,
            accounts: self.world.balances.len(),
            assets: self.world.assets.len(),
            committed_groups: self.committed_groups,
            rejected_groups: self.rejected_groups,
        }
    }

    /// Execute an atomic group on behalf of the operator process. On any
    /// failure no balance, asset, oracle or storage change is applied.
    pub fn submit(&mut self, group: Vec<Txn>) -> Result<GroupReceipt, LedgerError> {
        check_group_size(group.len())?;
        let world = self.world.clone();
        self.run(group, world)
    }

    /// Execute a group that arrived from outside. Every transaction must be
    /// signed by its sender and carry that sender's next nonce.
    pub fn submit_signed(&mut self, signed: Vec<SignedTxn>) -> Result<GroupReceipt, LedgerError> {
        check_group_size(signed.len())?;
        let group: Vec<Txn> = signed.iter().map(|s| s.txn.clone()).collect();

        if let Err(e) = signing::verify_group(&signed) {
            return Err(self.reject(&group, LedgerError::BadSignature(e)));
        }

        let mut world = self.world.clone();
        for (index, entry) in signed.iter().enumerate() {
            let sender = *entry.txn.sender();
            let expected = world.nonce(&sender);
            if entry.nonce != expected {
                let error = LedgerError::BadNonce { address: sender, expected, got: entry.nonce };
                return Err(self.reject(&group, LedgerError::TxnFailed { index, source: Box::new(error) }));
            }
            world.nonces.insert(sender, expected + 1);
        }

        self.run(group, world)
    }

    fn run(&mut self, group: Vec<Txn>, mut world: World) -> Result<GroupReceipt, LedgerError> {
        let executed = {
            let mut state = Overlay::new(&self.store);
            execute_group(&mut world, &mut state, &group).and_then(|(results, inner)| {
                state.put(WORLD_KEY.to_vec(), world.to_bytes()?);
                Ok((results, inner, state.into_write_set()))
            })
        };

        let (results, inner_txns, writes) = match executed {
            Ok(done) => done,
            Err(e) => return Err(self.reject(&group, e)),
        };

        if let Err(e) = self.store.commit(writes) {
            return Err(self.reject(&group, e.into()));
        }

        self.world = world;
        self.committed_groups += 1;
        let receipt = GroupReceipt {
            group_id: self.group_id(&group),
            height: self.world.height,
            results,
            inner_txns,
        };

        for result in &receipt.results {
            let (emoji, action, details) = describe(result);
            self.record_activity(emoji, action, details);
        }
        info!(group_id = %receipt.group_id, size = group.len(), height = receipt.height, "group committed");
        Ok(receipt)
    }

    fn reject(&mut self, group: &[Txn], error: LedgerError) -> LedgerError {
        self.rejected_groups += 1;
        let kinds: Vec<&str> = group.iter().map(Txn::kind).collect();
        let senders: Vec<String> = group.iter().map(|t| t.sender().short()).collect();
        warn!(height = self.world.height, ?kinds, ?senders, %error, "group rejected");
        self.record_activity("⛔", "REJECTED", format!("{:?}: {}", kinds, error));
        error
    }

    fn group_id(&self, group: &[Txn]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.world.height.to_be_bytes());
        hasher.update(self.committed_groups.to_be_bytes());
        hasher.update(serde_json::to_vec(group).unwrap_or_default());
        hex::encode(hasher.finalize())
    }

    fn record_activity(&mut self, emoji: &'static str, action: &str, details: String) {
        let entry = ActivityEntry {
            timestamp: chrono::Utc::now().format("%H:%M:%S").to_string(),
            height: self.world.height,
            emoji,
            action: action.to_string(),
            details,
        };
        self.activity.push_back(entry);
        if self.activity.len() > MAX_ACTIVITY {
            self.activity.pop_front();
        }
    }

    // ========================================================================
    // CONVENIENCE BUILDERS
    // ========================================================================

    /// Deploy a mock oracle; returns its reference
    pub fn deploy_oracle(&mut self, sender: Address) -> Result<u64, LedgerError> {
        let receipt = self.submit(vec![Txn::OracleCreate { sender }])?;
        match receipt.results.first() {
            Some(TxnResult::OracleCreated { oracle_ref }) => Ok(*oracle_ref),
            _ => Err(LedgerError::UnknownOracle(0)),
        }
    }

    pub fn set_oracle_price(&mut self, sender: Address, oracle_ref: u64, price: u64) -> Result<GroupReceipt, LedgerError> {
        self.submit(vec![Txn::OracleUpdate { sender, oracle_ref, price }])
    }

    /// Deploy the market bound to `oracle_ref`; returns its application id
    pub fn deploy_market(&mut self, sender: Address, oracle_ref: u64) -> Result<u64, LedgerError> {
        let args = MarketCall::Create { oracle_ref }.to_args();
        let receipt = self.submit(vec![Txn::MarketCreate { sender, args }])?;
        match receipt.results.first() {
            Some(TxnResult::MarketCreated { app_id, .. }) => Ok(*app_id),
            _ => Err(LedgerError::MarketNotDeployed),
        }
    }

    /// `[payment → custody, bet call]`
    pub fn bet_group(&self, bettor: Address, side: Side, amount: u64) -> Result<Vec<Txn>, LedgerError> {
        let custody = self.market_address().ok_or(LedgerError::MarketNotDeployed)?;
        Ok(vec![
            Txn::payment(bettor, custody, amount),
            Txn::market_call(bettor, MarketCall::PlaceBet { side }.to_args()),
        ])
    }

    pub fn place_bet(&mut self, bettor: Address, side: Side, amount: u64) -> Result<GroupReceipt, LedgerError> {
        let group = self.bet_group(bettor, side, amount)?;
        self.submit(group)
    }

    pub fn resolve(&mut self, caller: Address, selector: RoundSelector) -> Result<GroupReceipt, LedgerError> {
        let args = MarketCall::Resolve { selector }.to_args();
        self.submit(vec![Txn::market_call(caller, args)])
    }

    pub fn claim(&mut self, bettor: Address, round_index: u64) -> Result<GroupReceipt, LedgerError> {
        let args = MarketCall::Claim { round: round_index }.to_args();
        self.submit(vec![Txn::market_call(bettor, args)])
    }
}

// ============================================================================
// TESTS
// ============================================================================
