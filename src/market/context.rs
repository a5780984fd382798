// Execution context handed to the market by the host ledger

use crate::ledger::{Address, AssetParams, InnerTxn, Txn};

use super::ROUND_LEN;

/// Where and by whom a market call is being executed
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub sender: Address,
    pub height: u64,
    /// Custody account of the market application
    pub app_address: Address,
    /// Whole atomic group this call belongs to
    pub group: &'a [Txn],
    pub group_index: usize,
}

impl<'a> CallContext<'a> {
    pub fn round_index(&self) -> u64 {
        round_index(self.height)
    }
}

/// `floor(height / ROUND_LEN)`
pub fn round_index(height: u64) -> u64 {
    height / ROUND_LEN
}

/// Side effects requested by one call. Asset ids are reserved from the
/// ledger's counter but only become real if the group commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTxns {
    next_asset_id: u64,
    submitted: Vec<InnerTxn>,
}

impl InnerTxns {
    pub fn new(next_asset_id: u64) -> Self {
        Self { next_asset_id, submitted: Vec::new() }
    }

    /// Request a new asset; returns the id it will carry
    pub fn create_asset(&mut self, params: AssetParams) -> u64 {
        let asset_id = self.next_asset_id;
        self.next_asset_id += 1;
        self.submitted.push(InnerTxn::AssetCreate { asset_id, params });
        asset_id
    }

    pub fn asset_transfer(&mut self, asset_id: u64, receiver: Address, amount: u64) {
        self.submitted.push(InnerTxn::AssetTransfer { asset_id, receiver, amount });
    }

    pub fn payment(&mut self, receiver: Address, amount: u64) {
        self.submitted.push(InnerTxn::Payment { receiver, amount });
    }

    pub fn submitted(&self) -> &[InnerTxn] {
        &self.submitted
    }

    pub fn next_asset_id(&self) -> u64 {
        self.next_asset_id
    }

    pub fn into_submitted(self) -> Vec<InnerTxn> {
        self.submitted
    }
}
