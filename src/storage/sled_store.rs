// Sled-backed market storage

use std::path::Path;

use sled::transaction::{abort, ConflictableTransactionResult, TransactionError, TransactionalTree};

use super::{display_key, KeyValueStore, StorageError, WriteSet};

/// Tree holding the market's slots
pub const MARKET_TREE: &str = "market_slots";

pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Scratch database removed on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(MARKET_TREE)?;
        Ok(Self { db, tree })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.tree.flush()?;
        self.db.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

fn apply_writes(tx: &TransactionalTree, writes: &WriteSet) -> ConflictableTransactionResult<(), StorageError> {
    for key in writes.creates() {
        if tx.get(key.as_slice())?.is_some() {
            return abort(StorageError::Conflict(display_key(key)));
        }
    }
    for (key, value) in writes.puts() {
        tx.insert(key.as_slice(), value.as_slice())?;
    }
    Ok(())
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn commit(&mut self, writes: WriteSet) -> Result<(), StorageError> {
        if writes.is_empty() {
            return Ok(());
        }
        match self.tree.transaction(|tx| apply_writes(tx, &writes)) {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        }
        // A committed group is on disk before it is acknowledged
        self.tree.flush()?;
        Ok(())
    }
}
