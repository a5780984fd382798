// ============================================================================
// Storage - Key-value slots backing the market state machine
// ============================================================================
//
// Every submitted group runs against an `Overlay`: reads fall through to the
// committed store, writes are buffered. When the group succeeds its `WriteSet`
// is committed in one atomic step; when it fails the overlay is dropped and
// nothing is written.
//
// `create` keys are re-checked at commit time, so two writers racing for the
// same slot resolve to "second writer fails".
//
// ============================================================================

pub mod sled_store;

pub use sled_store::SledStore;

use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// `create` on a key that is already visible
    AlreadyExists(String),
    /// A create key appeared between staging and commit
    Conflict(String),
    /// Backend I/O failure
    Backend(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::AlreadyExists(key) => write!(f, "Slot already exists: {}", key),
            StorageError::Conflict(key) => write!(f, "Commit conflict on slot: {}", key),
            StorageError::Backend(msg) => write!(f, "Storage backend error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Printable form of a binary key for error messages
pub fn display_key(key: &[u8]) -> String {
    match key.iter().position(|b| *b == b'|') {
        Some(split) if key[..split].iter().all(|b| b.is_ascii_alphanumeric()) => {
            format!("{}|{}", String::from_utf8_lossy(&key[..split]), hex::encode(&key[split + 1..]))
        }
        _ => hex::encode(key),
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Committed key-value state
pub trait KeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Apply a write set atomically. Fails with `Conflict` (and writes
    /// nothing) if any create key already exists.
    fn commit(&mut self, writes: WriteSet) -> Result<(), StorageError>;
}

// ============================================================================
// WRITE SET
// ============================================================================

/// Buffered mutations of one group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    creates: BTreeSet<Vec<u8>>,
    puts: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl WriteSet {
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.puts.len()
    }

    /// Keys that must not exist at commit time
    pub fn creates(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.creates.iter()
    }

    pub fn puts(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.puts.iter()
    }
}

// ============================================================================
// OVERLAY
// ============================================================================

/// Staging view over a committed store
pub struct Overlay<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    writes: WriteSet,
}

impl<'a, S: KeyValueStore + ?Sized> Overlay<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, writes: WriteSet::default() }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(value) = self.writes.puts.get(key) {
            return Ok(Some(value.clone()));
        }
        self.store.get(key)
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Overwrite (or create) a slot
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.puts.insert(key, value);
    }

    /// Create-if-absent
    pub fn create(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        if self.contains(&key)? {
            return Err(StorageError::AlreadyExists(display_key(&key)));
        }
        self.writes.creates.insert(key.clone());
        self.writes.puts.insert(key, value);
        Ok(())
    }

    pub fn into_write_set(self) -> WriteSet {
        self.writes
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn commit(&mut self, writes: WriteSet) -> Result<(), StorageError> {
        if let Some(key) = writes.creates.iter().find(|k| self.entries.contains_key(*k)) {
            return Err(StorageError::Conflict(display_key(key)));
        }
        self.entries.extend(writes.puts);
        Ok(())
    }
}

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Store chosen at service start-up
pub enum StoreBackend {
    Memory(MemoryStore),
    Sled(SledStore),
}

impl StoreBackend {
    pub fn flush(&self) -> Result<(), StorageError> {
        match self {
            StoreBackend::Memory(_) => Ok(()),
            StoreBackend::Sled(store) => store.flush(),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            StoreBackend::Memory(_) => "memory",
            StoreBackend::Sled(_) => "sled",
        }
    }
}

impl KeyValueStore for StoreBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match self {
            StoreBackend::Memory(store) => store.get(key),
            StoreBackend::Sled(store) => store.get(key),
        }
    }

    fn commit(&mut self, writes: WriteSet) -> Result<(), StorageError> {
        match self {
            StoreBackend::Memory(store) => store.commit(writes),
            StoreBackend::Sled(store) => store.commit(writes),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
