/// Signed Transaction Envelopes
///
/// An account address is its Ed25519 verifying key. Every transaction that
/// arrives from outside the process carries the sender's signature over the
/// digest of its whole group, its position in the group and the sender's nonce.
///
/// Signing digest:
///   SHA256("predix-group" || for each txn: len(json) || json)   → group digest
///   SHA256("predix-txn" || group digest || index || nonce)      → signed bytes
///
/// Binding the signature to the group means a signed payment cannot be lifted
/// out of its bet group; the nonce makes a committed group non-replayable.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use super::txn::{Address, Txn};

/// Master seed for the well-known development accounts (NEVER use in production!)
const DEV_KEY_SEED: &[u8] = b"predix-dev-accounts-v1";

/// Deterministic key of a named development account
pub fn dev_signing_key(name: &str) -> SigningKey {
    let mut hasher = Sha256::new();
    hasher.update(DEV_KEY_SEED);
    hasher.update(name.to_uppercase().as_bytes());
    let secret: [u8; 32] = hasher.finalize().into();
    SigningKey::from_bytes(&secret)
}

/// Address controlled by `key`
pub fn address_of(key: &SigningKey) -> Address {
    Address(key.verifying_key().to_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Sender address is not a valid Ed25519 key (application accounts never are)
    InvalidSender(Address),
    Malformed(String),
    Mismatch { index: usize },
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::InvalidSender(address) => write!(f, "Sender {} cannot sign", address.short()),
            SignatureError::Malformed(msg) => write!(f, "Malformed signature: {}", msg),
            SignatureError::Mismatch { index } => write!(f, "Signature of transaction {} does not match its sender", index),
        }
    }
}

impl std::error::Error for SignatureError {}

/// One transaction of a group with its sender's authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTxn {
    pub txn: Txn,
    pub nonce: u64,
    pub signature: Vec<u8>,
}

pub fn group_digest(group: &[Txn]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"predix-group");
    for txn in group {
        let json = serde_json::to_vec(txn).unwrap_or_default();
        hasher.update((json.len() as u64).to_be_bytes());
        hasher.update(&json);
    }
    hasher.finalize().into()
}

/// Bytes the sender of transaction `index` signs
pub fn signing_bytes(digest: &[u8; 32], index: usize, nonce: u64) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"predix-txn");
    hasher.update(digest);
    hasher.update((index as u64).to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    hasher.finalize().to_vec()
}

/// Sign transaction `index` of `group`
pub fn sign_txn(key: &SigningKey, group: &[Txn], index: usize, nonce: u64) -> Vec<u8> {
    let message = signing_bytes(&group_digest(group), index, nonce);
    key.sign(&message).to_bytes().to_vec()
}

/// Check every signature against its transaction's sender
pub fn verify_group(signed: &[SignedTxn]) -> Result<(), SignatureError> {
    let group: Vec<Txn> = signed.iter().map(|s| s.txn.clone()).collect();
    let digest = group_digest(&group);

    for (index, entry) in signed.iter().enumerate() {
        let sender = entry.txn.sender();
        let key = VerifyingKey::from_bytes(sender.as_bytes()).map_err(|_| SignatureError::InvalidSender(*sender))?;
        let signature = Signature::from_slice(&entry.signature)
            .map_err(|e| SignatureError::Malformed(format!("transaction {}: {}", index, e)))?;

        key.verify(&signing_bytes(&digest, index, entry.nonce), &signature)
            .map_err(|_| SignatureError::Mismatch { index })?;
    }
    Ok(())
}
