//! Storage logic.
//!
//! All protocol records are kept in a single map from string keys to raw bytes, so that
//! any record can be looked up by the key it is published under:
//!
//! | Key | Record |
//! |-----|--------|
//! | `PubKey` | [`PublicKeyRegistry`](struct.PublicKeyRegistry.html) |
//! | `TX<n>RandNum` | [`RandomnessWindow`](struct.RandomnessWindow.html) |
//! | `TX<n>` | [`TransactionRecord`](struct.TransactionRecord.html) |
//! | `TXID` | decimal index of the latest settled transaction |
//!
//! [`Schema`](struct.Schema.html) gives typed access on top of the raw map.

use exonum::storage::{Fork, MapIndex, Snapshot};
use serde::{de::DeserializeOwned, Serialize};
use serde_json;

use crypto::{Commitment, ProofRandomness, PublicKey, RangeProof, Scalar, Token};
use error::Error;

const STATE: &str = "confidential_ledger.state";

/// Key of the public key registry.
pub const PUBLIC_KEYS: &str = "PubKey";
/// Key of the latest settled transaction index.
pub const TXID: &str = "TXID";

/// Key of the randomness window for the transaction `index`.
pub fn randomness_key(index: u64) -> String {
    format!("TX{}RandNum", index)
}

/// Key of the transaction record `index`.
pub fn transaction_key(index: u64) -> String {
    format!("TX{}", index)
}

/// Record kinds addressed by transaction index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedKey {
    Randomness(u64),
    Transaction(u64),
}

impl IndexedKey {
    /// Recognizes `TX<n>` and `TX<n>RandNum` keys.
    pub fn parse(key: &str) -> Option<Self> {
        if !key.starts_with("TX") {
            return None;
        }
        let rest = &key[2..];
        let (digits, is_randomness) = if rest.ends_with("RandNum") {
            (&rest[..rest.len() - "RandNum".len()], true)
        } else {
            (rest, false)
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = digits.parse().ok()?;
        Some(if is_randomness {
            IndexedKey::Randomness(index)
        } else {
            IndexedKey::Transaction(index)
        })
    }

    pub fn index(&self) -> u64 {
        match *self {
            IndexedKey::Randomness(index) | IndexedKey::Transaction(index) => index,
        }
    }
}

/// Public key of a single account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    pub name: String,
    pub public_key: PublicKey,
}

/// Registry of account public keys, written once at genesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyRegistry {
    pub keys: Vec<PublicKeyEntry>,
}

impl PublicKeyRegistry {
    pub fn get(&self, name: &str) -> Option<&PublicKey> {
        self.keys
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.public_key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.keys.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Commitment blinding of a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBlinding {
    pub name: String,
    #[serde(with = "::crypto::serialization::scalar")]
    pub blinding: Scalar,
}

/// Randomness scheduled for a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessWindow {
    pub index: u64,
    /// Commitment blinding for every account.
    pub blindings: Vec<AccountBlinding>,
    /// Auxiliary range proof randomness; absent for the genesis window.
    pub proof: Option<ProofRandomness>,
    /// Set once the transaction `index` is settled with this window.
    pub consumed: bool,
}

impl RandomnessWindow {
    pub fn blinding(&self, name: &str) -> Option<&Scalar> {
        self.blindings
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.blinding)
    }
}

/// Per-account element of a transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZkEntry {
    pub name: String,
    pub commitment: Commitment,
    pub token: Token,
    /// Range proof; absent in the genesis record.
    pub range_proof: Option<RangeProof>,
    /// Accumulated commitment of the spender, including this transaction.
    pub accumulated: Option<Commitment>,
}

/// Record of a settled transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub index: u64,
    pub entries: Vec<ZkEntry>,
}

impl TransactionRecord {
    pub fn entry(&self, name: &str) -> Option<&ZkEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

/// Protocol state of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// Genesis has not been performed.
    Uninitialized,
    /// Transactions `0..=txid` are settled.
    Ready { txid: u64 },
}

impl LedgerState {
    /// Index of the transaction which may be settled next.
    pub fn next_index(&self) -> Option<u64> {
        match *self {
            LedgerState::Uninitialized => None,
            LedgerState::Ready { txid } => txid.checked_add(1),
        }
    }
}

#[derive(Debug)]
pub struct Schema<T> {
    inner: T,
}

impl<T: AsRef<dyn Snapshot>> Schema<T> {
    pub fn new(view: T) -> Self {
        Schema { inner: view }
    }

    fn records(&self) -> MapIndex<&T, String, Vec<u8>> {
        MapIndex::new(STATE, &self.inner)
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.records().get(&key.to_owned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records().contains(&key.to_owned())
    }

    fn read<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, Error> {
        match self.raw(key) {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::LedgerRead {
                    key: key.to_owned(),
                    cause: e.to_string(),
                }),
        }
    }

    pub fn public_keys(&self) -> Result<Option<PublicKeyRegistry>, Error> {
        self.read(PUBLIC_KEYS)
    }

    pub fn txid(&self) -> Result<Option<u64>, Error> {
        match self.raw(TXID) {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Some)
                .ok_or_else(|| Error::LedgerRead {
                    key: TXID.to_owned(),
                    cause: "expected decimal transaction index".to_owned(),
                }),
        }
    }

    pub fn randomness(&self, index: u64) -> Result<Option<RandomnessWindow>, Error> {
        self.read(&randomness_key(index))
    }

    pub fn transaction(&self, index: u64) -> Result<Option<TransactionRecord>, Error> {
        self.read(&transaction_key(index))
    }

    /// Determines the protocol state. A ledger with only a part of the genesis records
    /// is reported as missing the first absent one.
    pub fn state(&self) -> Result<LedgerState, Error> {
        let genesis_record = transaction_key(0);
        let genesis_keys: [&str; 3] = [PUBLIC_KEYS, TXID, &genesis_record];
        let present = genesis_keys.iter().filter(|key| self.contains(key)).count();
        if present == 0 {
            return Ok(LedgerState::Uninitialized);
        }

        if let Some(missing) = genesis_keys.iter().find(|key| !self.contains(key)) {
            return Err(Error::missing(missing));
        }
        let txid = self.txid()?.ok_or_else(|| Error::missing(TXID))?;
        Ok(LedgerState::Ready { txid })
    }
}

impl<'a> Schema<&'a mut Fork> {
    fn records_mut(&mut self) -> MapIndex<&mut Fork, String, Vec<u8>> {
        MapIndex::new(STATE, self.inner)
    }

    fn write<V: Serialize>(&mut self, key: &str, value: &V) {
        let bytes = serde_json::to_vec(value).expect("ledger records are always serializable");
        self.records_mut().put(&key.to_owned(), bytes);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.records_mut().remove(&key.to_owned());
    }

    pub(crate) fn put_public_keys(&mut self, registry: &PublicKeyRegistry) {
        self.write(PUBLIC_KEYS, registry);
    }

    pub(crate) fn put_txid(&mut self, txid: u64) {
        self.records_mut()
            .put(&TXID.to_owned(), txid.to_string().into_bytes());
    }

    pub(crate) fn put_randomness(&mut self, window: &RandomnessWindow) {
        self.write(&randomness_key(window.index), window);
    }

    pub(crate) fn put_transaction(&mut self, record: &TransactionRecord) {
        self.write(&transaction_key(record.index), record);
    }
}

#[cfg(test)]
mod tests {
    use exonum::storage::{Database, MemoryDB};

    use super::*;

    #[test]
    fn indexed_keys_are_recognized() {
        assert_eq!(IndexedKey::parse("TX0"), Some(IndexedKey::Transaction(0)));
        assert_eq!(IndexedKey::parse("TX12"), Some(IndexedKey::Transaction(12)));
        assert_eq!(
            IndexedKey::parse("TX3RandNum"),
            Some(IndexedKey::Randomness(3))
        );
        assert_eq!(IndexedKey::parse("TXID"), None);
        assert_eq!(IndexedKey::parse("TX"), None);
        assert_eq!(IndexedKey::parse("TXRandNum"), None);
        assert_eq!(IndexedKey::parse("TX-1"), None);
        assert_eq!(IndexedKey::parse("PubKey"), None);
    }

    #[test]
    fn state_follows_genesis_records() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        assert_eq!(
            Schema::new(&fork).state(),
            Ok(LedgerState::Uninitialized)
        );

        {
            let mut schema = Schema::new(&mut fork);
            schema.put_txid(0);
        }
        assert_eq!(
            Schema::new(&fork).state(),
            Err(Error::missing(PUBLIC_KEYS))
        );

        {
            let mut schema = Schema::new(&mut fork);
            schema.put_public_keys(&PublicKeyRegistry { keys: vec![] });
            schema.put_transaction(&TransactionRecord {
                index: 0,
                entries: vec![],
            });
            schema.put_txid(3);
        }
        let state = Schema::new(&fork).state().expect("state");
        assert_eq!(state, LedgerState::Ready { txid: 3 });
        assert_eq!(state.next_index(), Some(4));
    }

    #[test]
    fn malformed_records_are_read_failures() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        MapIndex::new(STATE, &mut fork).put(&TXID.to_owned(), b"zero".to_vec());
        MapIndex::new(STATE, &mut fork).put(&PUBLIC_KEYS.to_owned(), b"{".to_vec());

        let schema = Schema::new(&fork);
        match schema.txid() {
            Err(Error::LedgerRead { ref key, .. }) if key == TXID => {}
            other => panic!("unexpected result: {:?}", other),
        }
        match schema.public_keys() {
            Err(Error::LedgerRead { ref key, .. }) if key == PUBLIC_KEYS => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn txid_is_stored_as_decimal_string() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        Schema::new(&mut fork).put_txid(42);
        let schema = Schema::new(&fork);
        assert_eq!(schema.raw(TXID), Some(b"42".to_vec()));
        assert_eq!(schema.txid(), Ok(Some(42)));
    }
}
