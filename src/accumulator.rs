//! Accumulation of account history.
//!
//! The accumulated commitment of an account is the sum of its commitments in every
//! transaction record `0..=index` it has an entry in. Since commitments are additively
//! homomorphic, it commits to the sum of the account's values under the sum of its
//! blindings, which is accumulated alongside.

use exonum::storage::Snapshot;

use std::collections::HashMap;

use crypto::{Commitment, Scalar};
use error::Error;
use storage::{randomness_key, transaction_key, Schema};

/// Accumulated history of an account up to and including a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulated {
    /// Last transaction index included into the totals.
    pub index: u64,
    pub commitment: Commitment,
    pub blinding: Scalar,
}

/// Sums the commitments of `account` in transaction records `0..=up_to`.
pub fn accumulate<T: AsRef<dyn Snapshot>>(
    schema: &Schema<T>,
    account: &str,
    up_to: u64,
) -> Result<Commitment, Error> {
    accumulate_history(schema, account, up_to).map(|total| total.commitment)
}

/// Sums commitments and commitment blindings of `account` over transactions `0..=up_to`.
pub fn accumulate_history<T: AsRef<dyn Snapshot>>(
    schema: &Schema<T>,
    account: &str,
    up_to: u64,
) -> Result<Accumulated, Error> {
    extend(schema, account, None, up_to)
}

/// Continues `base` (or starts from scratch) up to the transaction `up_to`.
fn extend<T: AsRef<dyn Snapshot>>(
    schema: &Schema<T>,
    account: &str,
    base: Option<Accumulated>,
    up_to: u64,
) -> Result<Accumulated, Error> {
    let (start, mut commitment, mut blinding) = match base {
        Some(base) => (base.index + 1, base.commitment, base.blinding),
        None => (0, Commitment::identity(), Scalar::zero()),
    };

    for index in start..=up_to {
        let record = schema
            .transaction(index)?
            .ok_or_else(|| Error::missing(&transaction_key(index)))?;
        let entry = match record.entry(account) {
            Some(entry) => entry,
            None => continue,
        };
        commitment += entry.commitment;

        let window = schema
            .randomness(index)?
            .ok_or_else(|| Error::missing(&randomness_key(index)))?;
        let entry_blinding = window.blinding(account).ok_or_else(|| Error::LedgerRead {
            key: randomness_key(index),
            cause: format!("no blinding for account `{}`", account),
        })?;
        blinding += *entry_blinding;
    }

    Ok(Accumulated {
        index: up_to,
        commitment,
        blinding,
    })
}

/// Per-account cache of accumulated history.
///
/// The cache is valid only as long as the records it was built from are unchanged;
/// the owner must call [`invalidate_from`](#method.invalidate_from) whenever a transaction
/// record or a randomness window is removed.
#[derive(Debug, Clone, Default)]
pub struct AccumulatorCache {
    entries: HashMap<String, Accumulated>,
}

impl AccumulatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &str) -> Option<&Accumulated> {
        self.entries.get(account)
    }

    /// Records the accumulated history of an account, replacing older totals.
    pub fn insert(&mut self, account: &str, total: Accumulated) {
        let replace = self
            .entries
            .get(account)
            .map_or(true, |cached| cached.index <= total.index);
        if replace {
            self.entries.insert(account.to_owned(), total);
        }
    }

    /// Drops every total that includes the transaction `index` or later ones.
    pub fn invalidate_from(&mut self, index: u64) {
        self.entries.retain(|_, total| total.index < index);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Same as [`accumulate_history`], resuming from the cached total when it does not
    /// reach past `up_to`. The result is cached.
    ///
    /// [`accumulate_history`]: fn.accumulate_history.html
    pub fn accumulate_history<T: AsRef<dyn Snapshot>>(
        &mut self,
        schema: &Schema<T>,
        account: &str,
        up_to: u64,
    ) -> Result<Accumulated, Error> {
        let base = self
            .entries
            .get(account)
            .filter(|cached| cached.index <= up_to)
            .cloned();
        let total = match base {
            Some(cached) => {
                if cached.index == up_to {
                    cached
                } else {
                    extend(schema, account, Some(cached), up_to)?
                }
            }
            None => extend(schema, account, None, up_to)?,
        };
        self.insert(account, total.clone());
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use exonum::storage::{Database, Fork, MemoryDB};
    use rand::{thread_rng, Rng};

    use super::*;
    use crypto::{KeyPair, Opening, Token};
    use randomness::draw_window;
    use storage::{TransactionRecord, ZkEntry};

    const ACCOUNTS: [&str; 3] = ["A", "B", "C"];

    /// Writes transactions `0..count`; the account `C` only appears in even transactions.
    fn write_history(fork: &mut Fork, count: u64) -> Vec<Vec<Opening>> {
        let keys: Vec<_> = ACCOUNTS.iter().map(|_| KeyPair::random()).collect();
        let mut rng = thread_rng();
        let mut schema = Schema::new(fork);
        let mut openings = vec![];

        for index in 0..count {
            let window = draw_window(&ACCOUNTS, index);
            let mut entries = vec![];
            let mut row = vec![];
            for (i, name) in ACCOUNTS.iter().enumerate() {
                if *name == "C" && index % 2 == 1 {
                    continue;
                }
                let blinding = *window.blinding(name).expect("blinding");
                let opening = Opening::new(rng.gen_range(0, 1_000), blinding);
                entries.push(ZkEntry {
                    name: name.to_string(),
                    commitment: Commitment::from_opening(&opening),
                    token: Token::new(&blinding, keys[i].public_key()),
                    range_proof: None,
                    accumulated: None,
                });
                row.push(opening);
            }
            schema.put_randomness(&window);
            schema.put_transaction(&TransactionRecord { index, entries });
            openings.push(row);
        }
        openings
    }

    #[test]
    fn accumulation_sums_committed_values() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        let openings = write_history(&mut fork, 4);
        let schema = Schema::new(&fork);

        for up_to in 0..4 {
            let expected = openings[..=up_to as usize]
                .iter()
                .map(|row| row[0].clone())
                .fold(Opening::with_no_blinding(0), |acc, opening| acc + opening);
            let total = accumulate_history(&schema, "A", up_to).expect("accumulate");
            assert!(total.commitment.verify(&expected));
            assert_eq!(total.blinding, expected.blinding);
            assert_eq!(total.index, up_to);
        }
    }

    #[test]
    fn accumulation_skips_records_without_entry() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        let openings = write_history(&mut fork, 5);
        let schema = Schema::new(&fork);

        // `C` is the third entry of even rows only.
        let expected = [0, 2, 4]
            .iter()
            .map(|&i| openings[i][2].clone())
            .fold(Opening::with_no_blinding(0), |acc, opening| acc + opening);
        let total = accumulate(&schema, "C", 4).expect("accumulate");
        assert!(total.verify(&expected));
    }

    #[test]
    fn unknown_account_accumulates_to_identity() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        write_history(&mut fork, 3);
        let schema = Schema::new(&fork);
        assert_eq!(accumulate(&schema, "Z", 2), Ok(Commitment::identity()));
    }

    #[test]
    fn missing_record_is_reported() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        write_history(&mut fork, 2);
        let schema = Schema::new(&fork);
        assert_eq!(
            accumulate(&schema, "A", 3),
            Err(Error::missing(&transaction_key(2)))
        );
    }

    #[test]
    fn entry_without_blinding_is_reported() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        write_history(&mut fork, 2);
        let mut schema = Schema::new(&mut fork);

        let mut window = schema.randomness(1).expect("window").expect("TX1RandNum");
        window.blindings.retain(|blinding| blinding.name != "A");
        schema.put_randomness(&window);

        match accumulate_history(&schema, "A", 1) {
            Err(Error::LedgerRead { ref key, .. }) if *key == randomness_key(1) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(accumulate_history(&schema, "B", 1).is_ok());
    }

    #[test]
    fn cached_totals_match_recomputation() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        write_history(&mut fork, 12);
        let schema = Schema::new(&fork);
        let mut cache = AccumulatorCache::new();
        let mut rng = thread_rng();

        for _ in 0..40 {
            let account = ACCOUNTS[rng.gen_range(0, ACCOUNTS.len())];
            let up_to = rng.gen_range(0, 12);
            if rng.gen_bool(0.2) {
                cache.invalidate_from(rng.gen_range(0, 12));
            }

            let cached = cache
                .accumulate_history(&schema, account, up_to)
                .expect("cached");
            let fresh = accumulate_history(&schema, account, up_to).expect("fresh");
            assert_eq!(cached, fresh);
        }
    }

    #[test]
    fn invalidation_drops_affected_totals() {
        let db = MemoryDB::new();
        let mut fork = db.fork();
        write_history(&mut fork, 6);
        let schema = Schema::new(&fork);
        let mut cache = AccumulatorCache::new();

        cache.accumulate_history(&schema, "A", 2).expect("A");
        cache.accumulate_history(&schema, "B", 5).expect("B");
        assert_eq!(cache.len(), 2);

        cache.invalidate_from(3);
        assert_eq!(cache.get("A").map(|total| total.index), Some(2));
        assert!(cache.get("B").is_none());

        cache.invalidate_from(2);
        assert!(cache.is_empty());
    }
}
