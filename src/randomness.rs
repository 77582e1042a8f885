//! Scheduling of transaction randomness.
//!
//! Settling a transaction never draws randomness: commitment blindings and range proof
//! randomness for the transaction `n` are written to the ledger in advance, as the
//! randomness window `TX<n>RandNum`. A window is never overwritten; reusing blindings or
//! proof randomness across transactions would break hiding of the commitments.

use exonum::storage::Fork;

use std::collections::HashSet;

use config::Config;
use crypto::{random_scalar, ProofRandomness};
use error::Error;
use storage::{
    randomness_key, AccountBlinding, LedgerState, RandomnessWindow, Schema, PUBLIC_KEYS, TXID,
};

/// Draws a fresh window for the transaction `index`. Only windows after genesis
/// carry range proof randomness.
pub fn draw_window<S: AsRef<str>>(accounts: &[S], index: u64) -> RandomnessWindow {
    let blindings = accounts
        .iter()
        .map(|name| AccountBlinding {
            name: name.as_ref().to_owned(),
            blinding: random_scalar(),
        }).collect();
    let proof = if index == 0 {
        None
    } else {
        Some(ProofRandomness::random())
    };

    RandomnessWindow {
        index,
        blindings,
        proof,
        consumed: false,
    }
}

/// Schedules the window for the transaction `index`.
///
/// # Errors
///
/// Fails with `RandomnessAlreadyAssigned` if a window for `index` exists, whether
/// it is consumed or not; the existing window is left intact.
pub fn schedule_window<S: AsRef<str>>(
    schema: &mut Schema<&mut Fork>,
    accounts: &[S],
    index: u64,
) -> Result<RandomnessWindow, Error> {
    if schema.randomness(index)?.is_some() {
        return Err(Error::RandomnessAlreadyAssigned { index });
    }

    let window = draw_window(accounts, index);
    schema.put_randomness(&window);
    debug!("Scheduled randomness for transaction {}", index);
    Ok(window)
}

/// Checks that `accounts` lists every registered account exactly once.
fn check_accounts(schema: &Schema<&mut Fork>, accounts: &[&str]) -> Result<(), Error> {
    let registry = schema
        .public_keys()?
        .ok_or_else(|| Error::missing(PUBLIC_KEYS))?;

    let mut seen = HashSet::new();
    for &name in accounts {
        if !registry.contains(name) {
            return Err(Error::unknown_account(name));
        }
        if !seen.insert(name) {
            return Err(Error::argument_format("account", name, "distinct account names"));
        }
    }
    if seen.len() != registry.len() {
        let missing = registry
            .names()
            .into_iter()
            .find(|name| !seen.contains(name))
            .unwrap_or_default();
        return Err(Error::argument_format("account", missing, "every registered account"));
    }
    Ok(())
}

/// Refills one slot of the randomness queue: the lowest transaction index among the next
/// `config.lookahead` transactions that has no window yet.
///
/// # Return value
///
/// Returns the index of the scheduled window.
///
/// # Errors
///
/// Fails with `RandomnessAlreadyAssigned` for the next transaction index if the whole
/// lookahead range is already scheduled.
pub(crate) fn refill(
    schema: &mut Schema<&mut Fork>,
    accounts: &[&str],
    config: &Config,
) -> Result<u64, Error> {
    config.validate()?;
    let next = match schema.state()? {
        LedgerState::Uninitialized => return Err(Error::missing(PUBLIC_KEYS)),
        LedgerState::Ready { txid } => txid.checked_add(1).ok_or_else(|| Error::LedgerRead {
            key: TXID.to_owned(),
            cause: "transaction index overflows".to_owned(),
        })?,
    };
    check_accounts(schema, accounts)?;
    let end = next
        .checked_add(config.lookahead)
        .ok_or_else(|| Error::Config("randomness lookahead overflows".to_owned()))?;

    for index in next..end {
        if !schema.contains(&randomness_key(index)) {
            schedule_window(schema, accounts, index)?;
            return Ok(index);
        }
    }

    warn!("Randomness queue is full for transactions {}..{}", next, end);
    Err(Error::RandomnessAlreadyAssigned { index: next })
}
