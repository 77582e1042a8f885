//! Settlement of confidential transfers.
//!
//! A transfer appends a transaction record with an entry for *every* registered account:
//! a commitment to the value the account takes part with (zero for bystanders),
//! a spend token and a range proof. The spender's range proof is computed over its
//! claimed remaining balance with the blinding of its whole accumulated history;
//! the proofs of other accounts are produced with the same scheduled randomness, so that
//! entries are structurally indistinguishable.

use exonum::storage::Fork;

use accumulator::{accumulate_history, Accumulated, AccumulatorCache};
use crypto::{Commitment, Opening, ProofRandomness, RangeProof, Token};
use error::{check_arg_count, Error};
use storage::{randomness_key, Schema, TransactionRecord, ZkEntry, PUBLIC_KEYS, TXID};

/// Arguments of the `invoke` function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub spender: String,
    pub spend_amount: u64,
    /// Remaining balance of the spender claimed for the range proof, clamped to zero.
    pub remainder: u64,
    pub receiver: String,
    pub receive_amount: u64,
}

fn parse_amount(argument: &str, value: &str) -> Result<u64, Error> {
    value
        .parse()
        .map_err(|_| Error::argument_format(argument, value, "non-negative integer"))
}

/// Parses the claimed remainder. Negative remainders are clamped to zero: a misbehaving
/// spender understating its remainder still produces a valid proof over zero.
fn parse_remainder(value: &str) -> Result<u64, Error> {
    let remainder = value
        .parse::<i64>()
        .map_err(|_| Error::argument_format("remainder", value, "integer"))?;
    if remainder < 0 {
        warn!("Negative remainder is clamped to zero");
        Ok(0)
    } else {
        Ok(remainder as u64)
    }
}

impl TransferRequest {
    /// Parses `spender, spend_amount, remainder, receiver, receive_amount`.
    pub fn parse_args(args: &[&str]) -> Result<Self, Error> {
        check_arg_count("invoke", args, 5)?;
        Ok(TransferRequest {
            spender: args[0].to_owned(),
            spend_amount: parse_amount("spend_amount", args[1])?,
            remainder: parse_remainder(args[2])?,
            receiver: args[3].to_owned(),
            receive_amount: parse_amount("receive_amount", args[4])?,
        })
    }

    /// Value the account takes part in the transfer with.
    pub fn value_of(&self, account: &str) -> u64 {
        if account == self.spender {
            self.spend_amount
        } else if account == self.receiver {
            self.receive_amount
        } else {
            0
        }
    }
}

/// Result of a settled transfer.
#[derive(Debug, Clone)]
pub(crate) struct Settlement {
    pub record: TransactionRecord,
    /// Spender history including the settled transaction.
    pub spender_history: Accumulated,
}

fn malformed_window(index: u64, cause: &str) -> Error {
    Error::LedgerRead {
        key: randomness_key(index),
        cause: cause.to_owned(),
    }
}

/// Settles `request` as the next transaction.
///
/// The accumulated history of the spender is taken from `cache` when provided; the cache
/// is only extended with totals over already settled transactions.
pub(crate) fn settle(
    schema: &mut Schema<&mut Fork>,
    request: &TransferRequest,
    cache: Option<&mut AccumulatorCache>,
) -> Result<Settlement, Error> {
    let registry = schema
        .public_keys()?
        .ok_or_else(|| Error::missing(PUBLIC_KEYS))?;
    for name in &[&request.spender, &request.receiver] {
        if !registry.contains(name) {
            return Err(Error::unknown_account(name));
        }
    }
    if request.spender == request.receiver {
        return Err(Error::argument_format(
            "receiver",
            &request.receiver,
            "account different from the spender",
        ));
    }

    let txid = schema.txid()?.ok_or_else(|| Error::missing(TXID))?;
    let next = txid.checked_add(1).ok_or_else(|| Error::LedgerRead {
        key: TXID.to_owned(),
        cause: "transaction index overflows".to_owned(),
    })?;

    debug!("Reading randomness for transaction {}", next);
    let mut window = schema
        .randomness(next)?
        .ok_or(Error::RandomnessNotAssigned { index: next })?;
    if window.consumed {
        return Err(Error::RandomnessConsumed { index: next });
    }
    let proof_randomness: ProofRandomness = match window.proof {
        Some(ref randomness) if randomness.is_well_formed() => randomness.clone(),
        _ => return Err(malformed_window(next, "no range proof randomness")),
    };

    debug!("Accumulating spender history up to transaction {}", txid);
    let history = match cache {
        Some(cache) => cache.accumulate_history(&*schema, &request.spender, txid)?,
        None => accumulate_history(&*schema, &request.spender, txid)?,
    };

    debug!("Computing commitments, tokens and range proofs");
    let mut spender_history = None;
    let mut entries = Vec::with_capacity(registry.len());
    for key in &registry.keys {
        let blinding = *window
            .blinding(&key.name)
            .ok_or_else(|| malformed_window(next, "account blinding is missing"))?;
        let opening = Opening::new(request.value_of(&key.name), blinding);
        let commitment = Commitment::from_opening(&opening);
        let token = Token::new(&blinding, &key.public_key);

        let (range_proof, accumulated) = if key.name == request.spender {
            let total = Accumulated {
                index: next,
                commitment: history.commitment + commitment,
                blinding: history.blinding + blinding,
            };
            let remainder = Opening::new(request.remainder, total.blinding);
            let proof = RangeProof::prove(&remainder, &proof_randomness)?;
            let accumulated = total.commitment;
            spender_history = Some(total);
            (proof, Some(accumulated))
        } else {
            (RangeProof::prove(&opening, &proof_randomness)?, None)
        };

        entries.push(ZkEntry {
            name: key.name.clone(),
            commitment,
            token,
            range_proof: Some(range_proof),
            accumulated,
        });
    }
    // The spender is registered, so its entry is always produced.
    let spender_history =
        spender_history.ok_or_else(|| Error::unknown_account(&request.spender))?;

    let record = TransactionRecord {
        index: next,
        entries,
    };
    window.consumed = true;
    schema.put_randomness(&window);
    schema.put_transaction(&record);
    schema.put_txid(next);

    info!("Settled transaction {}", next);
    Ok(Settlement {
        record,
        spender_history,
    })
}
