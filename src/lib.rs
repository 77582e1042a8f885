//! Confidential value transfers over a key-value ledger.
//!
//! Balances of a fixed set of accounts are never published. Each transaction instead
//! records, for every account, a Pedersen commitment to the value the account takes part
//! with, a spend token binding the commitment blinding to the account key, and a
//! Bulletproofs range proof. Randomness for transactions is scheduled on the ledger ahead
//! of time, so that settling a transaction is deterministic given the ledger state.
//!
//! The entry point is [`Chaincode`](chaincode/struct.Chaincode.html), which exposes
//! the ledger functions `init`, `invoke`, `generater`, `delete` and `query`.

#[macro_use]
extern crate lazy_static;
extern crate byteorder;
extern crate bulletproofs;
extern crate curve25519_dalek as curve25519;
extern crate exonum;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
extern crate merlin;
extern crate rand;
extern crate rand_chacha;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

pub mod accumulator;
pub mod chaincode;
pub mod config;
pub mod crypto;
pub mod error;
pub mod genesis;
pub mod randomness;
pub mod storage;
pub mod transfer;

pub use accumulator::{accumulate, accumulate_history, Accumulated, AccumulatorCache};
pub use chaincode::{Chaincode, Function};
pub use config::Config;
pub use error::Error;
pub use genesis::{AccountSecret, GenesisAccount, ACCOUNT_COUNT};
pub use storage::{LedgerState, Schema, TransactionRecord, ZkEntry};
pub use transfer::TransferRequest;
