//! Invocation surface of the ledger.
//!
//! Ledger functions are invoked by name with a list of string arguments, as delivered by
//! the dispatch layer:
//!
//! | Function | Arguments |
//! |----------|-----------|
//! | `init` | `name0, balance0, .., name3, balance3` |
//! | `invoke` | `spender, spend_amount, remainder, receiver, receive_amount` |
//! | `generater` | `name0, .., name3` |
//! | `delete` | `key` |
//! | `query` | `key` |
//!
//! Each invocation is executed against a fork of the database, which is merged only if
//! the invocation succeeds. Thus, a failed invocation never leaves partial changes.

use exonum::storage::{Database, Fork, Snapshot};
use serde_json;

use std::{fmt, str::FromStr, sync::Arc};

use accumulator::AccumulatorCache;
use config::Config;
use error::{check_arg_count, Error};
use genesis::{self, AccountSecret, GenesisAccount, ACCOUNT_COUNT};
use randomness;
use storage::{IndexedKey, LedgerState, Schema, TransactionRecord};
use transfer::{self, TransferRequest};

/// Functions of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Genesis.
    Init,
    /// Confidential transfer.
    Invoke,
    /// Refill of the randomness queue.
    GenerateRandomness,
    /// Removal of a raw ledger record.
    Delete,
    /// Lookup of a raw ledger record.
    Query,
}

impl FromStr for Function {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "init" => Ok(Function::Init),
            "invoke" => Ok(Function::Invoke),
            "generater" => Ok(Function::GenerateRandomness),
            "delete" => Ok(Function::Delete),
            "query" => Ok(Function::Query),
            _ => Err(Error::UnknownFunction { name: s.to_owned() }),
        }
    }
}

/// Runs `f` on a fork of `db` and merges the changes if `f` succeeds.
fn execute<F, R>(db: &dyn Database, f: F) -> Result<R, Error>
where
    F: FnOnce(&mut Schema<&mut Fork>) -> Result<R, Error>,
{
    let mut fork = db.fork();
    let result = {
        let mut schema = Schema::new(&mut fork);
        f(&mut schema)?
    };
    db.merge(fork.into_patch())
        .map_err(|e| Error::LedgerWrite(e.to_string()))?;
    Ok(result)
}

/// Confidential ledger over an Exonum database.
pub struct Chaincode {
    db: Arc<dyn Database>,
    config: Config,
    cache: AccumulatorCache,
}

impl Chaincode {
    /// Creates a ledger with the default configuration.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Chaincode {
            db,
            config: Config::default(),
            cache: AccumulatorCache::new(),
        }
    }

    pub fn with_config(db: Arc<dyn Database>, config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Chaincode {
            db,
            config,
            cache: AccumulatorCache::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> Box<dyn Snapshot> {
        self.db.snapshot()
    }

    pub fn state(&self) -> Result<LedgerState, Error> {
        Schema::new(self.snapshot()).state()
    }

    /// Accumulated history cached between invocations.
    pub fn accumulator_cache(&self) -> &AccumulatorCache {
        &self.cache
    }

    /// Invokes a ledger function by name.
    ///
    /// # Return value
    ///
    /// - `init`: JSON array of generated account secret keys
    /// - `generater`: decimal index of the scheduled randomness window
    /// - `query`: raw bytes of the record
    /// - `invoke` and `delete`: empty
    pub fn call(&mut self, function: &str, args: &[&str]) -> Result<Vec<u8>, Error> {
        let function = function.parse::<Function>()?;
        debug!("Invoking {:?} with {} arguments", function, args.len());

        match function {
            Function::Init => {
                let accounts = GenesisAccount::parse_args(args)?;
                let secrets = self.init(&accounts)?;
                Ok(serde_json::to_vec(&secrets).expect("secret keys are serializable"))
            }
            Function::Invoke => {
                let request = TransferRequest::parse_args(args)?;
                self.transfer(&request).map(|_| Vec::new())
            }
            Function::GenerateRandomness => {
                check_arg_count("generater", args, ACCOUNT_COUNT)?;
                let index = self.generate_randomness(args)?;
                Ok(index.to_string().into_bytes())
            }
            Function::Delete => {
                check_arg_count("delete", args, 1)?;
                self.delete(args[0]).map(|()| Vec::new())
            }
            Function::Query => {
                check_arg_count("query", args, 1)?;
                self.query(args[0])
            }
        }
    }

    /// Performs genesis.
    pub fn init(&mut self, accounts: &[GenesisAccount]) -> Result<Vec<AccountSecret>, Error> {
        let config = &self.config;
        let secrets = execute(&*self.db, |schema| genesis::initialize(schema, accounts, config))?;
        self.cache.clear();
        Ok(secrets)
    }

    /// Settles a transfer as the next transaction.
    pub fn transfer(&mut self, request: &TransferRequest) -> Result<TransactionRecord, Error> {
        let mut pending = if self.config.cache_accumulators {
            Some(self.cache.clone())
        } else {
            None
        };

        let settlement = execute(&*self.db, |schema| {
            transfer::settle(schema, request, pending.as_mut())
        })?;

        if let Some(mut cache) = pending {
            cache.insert(&request.spender, settlement.spender_history.clone());
            self.cache = cache;
        }
        Ok(settlement.record)
    }

    /// Schedules the next missing randomness window for `accounts`.
    pub fn generate_randomness(&mut self, accounts: &[&str]) -> Result<u64, Error> {
        let config = &self.config;
        execute(&*self.db, |schema| randomness::refill(schema, accounts, config))
    }

    /// Removes a raw ledger record. Removing an absent record is not an error.
    pub fn delete(&mut self, key: &str) -> Result<(), Error> {
        execute(&*self.db, |schema| {
            schema.remove(key);
            Ok(())
        })?;
        if let Some(key) = IndexedKey::parse(key) {
            self.cache.invalidate_from(key.index());
        }
        warn!("Deleted ledger record `{}`", key);
        Ok(())
    }

    /// Looks up raw bytes of a ledger record.
    pub fn query(&self, key: &str) -> Result<Vec<u8>, Error> {
        Schema::new(self.snapshot())
            .raw(key)
            .ok_or_else(|| Error::missing(key))
    }
}

impl fmt::Debug for Chaincode {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Chaincode")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}
