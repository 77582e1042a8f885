//! Genesis of the ledger.

use exonum::storage::Fork;

use std::collections::HashSet;

use config::Config;
use crypto::{Commitment, KeyPair, Opening, SecretKey, Token};
use error::{check_arg_count, Error};
use randomness::schedule_window;
use storage::{
    LedgerState, PublicKeyEntry, PublicKeyRegistry, Schema, TransactionRecord, ZkEntry,
};

/// Number of accounts established at genesis.
pub const ACCOUNT_COUNT: usize = 4;

/// Account with its initial balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisAccount {
    pub name: String,
    pub balance: u64,
}

impl GenesisAccount {
    pub fn new(name: &str, balance: u64) -> Self {
        GenesisAccount {
            name: name.to_owned(),
            balance,
        }
    }

    /// Parses `init` arguments, i.e., `ACCOUNT_COUNT` pairs of account name and
    /// non-negative integer balance.
    pub fn parse_args(args: &[&str]) -> Result<Vec<Self>, Error> {
        check_arg_count("init", args, 2 * ACCOUNT_COUNT)?;
        args.chunks(2)
            .map(|pair| -> Result<Self, Error> {
                let balance = pair[1].parse::<u64>().map_err(|_| {
                    Error::argument_format("balance", pair[1], "non-negative integer")
                })?;
                Ok(GenesisAccount::new(pair[0], balance))
            }).collect()
    }
}

/// Secret key of an account generated at genesis.
///
/// Secret keys are handed to the caller of `init` and are never written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSecret {
    pub name: String,
    pub secret_key: SecretKey,
}

fn check_accounts(accounts: &[GenesisAccount]) -> Result<(), Error> {
    if accounts.len() != ACCOUNT_COUNT {
        return Err(Error::ArgumentCount {
            function: "init".to_owned(),
            expected: 2 * ACCOUNT_COUNT,
            actual: 2 * accounts.len(),
        });
    }

    let mut names = HashSet::new();
    for account in accounts {
        if account.name.is_empty() {
            return Err(Error::argument_format("name", "", "non-empty account name"));
        }
        if !names.insert(account.name.as_str()) {
            return Err(Error::argument_format(
                "name",
                &account.name,
                "distinct account names",
            ));
        }
    }
    Ok(())
}

/// Establishes the ledger: account keys, the public key registry, randomness windows
/// `0..=config.genesis_windows`, the transaction record 0 committing to initial balances
/// and `TXID = 0`.
pub(crate) fn initialize(
    schema: &mut Schema<&mut Fork>,
    accounts: &[GenesisAccount],
    config: &Config,
) -> Result<Vec<AccountSecret>, Error> {
    check_accounts(accounts)?;
    config.validate()?;
    if schema.state()? != LedgerState::Uninitialized {
        return Err(Error::AlreadyInitialized);
    }

    debug!("Assigning keys to {} accounts", accounts.len());
    let keypairs: Vec<_> = accounts.iter().map(|_| KeyPair::random()).collect();
    let registry = PublicKeyRegistry {
        keys: accounts
            .iter()
            .zip(&keypairs)
            .map(|(account, keypair)| PublicKeyEntry {
                name: account.name.clone(),
                public_key: *keypair.public_key(),
            }).collect(),
    };
    schema.put_public_keys(&registry);

    let names: Vec<_> = accounts.iter().map(|account| account.name.as_str()).collect();
    let genesis_window = schedule_window(schema, &names, 0)?;
    for index in 1..=config.genesis_windows {
        schedule_window(schema, &names, index)?;
    }
    debug!(
        "Scheduled randomness for transactions 1..={}",
        config.genesis_windows
    );

    let entries = accounts
        .iter()
        .zip(&keypairs)
        .zip(&genesis_window.blindings)
        .map(|((account, keypair), blinding)| {
            debug_assert_eq!(account.name, blinding.name);
            let opening = Opening::new(account.balance, blinding.blinding);
            ZkEntry {
                name: account.name.clone(),
                commitment: Commitment::from_opening(&opening),
                token: Token::new(&blinding.blinding, keypair.public_key()),
                range_proof: None,
                accumulated: None,
            }
        }).collect();
    schema.put_transaction(&TransactionRecord { index: 0, entries });
    schema.put_txid(0);

    info!("Initialized ledger with accounts {:?}", names);
    Ok(accounts
        .iter()
        .zip(keypairs)
        .map(|(account, keypair)| AccountSecret {
            name: account.name.clone(),
            secret_key: keypair.secret_key().clone(),
        }).collect())
}
