//! Errors reported by ledger operations.

use bulletproofs::ProofError;

/// Failure of a single invocation.
///
/// Every error is terminal for the invocation that produced it: nothing is retried
/// internally, and the ledger is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum Error {
    /// The invoked function received a wrong number of arguments.
    #[fail(
        display = "incorrect number of arguments for `{}`: expected {}, got {}",
        function,
        expected,
        actual
    )]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// An argument could not be parsed.
    #[fail(display = "invalid `{}` argument {:?}: expected {}", argument, value, expected)]
    ArgumentFormat {
        argument: String,
        value: String,
        expected: &'static str,
    },

    /// A stored record exists, but cannot be decoded.
    #[fail(display = "failed to read ledger record `{}`: {}", key, cause)]
    LedgerRead { key: String, cause: String },

    /// The underlying database refused to apply the changes of an invocation.
    #[fail(display = "failed to commit ledger changes: {}", _0)]
    LedgerWrite(String),

    /// A record the operation depends on is absent.
    #[fail(display = "ledger record `{}` does not exist", key)]
    MissingState { key: String },

    /// The randomness window for the transaction has not been scheduled yet.
    #[fail(display = "randomness for transaction {} is not assigned yet", index)]
    RandomnessNotAssigned { index: u64 },

    /// The randomness window already exists and cannot be regenerated.
    #[fail(display = "randomness for transaction {} is already assigned", index)]
    RandomnessAlreadyAssigned { index: u64 },

    /// The randomness window was already used to settle a transaction.
    #[fail(display = "randomness for transaction {} is already consumed", index)]
    RandomnessConsumed { index: u64 },

    /// The account is not present in the public key registry.
    #[fail(display = "unknown account `{}`", name)]
    UnknownAccount { name: String },

    /// Genesis was requested on a ledger which already holds protocol state.
    #[fail(display = "ledger is already initialized")]
    AlreadyInitialized,

    /// The invoked function does not exist.
    #[fail(display = "unknown function `{}`", name)]
    UnknownFunction { name: String },

    /// Invalid configuration.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// Error propagated from commitment or proof construction.
    #[fail(display = "cryptographic primitive failed: {}", _0)]
    Crypto(String),
}

impl Error {
    pub(crate) fn argument_format(argument: &str, value: &str, expected: &'static str) -> Self {
        Error::ArgumentFormat {
            argument: argument.to_owned(),
            value: value.to_owned(),
            expected,
        }
    }

    pub(crate) fn missing(key: &str) -> Self {
        Error::MissingState {
            key: key.to_owned(),
        }
    }

    pub(crate) fn unknown_account(name: &str) -> Self {
        Error::UnknownAccount {
            name: name.to_owned(),
        }
    }
}

impl From<ProofError> for Error {
    fn from(e: ProofError) -> Self {
        Error::Crypto(format!("{:?}", e))
    }
}

/// Checks that the invoked function received exactly `expected` arguments.
pub(crate) fn check_arg_count<S>(function: &str, args: &[S], expected: usize) -> Result<(), Error> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::ArgumentCount {
            function: function.to_owned(),
            expected,
            actual: args.len(),
        })
    }
}
