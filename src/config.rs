//! Protocol configuration.

use serde_json;

use error::Error;

/// Upper bound on `genesis_windows` and `lookahead`.
pub const MAX_WINDOWS: u64 = 1_024;

/// Tunable parameters of the protocol.
///
/// # JSON representation
///
/// ```json
/// { "genesis_windows": 5, "lookahead": 5, "cache_accumulators": true }
/// ```
///
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of randomness windows scheduled by genesis, i.e., windows
    /// `1..=genesis_windows`. Zero means every window is scheduled with `generater`.
    pub genesis_windows: u64,
    /// Depth of the randomness queue refilled by `generater`. A call fills the lowest
    /// unassigned window among the next `lookahead` transactions.
    pub lookahead: u64,
    /// Keep accumulated commitments in memory between invocations.
    pub cache_accumulators: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            genesis_windows: 5,
            lookahead: 5,
            cache_accumulators: true,
        }
    }
}

impl Config {
    /// Parses configuration from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.lookahead == 0 || self.lookahead > MAX_WINDOWS {
            return Err(Error::Config(format!(
                "`lookahead` must be in 1..={}",
                MAX_WINDOWS
            )));
        }
        if self.genesis_windows > MAX_WINDOWS {
            return Err(Error::Config(format!(
                "`genesis_windows` must not exceed {}",
                MAX_WINDOWS
            )));
        }
        Ok(())
    }
}
