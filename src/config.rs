//! Immutable parameters a sale is created with.

use alloc::string::String;

use alloy_primitives::{Address, U256};

use crate::error::{Errors, ZeroValueArgumentInjected};
use crate::schedule;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaleConfig {
    /// Account allowed to run the administrative operations
    pub admin: Address,
    /// Presale ends and week 1 begins right after this timestamp
    pub start_time: u64,
    /// Receives the collected funds when the goal is reached
    pub beneficiary: Address,
    /// Token being sold
    pub asset: Address,
    /// Base currency to raise for the sale to succeed
    pub funding_goal: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

impl SaleConfig {
    /// Function ensuring no zero address or zero goal is configured
    pub fn validate(&self) -> Result<(), Errors> {
        let zero_address = [self.admin, self.beneficiary, self.asset]
            .iter()
            .any(|account| *account == Address::ZERO);
        if zero_address || self.funding_goal.is_zero() {
            return Err(Errors::ZeroValueArgumentInjected(ZeroValueArgumentInjected {}));
        }

        Ok(())
    }

    pub fn sale_end(&self) -> u64 {
        schedule::sale_end(self.start_time)
    }

    /// Whether the last selling second has passed
    pub fn has_closed(&self, now: u64) -> bool {
        now > self.sale_end()
    }

    /// Load the configuration from the process environment, reading a `.env`
    /// file first if there is one
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key/value source using the `SALE_*` keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let address = |key: &'static str| {
            let value = read(key)?;
            parse_address(&value).ok_or(ConfigError::Invalid(key, value))
        };

        let start_time = read("SALE_START_TIME")?;
        let funding_goal = read("SALE_FUNDING_GOAL")?;

        Ok(Self {
            admin: address("SALE_ADMIN")?,
            start_time: start_time
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("SALE_START_TIME", start_time.clone()))?,
            beneficiary: address("SALE_BENEFICIARY")?,
            asset: address("SALE_ASSET")?,
            funding_goal: funding_goal
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("SALE_FUNDING_GOAL", funding_goal.clone()))?,
        })
    }
}

/// Decode a 20 byte hex address, with or without the `0x` prefix
pub fn parse_address(value: &str) -> Option<Address> {
    let value = value.trim();
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(digits).ok()?;
    (bytes.len() == 20).then(|| Address::from_slice(&bytes))
}
