//! Coin amounts and fee arithmetic.
//!
//! Gas prices are configured as human strings (`1gwei`, `0.5stos`,
//! `1000000000wei`) and normalised into the base denomination `wei`
//! before any arithmetic happens.

use std::fmt;

use alloy::primitives::utils::parse_units;
use alloy::primitives::U256;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Base denomination every coin is normalised into.
pub const BASE_DENOM: &str = "wei";

/// A non-negative amount in a single denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: U256) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Parse `<amount><denom>` and convert it to `wei`.
    ///
    /// The amount may be a decimal (`0.25stos`) as long as it resolves to a
    /// whole number of wei.
    pub fn parse_normalized(input: &str) -> BlockchainResult<Self> {
        let invalid = || BlockchainError::InvalidCoin(input.to_string());

        let trimmed = input.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (amount, denom) = trimmed.split_at(split);
        let amount = amount.trim();
        if amount.is_empty() || !amount.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(invalid());
        }

        let decimals: u8 = match denom.trim().to_ascii_lowercase().as_str() {
            "stos" => 18,
            "gwei" => 9,
            "wei" => 0,
            _ => return Err(invalid()),
        };
        // parse_units truncates digits below one wei.
        let fraction_digits = amount.split_once('.').map_or(0, |(_, fraction)| fraction.len());
        if fraction_digits > usize::from(decimals) {
            return Err(invalid());
        }

        let parsed = parse_units(amount, decimals).map_err(|_| invalid())?;
        Ok(Self::new(BASE_DENOM, parsed.get_absolute()))
    }

    /// Fee for `gas_limit` units of gas at this price.
    pub fn fee_for(&self, gas_limit: u64) -> Self {
        Self::new(
            self.denom.clone(),
            self.amount.saturating_mul(U256::from(gas_limit)),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Gas limit for a simulated usage: `floor(gas_used * adjustment)`.
pub fn adjusted_gas_limit(gas_used: u64, adjustment: f64) -> u64 {
    (gas_used as f64 * adjustment).floor() as u64
}
