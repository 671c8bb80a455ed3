//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that the
//! strings the relay parses later (gas price, endpoints) are usable.
//! All violations are collected, not just the first.

use std::fmt;

use crate::blockchain::coin::Coin;
use crate::config::schema::{ConnectionRetriesConfig, RelayConfig};

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if config.blockchain_info.chain_id.trim().is_empty() {
        fail("blockchain_info.chain_id", "must not be empty".into());
    }
    if config.blockchain_info.address_prefix.is_empty() {
        fail("blockchain_info.address_prefix", "must not be empty".into());
    }
    if let Err(e) = Coin::parse_normalized(&config.blockchain_info.transactions.gas_price) {
        fail("blockchain_info.transactions.gas_price", e.to_string());
    }
    let adjustment = config.blockchain_info.transactions.gas_adjustment;
    if !(adjustment.is_finite() && adjustment > 0.0) {
        fail(
            "blockchain_info.transactions.gas_adjustment",
            format!("must be a positive number, got {}", adjustment),
        );
    }

    if config.sds.network_address.is_empty() {
        fail("sds.network_address", "must not be empty".into());
    }
    if config.sds.api_port == 0 {
        fail("sds.api_port", "must not be 0".into());
    }
    if config.sds.websocket_port == 0 {
        fail("sds.websocket_port", "must not be 0".into());
    }
    if let Some(message) = check_retries(&config.sds.connection_retries) {
        fail("sds.connection_retries", message);
    }

    let chain = &config.stratos_chain;
    if chain.websocket_server.is_empty() {
        fail("stratos_chain.websocket_server", "must not be empty".into());
    }
    if chain.grpc.server.is_empty() {
        fail("stratos_chain.grpc.server", "must not be empty".into());
    }
    if let Some(message) = check_retries(&chain.connection_retries) {
        fail("stratos_chain.connection_retries", message);
    }
    if chain.broadcast.channel_size == 0 {
        fail("stratos_chain.broadcast.channel_size", "must be greater than 0".into());
    }
    if chain.broadcast.max_msg_per_tx == 0 {
        fail("stratos_chain.broadcast.max_msg_per_tx", "must be greater than 0".into());
    }
    if chain.broadcast.flush_interval_ms == 0 {
        fail("stratos_chain.broadcast.flush_interval_ms", "must be greater than 0".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retries(retries: &ConnectionRetriesConfig) -> Option<String> {
    if retries.max == 0 {
        return Some("max must be at least 1".into());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RelayConfig::default();
        config.blockchain_info.chain_id = "".into();
        config.blockchain_info.transactions.gas_price = "lots".into();
        config.blockchain_info.transactions.gas_adjustment = 0.0;
        config.stratos_chain.broadcast.max_msg_per_tx = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"blockchain_info.chain_id"));
        assert!(fields.contains(&"blockchain_info.transactions.gas_price"));
        assert!(fields.contains(&"blockchain_info.transactions.gas_adjustment"));
        assert!(fields.contains(&"stratos_chain.broadcast.max_msg_per_tx"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = RelayConfig::default();
        config.sds.connection_retries.max = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "sds.connection_retries");
    }
}
