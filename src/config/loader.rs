//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Render(toml::ser::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Render(e) => write!(f, "Render error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let config: RelayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(&RelayConfig::default()).map_err(ConfigError::Render)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ConfigError::Io)?;
    }
    fs::write(path, rendered).map_err(ConfigError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
            [sds]
            network_address = "10.0.0.5"
            api_port = 9608
            websocket_port = 9609

            [sds.connection_retries]
            max = 5
            sleep_duration = 100
            refresh_interval = 3600

            [stratos_chain]
            websocket_server = "tcp://10.0.0.6:26657"

            [stratos_chain.grpc]
            server = "10.0.0.6:9090"
            insecure = false

            [stratos_chain.broadcast]
            channel_size = 50
            max_msg_per_tx = 20

            [blockchain_info]
            chain_id = "mesos-1"

            [blockchain_info.transactions]
            gas_price = "1gwei"
            gas_adjustment = 1.5

            [keys]
            wallet_path = "wallets/relay.json"
            wallet_password = "secret"
        "#;
        let config = parse_config(content).unwrap();
        assert_eq!(config.sds.network_address, "10.0.0.5");
        assert_eq!(config.sds.connection_retries.refresh_interval, 3600);
        assert!(!config.stratos_chain.grpc.insecure);
        assert_eq!(config.stratos_chain.broadcast.channel_size, 50);
        assert_eq!(config.keys.wallet_path, "wallets/relay.json");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let content = r#"
            [blockchain_info.transactions]
            gas_price = "not-a-coin"
        "#;
        match parse_config(content) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_then_load_default() {
        let dir = std::env::temp_dir().join(format!("relayd-config-{}", std::process::id()));
        let path = dir.join("config").join("relayd.toml");
        write_default_config(&path).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.stratos_chain.broadcast.max_msg_per_tx, 100);
        std::fs::remove_dir_all(&dir).unwrap_or_default();
    }
}
