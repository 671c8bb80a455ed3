//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Storage network endpoints (websocket subscription and HTTP API).
    pub sds: SdsConfig,

    /// Chain endpoints and broadcast batching.
    pub stratos_chain: StratosChainConfig,

    /// Chain identity and transaction pricing.
    pub blockchain_info: BlockchainInfoConfig,

    /// Relay wallet location.
    pub keys: KeysConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Connection retry budget shared by both sides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionRetriesConfig {
    /// Maximum dial attempts per refresh.
    pub max: u32,

    /// Sleep between attempts, in milliseconds.
    pub sleep_duration: u64,

    /// Forced reconnect interval in seconds (0 disables it).
    pub refresh_interval: u64,
}

impl Default for ConnectionRetriesConfig {
    fn default() -> Self {
        Self {
            max: 100,
            sleep_duration: 3_000,
            refresh_interval: 0,
        }
    }
}

/// Storage network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SdsConfig {
    /// Host of the storage node.
    pub network_address: String,

    /// Port of the storage node's HTTP API.
    pub api_port: u16,

    /// Port of the storage node's websocket subscription server.
    pub websocket_port: u16,

    pub connection_retries: ConnectionRetriesConfig,
}

impl Default for SdsConfig {
    fn default() -> Self {
        Self {
            network_address: "127.0.0.1".to_string(),
            api_port: 8_081,
            websocket_port: 8_083,
            connection_retries: ConnectionRetriesConfig::default(),
        }
    }
}

/// Chain endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StratosChainConfig {
    /// CometBFT RPC websocket endpoint (e.g. "127.0.0.1:26657").
    pub websocket_server: String,

    /// gRPC endpoint used for account lookup, simulation and broadcast.
    pub grpc: GrpcConfig,

    pub connection_retries: ConnectionRetriesConfig,

    /// Transaction batching.
    pub broadcast: BroadcastConfig,
}

impl Default for StratosChainConfig {
    fn default() -> Self {
        Self {
            websocket_server: "127.0.0.1:26657".to_string(),
            grpc: GrpcConfig::default(),
            connection_retries: ConnectionRetriesConfig::default(),
            broadcast: BroadcastConfig::default(),
        }
    }
}

/// gRPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrpcConfig {
    /// Server address, with or without scheme.
    pub server: String,

    /// Use plaintext HTTP/2 instead of TLS.
    pub insecure: bool,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:9090".to_string(),
            insecure: true,
            timeout_secs: 10,
        }
    }
}

/// Batching parameters of the transaction broadcaster.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Capacity of the pending-message queue.
    pub channel_size: usize,

    /// Flush as soon as this many messages are pending.
    pub max_msg_per_tx: usize,

    /// Flush timer interval in milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            channel_size: 1_000,
            max_msg_per_tx: 100,
            flush_interval_ms: 500,
        }
    }
}

/// Chain identity and pricing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainInfoConfig {
    pub chain_id: String,

    /// Bech32 human-readable prefix of account addresses.
    pub address_prefix: String,

    pub transactions: TransactionsConfig,
}

impl Default for BlockchainInfoConfig {
    fn default() -> Self {
        Self {
            chain_id: "tropos-5".to_string(),
            address_prefix: "st".to_string(),
            transactions: TransactionsConfig::default(),
        }
    }
}

/// Transaction pricing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionsConfig {
    /// Gas price as a coin string, e.g. "1000000000wei" or "1gwei".
    pub gas_price: String,

    /// Multiplier applied to simulated gas usage.
    pub gas_adjustment: f64,
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            gas_price: "1000000000wei".to_string(),
            gas_adjustment: 1.3,
        }
    }
}

/// Location of the relay wallet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KeysConfig {
    /// Keystore file, relative to the storage node home.
    pub wallet_path: String,

    pub wallet_password: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Bind address of the Prometheus exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
