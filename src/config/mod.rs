//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated)
//!     → SharedConfig (Arc<ArcSwap<RelayConfig>>) handed to the client
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the shared config
//!     → connections pick up endpoints on their next refresh,
//!       the broadcaster snapshots pricing on its next flush
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - An invalid reload is logged and ignored

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BlockchainInfoConfig, BroadcastConfig, ConnectionRetriesConfig, GrpcConfig, KeysConfig,
    ObservabilityConfig, RelayConfig, SdsConfig, StratosChainConfig, TransactionsConfig,
};
pub use watcher::{shared, ConfigWatcher, SharedConfig};
