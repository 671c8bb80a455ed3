//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! keystore file (home/keys.wallet_path, password from config)
//!     → wallet.rs (decrypt once, bech32 address)
//! pending UnsignedMessages
//!     → transaction.rs (attach key, filter, resolve accounts, sign)
//!     → client.rs (gRPC: account, simulate, broadcast)
//! ```
//!
//! # Security Constraints
//! - Private keys are read once at start-up and never logged
//! - All gRPC calls have configurable timeouts
//! - A rejected or failed broadcast drops the batch; nothing is retried here

pub mod client;
pub mod coin;
pub mod msg_type;
pub mod proto;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainApi, GrpcChainClient};
pub use coin::Coin;
pub use transaction::TxParams;
pub use types::{
    AccountInfo, BlockchainError, BlockchainResult, GasInfo, SignatureKey, SignatureScheme,
    TxResponse, UnsignedMessage,
};
pub use wallet::{KeyLoadError, Wallet};
