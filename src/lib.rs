//! Stratos relayer library.
//!
//! Relays events between the Stratos storage network and stratos-chain:
//! chain events become HTTP requests to the local storage node, and
//! pending messages pushed by the storage node become signed transactions.

// Connections
pub mod client;
pub mod sds;

// Event and transaction pipelines
pub mod broadcaster;
pub mod events;

// Chain access
pub mod blockchain;

// Cross-cutting concerns
pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use client::MultiClient;
pub use config::schema::RelayConfig;
pub use lifecycle::Shutdown;
