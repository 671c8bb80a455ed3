//! Relay connections and their orchestrator.
//!
//! # Data Flow
//! ```text
//! MultiClient (multi_client.rs)
//!     owns wallet + root Shutdown
//!     → supervise(ChainConnection)   → chain-reader task
//!     → supervise(SdsConnection)     → sds-reader + broadcaster tasks
//!
//! session.rs (per connection):
//!     Connecting → retry_fixed(connect) → Subscribed → Streaming
//!     task exit / refresh timer → drain session → Connecting
//!     retries exhausted → cancel root
//!
//! chain_connection.rs:
//!     subscribe(NewBlock + one query per message type)
//!     → rpc.rs responses → EventDispatcher
//!
//! sds_connection.rs:
//!     relay envelope → pending messages → bounded queue → Broadcaster
//! ```
//!
//! # Design Decisions
//! - A refresh always dials a fresh session; subscriptions are re-issued on every connect
//! - Session tasks report their exit instead of restarting themselves
//! - One exhausted retry budget is fatal to the whole relay

pub mod chain_connection;
pub mod multi_client;
pub mod rpc;
pub mod sds_connection;
pub mod session;
pub mod state;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::blockchain::{BlockchainError, KeyLoadError};

pub use chain_connection::ChainConnection;
pub use multi_client::MultiClient;
pub use sds_connection::SdsConnection;
pub use session::{supervise, Connection, Session, SessionEnd};
pub use state::{ConnectionState, StateHandle};

pub(crate) type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Failures of a single connection session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("dial failed: {0}")]
    Dial(#[source] tungstenite::Error),

    #[error("read failed: {0}")]
    Read(#[source] tungstenite::Error),

    #[error("write failed: {0}")]
    Write(#[source] tungstenite::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("broadcast queue closed")]
    QueueClosed,

    #[error("{side} connection gave up after {attempts} attempts: {last}")]
    Exhausted {
        side: &'static str,
        attempts: u32,
        last: Box<ConnectionError>,
    },
}

/// Failures constructing or starting the orchestrator.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    KeyLoad(#[from] KeyLoadError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
