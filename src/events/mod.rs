//! Chain event processing.
//!
//! # Data Flow
//! ```text
//! chain websocket result (query + ordered tx events + flat index)
//!     → types.rs (deserialize, unquote values)
//!     → dispatch.rs
//!         → registry.rs (msg type → handler; EVM → wrapped event's handler)
//!         → extract.rs (split by message/action, keep complete events)
//!         → dedup key → TtlCache hit? stop
//!         → handlers.rs (typed request, accepted / filtered / invalid)
//!     → storage_node.rs (POST JSON to the storage node)
//! ```
//!
//! # Design Decisions
//! - The handler table is an immutable value, not global state
//! - Attributes are keyed by (event type, attribute) so events never bleed into each other
//! - The dedup key always mixes in the transaction hash
//! - POST failures are logged, never retried

pub mod dispatch;
pub mod extract;
pub mod handlers;
pub mod registry;
pub mod requests;
pub mod storage_node;
pub mod types;

pub use dispatch::{DispatchOutcome, EventDispatcher, Tally, DEDUP_TTL};
pub use extract::{dedup_key, process_events, process_typed_events, Extraction, ProcessedEvent, RequiredAttribute};
pub use registry::{Handler, HandlerRegistry};
pub use storage_node::{HttpStorageNode, StorageNode, StorageNodeError, StorageNodeReply};
pub use types::{AbciEvent, ResultEvent};
