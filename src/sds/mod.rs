//! Storage network wire formats.
//!
//! # Data Flow
//! ```text
//! websocket binary frame
//!     → RelayMessage { type, data } (protobuf)
//!     → type == "broadcast": UnsignedMsgs JSON (base64 byte fields)
//!     → UnsignedMessage per entry → broadcaster queue
//! ```
//!
//! # Design Decisions
//! - A bad entry is reported on its own; the rest of the frame still flows
//! - Only message types the relay can broadcast are accepted

pub mod envelope;

pub use envelope::{decode_broadcast, EnvelopeError, RelayMessage, TYPE_BROADCAST};
