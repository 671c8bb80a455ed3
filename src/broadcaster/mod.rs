//! Transaction broadcaster.
//!
//! # Data Flow
//! ```text
//! network connection reader
//!     → bounded mpsc queue (stratos_chain.broadcast.channel_size)
//!     → worker.rs (attach relay key, append to pending)
//!         full batch or flush timer
//!     → batch.rs (drop unsignable, resolve accounts, simulate, sign, broadcast)
//!     → pending cleared
//! ```
//!
//! # Design Decisions
//! - Single task owns the pending list, so there is at most one flush in flight
//! - Pricing parameters are snapshotted once per flush
//! - Failed batches are dropped, never retried here

pub mod batch;
pub mod worker;

pub use batch::{flush_batch, FlushReport};
pub use worker::Broadcaster;
