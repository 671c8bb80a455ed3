//! In-memory caches.
//!
//! # Data Flow
//! ```text
//! chain event handler
//!     → DedupKey (keccak256 over tx hash + required attribute values)
//!     → TtlCache::load(key)  hit  → skip, lifetime extended
//!                            miss → TtlCache::store(key) → POST
//!     → per-entry timer removes the key one TTL after its last use
//! ```
//!
//! # Design Decisions
//! - One timer task per store; stale timers detect a newer store by generation
//! - Sliding expiration: repeated replays keep the marker alive

pub mod ttl;

pub use ttl::TtlCache;
