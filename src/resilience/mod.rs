//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! connection refresh()
//!     → retries.rs (dial up to N times, fixed sleep between attempts)
//!     → success: session starts
//!     → exhausted: caller cancels the orchestrator
//! ```
//!
//! # Design Decisions
//! - Fixed delay, no jitter: there is exactly one client per peer
//! - Cancellation interrupts both the sleep and a hung attempt

pub mod retries;

pub use retries::{retry_fixed, RetryError, RetryPolicy};
