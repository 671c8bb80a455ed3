//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     root token (MultiClient) ─child()→ session token (per connection refresh)
//!     trigger on root → every session observes it
//!     trigger on session → only that session's tasks stop
//!
//! Tasks (tasks.rs):
//!     TaskGroup::spawn_supervised → task ends / errors / panics
//!     → TaskReport on the connection's report channel
//!     → connection supervisor decides to refresh
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → main stops the client
//! ```
//!
//! # Design Decisions
//! - Cancellation is level-triggered (watch channel), late waiters see it
//! - Only the connection supervisor restarts tasks

pub mod shutdown;
pub mod signals;
pub mod tasks;

pub use shutdown::Shutdown;
pub use tasks::{TaskExit, TaskGroup, TaskReport};
