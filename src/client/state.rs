//! Per-side connection state.

use std::fmt;

use tokio::sync::watch;

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
    Streaming,
}

impl ConnectionState {
    fn gauge_value(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Subscribed => 2,
            ConnectionState::Streaming => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Subscribed => "subscribed",
            ConnectionState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

/// Publishes state changes of one side to watchers, logs and the gauge.
#[derive(Debug)]
pub struct StateHandle {
    side: &'static str,
    tx: watch::Sender<ConnectionState>,
}

impl StateHandle {
    pub fn new(side: &'static str) -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        metrics::record_connection_state(side, ConnectionState::Disconnected.gauge_value());
        Self { side, tx }
    }

    pub fn set(&self, state: ConnectionState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::debug!(side = self.side, from = %previous, to = %state, "Connection state changed");
            metrics::record_connection_state(self.side, state.gauge_value());
        }
    }

    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_visible_to_watchers() {
        let handle = StateHandle::new("chain");
        let rx = handle.subscribe();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);

        handle.set(ConnectionState::Connecting);
        handle.set(ConnectionState::Subscribed);
        assert_eq!(handle.get(), ConnectionState::Subscribed);
        assert!(rx.has_changed().unwrap());
    }
}
