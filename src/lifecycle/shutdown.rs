//! Cancellation coordination for the relay.

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation token shared by long-running tasks.
///
/// Built on a watch channel so that tasks subscribing after the trigger
/// still observe it. Clones share the same state.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, untriggered token.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trigger the token. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the token has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token is triggered.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on trigger.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }

    /// Derive a token that is triggered together with this one but can also
    /// be triggered on its own without affecting the parent.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn child(&self) -> Shutdown {
        let child = Shutdown::new();
        if self.is_triggered() {
            child.trigger();
            return child;
        }

        let parent = self.clone();
        let linked = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.cancelled() => linked.trigger(),
                _ = linked.cancelled() => {}
            }
        });
        child
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
