//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Configuration shared with every subsystem. Readers take a snapshot with
/// `load_full()`; a reload replaces the whole value atomically.
pub type SharedConfig = Arc<ArcSwap<RelayConfig>>;

/// Wrap a configuration for sharing.
pub fn shared(config: RelayConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected, reloading");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply updates from a watcher to the shared configuration until the
/// channel closes.
pub async fn apply_updates(shared: SharedConfig, mut updates: mpsc::UnboundedReceiver<RelayConfig>) {
    while let Some(config) = updates.recv().await {
        tracing::info!(
            chain_id = %config.blockchain_info.chain_id,
            gas_price = %config.blockchain_info.transactions.gas_price,
            "Configuration reloaded"
        );
        shared.store(Arc::new(config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_updates_swaps_config() {
        let shared_config = shared(RelayConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();

        let mut updated = RelayConfig::default();
        updated.blockchain_info.transactions.gas_adjustment = 2.0;
        tx.send(updated).unwrap();
        drop(tx);

        apply_updates(shared_config.clone(), rx).await;
        assert_eq!(shared_config.load().blockchain_info.transactions.gas_adjustment, 2.0);
    }
}
